use std::sync::Arc;

use crate::metering::meter_state::MeterState;
use crate::models::endpoint::AudioEndpointRef;
use crate::models::error::MeterError;
use crate::models::snapshot::{MeterSnapshot, SourceReading};
use crate::models::source::SourceConfig;
use crate::session::capture::CaptureSession;
use crate::traits::device_catalog::DeviceCatalog;

/// One configured source and whatever it currently resolves to.
///
/// `session` is `None` while the configured pattern matches no live
/// endpoint; the source then reads as a placeholder until a dirty
/// rebuild finds a match.
pub struct MeterSource {
    pub config: SourceConfig,
    pub label: String,
    pub session: Option<CaptureSession>,
    pub meter: MeterState,
}

/// Resolves configured device patterns to live capture sessions.
///
/// Owned exclusively by the polling thread; device-change notifications
/// never touch the session list directly, they only mark it dirty so
/// the next tick rebuilds here.
pub struct SourceRegistry {
    catalog: Arc<dyn DeviceCatalog>,
    sources: Vec<MeterSource>,
}

impl SourceRegistry {
    pub fn new(catalog: Arc<dyn DeviceCatalog>) -> Self {
        Self {
            catalog,
            sources: Vec::new(),
        }
    }

    /// Tear down every session and re-resolve all configs.
    ///
    /// `device_offset` cycles pattern matches: the first match is
    /// shifted by the offset, wrapped modulo the candidate count, so a
    /// user can step through devices sharing a name substring. The
    /// offset does not apply to `"default"` resolution.
    ///
    /// Per-source failures never abort the rebuild; they are logged and
    /// returned for the delegate, and the affected entry becomes a
    /// placeholder (or is skipped, for a nameless config).
    pub fn rebuild(&mut self, configs: &[SourceConfig], device_offset: isize) -> Vec<MeterError> {
        log::info!("Rebuilding sources ({} configured)", configs.len());

        self.close_all();
        self.sources.clear();
        let mut errors = Vec::new();

        for config in configs {
            if config.name.trim().is_empty() {
                log::warn!("Device configuration missing a name. This entry will be skipped.");
                errors.push(MeterError::ConfigurationInvalid(
                    "device configuration missing a name".into(),
                ));
                continue;
            }

            match self.resolve(config, device_offset) {
                Ok(endpoint) => {
                    let label = config.label_for(&endpoint.name);
                    let session = match self.open_session(endpoint) {
                        Ok(session) => Some(session),
                        Err(e) => {
                            log::warn!("Failed to open capture for '{}': {}", config.name, e);
                            errors.push(e);
                            None
                        }
                    };
                    self.sources.push(MeterSource {
                        config: config.clone(),
                        label,
                        session,
                        meter: MeterState::new(),
                    });
                }
                Err(e) => {
                    log::warn!("Device name '{}' did not match any devices: {}", config.name, e);
                    errors.push(e);
                    self.sources.push(MeterSource {
                        config: config.clone(),
                        label: config.fallback_label(),
                        session: None,
                        meter: MeterState::new(),
                    });
                }
            }
        }

        errors
    }

    fn resolve(
        &self,
        config: &SourceConfig,
        device_offset: isize,
    ) -> Result<AudioEndpointRef, MeterError> {
        if config.wants_default() {
            return self.catalog.default_endpoint(config.direction);
        }

        let pattern = config.name.to_lowercase();
        let candidates: Vec<AudioEndpointRef> = self
            .catalog
            .endpoints(config.direction)?
            .into_iter()
            .filter(|endpoint| endpoint.name.to_lowercase().contains(&pattern))
            .collect();

        if candidates.is_empty() {
            return Err(MeterError::DeviceUnavailable(config.name.clone()));
        }

        let index = wrap_index(0, device_offset, candidates.len());
        Ok(candidates[index].clone())
    }

    fn open_session(&self, endpoint: AudioEndpointRef) -> Result<CaptureSession, MeterError> {
        let provider = self.catalog.open_capture(&endpoint)?;
        CaptureSession::open(endpoint, provider)
    }

    /// Readings for all visible sources, in config order.
    pub fn snapshot(&self) -> MeterSnapshot {
        let readings = self
            .sources
            .iter()
            .filter(|source| source.config.visible)
            .map(|source| SourceReading {
                label: source.label.clone(),
                scale: source.config.scale,
                levels: source.session.as_ref().map(|_| source.meter.levels()),
            })
            .collect();

        MeterSnapshot { readings }
    }

    /// Mute/clear: floor every meter without touching capture sessions.
    pub fn reset_meters(&mut self) {
        for source in &mut self.sources {
            source.meter.reset();
        }
    }

    pub fn pause_all(&mut self) {
        for source in &mut self.sources {
            if let Some(session) = source.session.as_mut() {
                if let Err(e) = session.pause() {
                    log::warn!("Failed to pause '{}': {}", source.label, e);
                }
            }
        }
    }

    pub fn resume_all(&mut self) {
        for source in &mut self.sources {
            if let Some(session) = source.session.as_mut() {
                if let Err(e) = session.resume() {
                    log::warn!("Failed to resume '{}': {}", source.label, e);
                }
            }
        }
    }

    pub fn close_all(&mut self) {
        for source in &mut self.sources {
            if let Some(session) = source.session.as_mut() {
                session.close();
            }
        }
    }

    pub fn sources(&self) -> &[MeterSource] {
        &self.sources
    }

    pub fn sources_mut(&mut self) -> &mut [MeterSource] {
        &mut self.sources
    }
}

/// `((i + offset) mod n + n) mod n` — wraps negative offsets correctly.
pub(crate) fn wrap_index(index: usize, offset: isize, len: usize) -> usize {
    debug_assert!(len > 0);
    let len = len as isize;
    let wrapped = ((index as isize + offset) % len + len) % len;
    wrapped as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::endpoint::Direction;
    use crate::testing::MockCatalog;

    fn catalog_with_mics(names: &[&str]) -> Arc<MockCatalog> {
        let endpoints = names
            .iter()
            .enumerate()
            .map(|(i, name)| AudioEndpointRef {
                id: format!("mic-{}", i),
                name: (*name).to_string(),
                direction: Direction::Capture,
                is_default: i == 0,
            })
            .collect();
        Arc::new(MockCatalog::new(endpoints))
    }

    #[test]
    fn wrap_index_handles_negative_offsets() {
        assert_eq!(wrap_index(0, -1, 3), 2);
        assert_eq!(wrap_index(0, 1, 3), 1);
        assert_eq!(wrap_index(0, 3, 3), 0);
        assert_eq!(wrap_index(0, -4, 3), 2);
        assert_eq!(wrap_index(2, 2, 3), 1);
        assert_eq!(wrap_index(0, 0, 1), 0);
    }

    #[test]
    fn default_keyword_resolves_the_os_default() {
        let catalog = catalog_with_mics(&["Headset Microphone", "USB Microphone"]);
        let mut registry = SourceRegistry::new(catalog);

        registry.rebuild(&[SourceConfig::new("default", Direction::Capture)], 0);

        let source = &registry.sources()[0];
        assert_eq!(
            source.session.as_ref().unwrap().endpoint().name,
            "Headset Microphone"
        );
    }

    #[test]
    fn pattern_matches_substring_case_insensitively() {
        let catalog = catalog_with_mics(&["Headset Microphone", "Chat Mic (GoXLR)"]);
        let mut registry = SourceRegistry::new(catalog);

        registry.rebuild(&[SourceConfig::new("chat mic", Direction::Capture)], 0);

        let source = &registry.sources()[0];
        assert_eq!(
            source.session.as_ref().unwrap().endpoint().name,
            "Chat Mic (GoXLR)"
        );
    }

    #[test]
    fn unmatched_pattern_yields_a_placeholder_not_an_error() {
        let catalog = catalog_with_mics(&["Headset Microphone"]);
        let mut registry = SourceRegistry::new(catalog);

        registry.rebuild(&[SourceConfig::new("No Such Device", Direction::Capture)], 0);

        assert_eq!(registry.sources().len(), 1);
        let source = &registry.sources()[0];
        assert!(source.session.is_none());
        assert_eq!(source.label, "No Such Device");

        let snapshot = registry.snapshot();
        assert!(snapshot.readings[0].is_placeholder());
    }

    #[test]
    fn nameless_config_is_skipped_entirely() {
        let catalog = catalog_with_mics(&["Headset Microphone"]);
        let mut registry = SourceRegistry::new(catalog);

        registry.rebuild(
            &[
                SourceConfig::new("  ", Direction::Capture),
                SourceConfig::new("default", Direction::Capture),
            ],
            0,
        );

        assert_eq!(registry.sources().len(), 1);
    }

    #[test]
    fn offset_cycles_through_matching_candidates() {
        let catalog = catalog_with_mics(&["Mic A", "Mic B", "Mic C"]);
        let mut registry = SourceRegistry::new(Arc::clone(&catalog) as Arc<dyn DeviceCatalog>);
        let config = vec![SourceConfig::new("Mic", Direction::Capture)];

        registry.rebuild(&config, 0);
        assert_eq!(registry.sources()[0].session.as_ref().unwrap().endpoint().name, "Mic A");

        registry.rebuild(&config, 1);
        assert_eq!(registry.sources()[0].session.as_ref().unwrap().endpoint().name, "Mic B");

        registry.rebuild(&config, -1);
        assert_eq!(registry.sources()[0].session.as_ref().unwrap().endpoint().name, "Mic C");
    }

    #[test]
    fn rebuild_closes_previous_sessions() {
        let catalog = catalog_with_mics(&["Headset Microphone"]);
        let mut registry = SourceRegistry::new(Arc::clone(&catalog) as Arc<dyn DeviceCatalog>);
        let config = vec![SourceConfig::new("default", Direction::Capture)];

        registry.rebuild(&config, 0);
        let first = catalog.last_handle("mic-0").unwrap();
        assert!(first.is_active());

        registry.rebuild(&config, 0);
        assert!(!first.is_active());
        assert!(catalog.last_handle("mic-0").unwrap().is_active());
    }

    #[test]
    fn hidden_sources_are_metered_but_not_reported() {
        let catalog = catalog_with_mics(&["Headset Microphone", "USB Microphone"]);
        let mut registry = SourceRegistry::new(catalog);

        let mut hidden = SourceConfig::new("USB", Direction::Capture);
        hidden.visible = false;
        registry.rebuild(
            &[SourceConfig::new("Headset", Direction::Capture), hidden],
            0,
        );

        assert_eq!(registry.sources().len(), 2);
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.readings[0].label, "Headset Microphone");
    }

    #[test]
    fn reset_meters_floors_all_tracks() {
        let catalog = catalog_with_mics(&["Headset Microphone"]);
        let mut registry = SourceRegistry::new(catalog);
        registry.rebuild(&[SourceConfig::new("default", Direction::Capture)], 0);

        registry.sources_mut()[0].meter.update(0.8);
        registry.reset_meters();

        let levels = registry.sources()[0].meter.levels();
        assert_eq!(levels.peak_max, 0.0);
        assert_eq!(levels.peak, 0.0);
    }

    #[test]
    fn alias_pattern_labels_the_reading() {
        let catalog = catalog_with_mics(&["Chat Mic (TC-Helicon GoXLR)"]);
        let mut registry = SourceRegistry::new(catalog);

        let mut config = SourceConfig::new("Chat Mic", Direction::Capture);
        config.alias_pattern = Some(r"\((.+)\)".into());
        registry.rebuild(&[config], 0);

        assert_eq!(registry.snapshot().readings[0].label, "TC-Helicon GoXLR");
    }
}
