use regex::Regex;
use serde::{Deserialize, Serialize};

use super::endpoint::Direction;

/// Display scale for a metered source.
///
/// Consumed only at presentation time; meter state stays in raw linear
/// amplitude regardless of scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayScale {
    /// Decibels (dBFS), floored at the converter's minimum.
    Logarithmic,
    /// Percentage of full scale.
    Linear,
}

impl Default for DisplayScale {
    fn default() -> Self {
        Self::Logarithmic
    }
}

/// User-declared intent for one metered source.
///
/// Supplied by the embedding host; read-only to the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Device name pattern. The literal `"default"` (case-insensitive)
    /// selects the OS default endpoint for `direction`; anything else
    /// matches the first active endpoint whose friendly name contains
    /// the pattern, case-insensitively. A partial name is fine as long
    /// as it is unambiguous, e.g. "Chat Mic" for
    /// "Chat Mic (TC-Helicon GoXLR)".
    pub name: String,

    #[serde(default = "default_direction")]
    pub direction: Direction,

    #[serde(default)]
    pub scale: DisplayScale,

    /// Optional regex applied to the resolved friendly name to derive a
    /// shorter display label. The first capture group wins, else the
    /// whole match.
    #[serde(default)]
    pub alias_pattern: Option<String>,

    /// Hidden sources are still resolved and metered, but excluded from
    /// snapshots.
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_direction() -> Direction {
    Direction::Capture
}

fn default_visible() -> bool {
    true
}

impl SourceConfig {
    pub fn new(name: impl Into<String>, direction: Direction) -> Self {
        Self {
            name: name.into(),
            direction,
            scale: DisplayScale::default(),
            alias_pattern: None,
            visible: true,
        }
    }

    /// Whether this config requests the OS default endpoint.
    pub fn wants_default(&self) -> bool {
        self.name.eq_ignore_ascii_case("default")
    }

    /// Display label for a source resolved to `friendly_name`.
    ///
    /// An invalid or non-matching alias pattern falls back to the full
    /// friendly name.
    pub fn label_for(&self, friendly_name: &str) -> String {
        let Some(pattern) = self.alias_pattern.as_deref() else {
            return friendly_name.to_string();
        };
        let Ok(re) = Regex::new(pattern) else {
            log::warn!("Invalid alias pattern '{}', using device name", pattern);
            return friendly_name.to_string();
        };
        match re.captures(friendly_name) {
            Some(caps) => caps
                .get(1)
                .or_else(|| caps.get(0))
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| friendly_name.to_string()),
            None => friendly_name.to_string(),
        }
    }

    /// Display label when no endpoint resolved: the configured pattern.
    pub fn fallback_label(&self) -> String {
        self.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_keyword_is_case_insensitive() {
        assert!(SourceConfig::new("default", Direction::Capture).wants_default());
        assert!(SourceConfig::new("Default", Direction::Render).wants_default());
        assert!(!SourceConfig::new("Chat Mic", Direction::Capture).wants_default());
    }

    #[test]
    fn alias_pattern_extracts_capture_group() {
        let mut config = SourceConfig::new("Chat Mic", Direction::Capture);
        config.alias_pattern = Some(r"\((.+)\)".into());

        assert_eq!(config.label_for("Chat Mic (GoXLR)"), "GoXLR");
    }

    #[test]
    fn alias_pattern_without_group_uses_whole_match() {
        let mut config = SourceConfig::new("default", Direction::Capture);
        config.alias_pattern = Some("Chat Mic".into());

        assert_eq!(config.label_for("Chat Mic (GoXLR)"), "Chat Mic");
    }

    #[test]
    fn missing_or_broken_alias_falls_back_to_device_name() {
        let mut config = SourceConfig::new("default", Direction::Capture);
        assert_eq!(config.label_for("Headset Microphone"), "Headset Microphone");

        config.alias_pattern = Some("(unclosed".into());
        assert_eq!(config.label_for("Headset Microphone"), "Headset Microphone");

        config.alias_pattern = Some("no such text".into());
        assert_eq!(config.label_for("Headset Microphone"), "Headset Microphone");
    }

    #[test]
    fn serde_defaults() {
        let config: SourceConfig = serde_json::from_str(r#"{"name": "default"}"#).unwrap();

        assert_eq!(config.direction, Direction::Capture);
        assert_eq!(config.scale, DisplayScale::Logarithmic);
        assert!(config.visible);
        assert!(config.alias_pattern.is_none());
    }
}
