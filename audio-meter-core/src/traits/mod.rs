pub mod capture_provider;
pub mod device_catalog;
pub mod monitor_delegate;
