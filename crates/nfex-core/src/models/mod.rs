//! Data models: configuration, decoded tax groups and flat records.

pub mod config;
pub mod record;
pub mod tax;
