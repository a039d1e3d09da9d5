//! Engine configuration
//!
//! Tunable constants for the workflow and finance engines. Loaded from the
//! embedding application's config layer; defaults match production policy.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Configuration for the CRM core
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Platform fee charged for a Play Console account, in currency units.
    /// Applied as the default when an organization cost row is first created.
    pub play_console_fee: Decimal,

    /// Days of timeline extension granted per client-caused blocking event.
    pub extension_days_per_event: i64,

    /// Default page size for client listings.
    pub default_page_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            play_console_fee: Decimal::from(25),
            extension_days_per_event: 1,
            default_page_limit: 20,
        }
    }
}
