use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::capacity::DEFAULT_CATEGORY_LIMIT;

/// Json struct for deployment-independent settings.
///
/// Read once at process start and passed explicitly into the pieces that
/// need it; there is no runtime reload.
#[derive(Serialize, Deserialize, Clone)]
pub struct Settings {
    /// Path of the registration database file.
    pub database_file: String,

    /// Directory that proof-of-payment uploads are written into.
    pub proof_dir: String,

    /// Base URL under which this service is publicly reachable.
    /// Stored proof URLs are formed against it.
    pub public_base_url: String,

    /// Shared password for the roster view.
    pub admin_password: String,

    pub web_port: Option<u16>,

    /// Per-event category configuration, keyed by event tag.
    pub events: HashMap<String, EventConfig>,
}

/// Categories and capacity limits for a single tournament instance.
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct EventConfig {
    /// Category names valid for this event, in display order.
    pub categories: Vec<String>,

    /// Per-category capacity overrides. Categories not listed here use
    /// `default_limit`.
    #[serde(default)]
    pub limits: HashMap<String, u32>,

    pub default_limit: Option<u32>,

    /// Whether a proof-of-payment upload is required to register.
    #[serde(default)]
    pub proof_required: bool,

    /// Whether this event's form collects the address field and
    /// requires it.
    #[serde(default)]
    pub address_required: bool,
}

impl EventConfig {
    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    pub fn limit(&self, category: &str) -> u32 {
        self.limits
            .get(category)
            .copied()
            .unwrap_or(self.default_limit.unwrap_or(DEFAULT_CATEGORY_LIMIT))
    }
}

impl Settings {
    pub fn event(&self, event: &str) -> Option<&EventConfig> {
        self.events.get(event)
    }
}
