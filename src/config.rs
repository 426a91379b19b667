/// Store configuration, passed in from the extension page as a plain object
use serde::{Deserialize, Serialize};

pub const DEFAULT_DEBOUNCE_MS: i64 = 300;
pub const DEFAULT_GROUP_ID: &str = "nachoneko";
pub const DEFAULT_FAVORITES_NAME: &str = "常用表情";
pub const DEFAULT_FAVORITES_ICON: &str = "⭐";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreConfig {
    /// Quiet period that coalesces save requests into one flush
    pub debounce_ms: i64,
    /// Group selected when the active group disappears and nothing else is left
    pub default_group_id: String,
    pub favorites_group_name: String,
    pub favorites_group_icon: String,
    /// Popup and sidebar contexts only ever persist favorites
    pub read_only: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            default_group_id: DEFAULT_GROUP_ID.to_string(),
            favorites_group_name: DEFAULT_FAVORITES_NAME.to_string(),
            favorites_group_icon: DEFAULT_FAVORITES_ICON.to_string(),
            read_only: false,
        }
    }
}
