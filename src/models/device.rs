use serde::{Deserialize, Serialize};

/// Preference keys a device may read/write. Anything else is rejected.
pub const AUTO_LOGIN_ENABLED: &str = "auto_login_enabled";
pub const CHILD_AUTO_LOGIN_ENABLED: &str = "child_auto_login_enabled";
pub const CHILD_SESSION_ID: &str = "child_session_id";
pub const PREMIUM_SUBSCRIPTION_ACTIVE: &str = "premium_subscription_active";
pub const PARENT_SELECTED_THEME: &str = "parent_selected_theme";
pub const ACTIVE_LINK_REQUEST_ID: &str = "active_link_request_id";

/// All preferences of one device, with defaults filled in for unset keys.
#[derive(Debug, Clone, Serialize)]
pub struct DevicePreferences {
    pub auto_login_enabled: bool,
    pub child_auto_login_enabled: bool,
    pub premium_subscription_active: bool,
    pub parent_selected_theme: String,
    pub child_session_id: Option<String>,
    pub active_link_request_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetPreferenceRequest {
    pub value: String,
}
