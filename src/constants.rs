//! Process-wide defaults. Each one can be overridden from the environment (or a .env file).

use std::env;

/// Number of whitespace-delimited words the prompt history may hold.
pub const MAX_HISTORY_WORDS: usize = 2000;

/// Per-turn timeout in seconds; large enough to never trip on slow analyses.
pub const RESPONSE_TIMEOUT_SECS: u64 = 9999;

pub const DEFAULT_CONFIG_FILE: &str = "run_configuration_uat.json";

/// Path template registered for temporary file uploads.
pub const TEMP_FILE_ENDPOINT: &str =
    "/chat/temp_file?conversation_id={{conversation_id}}&app_id={{app_id}}&force_group=True";

lazy_static::lazy_static! {
    pub static ref SERVICE_ENDPOINT: String = env::var("PM_OPTIMIZER_ENDPOINT")
        .unwrap_or_else(|_| "https://nprd-sbtst-shelleapimgmt.azure-api.net/backend".to_string());
    // "none" disables the proxy entirely
    pub static ref PROXY_URL: String = env::var("PM_OPTIMIZER_PROXY")
        .unwrap_or_else(|_| "http://zproxy-global.shell.com:80".to_string());
    pub static ref IMAGE_BASE_URL: String = env::var("PM_OPTIMIZER_IMAGE_BASE_URL")
        .unwrap_or_else(|_| "https://uat-shell-e-chat.shell.com/api".to_string());
    pub static ref APPLICATION_ID: u32 = env::var("PM_OPTIMIZER_APP_ID")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(47);
}
