//! Application-level configuration constants.

// Backend
pub const API_BASE_URL: &str = "/api";

// UI behavior
pub const SEARCH_DEBOUNCE_MS: u32 = 300;
pub const CELEBRATION_MS: u32 = 1200;
pub const TOAST_MS: u32 = 4000;

// Input limits
pub const MIN_PASSWORD_LEN: usize = 8;
pub const MIN_NAME_LEN: usize = 2;
pub const MAX_NAME_LEN: usize = 64;
