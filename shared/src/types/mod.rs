pub mod claims;
pub mod json_error;
pub mod log_entry;
pub mod server_config;
