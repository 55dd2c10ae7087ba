pub mod csrf;
pub mod error;
pub mod request_log;
pub mod sanitize;
pub mod token;

pub use csrf::CsrfStore;
pub use error::AuthError;
pub use request_log::RequestLog;
