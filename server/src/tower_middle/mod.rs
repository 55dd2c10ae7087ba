/// Tower middleware module
///
/// One layer lives here: the request logger that wraps the router service,
/// producing exactly one log entry per inbound request and converting any
/// handler failure into a generic 500.
pub mod request_logger;

pub use request_logger::{RequestLoggerLayer, RequestLoggerService};
