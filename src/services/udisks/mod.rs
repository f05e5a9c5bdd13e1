/// Property lookups against the UDisks2 object tree
mod discovery;
/// UDisks2 service errors
mod error;
/// Signal subscriptions feeding the detector
mod monitoring;
/// D-Bus proxy definitions for UDisks2 interfaces.
#[allow(missing_docs)]
mod proxy;
/// Device event source over the system bus
mod service;

pub use error::UDisksError;
pub use proxy::*;
pub use service::UDisksEventSource;
