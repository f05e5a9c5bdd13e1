/// UDisks2 disk management over D-Bus
pub mod udisks;

pub use udisks::{UDisksError, UDisksEventSource};
