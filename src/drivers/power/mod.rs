pub(crate) mod battery;

pub use battery::{BatteryError, BatteryMonitor};
