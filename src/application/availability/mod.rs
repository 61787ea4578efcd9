pub mod monitor;
pub mod tracker;

pub use monitor::AvailabilityMonitor;
pub use tracker::AvailabilityTracker;
