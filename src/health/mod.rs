pub mod counter;
pub mod periodic;
pub mod threshold;

pub use counter::HealthCounter;
pub use periodic::PeriodicCounter;
pub use threshold::ThresholdCounter;
