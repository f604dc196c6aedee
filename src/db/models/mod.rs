pub mod activity;
pub mod journey;
pub mod location;

pub use activity::ActivityType;
pub use journey::{Journey, JourneyKey};
pub use location::Location;
