pub mod accel;
pub mod fusion;
pub mod quadrant;

pub use accel::{AccelAngles, AccelWindow};
pub use fusion::AttitudeEstimator;
pub use quadrant::QuadrantState;
