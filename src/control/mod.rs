//! Контур управления: компенсация гравитации, планирование
//! траектории и распределение мощности по моторам

pub mod actuator;
pub mod gravity;
pub mod mixer;
pub mod trajectory;

pub use actuator::{ControlMode, MotorController, TickBranch, TickCommands, TickStep};
pub use mixer::PairPowers;
pub use trajectory::TrajectoryPlanner;
