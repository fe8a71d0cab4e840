pub(crate) mod l3gd20;
pub(crate) mod lsm303;

pub use l3gd20::{GyroFifo, L3gd20, L3gd20Error};
pub use lsm303::{AccelFifo, Lsm303, Lsm303Error};
