//! Драйверы внешних устройств на шине I2C и АЦП
pub mod imu;
pub mod power;
pub mod pwm;
