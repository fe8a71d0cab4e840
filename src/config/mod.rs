//! Конфигурация системы

pub mod flight;
pub mod hardware;
