//! Задачи executor: цикл управления и консоль оператора

pub mod console_task;
pub mod control_task;
