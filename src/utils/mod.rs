//! Вспомогательные утилиты

pub mod filters;
pub mod math;
pub mod system_info;
pub mod timing;

pub use filters::MeanWindow;
pub use math::{constrain, floor_to_quarter, safe_sqrt, sign_of, zero_band};
pub use timing::{SectionClock, TickGuard, TimingStats};
