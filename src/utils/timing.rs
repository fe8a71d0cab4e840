//! Измерение длительности циклов управления

use embassy_time::Instant;

/// Накопленная статистика длительности циклов
pub struct TimingStats {
    /// Бюджет одного цикла (мкс)
    budget_us: u32,
    /// Количество завершенных циклов
    ticks: u32,
    /// Суммарная длительность (мкс)
    total_us: u64,
    /// Максимальная длительность (мкс)
    max_us: u32,
    /// Длительность последнего цикла (мкс)
    last_us: u32,
    /// Количество циклов с превышением бюджета
    overruns: u32,
}

impl TimingStats {
    pub const fn new(budget_us: u32) -> Self {
        Self {
            budget_us,
            ticks: 0,
            total_us: 0,
            max_us: 0,
            last_us: 0,
            overruns: 0,
        }
    }

    /// Фиксирует длительность одного завершенного цикла
    pub fn record_us(&mut self, elapsed_us: u32) {
        self.ticks = self.ticks.wrapping_add(1);
        self.total_us += elapsed_us as u64;
        self.last_us = elapsed_us;
        if elapsed_us > self.max_us {
            self.max_us = elapsed_us;
        }
        if elapsed_us > self.budget_us {
            self.overruns += 1;
        }
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn last_us(&self) -> u32 {
        self.last_us
    }

    pub fn max_us(&self) -> u32 {
        self.max_us
    }

    pub fn overruns(&self) -> u32 {
        self.overruns
    }

    /// Средняя длительность цикла (мкс)
    pub fn mean_us(&self) -> u32 {
        if self.ticks == 0 {
            0
        } else {
            (self.total_us / self.ticks as u64) as u32
        }
    }
}

/// Страж одного цикла: фиксирует длительность при любом выходе
/// из области видимости, включая ранние `continue` и `break`
pub struct TickGuard<'a> {
    stats: &'a mut TimingStats,
    started: Instant,
}

impl<'a> TickGuard<'a> {
    pub fn begin(stats: &'a mut TimingStats) -> Self {
        Self {
            stats,
            started: Instant::now(),
        }
    }
}

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        let elapsed_us = self.started.elapsed().as_micros() as u32;
        self.stats.record_us(elapsed_us);
    }
}

/// Счетчик времени, проведенного в обменах по шине за один цикл
pub struct SectionClock {
    accumulated_us: u32,
}

impl SectionClock {
    pub fn new() -> Self {
        Self { accumulated_us: 0 }
    }

    /// Выполняет операцию, добавляя ее длительность к счетчику
    pub fn time<R>(&mut self, op: impl FnOnce() -> R) -> R {
        let started = Instant::now();
        let result = op();
        self.accumulated_us += started.elapsed().as_micros() as u32;
        result
    }

    pub fn total_us(&self) -> u32 {
        self.accumulated_us
    }
}
