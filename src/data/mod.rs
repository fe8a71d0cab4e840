// src/data/mod.rs
use core::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use heapless::HistoryBuffer;

/// Глубина журнала полета (циклов)
const FLIGHT_LOG_SIZE: usize = 256;

/// Снимок оценки ориентации за один цикл
#[derive(Clone, Copy, Debug, defmt::Format)]
pub struct ImuSample {
    /// Тангаж с коррекцией акселерометром (градусы)
    pub pitch_deg: f32,
    /// Крен с коррекцией акселерометром (градусы)
    pub roll_deg: f32,
    /// Тангаж только по гироскопу (градусы)
    pub pitch_raw_deg: f32,
    /// Крен только по гироскопу (градусы)
    pub roll_raw_deg: f32,
    /// Тангаж по акселерометру (градусы)
    pub accel_pitch_deg: f32,
    /// Крен по акселерометру (градусы)
    pub accel_roll_deg: f32,
    /// Угловая скорость тангажа (градусы/с)
    pub pitch_rate_dps: f32,
    /// Угловая скорость крена (градусы/с)
    pub roll_rate_dps: f32,
    /// Накопленный угол рыскания (градусы)
    pub heading_deg: f32,
    /// Квадрант и знак интегрирования тангажа
    pub pitch_quadrant: u8,
    pub pitch_sign: f32,
    /// Квадрант и знак интегрирования крена
    pub roll_quadrant: u8,
    pub roll_sign: f32,
}

/// Показания одной ячейки батареи
#[derive(Clone, Copy, Debug, defmt::Format)]
pub struct CellReading {
    pub volts: f32,
    pub percent: f32,
}

/// Состояние батареи: три последовательные ячейки
#[derive(Clone, Copy, Debug, defmt::Format)]
pub struct BatteryState {
    pub cells: [CellReading; 3],
}

impl BatteryState {
    /// Заряд самой разряженной ячейки (проценты)
    pub fn min_percent(&self) -> f32 {
        let mut min = self.cells[0].percent;
        for cell in &self.cells[1..] {
            if cell.percent < min {
                min = cell.percent;
            }
        }
        min
    }

    /// Есть ли ячейка с зарядом ниже порога
    pub fn any_below(&self, threshold: f32) -> bool {
        self.cells.iter().any(|cell| cell.percent < threshold)
    }
}

/// Флаги команд оператора (консоль -> цикл управления)
///
/// Консоль только ставит флаги, цикл управления их считывает
/// и при необходимости сбрасывает. Однократные команды (сброс,
/// приращение мощности) потребляются один раз за цикл.
pub struct OperatorFlags {
    stop: AtomicBool,
    start: AtomicBool,
    reset: AtomicBool,
    inc_power: AtomicBool,
    /// Отложенное приращение мощности (проценты)
    pending_increment: AtomicI32,
}

impl OperatorFlags {
    pub const fn new() -> Self {
        Self {
            stop: AtomicBool::new(false),
            start: AtomicBool::new(false),
            // Первый цикл начинается с установки начальной мощности
            reset: AtomicBool::new(true),
            inc_power: AtomicBool::new(false),
            pending_increment: AtomicI32::new(0),
        }
    }

    /// Запрос остановки моторов, флаг не снимается
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn is_stop(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Запуск контура стабилизации
    pub fn request_start(&self) {
        self.start.store(true, Ordering::Relaxed);
    }

    pub fn is_started(&self) -> bool {
        self.start.load(Ordering::Relaxed)
    }

    /// Запрос сброса мощности моторов к начальной
    pub fn request_reset(&self) {
        self.reset.store(true, Ordering::Relaxed);
    }

    /// Снимает флаг сброса, возвращая его прежнее значение
    pub fn take_reset(&self) -> bool {
        self.reset.swap(false, Ordering::Relaxed)
    }

    /// Запрос приращения общей мощности. Повторный запрос до
    /// обработки заменяет предыдущее значение.
    pub fn request_power_increment(&self, delta_percent: i32) {
        self.pending_increment.store(delta_percent, Ordering::Relaxed);
        self.inc_power.store(true, Ordering::Relaxed);
    }

    /// Забирает отложенное приращение мощности, если оно есть
    pub fn take_power_increment(&self) -> Option<i32> {
        if self.inc_power.swap(false, Ordering::Relaxed) {
            Some(self.pending_increment.swap(0, Ordering::Relaxed))
        } else {
            None
        }
    }
}

/// Общее состояние системы
pub struct SystemState {
    /// Команды оператора
    pub flags: OperatorFlags,
    /// Все моторы остановлены, программу можно завершать
    pub motors_stopped: AtomicBool,
    /// Текущая базовая мощность моторов (проценты)
    pub current_power: Mutex<CriticalSectionRawMutex, f32>,
    /// Последняя оценка ориентации
    pub last_imu: Mutex<CriticalSectionRawMutex, Option<ImuSample>>,
    /// Последние показания батареи
    pub last_battery: Mutex<CriticalSectionRawMutex, Option<BatteryState>>,
}

impl SystemState {
    pub const fn new() -> Self {
        Self {
            flags: OperatorFlags::new(),
            motors_stopped: AtomicBool::new(false),
            current_power: Mutex::new(0.0),
            last_imu: Mutex::new(None),
            last_battery: Mutex::new(None),
        }
    }

    /// Проверка готовности датчиков
    pub async fn is_ready(&self) -> bool {
        self.last_imu.lock().await.is_some()
    }

    pub fn set_motors_stopped(&self) {
        self.motors_stopped.store(true, Ordering::Relaxed);
    }

    pub fn are_motors_stopped(&self) -> bool {
        self.motors_stopped.load(Ordering::Relaxed)
    }
}

/// Запись журнала полета за один цикл управления
#[derive(Clone, Copy, Debug, defmt::Format)]
pub struct TickRecord {
    pub tick: u32,
    /// Углы с коррекцией акселерометром (градусы)
    pub pitch_deg: f32,
    pub roll_deg: f32,
    /// Углы только по гироскопу (градусы)
    pub pitch_raw_deg: f32,
    pub roll_raw_deg: f32,
    /// Углы по акселерометру (градусы)
    pub accel_pitch_deg: f32,
    pub accel_roll_deg: f32,
    /// Угловые скорости (градусы/с)
    pub pitch_rate_dps: f32,
    pub roll_rate_dps: f32,
    /// Составляющие разности мощностей по тангажу
    pub pitch_q: f32,
    pub pitch_qg: f32,
    pub pitch_qp: f32,
    /// Составляющие разности мощностей по крену
    pub roll_q: f32,
    pub roll_qg: f32,
    pub roll_qp: f32,
    /// Мощности моторов по каналам 12..=15 (проценты)
    pub powers: [f32; 4],
    /// Длительность цикла (мкс)
    pub tick_us: u32,
    /// Время обменов по шине за цикл (мкс)
    pub bus_us: u32,
}

/// Кольцевой журнал последних циклов управления
///
/// Заполняется циклом управления, выгружается в лог после
/// остановки моторов. Старые записи вытесняются новыми.
pub struct FlightLog {
    records: HistoryBuffer<TickRecord, FLIGHT_LOG_SIZE>,
}

impl FlightLog {
    pub const fn new() -> Self {
        Self {
            records: HistoryBuffer::new(),
        }
    }

    pub fn record(&mut self, record: TickRecord) {
        self.records.write(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.len() == 0
    }

    /// Записи от самой старой к самой новой
    pub fn iter_chronological(&self) -> impl Iterator<Item = &TickRecord> {
        self.records.oldest_ordered()
    }
}

// Статические экземпляры для глобального доступа
pub static SYSTEM_STATE: SystemState = SystemState::new();
pub static FLIGHT_LOG: Mutex<CriticalSectionRawMutex, FlightLog> =
    Mutex::new(FlightLog::new());
