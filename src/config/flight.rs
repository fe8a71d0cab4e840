//! Конфигурация параметров стабилизации

use core::f32::consts::PI;

/// Параметры главного цикла управления
pub mod loop_timing {
    /// Частота главного цикла (Гц)
    pub const TICK_HZ: u64 = 50;

    /// Период главного цикла (мкс)
    pub const TICK_US: u64 = 1_000_000 / TICK_HZ;

    /// Бюджет времени одного цикла (мкс)
    pub const TICK_BUDGET_US: u32 = 20_000;

    /// Период вывода статистики времени (в циклах)
    pub const TIMING_REPORT_TICKS: u32 = 250;
}

/// Параметры комплементарного фильтра и обработки гироскопа
pub mod fusion {
    /// Вес гироскопа в комплементарном фильтре
    pub const COMPLEMENTARY: f32 = 0.98;

    /// Вес акселерометра в комплементарном фильтре
    pub const ACCEL_WEIGHT: f32 = 1.0 - COMPLEMENTARY;

    /// Зона нечувствительности гироскопа (градусы/с),
    /// подавляет дрейф нуля неоткалиброванного датчика
    pub const GYRO_DEADBAND_DPS: f32 = 0.5;

    /// Длина окна усреднения показаний акселерометра
    pub const ACCEL_MEAN_WINDOW: usize = 20;

    /// Порог нормированной оси Z для определения ориентации
    /// платформы при старте (датчик вверх или вниз)
    pub const Z_UP_THRESHOLD: f32 = -0.8;
}

/// Геометрия платформы для маятниковой модели
pub mod geometry {
    /// Плечо маятника: расстояние от центра до мотора (метры)
    pub const RADIUS_M: f32 = 0.3;
}

/// Параметры компенсации гравитации
pub mod gravity {
    /// Ускорение свободного падения (м/с^2)
    pub const G: f32 = 9.81;

    /// Масштаб тангенциальной составляющей при положительном знаке
    pub const SCALE_POS: f32 = 0.804;

    /// Масштаб тангенциальной составляющей при отрицательном знаке
    pub const SCALE_NEG: f32 = 0.856;
}

/// Параметры мощности моторов
pub mod power {
    /// Связь разности мощностей и ускорения:
    /// ускорение (м/с^2) = Q * P
    pub const P: f32 = 0.3;

    /// Предел разности мощностей пары моторов (проценты)
    pub const Q_LIMIT: f32 = 25.0;

    /// Начальная мощность моторов (проценты)
    pub const INIT_POWER: f32 = 0.0;

    /// Максимальная мощность мотора (проценты)
    pub const MAX_POWER: f32 = 100.0;

    /// Нижний предел мощности в режиме выравнивания (проценты)
    pub const FLOOR_LEVEL: f32 = 15.0;

    /// Нижний предел мощности в режиме стабилизации (проценты)
    pub const FLOOR_STABILIZE: f32 = 12.0;

    /// Шаг снижения мощности при плавной остановке (проценты за цикл)
    pub const STOP_RAMP_STEP: f32 = 0.25;

    /// Постоянная добавка к разности мощностей в режиме
    /// выравнивания, компенсирует асимметрию пары моторов
    pub const LEVEL_OFFSET: f32 = 0.0;
}

/// Параметры трапецеидального планировщика траектории
pub mod trajectory {
    use super::{geometry, power, PI};

    /// Предел углового ускорения (м/с^2 по дуге маятника)
    pub const ACC_LIMIT_MS2: f32 = power::Q_LIMIT * power::P;

    /// Предел углового ускорения (градусы/с^2)
    pub const ACC_LIMIT_DEG_S2: f32 =
        ACC_LIMIT_MS2 * (180.0 / PI) / geometry::RADIUS_M;

    /// Предел угловой скорости (градусы/с)
    pub const VEL_LIMIT_DEG_S: f32 = 150.0;
}

/// Параметры контроля батареи
pub mod battery {
    /// Напряжение полностью заряженной ячейки (вольты)
    pub const CELL_VMAX: f32 = 4.2;

    /// Напряжение разряженной ячейки (вольты)
    pub const CELL_VMIN: f32 = 3.6;

    /// Минимальный допустимый заряд ячейки (проценты)
    pub const MIN_CELL_PERCENT: f32 = 20.0;

    /// Период проверки батареи (в циклах управления)
    pub const CHECK_DIVIDER: u32 = 250;
}

/// Преобразование единиц измерения
pub mod conversions {
    use super::*;

    /// Преобразование градусов в радианы
    pub const fn deg_to_rad(deg: f32) -> f32 {
        deg * (PI / 180.0)
    }

    /// Преобразование радианов в градусы
    pub const fn rad_to_deg(rad: f32) -> f32 {
        rad * (180.0 / PI)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acc_limit_derivation() {
        // 25 * 0.3 = 7.5 м/с^2
        assert_eq!(trajectory::ACC_LIMIT_MS2, 7.5);
        // 7.5 * (180/pi) / 0.3 ~= 1432.39 градусов/с^2
        let expected = 7.5 * (180.0 / PI) / 0.3;
        assert_eq!(trajectory::ACC_LIMIT_DEG_S2, expected);
    }

    #[test]
    fn test_deg_rad_roundtrip() {
        let deg = 90.0;
        let rad = conversions::deg_to_rad(deg);
        assert!((conversions::rad_to_deg(rad) - deg).abs() < 1e-4);
    }
}
