//! Смеситель: дифференциал мощности в мощности пары моторов
//!
//! Сумма гравитационной и траекторной составляющих распределяется
//! между двумя моторами оси вокруг общего уровня мощности. Выход
//! дискретизируется с шагом 0.25% и ограничивается снизу полом
//! холостого хода, сверху полной мощностью.

use crate::config::flight::power;
use crate::config::hardware::motors;
use crate::utils::{constrain, floor_to_quarter};

/// Мощности пары моторов одной оси (проценты)
#[derive(Clone, Copy, Debug, PartialEq, defmt::Format)]
pub struct PairPowers {
    /// Первый мотор пары: подъем уводит угол в минус
    pub first: f32,
    /// Второй мотор пары
    pub second: f32,
}

/// Ограничение мощности мотора: не ниже пола, не выше предела
pub fn clamp_power(value: f32, floor: f32) -> f32 {
    constrain(value, floor, power::MAX_POWER)
}

/// Распределяет дифференциал Q = Qg + Qp + offset между моторами
/// пары вокруг общего уровня `current_power`.
pub fn mix(
    q_gravity: f32,
    q_trajectory: f32,
    current_power: f32,
    offset: f32,
    floor: f32,
) -> PairPowers {
    let q = q_gravity + q_trajectory + offset;
    let total = current_power * 2.0;
    let second = (total - q) / 2.0;
    let first = q + second;

    PairPowers {
        first: clamp_power(floor_to_quarter(first), floor),
        second: clamp_power(floor_to_quarter(second), floor),
    }
}

/// Перевод мощности в промилле длительности импульса PCA9685.
/// 0% соответствует 400 промилле (1.0 мс при 400 Гц), 100% -
/// 800 промилле (2.0 мс). Дробная часть отбрасывается.
pub fn power_to_duty_pm(percent: f32) -> u16 {
    let span = (motors::DUTY_MIN - motors::DUTY_MAX) / (0.0 - power::MAX_POWER);
    (motors::DUTY_MAX + (percent - power::MAX_POWER) * span) as u16
}

// Модульные тесты
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::flight::power::{FLOOR_STABILIZE, MAX_POWER, Q_LIMIT};

    #[test]
    fn test_zero_differential_even_split() {
        let pair = mix(0.0, 0.0, 20.0, 0.0, FLOOR_STABILIZE);
        assert_eq!(pair.first, 20.0);
        assert_eq!(pair.second, 20.0);
    }

    #[test]
    fn test_differential_shifts_pair() {
        // Q = 25 вокруг уровня 50: 62.5 против 37.5
        let pair = mix(25.0, 0.0, 50.0, 0.0, FLOOR_STABILIZE);
        assert_eq!(pair.first, 62.5);
        assert_eq!(pair.second, 37.5);
    }

    #[test]
    fn test_output_discretized_to_quarter() {
        let pair = mix(1.3, 0.0, 20.0, 0.0, FLOOR_STABILIZE);
        assert_eq!(pair.first, 20.5); // 20.65 -> 20.5
        assert_eq!(pair.second, 19.25); // 19.35 -> 19.25
    }

    #[test]
    fn test_offset_added_to_differential() {
        let with_offset = mix(10.0, 0.0, 50.0, 2.0, FLOOR_STABILIZE);
        let without = mix(12.0, 0.0, 50.0, 0.0, FLOOR_STABILIZE);
        assert_eq!(with_offset, without);
    }

    #[test]
    fn test_bounds_for_full_differential_range() {
        // Выход всегда в [пол, 100] для любых Q и уровней
        let mut q = -2.0 * Q_LIMIT;
        while q <= 2.0 * Q_LIMIT {
            for current in [0.0, 25.0, 50.0, 75.0, 100.0] {
                let pair = mix(q, 0.0, current, 0.0, FLOOR_STABILIZE);
                assert!(pair.first >= FLOOR_STABILIZE && pair.first <= MAX_POWER);
                assert!(pair.second >= FLOOR_STABILIZE && pair.second <= MAX_POWER);
            }
            q += 12.5;
        }
    }

    #[test]
    fn test_zero_power_rests_at_floor() {
        // До набора мощности оба мотора держат холостой ход
        let pair = mix(0.0, 0.0, 0.0, 0.0, FLOOR_STABILIZE);
        assert_eq!(pair.first, FLOOR_STABILIZE);
        assert_eq!(pair.second, FLOOR_STABILIZE);
    }

    #[test]
    fn test_duty_endpoints() {
        assert_eq!(power_to_duty_pm(0.0), 400);
        assert_eq!(power_to_duty_pm(100.0), 800);
        assert_eq!(power_to_duty_pm(50.0), 600);
    }

    #[test]
    fn test_duty_truncates_fraction() {
        // 400 + 4 * 33.25 = 533.0, дробная часть отбрасывается
        assert_eq!(power_to_duty_pm(33.25), 533);
        assert_eq!(power_to_duty_pm(12.0), 448);
    }
}
