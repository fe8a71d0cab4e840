//! Математические функции и утилиты

use num_traits::Float;

/// Ограничение значения в заданных пределах
#[inline(always)]
pub fn constrain(value: f32, min: f32, max: f32) -> f32 {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Зона нечувствительности: значения в пределах полосы считаются нулем
#[inline(always)]
pub fn zero_band(value: f32, band: f32) -> f32 {
    if value.abs() <= band {
        0.0
    } else {
        value
    }
}

/// Квадратный корень с защитой от отрицательных значений
#[inline]
pub fn safe_sqrt(value: f32) -> f32 {
    if value <= 0.0 {
        0.0
    } else {
        libm::sqrtf(value)
    }
}

/// Дискретизация мощности: модуль округляется вниз до кратного 0.25,
/// знак сохраняется
#[inline]
pub fn floor_to_quarter(value: f32) -> f32 {
    if value == 0.0 {
        return 0.0;
    }
    let magnitude = value.abs();
    let floored = magnitude - (magnitude % 0.25);
    floored * sign_of(value)
}

/// Знак значения как множитель (+1/-1, ноль считается положительным)
#[inline(always)]
pub fn sign_of(value: f32) -> f32 {
    if value < 0.0 {
        -1.0
    } else {
        1.0
    }
}

// Модульные тесты
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constrain() {
        assert_eq!(constrain(5.0, 0.0, 10.0), 5.0);
        assert_eq!(constrain(-5.0, 0.0, 10.0), 0.0);
        assert_eq!(constrain(15.0, 0.0, 10.0), 10.0);
    }

    #[test]
    fn test_zero_band() {
        assert_eq!(zero_band(0.05, 0.1), 0.0);
        assert_eq!(zero_band(-0.05, 0.1), 0.0);
        assert_eq!(zero_band(0.5, 0.1), 0.5);
        assert_eq!(zero_band(-0.5, 0.1), -0.5);
    }

    #[test]
    fn test_safe_sqrt() {
        assert_eq!(safe_sqrt(4.0), 2.0);
        assert_eq!(safe_sqrt(0.0), 0.0);
        assert_eq!(safe_sqrt(-1.0), 0.0);
    }

    #[test]
    fn test_floor_to_quarter() {
        assert_eq!(floor_to_quarter(1.3), 1.25);
        assert_eq!(floor_to_quarter(-1.3), -1.25);
        assert_eq!(floor_to_quarter(2.25), 2.25);
        assert_eq!(floor_to_quarter(0.0), 0.0);
        assert_eq!(floor_to_quarter(0.24), 0.0);
    }

    #[test]
    fn test_floor_to_quarter_idempotent() {
        for &v in &[0.3, -0.3, 17.8, -99.99, 100.0, 0.25] {
            let once = floor_to_quarter(v);
            assert_eq!(floor_to_quarter(once), once);
        }
    }

    #[test]
    fn test_sign_of() {
        assert_eq!(sign_of(3.5), 1.0);
        assert_eq!(sign_of(-0.1), -1.0);
        assert_eq!(sign_of(0.0), 1.0);
    }
}
