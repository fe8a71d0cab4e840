//! Компенсация гравитации дифференциалом мощности пары моторов
//!
//! Платформа рассматривается как маятник: при отклонении от
//! вертикали вдоль дуги действует тангенциальная составляющая
//! гравитации. Дифференциал мощности пары моторов подбирается
//! так, чтобы создать равное по величине противоположное
//! ускорение.

use core::f32::consts::FRAC_PI_2;

use num_traits::Float;

use crate::config::flight::{gravity, power};
use crate::sensors::QuadrantState;

/// Тангенциальная составляющая гравитации (м/с^2) для текущего
/// угла и квадранта. Угол beta отсчитывается от местной вертикали.
pub fn tangential_gravity(angle_rad: f32, quadrant: &QuadrantState) -> f32 {
    let beta = match quadrant.quadrant {
        0 | 3 => FRAC_PI_2 - angle_rad,
        1 => -(FRAC_PI_2 - angle_rad),
        2 => -FRAC_PI_2 + angle_rad,
        q => {
            defmt::warn!("Недопустимый квадрант {}, расчет как для 0", q);
            FRAC_PI_2 - angle_rad
        }
    };

    let gt = gravity::G * libm::cosf(beta);
    // Тяга пары асимметрична: подъем и спуск масштабируются по-разному
    let gt = if gt > 0.0 {
        gt * gravity::SCALE_POS
    } else {
        gt * gravity::SCALE_NEG
    };

    gt * quadrant.sign
}

/// Знак дифференциала мощности для квадранта. В нижней паре
/// квадрантов моторы работают против противоположной стороны дуги,
/// поэтому дифференциал меняет направление.
pub fn power_sign(quadrant: u8) -> f32 {
    if quadrant == 2 || quadrant == 3 {
        -1.0
    } else {
        1.0
    }
}

/// Дифференциал мощности, компенсирующий гравитацию (проценты).
pub fn gravity_command(angle_rad: f32, quadrant: &QuadrantState) -> f32 {
    let gt = tangential_gravity(angle_rad, quadrant);
    let q_g = (gt / power::P).abs();
    q_g * power_sign(quadrant.quadrant)
}

// Модульные тесты
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::flight::conversions::deg_to_rad;

    #[test]
    fn test_level_platform_nearly_zero() {
        // Угол 0 в квадранте 0: beta = 90 градусов, cos ~ 0
        let q = QuadrantState::new(0, 1.0);
        let gt = tangential_gravity(0.0, &q);
        assert!(gt.abs() < 1e-5);
        assert!(gravity_command(0.0, &q).abs() < 1e-4);
    }

    #[test]
    fn test_horizontal_arm_full_gravity() {
        // Угол 90 градусов в квадранте 0: рычаг горизонтален,
        // тангенциальная составляющая максимальна
        let q = QuadrantState::new(0, 1.0);
        let gt = tangential_gravity(deg_to_rad(90.0), &q);
        let expected = gravity::G * gravity::SCALE_POS;
        assert!((gt - expected).abs() < 1e-3);

        let cmd = gravity_command(deg_to_rad(90.0), &q);
        assert!((cmd - expected / power::P).abs() < 1e-2);
    }

    #[test]
    fn test_quadrant_1_flips_direction() {
        // Тот же угол в квадранте 1 со знаком -1
        let q = QuadrantState::new(1, -1.0);
        let gt = tangential_gravity(deg_to_rad(90.0), &q);
        let expected = -gravity::G * gravity::SCALE_POS;
        assert!((gt - expected).abs() < 1e-3);
    }

    #[test]
    fn test_lower_quadrant_negative_gt() {
        // Квадрант 2, угол -90: cos отрицателен, масштаб спуска
        let q = QuadrantState::new(2, -1.0);
        let gt = tangential_gravity(deg_to_rad(-90.0), &q);
        let expected = gravity::G * gravity::SCALE_NEG;
        assert!((gt - expected).abs() < 1e-3);
    }

    #[test]
    fn test_power_sign_per_quadrant() {
        assert_eq!(power_sign(0), 1.0);
        assert_eq!(power_sign(1), 1.0);
        assert_eq!(power_sign(2), -1.0);
        assert_eq!(power_sign(3), -1.0);
    }

    #[test]
    fn test_mirror_symmetry_about_vertical() {
        // Зеркальные положения дают противоположные команды,
        // с точностью до асимметрии масштабов тяги
        for deg in [10.0, 30.0, 60.0, 85.0] {
            let upper = QuadrantState::new(0, 1.0);
            let mirror = QuadrantState::new(3, 1.0);
            let cmd_up = gravity_command(deg_to_rad(deg), &upper);
            let cmd_mirror = gravity_command(deg_to_rad(-deg), &mirror);
            assert!(cmd_up > 0.0);
            assert!(cmd_mirror < 0.0);
            let up_unscaled = cmd_up / gravity::SCALE_POS;
            let mirror_unscaled = -cmd_mirror / gravity::SCALE_NEG;
            assert!((up_unscaled - mirror_unscaled).abs() < 1e-2);
        }
    }

    #[test]
    fn test_invalid_quadrant_treated_as_upper() {
        let q = QuadrantState::new(7, 1.0);
        let good = QuadrantState::new(0, 1.0);
        let angle = deg_to_rad(45.0);
        assert_eq!(
            tangential_gravity(angle, &q),
            tangential_gravity(angle, &good)
        );
    }
}
