//! Обработка показаний акселерометра
//!
//! Сырые отсчеты сглаживаются скользящим окном по каждой оси,
//! среднее нормируется и переводится в углы тангажа и крена по
//! соглашению осей из AN3192.

use nalgebra::Vector3;
use num_traits::Float;

use crate::config::flight::{conversions, fusion};
use crate::sensors::quadrant::QuadrantState;
use crate::utils::MeanWindow;

/// Углы наклона по акселерометру (градусы)
#[derive(Clone, Copy, Debug, defmt::Format)]
pub struct AccelAngles {
    pub pitch_deg: f32,
    pub roll_deg: f32,
}

/// Скользящие окна усреднения по трем осям
pub struct AccelWindow {
    x: MeanWindow<{ fusion::ACCEL_MEAN_WINDOW }>,
    y: MeanWindow<{ fusion::ACCEL_MEAN_WINDOW }>,
    z: MeanWindow<{ fusion::ACCEL_MEAN_WINDOW }>,
}

impl AccelWindow {
    pub fn new() -> Self {
        Self {
            x: MeanWindow::new(),
            y: MeanWindow::new(),
            z: MeanWindow::new(),
        }
    }

    /// Заполняет окна первым отсчетом целиком
    pub fn seed(&mut self, sample: Vector3<f32>) {
        self.x.seed(sample.x);
        self.y.seed(sample.y);
        self.z.seed(sample.z);
    }

    pub fn push(&mut self, sample: Vector3<f32>) {
        self.x.push(sample.x);
        self.y.push(sample.y);
        self.z.push(sample.z);
    }

    pub fn mean(&self) -> Vector3<f32> {
        Vector3::new(self.x.mean(), self.y.mean(), self.z.mean())
    }

    /// Нормированное среднее по окну. `None` при нулевой норме,
    /// тогда показания этого цикла непригодны.
    pub fn normalized_mean(&self) -> Option<Vector3<f32>> {
        let mean = self.mean();
        let norm = mean.norm();
        if norm == 0.0 {
            None
        } else {
            Some(mean / norm)
        }
    }
}

/// Углы тангажа и крена из нормированного вектора ускорения
pub fn pitch_roll_from_unit(unit: &Vector3<f32>) -> AccelAngles {
    let p_rad = libm::asinf(-unit.x);

    // Вблизи вертикали крен не определен
    let r_rad = if p_rad.abs() == core::f32::consts::FRAC_PI_2 {
        0.0
    } else {
        let ratio = unit.y / libm::cosf(p_rad);
        if ratio.abs() > 1.0 {
            // Сохраняем знак, насыщая аргумент арксинуса
            libm::asinf(ratio / ratio.abs())
        } else {
            libm::asinf(ratio)
        }
    };

    AccelAngles {
        pitch_deg: conversions::rad_to_deg(p_rad),
        roll_deg: conversions::rad_to_deg(r_rad),
    }
}

/// Ориентация платформы по нормированной оси Z
pub fn is_z_up(z_normalized: f32) -> bool {
    z_normalized >= fusion::Z_UP_THRESHOLD
}

/// Начальный квадрант угла по его знаку и ориентации платформы
pub fn initial_quadrant(angle_deg: f32, z_up: bool) -> QuadrantState {
    match (angle_deg >= 0.0, z_up) {
        (true, true) => QuadrantState::new(0, 1.0),
        (true, false) => QuadrantState::new(1, -1.0),
        (false, false) => QuadrantState::new(2, -1.0),
        (false, true) => QuadrantState::new(3, 1.0),
    }
}

// Модульные тесты
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_platform_zero_angles() {
        let angles = pitch_roll_from_unit(&Vector3::new(0.0, 0.0, 1.0));
        assert!(angles.pitch_deg.abs() < 1e-4);
        assert!(angles.roll_deg.abs() < 1e-4);
    }

    #[test]
    fn test_pitch_30_degrees() {
        let p = 30.0_f32.to_radians();
        let unit = Vector3::new(-libm::sinf(p), 0.0, libm::cosf(p));
        let angles = pitch_roll_from_unit(&unit);
        assert!((angles.pitch_deg - 30.0).abs() < 1e-3);
        assert!(angles.roll_deg.abs() < 1e-3);
    }

    #[test]
    fn test_vertical_pitch_roll_undefined() {
        let angles = pitch_roll_from_unit(&Vector3::new(-1.0, 0.0, 0.0));
        assert!((angles.pitch_deg - 90.0).abs() < 1e-3);
        assert_eq!(angles.roll_deg, 0.0);
    }

    #[test]
    fn test_roll_ratio_saturated() {
        // Рассогласованный вектор: |y/cos(p)| > 1
        let angles = pitch_roll_from_unit(&Vector3::new(0.0, 1.2, 0.0));
        assert!((angles.roll_deg - 90.0).abs() < 1e-3);

        let angles = pitch_roll_from_unit(&Vector3::new(0.0, -1.2, 0.0));
        assert!((angles.roll_deg + 90.0).abs() < 1e-3);
    }

    #[test]
    fn test_zero_norm_rejected() {
        let window = AccelWindow::new();
        assert!(window.normalized_mean().is_none());
    }

    #[test]
    fn test_window_seed_then_mean() {
        let mut window = AccelWindow::new();
        window.seed(Vector3::new(0.0, 0.0, 1.0));
        let unit = window.normalized_mean().unwrap();
        assert!((unit.z - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_initial_quadrant_mapping() {
        assert_eq!(initial_quadrant(10.0, true), QuadrantState::new(0, 1.0));
        assert_eq!(initial_quadrant(10.0, false), QuadrantState::new(1, -1.0));
        assert_eq!(initial_quadrant(-10.0, false), QuadrantState::new(2, -1.0));
        assert_eq!(initial_quadrant(-10.0, true), QuadrantState::new(3, 1.0));
        // Ноль относится к положительной стороне
        assert_eq!(initial_quadrant(0.0, true), QuadrantState::new(0, 1.0));
    }

    #[test]
    fn test_z_up_threshold() {
        assert!(is_z_up(0.9));
        assert!(is_z_up(-0.8));
        assert!(!is_z_up(-0.81));
    }
}
