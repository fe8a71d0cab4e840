//! Отслеживание квадранта угла маятника
//!
//! Углы от акселерометра живут в диапазоне (-90, 90), поэтому
//! полный оборот платформы разбит на четыре квадранта:
//!
//! ```text
//!            угол=0
//!               |
//!           3   |   0
//!               |
//! угол=-90 -----+----- угол=90
//!               |
//!           2   |   1
//!               |
//!            угол=0
//! ```
//!
//! При пересечении границы квадранта угол отображается обратно в
//! рабочий диапазон, а знак интегрирования гироскопа меняется так,
//! чтобы угол следовал соглашению акселерометра.

/// Текущий квадрант угла и знак интегрирования
#[derive(Clone, Copy, Debug, PartialEq, defmt::Format)]
pub struct QuadrantState {
    pub quadrant: u8,
    pub sign: f32,
}

impl QuadrantState {
    pub const fn new(quadrant: u8, sign: f32) -> Self {
        Self { quadrant, sign }
    }

    /// Приводит угол к рабочему диапазону, обновляя квадрант и знак
    /// при пересечении границы. Возвращает скорректированный угол.
    pub fn correct_angle(&mut self, angle: f32) -> f32 {
        let mut angle = angle;
        match self.quadrant {
            0 => {
                if angle > 90.0 {
                    angle = 180.0 - angle;
                    self.quadrant = 1;
                    self.sign = -1.0;
                } else if angle < 0.0 {
                    // Знак интегрирования не меняется
                    self.quadrant = 3;
                }
            }
            1 => {
                if angle < 0.0 {
                    self.quadrant = 2;
                    self.sign = -1.0;
                } else if angle > 90.0 {
                    angle = 180.0 - angle;
                    self.quadrant = 0;
                    self.sign = 1.0;
                }
            }
            2 => {
                if angle < -90.0 {
                    angle = -180.0 - angle;
                    self.quadrant = 3;
                    self.sign = 1.0;
                } else if angle > 0.0 {
                    // Знак интегрирования не меняется
                    self.quadrant = 1;
                }
            }
            _ => {
                if angle > 0.0 {
                    self.quadrant = 0;
                    self.sign = 1.0;
                } else if angle < -90.0 {
                    angle = -180.0 - angle;
                    self.quadrant = 2;
                    self.sign = -1.0;
                }
            }
        }

        angle
    }
}

// Модульные тесты
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stays_inside_quadrant() {
        let mut q = QuadrantState::new(0, 1.0);
        assert_eq!(q.correct_angle(45.0), 45.0);
        assert_eq!(q.quadrant, 0);
        assert_eq!(q.sign, 1.0);
    }

    #[test]
    fn test_cross_0_to_1_remaps_angle() {
        let mut q = QuadrantState::new(0, 1.0);
        let corrected = q.correct_angle(92.0);
        assert_eq!(corrected, 88.0);
        assert_eq!(q.quadrant, 1);
        assert_eq!(q.sign, -1.0);
    }

    #[test]
    fn test_cross_1_to_2_keeps_angle() {
        let mut q = QuadrantState::new(1, -1.0);
        let corrected = q.correct_angle(-3.0);
        assert_eq!(corrected, -3.0);
        assert_eq!(q.quadrant, 2);
        assert_eq!(q.sign, -1.0);
    }

    #[test]
    fn test_cross_2_to_3_remaps_angle() {
        let mut q = QuadrantState::new(2, -1.0);
        let corrected = q.correct_angle(-95.0);
        assert_eq!(corrected, -85.0);
        assert_eq!(q.quadrant, 3);
        assert_eq!(q.sign, 1.0);
    }

    #[test]
    fn test_cross_3_to_0_keeps_angle() {
        let mut q = QuadrantState::new(3, 1.0);
        let corrected = q.correct_angle(2.0);
        assert_eq!(corrected, 2.0);
        assert_eq!(q.quadrant, 0);
        assert_eq!(q.sign, 1.0);
    }

    #[test]
    fn test_cross_0_to_3_keeps_sign() {
        let mut q = QuadrantState::new(0, 1.0);
        let corrected = q.correct_angle(-1.5);
        assert_eq!(corrected, -1.5);
        assert_eq!(q.quadrant, 3);
        // Знак остается от предыдущего квадранта
        assert_eq!(q.sign, 1.0);
    }

    #[test]
    fn test_cross_3_to_2_remaps_angle() {
        let mut q = QuadrantState::new(3, 1.0);
        let corrected = q.correct_angle(-91.0);
        assert_eq!(corrected, -89.0);
        assert_eq!(q.quadrant, 2);
        assert_eq!(q.sign, -1.0);
    }

    #[test]
    fn test_cross_2_to_1_keeps_sign() {
        let mut q = QuadrantState::new(2, -1.0);
        let corrected = q.correct_angle(0.5);
        assert_eq!(corrected, 0.5);
        assert_eq!(q.quadrant, 1);
        assert_eq!(q.sign, -1.0);
    }

    #[test]
    fn test_cross_1_to_0_remaps_angle() {
        let mut q = QuadrantState::new(1, -1.0);
        let corrected = q.correct_angle(95.0);
        assert_eq!(corrected, 85.0);
        assert_eq!(q.quadrant, 0);
        assert_eq!(q.sign, 1.0);
    }

    #[test]
    fn test_full_revolution() {
        // Платформа вращается в одну сторону через все квадранты
        let mut q = QuadrantState::new(0, 1.0);
        q.correct_angle(91.0); // 0 -> 1
        assert_eq!(q.quadrant, 1);
        q.correct_angle(-0.5); // 1 -> 2
        assert_eq!(q.quadrant, 2);
        q.correct_angle(-90.5); // 2 -> 3
        assert_eq!(q.quadrant, 3);
        q.correct_angle(0.5); // 3 -> 0
        assert_eq!(q.quadrant, 0);
        assert_eq!(q.sign, 1.0);
    }
}
