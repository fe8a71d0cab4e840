//! Планировщик разворота с трапецеидальным профилем угловой скорости
//!
//! По текущему углу и угловой скорости строится план возврата к
//! нулю: разгон с предельным ускорением, круиз на предельной
//! скорости, торможение. Если предельная скорость недостижима,
//! профиль вырождается в треугольный. План хранит абсолютные
//! моменты смены фаз и каждый цикл выдает команду -1/0/+1.

use num_traits::Float;

use crate::config::flight::{loop_timing, power, trajectory};
use crate::utils::safe_sqrt;

/// Длительности фаз построенного плана (секунды), для журнала
#[derive(Clone, Copy, Debug, defmt::Format)]
pub struct PlanTimes {
    /// Полное время разворота
    pub total_s: f32,
    /// Длительность разгона
    pub accel_s: f32,
    /// Длительность торможения
    pub decel_s: f32,
}

/// Планировщик траектории одной оси
pub struct TrajectoryPlanner {
    /// Есть ли активный план
    active: bool,
    /// Момент окончания фазы разгона (мкс)
    accel_end_us: u64,
    /// Момент начала фазы торможения (мкс)
    decel_begin_us: u64,
    /// Момент окончания плана (мкс)
    end_us: u64,
    /// Знак дифференциала, зафиксированный при построении плана
    sign: f32,
    /// Квадрант на момент построения плана
    start_quadrant: u8,
    /// Счетчик отклоненных планов (кинематически неисполнимых)
    rejected: u32,
}

impl TrajectoryPlanner {
    pub const fn new() -> Self {
        Self {
            active: false,
            accel_end_us: 0,
            decel_begin_us: 0,
            end_us: 0,
            sign: 0.0,
            start_quadrant: 0,
            rejected: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Сколько планов отклонено проверкой исполнимости
    pub fn rejected_count(&self) -> u32 {
        self.rejected
    }

    /// Пытается построить план разворота текущего угла к нулю.
    /// Возвращает `None`, если профиль кинематически неисполним:
    /// текущую скорость не погасить на оставшейся дистанции.
    pub fn plan(
        &mut self,
        angle_deg: f32,
        velocity_dps: f32,
        sign: f32,
        quadrant: u8,
        now_us: u64,
    ) -> Option<PlanTimes> {
        // Угол переводится в дистанцию до ближайшей точки
        // остановки: границы 0/180 дуги маятника
        let h = match quadrant {
            1 => 180.0 - angle_deg,
            2 => -180.0 - angle_deg,
            _ => angle_deg,
        };

        // Пределы ориентируются против знака дифференциала:
        // первый мотор пары уводит угол в минус
        let a_max = trajectory::ACC_LIMIT_DEG_S2 * sign * -1.0;
        let v_max = trajectory::VEL_LIMIT_DEG_S * sign * -1.0;
        let v0 = velocity_dps;

        if (a_max * h).abs() < v0 * v0 / 2.0 {
            self.rejected = self.rejected.wrapping_add(1);
            return None;
        }

        let (total, accel, decel) = if (h * a_max).abs() > v_max * v_max - v0 * v0 / 2.0 {
            // Профиль упирается в предельную скорость: есть круиз
            let ta = (v_max - v0) / a_max;
            let td = v_max / a_max;
            let ratio = 1.0 - v0 / v_max;
            let t = (h / v_max).abs()
                + v_max / (2.0 * a_max) * ratio * ratio
                + v_max / (2.0 * a_max);
            (t, ta, td)
        } else {
            // Треугольный профиль: пик скорости ниже предела
            let v_lim = safe_sqrt((h * a_max).abs() + v0 * v0 / 2.0) * sign * -1.0;
            let ta = ((v_lim - v0) / a_max).abs();
            let td = (v_lim / a_max).abs();
            (ta + td, ta, td)
        };

        let total = total.abs();
        let accel = accel.abs();
        let decel = decel.abs();

        self.active = true;
        self.accel_end_us = now_us + secs_to_us(accel);
        self.decel_begin_us = now_us + secs_to_us(total - decel);
        self.end_us = now_us + secs_to_us(total);
        self.sign = sign;
        self.start_quadrant = quadrant;

        Some(PlanTimes {
            total_s: total,
            accel_s: accel,
            decel_s: decel,
        })
    }

    /// Проверяет условия завершения и деактивирует план: время
    /// вышло либо квадрант перешел через парную границу (0-3 или
    /// 1-2), то есть цель пройдена или случился перелет.
    pub fn check_finished(&mut self, quadrant: u8, now_us: u64) {
        if !self.active {
            return;
        }
        if now_us > self.end_us {
            self.active = false;
            return;
        }
        let crossed = matches!(
            (self.start_quadrant, quadrant),
            (0, 3) | (3, 0) | (1, 2) | (2, 1)
        );
        if crossed {
            self.active = false;
        }
    }

    /// Фазовая команда: +1 разгон, -1 торможение, 0 круиз или
    /// покой. Ближе периода цикла к границе фазы команда
    /// обнуляется, чтобы не дергать моторы на переходе.
    pub fn phase_command(&self, now_us: u64) -> f32 {
        if !self.active {
            return 0.0;
        }
        if now_us <= self.accel_end_us {
            if self.accel_end_us - now_us < loop_timing::TICK_US {
                0.0
            } else {
                1.0
            }
        } else if now_us >= self.decel_begin_us && now_us < self.end_us {
            if self.end_us - now_us < loop_timing::TICK_US {
                0.0
            } else {
                -1.0
            }
        } else {
            0.0
        }
    }

    /// Дифференциал мощности от планировщика (проценты)
    pub fn trajectory_command(&self, now_us: u64) -> f32 {
        power::Q_LIMIT * self.sign * self.phase_command(now_us)
    }
}

/// Перевод секунд в микросекунды с отсечкой отрицательных
/// длительностей (защита от погрешности вычитания фаз)
fn secs_to_us(seconds: f32) -> u64 {
    if seconds <= 0.0 {
        0
    } else {
        (seconds * 1_000_000.0) as u64
    }
}

// Модульные тесты
#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn test_velocity_limited_profile() {
        // 45 градусов из покоя: профиль достигает предельной
        // скорости, появляется круизная фаза
        let mut planner = TrajectoryPlanner::new();
        let times = planner.plan(45.0, 0.0, 1.0, 0, 0).unwrap();

        assert!(planner.is_active());
        assert!(approx(times.accel_s, 0.1047, 1e-3));
        assert!(approx(times.decel_s, 0.1047, 1e-3));
        assert!(approx(times.total_s, 0.4047, 1e-3));
        // Круизная фаза неотрицательна
        assert!(times.accel_s + times.decel_s <= times.total_s + 1e-4);
    }

    #[test]
    fn test_steep_angle_keeps_cruise_phase() {
        // 80 градусов из покоя: длинный круиз между разгоном
        // и торможением
        let mut planner = TrajectoryPlanner::new();
        let times = planner.plan(80.0, 0.0, 1.0, 0, 0).unwrap();

        assert!(times.accel_s > 0.0 && times.decel_s > 0.0);
        assert!(approx(times.accel_s, 0.1047, 1e-3));
        assert!(approx(times.total_s, 0.6381, 1e-3));
        assert!(times.total_s > times.accel_s + times.decel_s);
    }

    #[test]
    fn test_triangular_profile() {
        // 1 градус из покоя: предельная скорость недостижима
        let mut planner = TrajectoryPlanner::new();
        let times = planner.plan(1.0, 0.0, 1.0, 0, 0).unwrap();

        assert!(approx(times.accel_s, 0.0264, 1e-3));
        assert!(approx(times.decel_s, 0.0264, 1e-3));
        assert!(approx(times.total_s, times.accel_s + times.decel_s, 1e-4));
    }

    #[test]
    fn test_infeasible_plan_rejected() {
        // Большая скорость на крошечной дистанции: не погасить
        let mut planner = TrajectoryPlanner::new();
        assert!(planner.plan(0.1, 600.0, 1.0, 0, 0).is_none());
        assert!(!planner.is_active());
        assert_eq!(planner.rejected_count(), 1);
        assert_eq!(planner.trajectory_command(0), 0.0);
    }

    #[test]
    fn test_zero_angle_degenerate_plan() {
        // Уровень и покой: план строится, но с нулевым временем
        // и нулевой командой
        let mut planner = TrajectoryPlanner::new();
        let times = planner.plan(0.0, 0.0, 1.0, 0, 1_000).unwrap();
        assert_eq!(times.total_s, 0.0);
        assert_eq!(planner.phase_command(1_000), 0.0);

        planner.check_finished(0, 1_000 + loop_timing::TICK_US);
        assert!(!planner.is_active());
    }

    #[test]
    fn test_quadrant_remaps_distance() {
        // 85 градусов в квадранте 1 эквивалентно дистанции 95
        let mut remapped = TrajectoryPlanner::new();
        let via_q1 = remapped.plan(85.0, 0.0, 1.0, 1, 0).unwrap();

        let mut direct = TrajectoryPlanner::new();
        let via_q0 = direct.plan(95.0, 0.0, 1.0, 0, 0).unwrap();

        assert!(approx(via_q1.total_s, via_q0.total_s, 1e-5));
        assert!(approx(via_q1.accel_s, via_q0.accel_s, 1e-5));
    }

    #[test]
    fn test_phase_sequence() {
        let mut planner = TrajectoryPlanner::new();
        planner.plan(45.0, 0.0, 1.0, 0, 0).unwrap();
        // Фазы: разгон до ~104.7 мс, круиз, торможение с ~300 мс,
        // конец на ~404.7 мс

        assert_eq!(planner.phase_command(10_000), 1.0);
        assert_eq!(planner.trajectory_command(10_000), power::Q_LIMIT);

        // У границы разгона команда обнуляется
        assert_eq!(planner.phase_command(100_000), 0.0);

        // Круиз
        assert_eq!(planner.phase_command(200_000), 0.0);

        // Торможение
        assert_eq!(planner.phase_command(320_000), -1.0);
        assert_eq!(planner.trajectory_command(320_000), -power::Q_LIMIT);

        // У конца плана команда обнуляется
        assert_eq!(planner.phase_command(400_000), 0.0);

        planner.check_finished(0, 410_000);
        assert!(!planner.is_active());
        assert_eq!(planner.trajectory_command(410_000), 0.0);
    }

    #[test]
    fn test_negative_sign_flips_command() {
        // В нижних квадрантах знак дифференциала отрицателен
        let mut planner = TrajectoryPlanner::new();
        planner.plan(-45.0, 0.0, -1.0, 3, 0).unwrap();
        assert_eq!(planner.trajectory_command(10_000), -power::Q_LIMIT);
    }

    #[test]
    fn test_early_abort_on_pair_crossing() {
        let mut planner = TrajectoryPlanner::new();
        planner.plan(45.0, 0.0, 1.0, 0, 0).unwrap();

        // Соседний квадрант не из парной границы план не снимает
        planner.check_finished(1, 20_000);
        assert!(planner.is_active());

        // Переход 0 -> 3 считается достижением цели
        planner.check_finished(3, 40_000);
        assert!(!planner.is_active());
    }

    #[test]
    fn test_nonzero_initial_velocity_shortens_accel() {
        // Скорость уже в направлении разворота: разгон короче
        let mut moving = TrajectoryPlanner::new();
        let with_v0 = moving.plan(45.0, -50.0, 1.0, 0, 0).unwrap();

        let mut resting = TrajectoryPlanner::new();
        let from_rest = resting.plan(45.0, 0.0, 1.0, 0, 0).unwrap();

        assert!(with_v0.accel_s < from_rest.accel_s);
        assert!(with_v0.total_s < from_rest.total_s);
    }
}
