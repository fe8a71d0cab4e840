//! Оценка ориентации: интегрирование гироскопа с коррекцией
//! акселерометром через комплементарный фильтр
//!
//! По каждой оси ведутся два угла: рабочий (с коррекцией) и
//! контрольный (только гироскоп). Расхождение между ними
//! показывает накопленный дрейф гироскопа.

use nalgebra::Vector3;

use crate::config::flight::fusion;
use crate::data::ImuSample;
use crate::sensors::accel::{
    initial_quadrant, is_z_up, pitch_roll_from_unit, AccelAngles, AccelWindow,
};
use crate::sensors::quadrant::QuadrantState;
use crate::utils::zero_band;

/// Оценка угла по одной оси: рабочий и контрольный треки
#[derive(Clone, Copy, Debug)]
struct AxisEstimate {
    fused_deg: f32,
    raw_deg: f32,
    fused_quadrant: QuadrantState,
    raw_quadrant: QuadrantState,
}

impl AxisEstimate {
    const fn zeroed() -> Self {
        Self {
            fused_deg: 0.0,
            raw_deg: 0.0,
            fused_quadrant: QuadrantState::new(0, 1.0),
            raw_quadrant: QuadrantState::new(0, 1.0),
        }
    }

    fn seeded(angle_deg: f32, quadrant: QuadrantState) -> Self {
        Self {
            fused_deg: angle_deg,
            raw_deg: angle_deg,
            fused_quadrant: quadrant,
            raw_quadrant: quadrant,
        }
    }

    /// Прибавляет приращение угла, каждый трек со своим знаком
    fn integrate(&mut self, delta_deg: f32) {
        self.fused_deg += delta_deg * self.fused_quadrant.sign;
        self.raw_deg += delta_deg * self.raw_quadrant.sign;
    }

    /// Приводит оба трека к рабочему диапазону квадрантов
    fn correct(&mut self) {
        self.fused_deg = self.fused_quadrant.correct_angle(self.fused_deg);
        self.raw_deg = self.raw_quadrant.correct_angle(self.raw_deg);
    }
}

/// Оценщик ориентации платформы
pub struct AttitudeEstimator {
    pitch: AxisEstimate,
    roll: AxisEstimate,
    /// Накопленный угол рыскания (градусы), только гироскоп
    heading_deg: f32,
    /// Последние углы по акселерометру
    accel: AccelAngles,
    accel_window: AccelWindow,
    pitch_rate_dps: f32,
    roll_rate_dps: f32,
}

impl AttitudeEstimator {
    pub fn new() -> Self {
        Self {
            pitch: AxisEstimate::zeroed(),
            roll: AxisEstimate::zeroed(),
            heading_deg: 0.0,
            accel: AccelAngles {
                pitch_deg: 0.0,
                roll_deg: 0.0,
            },
            accel_window: AccelWindow::new(),
            pitch_rate_dps: 0.0,
            roll_rate_dps: 0.0,
        }
    }

    /// Задает начальную ориентацию по первому отсчету акселерометра.
    /// Окна усреднения заполняются этим отсчетом целиком.
    pub fn seed(&mut self, first_sample: Vector3<f32>) {
        let norm = first_sample.norm();
        let unit = if norm == 0.0 {
            defmt::warn!("Нулевая норма начального отсчета акселерометра");
            Vector3::zeros()
        } else {
            first_sample / norm
        };

        self.accel_window.seed(unit);

        let angles = pitch_roll_from_unit(&unit);
        let z_up = is_z_up(unit.z);

        self.pitch = AxisEstimate::seeded(
            angles.pitch_deg,
            initial_quadrant(angles.pitch_deg, z_up),
        );
        self.roll = AxisEstimate::seeded(
            angles.roll_deg,
            initial_quadrant(angles.roll_deg, z_up),
        );
        self.accel = angles;
        self.heading_deg = 0.0;
    }

    /// Обрабатывает пакет отсчетов гироскопа (градусы/с в осях
    /// датчика). Возвращает `false`, если пакет пуст и углы не
    /// изменились.
    pub fn ingest_gyro(&mut self, samples: &[Vector3<f32>], dr_s: f32) -> bool {
        let last = match samples.last() {
            Some(last) => *last,
            None => return false,
        };

        let mut delta = Vector3::zeros();
        for sample in samples {
            let x = zero_band(sample.x, fusion::GYRO_DEADBAND_DPS);
            // Ось Y датчика направлена против соглашения углов
            let y = -zero_band(sample.y, fusion::GYRO_DEADBAND_DPS);
            let z = zero_band(sample.z, fusion::GYRO_DEADBAND_DPS);

            delta.x += x * dr_s;
            delta.y += y * dr_s;
            delta.z += z * dr_s;
        }

        // Угловые скорости берутся из последнего отсчета пакета
        self.roll_rate_dps = last.x;
        self.pitch_rate_dps = -last.y;

        self.roll.integrate(delta.x);
        self.pitch.integrate(delta.y);
        self.heading_deg += delta.z;

        self.pitch.correct();
        self.roll.correct();

        true
    }

    /// Добавляет отсчет акселерометра в окна усреднения
    pub fn push_accel_sample(&mut self, sample: Vector3<f32>) {
        self.accel_window.push(sample);
    }

    /// Подтягивает рабочие углы к углам акселерометра.
    /// Выполняется каждый цикл, даже без новых отсчетов: тогда
    /// окно усреднения отдает прежнее среднее. При вырожденном
    /// среднем коррекция такта пропускается, угол остается чисто
    /// гироскопным.
    pub fn fuse_accel(&mut self) {
        let unit = match self.accel_window.normalized_mean() {
            Some(unit) => unit,
            None => return,
        };
        self.accel = pitch_roll_from_unit(&unit);

        self.pitch.fused_deg = self.pitch.fused_deg * fusion::COMPLEMENTARY
            + fusion::ACCEL_WEIGHT * self.accel.pitch_deg;
        self.roll.fused_deg = self.roll.fused_deg * fusion::COMPLEMENTARY
            + fusion::ACCEL_WEIGHT * self.accel.roll_deg;
    }

    pub fn pitch_deg(&self) -> f32 {
        self.pitch.fused_deg
    }

    pub fn roll_deg(&self) -> f32 {
        self.roll.fused_deg
    }

    pub fn pitch_quadrant(&self) -> QuadrantState {
        self.pitch.fused_quadrant
    }

    pub fn roll_quadrant(&self) -> QuadrantState {
        self.roll.fused_quadrant
    }

    pub fn pitch_rate_dps(&self) -> f32 {
        self.pitch_rate_dps
    }

    pub fn roll_rate_dps(&self) -> f32 {
        self.roll_rate_dps
    }

    /// Снимок текущей оценки для телеметрии
    pub fn sample(&self) -> ImuSample {
        ImuSample {
            pitch_deg: self.pitch.fused_deg,
            roll_deg: self.roll.fused_deg,
            pitch_raw_deg: self.pitch.raw_deg,
            roll_raw_deg: self.roll.raw_deg,
            accel_pitch_deg: self.accel.pitch_deg,
            accel_roll_deg: self.accel.roll_deg,
            pitch_rate_dps: self.pitch_rate_dps,
            roll_rate_dps: self.roll_rate_dps,
            heading_deg: self.heading_deg,
            pitch_quadrant: self.pitch.fused_quadrant.quadrant,
            pitch_sign: self.pitch.fused_quadrant.sign,
            roll_quadrant: self.roll.fused_quadrant.quadrant,
            roll_sign: self.roll.fused_quadrant.sign,
        }
    }
}

// Модульные тесты
#[cfg(test)]
mod tests {
    use super::*;

    const DR: f32 = 1.0 / 95.0;

    fn level_estimator() -> AttitudeEstimator {
        let mut est = AttitudeEstimator::new();
        est.seed(Vector3::new(0.0, 0.0, 1.0));
        est
    }

    #[test]
    fn test_seed_level_platform() {
        let est = level_estimator();
        assert!(est.pitch_deg().abs() < 1e-4);
        assert!(est.roll_deg().abs() < 1e-4);
        assert_eq!(est.pitch_quadrant(), QuadrantState::new(0, 1.0));
        assert_eq!(est.roll_quadrant(), QuadrantState::new(0, 1.0));
    }

    #[test]
    fn test_seed_inverted_platform() {
        // Датчик вниз: z близко к -1
        let mut est = AttitudeEstimator::new();
        est.seed(Vector3::new(0.0, 0.0, -1.0));
        assert_eq!(est.pitch_quadrant().quadrant, 1);
        assert_eq!(est.pitch_quadrant().sign, -1.0);
    }

    #[test]
    fn test_gyro_integration() {
        let mut est = level_estimator();
        // Один отсчет 10 градусов/с по крену
        let new_data =
            est.ingest_gyro(&[Vector3::new(10.0, 0.0, 0.0)], DR);
        assert!(new_data);
        let expected = 10.0 * DR;
        assert!((est.roll_deg() - expected).abs() < 1e-4);
        assert_eq!(est.roll_rate_dps(), 10.0);
    }

    #[test]
    fn test_pitch_axis_inverted() {
        let mut est = level_estimator();
        est.ingest_gyro(&[Vector3::new(0.0, 10.0, 0.0)], DR);
        // Ось Y инвертирована: положительная скорость дает
        // отрицательное приращение тангажа
        let expected = -10.0 * DR;
        assert!((est.pitch_deg() - expected).abs() < 1e-4);
        assert_eq!(est.pitch_rate_dps(), -10.0);
    }

    #[test]
    fn test_deadband_suppresses_drift() {
        let mut est = level_estimator();
        est.ingest_gyro(&[Vector3::new(0.3, -0.2, 0.1)], DR);
        assert_eq!(est.pitch_deg(), 0.0);
        assert_eq!(est.roll_deg(), 0.0);
        assert_eq!(est.sample().heading_deg, 0.0);
    }

    #[test]
    fn test_empty_packet_no_new_data() {
        let mut est = level_estimator();
        assert!(!est.ingest_gyro(&[], DR));
    }

    #[test]
    fn test_heading_accumulates_without_sign() {
        let mut est = level_estimator();
        est.ingest_gyro(&[Vector3::new(0.0, 0.0, 20.0)], DR);
        est.ingest_gyro(&[Vector3::new(0.0, 0.0, 20.0)], DR);
        let expected = 2.0 * 20.0 * DR;
        assert!((est.sample().heading_deg - expected).abs() < 1e-4);
    }

    #[test]
    fn test_fuse_pulls_to_accel() {
        let mut est = level_estimator();
        // Гироскоп увел угол, акселерометр держит ноль
        est.ingest_gyro(&[Vector3::new(95.0, 0.0, 0.0)], 0.1);
        let drifted = est.roll_deg();
        est.fuse_accel();
        let fused = est.roll_deg();
        assert!((fused - drifted * fusion::COMPLEMENTARY).abs() < 1e-3);
        assert!(fused.abs() < drifted.abs());
    }

    #[test]
    fn test_fused_and_raw_tracks_diverge() {
        let mut est = level_estimator();
        est.ingest_gyro(&[Vector3::new(50.0, 0.0, 0.0)], 0.1);
        est.fuse_accel();
        let sample = est.sample();
        // Контрольный трек не подтягивается акселерометром
        assert!((sample.roll_raw_deg - 5.0).abs() < 1e-3);
        assert!(sample.roll_deg < sample.roll_raw_deg);
    }

    #[test]
    fn test_degenerate_accel_mean_skips_fusion() {
        let mut est = AttitudeEstimator::new();
        est.seed(Vector3::zeros());
        est.ingest_gyro(&[Vector3::new(95.0, 0.0, 0.0)], 0.1);
        let gyro_only = est.roll_deg();
        est.fuse_accel();
        // Нулевая норма окна: угол остается чисто гироскопным
        assert_eq!(est.roll_deg(), gyro_only);
    }

    #[test]
    fn test_quadrant_crossing_through_vertical() {
        let mut est = level_estimator();
        // Крен уходит за 90 градусов за два пакета
        est.ingest_gyro(&[Vector3::new(85.0, 0.0, 0.0)], 1.0);
        assert_eq!(est.roll_quadrant().quadrant, 0);
        est.ingest_gyro(&[Vector3::new(10.0, 0.0, 0.0)], 1.0);
        // 95 -> квадрант 1, угол отображен в 85
        assert_eq!(est.roll_quadrant().quadrant, 1);
        assert_eq!(est.roll_quadrant().sign, -1.0);
        assert!((est.roll_deg() - 85.0).abs() < 1e-3);
    }
}
