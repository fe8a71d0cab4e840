//! Исполнитель команд моторов: машина решений одного такта
//!
//! Каждый такт выполняется ровно одна ветвь в порядке приоритета:
//! остановка, отсечка по батарее, сброс, изменение мощности,
//! ожидание старта, пропуск без свежего гироскопа, штатное
//! управление. Ветвь решает, какие мощности записать в PWM и
//! завершен ли цикл управления.

use crate::config::flight::conversions::deg_to_rad;
use crate::config::flight::power;
use crate::config::hardware::motors;
use crate::control::gravity;
use crate::control::mixer::{self, PairPowers};
use crate::control::trajectory::TrajectoryPlanner;
use crate::data::ImuSample;
use crate::sensors::QuadrantState;

/// Режим управления платформой
#[derive(Clone, Copy, Debug, PartialEq, defmt::Format)]
pub enum ControlMode {
    /// Выравнивание: управляется только пара тангажа,
    /// остановка мгновенная
    Level,
    /// Стабилизация: обе пары, остановка плавным снижением
    Stabilize,
}

impl ControlMode {
    /// Нижний предел мощности работающего мотора (проценты)
    pub fn power_floor(&self) -> f32 {
        match self {
            ControlMode::Level => power::FLOOR_LEVEL,
            ControlMode::Stabilize => power::FLOOR_STABILIZE,
        }
    }

    /// Постоянная добавка к дифференциалу мощности
    pub fn q_offset(&self) -> f32 {
        match self {
            ControlMode::Level => power::LEVEL_OFFSET,
            ControlMode::Stabilize => 0.0,
        }
    }

    /// Участвует ли пара крена в управлении
    pub fn manages_roll(&self) -> bool {
        matches!(self, ControlMode::Stabilize)
    }
}

/// Команды оператора и защит, считанные на границе такта
#[derive(Clone, Copy, Default)]
pub struct TickCommands {
    /// Запрошена остановка моторов
    pub stop: bool,
    /// Ячейка батареи разряжена ниже допустимого порога
    pub battery_low: bool,
    /// Запрошен сброс моторов к начальной мощности
    pub reset: bool,
    /// Отложенное приращение общей мощности (проценты)
    pub power_increment: Option<f32>,
    /// Контур запущен командой старта
    pub started: bool,
}

/// Ветвь, отработавшая в такте
#[derive(Clone, Copy, Debug, PartialEq, defmt::Format)]
pub enum TickBranch {
    /// Остановка моторов
    Stopping,
    /// Отсечка по разряду батареи
    BatteryCutoff,
    /// Сброс моторов к начальной мощности
    Reset,
    /// Изменение общей мощности по команде оператора
    PowerAdjust,
    /// Ожидание команды старта
    NotStarted,
    /// Нет свежих данных гироскопа, моторы держат прежний сигнал
    NoFreshGyro,
    /// Штатный такт стабилизации
    Control,
}

/// Составляющие дифференциала мощности одной оси
#[derive(Clone, Copy, Debug, Default, defmt::Format)]
pub struct AxisCommand {
    /// Компенсация гравитации (проценты)
    pub q_gravity: f32,
    /// Команда планировщика траектории (проценты)
    pub q_trajectory: f32,
}

impl AxisCommand {
    pub fn total(&self) -> f32 {
        self.q_gravity + self.q_trajectory
    }
}

/// Результат шага исполнителя
pub struct TickStep {
    pub branch: TickBranch,
    /// Мощности каналов 12..=15 для записи в PWM,
    /// `None` - запись в этом такте не требуется
    pub output: Option<[f32; motors::COUNT]>,
    /// Все моторы остановлены, цикл управления можно завершать
    pub finished: bool,
    /// Дифференциал тангажа (штатная ветвь)
    pub pitch: AxisCommand,
    /// Дифференциал крена (штатная ветвь)
    pub roll: AxisCommand,
}

impl TickStep {
    /// Ветвь без записи в моторы
    fn silent(branch: TickBranch) -> Self {
        Self {
            branch,
            output: None,
            finished: false,
            pitch: AxisCommand::default(),
            roll: AxisCommand::default(),
        }
    }

    /// Ветвь с записью мощностей в моторы
    fn applied(branch: TickBranch, powers: [f32; motors::COUNT]) -> Self {
        Self {
            branch,
            output: Some(powers),
            finished: false,
            pitch: AxisCommand::default(),
            roll: AxisCommand::default(),
        }
    }
}

/// Индекс канала в массиве мощностей
const fn channel_index(channel: u8) -> usize {
    (channel - motors::MIN_CHANNEL) as usize
}

/// Исполнитель команд моторов
pub struct MotorController {
    mode: ControlMode,
    /// Мощности моторов каналов 12..=15 (проценты)
    powers: [f32; motors::COUNT],
    /// Общий уровень мощности пары (проценты)
    current_power: f32,
    pitch_plan: TrajectoryPlanner,
    roll_plan: TrajectoryPlanner,
}

impl MotorController {
    pub fn new(mode: ControlMode) -> Self {
        Self {
            mode,
            powers: [power::INIT_POWER; motors::COUNT],
            current_power: power::INIT_POWER,
            pitch_plan: TrajectoryPlanner::new(),
            roll_plan: TrajectoryPlanner::new(),
        }
    }

    pub fn powers(&self) -> &[f32; motors::COUNT] {
        &self.powers
    }

    pub fn current_power(&self) -> f32 {
        self.current_power
    }

    /// Отклоненные планы траектории по осям (тангаж, крен)
    pub fn rejected_plans(&self) -> (u32, u32) {
        (
            self.pitch_plan.rejected_count(),
            self.roll_plan.rejected_count(),
        )
    }

    /// Выполняет один такт управления
    pub fn step(
        &mut self,
        cmd: &TickCommands,
        imu: Option<&ImuSample>,
        now_us: u64,
    ) -> TickStep {
        if cmd.stop {
            return self.stop_step();
        }

        if cmd.battery_low {
            // Немедленное обнуление всех каналов, дальнейшую
            // остановку выполняет защелка stop
            self.powers = [0.0; motors::COUNT];
            return TickStep::applied(TickBranch::BatteryCutoff, self.powers);
        }

        if cmd.reset {
            // Общий уровень мощности сохраняется
            self.powers = [power::INIT_POWER; motors::COUNT];
            return TickStep::applied(TickBranch::Reset, self.powers);
        }

        if let Some(delta) = cmd.power_increment {
            self.current_power =
                mixer::clamp_power(self.current_power + delta, self.mode.power_floor());
            match self.mode {
                ControlMode::Stabilize => {
                    self.powers = [self.current_power; motors::COUNT];
                }
                ControlMode::Level => {
                    for channel in motors::PITCH_PAIR {
                        self.powers[channel_index(channel)] = self.current_power;
                    }
                }
            }
            return TickStep::applied(TickBranch::PowerAdjust, self.powers);
        }

        if !cmd.started {
            return TickStep::silent(TickBranch::NotStarted);
        }

        let imu = match imu {
            Some(imu) => imu,
            None => return TickStep::silent(TickBranch::NoFreshGyro),
        };

        self.control_step(imu, now_us)
    }

    /// Остановка: в режиме стабилизации мощность снижается
    /// ступенями до нуля, в режиме выравнивания пара обнуляется
    /// сразу
    fn stop_step(&mut self) -> TickStep {
        match self.mode {
            ControlMode::Level => {
                for channel in motors::PITCH_PAIR {
                    self.powers[channel_index(channel)] = 0.0;
                }
                let mut step = TickStep::applied(TickBranch::Stopping, self.powers);
                step.finished = true;
                step
            }
            ControlMode::Stabilize => {
                let mut stopped = 0;
                for value in self.powers.iter_mut() {
                    *value -= power::STOP_RAMP_STEP;
                    if *value <= 0.0 {
                        *value = 0.0;
                        stopped += 1;
                    }
                }
                let mut step = TickStep::applied(TickBranch::Stopping, self.powers);
                step.finished = stopped == motors::COUNT;
                step
            }
        }
    }

    /// Штатный такт: гравитационная компенсация и команда
    /// планировщика смешиваются в мощности пар
    fn control_step(&mut self, imu: &ImuSample, now_us: u64) -> TickStep {
        let pitch_quadrant = QuadrantState::new(imu.pitch_quadrant, imu.pitch_sign);
        let pitch = Self::axis_command(
            &mut self.pitch_plan,
            imu.pitch_deg,
            imu.pitch_rate_dps,
            pitch_quadrant,
            now_us,
        );
        let pair = mixer::mix(
            pitch.q_gravity,
            pitch.q_trajectory,
            self.current_power,
            self.mode.q_offset(),
            self.mode.power_floor(),
        );
        self.apply_pair(motors::PITCH_PAIR, pair);

        let mut roll = AxisCommand::default();
        if self.mode.manages_roll() {
            let roll_quadrant = QuadrantState::new(imu.roll_quadrant, imu.roll_sign);
            roll = Self::axis_command(
                &mut self.roll_plan,
                imu.roll_deg,
                imu.roll_rate_dps,
                roll_quadrant,
                now_us,
            );
            let pair = mixer::mix(
                roll.q_gravity,
                roll.q_trajectory,
                self.current_power,
                self.mode.q_offset(),
                self.mode.power_floor(),
            );
            self.apply_pair(motors::ROLL_PAIR, pair);
        }

        TickStep {
            branch: TickBranch::Control,
            output: Some(self.powers),
            finished: false,
            pitch,
            roll,
        }
    }

    /// Дифференциал мощности одной оси: компенсация гравитации
    /// плюс команда планировщика
    fn axis_command(
        plan: &mut TrajectoryPlanner,
        angle_deg: f32,
        rate_dps: f32,
        quadrant: QuadrantState,
        now_us: u64,
    ) -> AxisCommand {
        let q_gravity = gravity::gravity_command(deg_to_rad(angle_deg), &quadrant);
        let sign = gravity::power_sign(quadrant.quadrant);

        if !plan.is_active() {
            if let Some(times) =
                plan.plan(angle_deg, rate_dps, sign, quadrant.quadrant, now_us)
            {
                defmt::trace!("Новый план разворота: {}", times);
            }
        }
        plan.check_finished(quadrant.quadrant, now_us);

        AxisCommand {
            q_gravity,
            q_trajectory: plan.trajectory_command(now_us),
        }
    }

    fn apply_pair(&mut self, pair: [u8; 2], powers: PairPowers) {
        self.powers[channel_index(pair[0])] = powers.first;
        self.powers[channel_index(pair[1])] = powers.second;
    }
}
