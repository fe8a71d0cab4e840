//! Главный цикл стабилизации
//!
//! Один такт: выборка FIFO датчиков, обновление оценки ориентации,
//! контроль батареи, чтение команд оператора, шаг исполнителя
//! моторов и запись скважностей в PCA9685. Частота такта задается
//! тикером, длительность такта и время обменов по шине копятся
//! в статистике.

use embassy_rp::i2c::{Blocking, I2c};
use embassy_rp::peripherals::I2C0;
use embassy_time::{Duration, Instant, Ticker, Timer};

use crate::config::flight::{battery, loop_timing};
use crate::config::hardware::{motors, system};
use crate::control::{mixer, ControlMode, MotorController, TickBranch, TickCommands};
use crate::data::{TickRecord, FLIGHT_LOG, SYSTEM_STATE};
use crate::drivers::imu::{L3gd20, Lsm303};
use crate::drivers::power::BatteryMonitor;
use crate::drivers::pwm::Pca9685;
use crate::sensors::AttitudeEstimator;
use crate::utils::{SectionClock, TickGuard, TimingStats};

/// Режим управления выбирается на этапе компиляции
#[cfg(feature = "level-mode")]
const MODE: ControlMode = ControlMode::Level;
#[cfg(not(feature = "level-mode"))]
const MODE: ControlMode = ControlMode::Stabilize;

#[embassy_executor::task]
pub async fn task(
    mut i2c: I2c<'static, I2C0, Blocking>,
    mut battery_monitor: BatteryMonitor<'static>,
) {
    defmt::info!("Цикл управления: режим {}", MODE);

    // === Инициализация датчиков и PWM ===

    let gyro = {
        let mut attempt: u8 = 0;
        loop {
            match L3gd20::new(&mut i2c).await {
                Ok(driver) => break driver,
                Err(e) => {
                    attempt += 1;
                    if attempt >= system::INIT_RETRY_COUNT {
                        defmt::error!("Ошибка инициализации L3GD20: {}", e);
                        return;
                    }
                    defmt::warn!("L3GD20 не отвечает, попытка {}: {}", attempt, e);
                    Timer::after(Duration::from_millis(system::INIT_RETRY_DELAY_MS)).await;
                }
            }
        }
    };

    let accel = {
        let mut attempt: u8 = 0;
        loop {
            match Lsm303::new(&mut i2c).await {
                Ok(driver) => break driver,
                Err(e) => {
                    attempt += 1;
                    if attempt >= system::INIT_RETRY_COUNT {
                        defmt::error!("Ошибка инициализации LSM303: {}", e);
                        return;
                    }
                    defmt::warn!("LSM303 не отвечает, попытка {}: {}", attempt, e);
                    Timer::after(Duration::from_millis(system::INIT_RETRY_DELAY_MS)).await;
                }
            }
        }
    };

    let pwm = {
        let mut attempt: u8 = 0;
        loop {
            match Pca9685::new(&mut i2c).await {
                Ok(driver) => break driver,
                Err(e) => {
                    attempt += 1;
                    if attempt >= system::INIT_RETRY_COUNT {
                        defmt::error!("Ошибка инициализации PCA9685: {}", e);
                        return;
                    }
                    defmt::warn!("PCA9685 не отвечает, попытка {}: {}", attempt, e);
                    Timer::after(Duration::from_millis(system::INIT_RETRY_DELAY_MS)).await;
                }
            }
        }
    };

    // === Начальная ориентация ===

    // Первый отсчет акселерометра появляется через период ODR
    Timer::after(Duration::from_millis(20)).await;
    let mut estimator = AttitudeEstimator::new();
    match accel.read_sample(&mut i2c) {
        Ok(sample) => estimator.seed(sample),
        Err(e) => {
            defmt::error!("Нет начального отсчета акселерометра: {}", e);
            return;
        }
    }
    *SYSTEM_STATE.last_imu.lock().await = Some(estimator.sample());

    let mut controller = MotorController::new(MODE);
    let mut stats = TimingStats::new(loop_timing::TICK_BUDGET_US);
    let mut battery_low = false;
    let mut tick: u32 = 0;

    defmt::info!("Контур стабилизации готов, частота {} Гц", loop_timing::TICK_HZ);

    // === Главный цикл ===

    let mut ticker = Ticker::every(Duration::from_hz(loop_timing::TICK_HZ));
    loop {
        ticker.next().await;
        tick = tick.wrapping_add(1);

        let mut bus = SectionClock::new();

        let (finished, write_failed, pending) = {
            let _guard = TickGuard::begin(&mut stats);

            // === Выборка гироскопа ===
            let mut imu_fresh = false;
            match bus.time(|| gyro.read_fifo(&mut i2c)) {
                Ok(samples) => {
                    imu_fresh = estimator.ingest_gyro(&samples, gyro.sample_period_s());
                }
                Err(e) => defmt::error!("Ошибка чтения гироскопа: {}", e),
            }

            // === Выборка акселерометра ===
            match bus.time(|| accel.read_fifo(&mut i2c)) {
                Ok(samples) => {
                    for sample in &samples {
                        estimator.push_accel_sample(*sample);
                    }
                }
                Err(e) => defmt::error!("Ошибка чтения акселерометра: {}", e),
            }
            estimator.fuse_accel();

            // Без свежих данных гироскопа оценка такта не публикуется
            let imu = if imu_fresh {
                let sample = estimator.sample();
                *SYSTEM_STATE.last_imu.lock().await = Some(sample);
                Some(sample)
            } else {
                None
            };

            #[cfg(feature = "debug-sensors")]
            if let Some(sample) = &imu {
                defmt::debug!(
                    "Тангаж {}° ({}°/с), крен {}° ({}°/с), курс {}°",
                    sample.pitch_deg,
                    sample.pitch_rate_dps,
                    sample.roll_deg,
                    sample.roll_rate_dps,
                    sample.heading_deg
                );
            }

            // === Контроль батареи ===
            if tick % battery::CHECK_DIVIDER == 0 {
                match battery_monitor.read() {
                    Ok(state) => {
                        if state.any_below(battery::MIN_CELL_PERCENT) {
                            defmt::warn!(
                                "Разряд батареи: минимальная ячейка {}%",
                                state.min_percent()
                            );
                            battery_low = true;
                        }
                        *SYSTEM_STATE.last_battery.lock().await = Some(state);
                    }
                    Err(e) => defmt::error!("Ошибка чтения батареи: {}", e),
                }
            }

            // === Команды оператора ===
            // Однократный флаг снимается только в том такте, в котором
            // выполнится его ветвь, иначе команда пропала бы впустую
            let flags = &SYSTEM_STATE.flags;
            let stop = flags.is_stop();
            let reset = if !stop && !battery_low {
                flags.take_reset()
            } else {
                false
            };
            let power_increment = if !stop && !battery_low && !reset {
                flags.take_power_increment().map(|delta| delta as f32)
            } else {
                None
            };
            let cmd = TickCommands {
                stop,
                battery_low,
                reset,
                power_increment,
                started: flags.is_started(),
            };

            // === Шаг исполнителя ===
            let step = controller.step(&cmd, imu.as_ref(), Instant::now().as_micros());
            if step.branch == TickBranch::BatteryCutoff {
                // Отсечка переходит в штатную остановку со следующего такта
                flags.request_stop();
            }

            let mut write_failed = false;
            if let Some(powers) = step.output {
                let mut duties = [0u16; motors::COUNT];
                for (duty, percent) in duties.iter_mut().zip(powers.iter()) {
                    *duty = mixer::power_to_duty_pm(*percent);
                }
                if let Err(e) = bus.time(|| pwm.write_duties(&mut i2c, &duties)) {
                    defmt::error!("Ошибка записи PWM: {}", e);
                    write_failed = true;
                }

                #[cfg(feature = "debug-actuators")]
                defmt::debug!("Мощности моторов: {} -> {}", powers, duties);
            }

            *SYSTEM_STATE.current_power.lock().await = controller.current_power();

            // Журнал заполняется только в штатной ветви управления
            let mut pending: Option<TickRecord> = None;
            if step.branch == TickBranch::Control {
                if let Some(sample) = &imu {
                    pending = Some(TickRecord {
                        tick,
                        pitch_deg: sample.pitch_deg,
                        roll_deg: sample.roll_deg,
                        pitch_raw_deg: sample.pitch_raw_deg,
                        roll_raw_deg: sample.roll_raw_deg,
                        accel_pitch_deg: sample.accel_pitch_deg,
                        accel_roll_deg: sample.accel_roll_deg,
                        pitch_rate_dps: sample.pitch_rate_dps,
                        roll_rate_dps: sample.roll_rate_dps,
                        pitch_q: step.pitch.total(),
                        pitch_qg: step.pitch.q_gravity,
                        pitch_qp: step.pitch.q_trajectory,
                        roll_q: step.roll.total(),
                        roll_qg: step.roll.q_gravity,
                        roll_qp: step.roll.q_trajectory,
                        powers: step.output.unwrap_or([0.0; motors::COUNT]),
                        tick_us: 0,
                        bus_us: 0,
                    });
                }
            }

            (step.finished, write_failed, pending)
        };

        // Длительность такта зафиксирована, журнал и отчеты после
        if let Some(mut record) = pending {
            record.tick_us = stats.last_us();
            record.bus_us = bus.total_us();
            FLIGHT_LOG.lock().await.record(record);
        }

        if tick % loop_timing::TIMING_REPORT_TICKS == 0 {
            let (pitch_rejected, roll_rejected) = controller.rejected_plans();
            defmt::info!(
                "Тайминги: {} циклов, средний {} мкс, максимум {} мкс, превышений {}, отклоненных планов {}/{}",
                stats.ticks(),
                stats.mean_us(),
                stats.max_us(),
                stats.overruns(),
                pitch_rejected,
                roll_rejected
            );
        }

        if write_failed {
            defmt::error!("Запись в PWM не проходит, аварийная остановка");
            break;
        }
        if finished {
            break;
        }
    }

    // === Остановка ===

    if let Err(e) = pwm.write_min_duty(&mut i2c) {
        defmt::error!("Ошибка записи минимальной скважности: {}", e);
    }
    dump_flight_log().await;
    SYSTEM_STATE.set_motors_stopped();
    defmt::info!(
        "Цикл управления завершен: {} циклов, средний {} мкс, максимум {} мкс, превышений {}",
        stats.ticks(),
        stats.mean_us(),
        stats.max_us(),
        stats.overruns()
    );
}

/// Выгружает журнал полета в лог после остановки моторов
async fn dump_flight_log() {
    let log = FLIGHT_LOG.lock().await;
    if log.is_empty() {
        return;
    }
    defmt::info!("Журнал полета, {} последних циклов:", log.len());
    for record in log.iter_chronological() {
        defmt::info!("{}", record);
    }
}
