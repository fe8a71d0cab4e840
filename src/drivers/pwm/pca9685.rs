//! Драйвер PWM-контроллера PCA9685 (16 каналов, 12 бит)
//!
//! Двигатели сидят на каналах 12..=15, заполнение задается в
//! промилле периода. Все четыре канала пишутся одной блочной
//! операцией с автоинкрементом адреса.
use cortex_m::prelude::{_embedded_hal_blocking_i2c_Write, _embedded_hal_blocking_i2c_WriteRead};
use embassy_rp::i2c::{Blocking, Error as I2cError, I2c};
use embassy_time::{Duration, Timer};

use crate::config::hardware::{frequencies, i2c_addresses, motors};

/// Частота внутреннего генератора, Гц
const OSC_HZ: u32 = 25_000_000;

/// Полный диапазон счетчика канала
const COUNTS_FULL_SCALE: u32 = 4095;

/// Диапазон значений заполнения (промилле)
const DUTY_RANGE: u32 = 1000;

/// Регистры PCA9685
#[allow(dead_code)]
mod regs {
    pub const MODE1: u8 = 0x00;          // Режим 1: сон, автоинкремент, all-call
    pub const MODE2: u8 = 0x01;          // Режим 2: конфигурация выходов
    pub const LED0_ON_L: u8 = 0x06;      // Начало блока каналов, 4 байта на канал
    pub const ALL_LED_ON_L: u8 = 0xFA;   // Групповое управление каналами
    pub const PRE_SCALE: u8 = 0xFE;      // Предделитель частоты

    // Биты MODE1
    pub const MODE1_RESTART: u8 = 0x80;
    pub const MODE1_AI: u8 = 0x20;
    pub const MODE1_SLEEP: u8 = 0x10;
    pub const MODE1_ALLCALL: u8 = 0x01;
}

/// Ошибки PCA9685
#[derive(Debug)]
pub enum Pca9685Error {
    /// Ошибка I2C
    I2c(I2cError),
    /// Записанная конфигурация не подтвердилась при чтении
    ConfigError,
}

impl defmt::Format for Pca9685Error {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Pca9685Error::I2c(_) => defmt::write!(fmt, "PCA9685: I2C error"),
            Pca9685Error::ConfigError => defmt::write!(fmt, "PCA9685: Configuration error"),
        }
    }
}

impl From<I2cError> for Pca9685Error {
    fn from(error: I2cError) -> Self {
        Pca9685Error::I2c(error)
    }
}

/// Драйвер PCA9685
pub struct Pca9685 {
    /// Адрес устройства
    addr: u8,
}

impl Pca9685 {
    /// Создание нового экземпляра драйвера. После инициализации
    /// все каналы двигателей держат минимальное заполнение.
    pub async fn new<I>(i2c: &mut I2c<'_, I, Blocking>) -> Result<Self, Pca9685Error>
    where
        I: embassy_rp::i2c::Instance,
    {
        let pwm = Self {
            addr: i2c_addresses::PCA9685_ADDR,
        };

        pwm.init(i2c).await?;

        Ok(pwm)
    }

    /// Инициализация PCA9685
    async fn init<I>(&self, i2c: &mut I2c<'_, I, Blocking>) -> Result<(), Pca9685Error>
    where
        I: embassy_rp::i2c::Instance,
    {
        // Приведение регистров к известному состоянию: сон выключен,
        // all-call выключен, выходы push-pull
        self.write_register(i2c, regs::MODE1, 0x00)?;
        self.write_register(i2c, regs::MODE2, 0x04)?;
        Timer::after(Duration::from_millis(1)).await;

        // Частота PWM задается предделителем, запись возможна
        // только в режиме сна
        let prescale = prescale_for(frequencies::MOTOR_PWM_FREQUENCY);
        self.write_register(i2c, regs::MODE1, regs::MODE1_SLEEP)?;
        self.write_register(i2c, regs::PRE_SCALE, prescale)?;
        self.write_register(i2c, regs::MODE1, 0x00)?;
        // Генератору нужно до 500 мкс на запуск после сна
        Timer::after(Duration::from_millis(1)).await;

        // Автоинкремент адреса для блочной записи каналов
        self.write_register(i2c, regs::MODE1, regs::MODE1_AI)?;
        let mode1 = self.read_register(i2c, regs::MODE1)?;
        if mode1 & regs::MODE1_AI == 0 {
            return Err(Pca9685Error::ConfigError);
        }

        // Стартовое заполнение на каналах двигателей
        self.write_min_duty(i2c)?;

        defmt::info!(
            "PCA9685 инициализирован, частота {} Гц, предделитель {}",
            frequencies::MOTOR_PWM_FREQUENCY,
            prescale
        );
        Ok(())
    }

    /// Записывает заполнение (промилле) на каналы двигателей одной
    /// блочной операцией
    pub fn write_duties<I>(
        &self,
        i2c: &mut I2c<'_, I, Blocking>,
        duties_pm: &[u16; motors::COUNT],
    ) -> Result<(), Pca9685Error>
    where
        I: embassy_rp::i2c::Instance,
    {
        let mut buf = [0u8; 1 + 4 * motors::COUNT];
        buf[0] = channel_reg(motors::MIN_CHANNEL);

        for (slot, duty_pm) in duties_pm.iter().enumerate() {
            let (on, off) = duty_to_counts(*duty_pm, 0);
            let base = 1 + 4 * slot;
            buf[base] = (on & 0xFF) as u8;
            buf[base + 1] = ((on >> 8) & 0x0F) as u8;
            buf[base + 2] = (off & 0xFF) as u8;
            buf[base + 3] = ((off >> 8) & 0x0F) as u8;
        }

        i2c.write(self.addr, &buf)?;
        Ok(())
    }

    /// Переводит все каналы двигателей на минимальное заполнение
    pub fn write_min_duty<I>(&self, i2c: &mut I2c<'_, I, Blocking>) -> Result<(), Pca9685Error>
    where
        I: embassy_rp::i2c::Instance,
    {
        let duties = [motors::DUTY_MIN as u16; motors::COUNT];
        self.write_duties(i2c, &duties)
    }

    // Вспомогательные методы I2C
    fn read_register<I>(&self, i2c: &mut I2c<'_, I, Blocking>, reg: u8) -> Result<u8, I2cError>
    where
        I: embassy_rp::i2c::Instance,
    {
        let mut buf = [0u8; 1];
        i2c.write_read(self.addr, &[reg], &mut buf)?;
        Ok(buf[0])
    }

    fn write_register<I>(
        &self,
        i2c: &mut I2c<'_, I, Blocking>,
        reg: u8,
        value: u8,
    ) -> Result<(), I2cError>
    where
        I: embassy_rp::i2c::Instance,
    {
        i2c.write(self.addr, &[reg, value])
    }
}

/// Адрес первого регистра канала
const fn channel_reg(channel: u8) -> u8 {
    regs::LED0_ON_L + 4 * channel
}

/// Предделитель для заданной частоты PWM
fn prescale_for(freq_hz: u32) -> u8 {
    let div = 4096 * freq_hz;
    ((OSC_HZ + div / 2) / div - 1) as u8
}

/// Переводит заполнение и задержку (промилле) в счетчики ON/OFF.
/// Задержка сдвигает передний фронт, счетчик OFF заворачивается
/// по модулю полного диапазона.
fn duty_to_counts(duty_pm: u16, delay_pm: u16) -> (u16, u16) {
    let on = (delay_pm as u32 * COUNTS_FULL_SCALE + DUTY_RANGE / 2) / DUTY_RANGE;
    let mut off = on + (duty_pm as u32 * COUNTS_FULL_SCALE + DUTY_RANGE / 2) / DUTY_RANGE;
    if off > COUNTS_FULL_SCALE {
        off -= COUNTS_FULL_SCALE;
    }
    (on as u16, off as u16)
}
