//! Драйвер гироскопа L3GD20 (плата Pololu AltIMU-10)
//!
//! Датчик работает в потоковом режиме FIFO: цикл управления
//! вычитывает все накопленные отсчеты одним заходом. Значения
//! возвращаются в осях датчика, пересчет в оси платформы
//! выполняет оценщик ориентации.
use cortex_m::prelude::{_embedded_hal_blocking_i2c_Write, _embedded_hal_blocking_i2c_WriteRead};
use embassy_rp::i2c::{Blocking, Error as I2cError, I2c};
use embassy_time::{Duration, Timer};
use heapless::Vec;
use nalgebra::Vector3;

use crate::config::hardware::i2c_addresses;

/// Частота выборки по умолчанию (DRBW = 0b0000)
const ODR_HZ: f32 = 95.0;

/// Емкость аппаратного FIFO
pub const FIFO_CAPACITY: usize = 32;

/// Пакет отсчетов, вычитанный из FIFO за один заход
pub type GyroFifo = Vec<Vector3<f32>, FIFO_CAPACITY>;

/// Регистры L3GD20
#[allow(dead_code)]
mod regs {
    pub const WHO_AM_I: u8 = 0x0F;       // Идентификатор устройства
    pub const CTRL_REG1: u8 = 0x20;      // Питание, частота выборки, оси
    pub const CTRL_REG2: u8 = 0x21;      // Фильтр высоких частот
    pub const CTRL_REG3: u8 = 0x22;      // Прерывания
    pub const CTRL_REG4: u8 = 0x23;      // Диапазон измерения
    pub const CTRL_REG5: u8 = 0x24;      // FIFO и цепочка фильтров
    pub const REFERENCE: u8 = 0x25;      // Опорное значение прерываний
    pub const OUT_TEMP: u8 = 0x26;       // Температура
    pub const STATUS_REG: u8 = 0x27;     // Готовность данных
    pub const OUT_X_L: u8 = 0x28;        // Младший байт X, далее Y и Z
    pub const FIFO_CTRL_REG: u8 = 0x2E;  // Режим FIFO
    pub const FIFO_SRC_REG: u8 = 0x2F;   // Заполненность FIFO

    /// Бит автоинкремента адреса при блочном чтении
    pub const AUTO_INCREMENT: u8 = 0x80;
}

/// Диапазон измерения гироскопа (биты FS регистра CTRL_REG4)
#[derive(Debug, Clone, Copy)]
pub enum GyroScale {
    /// ±250°/с
    Dps250 = 0x00,
    /// ±500°/с
    Dps500 = 0x10,
    /// ±2000°/с
    Dps2000 = 0x20,
}

impl GyroScale {
    /// Цена деления в °/с на единицу кода
    pub const fn gain_dps(self) -> f32 {
        match self {
            GyroScale::Dps250 => 0.00875,
            GyroScale::Dps500 => 0.0175,
            GyroScale::Dps2000 => 0.07,
        }
    }
}

/// Ошибки L3GD20
#[derive(Debug)]
pub enum L3gd20Error {
    /// Ошибка I2C
    I2c(I2cError),
    /// Записанная конфигурация не подтвердилась при чтении
    ConfigError,
}

impl defmt::Format for L3gd20Error {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            L3gd20Error::I2c(_) => defmt::write!(fmt, "L3GD20: I2C error"),
            L3gd20Error::ConfigError => defmt::write!(fmt, "L3GD20: Configuration error"),
        }
    }
}

impl From<I2cError> for L3gd20Error {
    fn from(error: I2cError) -> Self {
        L3gd20Error::I2c(error)
    }
}

/// Драйвер L3GD20
pub struct L3gd20 {
    /// Адрес устройства
    addr: u8,
    /// Цена деления в °/с
    gain_dps: f32,
    /// Период выборки FIFO, секунды
    sample_period_s: f32,
}

impl L3gd20 {
    /// Создание нового экземпляра драйвера
    pub async fn new<I>(i2c: &mut I2c<'_, I, Blocking>) -> Result<Self, L3gd20Error>
    where
        I: embassy_rp::i2c::Instance,
    {
        let mut gyro = Self {
            addr: i2c_addresses::L3GD20_ADDR,
            gain_dps: GyroScale::Dps500.gain_dps(),
            sample_period_s: 1.0 / ODR_HZ,
        };

        gyro.init(i2c).await?;

        Ok(gyro)
    }

    /// Инициализация L3GD20
    async fn init<I>(&mut self, i2c: &mut I2c<'_, I, Blocking>) -> Result<(), L3gd20Error>
    where
        I: embassy_rp::i2c::Instance,
    {
        let who_am_i = self.read_register(i2c, regs::WHO_AM_I)?;
        // L3GD20 отвечает 0xD4, ревизия L3GD20H отвечает 0xD7
        if who_am_i != 0xD4 && who_am_i != 0xD7 {
            defmt::warn!("Неожиданный ID L3GD20: 0x{:02x}, продолжаем...", who_am_i);
        }
        defmt::info!("L3GD20 WHO_AM_I: 0x{:02x}", who_am_i);

        // Приведение регистров к известному состоянию
        self.write_register(i2c, regs::CTRL_REG1, 0x0F)?; // Нормальный режим, 95 Гц, все оси
        self.write_register(i2c, regs::CTRL_REG2, 0x00)?; // Фильтр высоких частот выключен
        self.write_register(i2c, regs::CTRL_REG3, 0x00)?; // Прерывания выключены
        self.write_register(i2c, regs::CTRL_REG4, 0x00)?;
        self.write_register(i2c, regs::CTRL_REG5, 0x00)?;
        self.write_register(i2c, regs::REFERENCE, 0x00)?;
        self.write_register(i2c, regs::FIFO_CTRL_REG, 0x00)?;
        Timer::after(Duration::from_millis(10)).await;

        // Диапазон измерения ±500°/с
        self.set_scale(i2c, GyroScale::Dps500)?;

        // Включение FIFO с проверкой
        self.write_register(i2c, regs::CTRL_REG5, 0x40)?; // FIFO_EN
        let ctrl5 = self.read_register(i2c, regs::CTRL_REG5)?;
        if ctrl5 & 0x40 == 0 {
            return Err(L3gd20Error::ConfigError);
        }

        // Потоковый режим FIFO с проверкой
        self.write_register(i2c, regs::FIFO_CTRL_REG, 0x40)?; // FM = stream
        let fifo_ctrl = self.read_register(i2c, regs::FIFO_CTRL_REG)?;
        if fifo_ctrl & 0xE0 != 0x40 {
            return Err(L3gd20Error::ConfigError);
        }

        Timer::after(Duration::from_millis(50)).await;

        defmt::info!("L3GD20 инициализирован успешно");
        Ok(())
    }

    /// Установка диапазона измерения
    pub fn set_scale<I>(
        &mut self,
        i2c: &mut I2c<'_, I, Blocking>,
        scale: GyroScale,
    ) -> Result<(), L3gd20Error>
    where
        I: embassy_rp::i2c::Instance,
    {
        self.write_register(i2c, regs::CTRL_REG4, scale as u8)?;
        self.gain_dps = scale.gain_dps();
        Ok(())
    }

    /// Период выборки FIFO в секундах
    pub fn sample_period_s(&self) -> f32 {
        self.sample_period_s
    }

    /// Число отсчетов, накопленных в FIFO
    pub fn fifo_level<I>(&self, i2c: &mut I2c<'_, I, Blocking>) -> Result<u8, L3gd20Error>
    where
        I: embassy_rp::i2c::Instance,
    {
        let src = self.read_register(i2c, regs::FIFO_SRC_REG)?;
        Ok(src & 0x1F)
    }

    /// Вычитывает все накопленные отсчеты FIFO (°/с в осях датчика)
    pub fn read_fifo<I>(&self, i2c: &mut I2c<'_, I, Blocking>) -> Result<GyroFifo, L3gd20Error>
    where
        I: embassy_rp::i2c::Instance,
    {
        let mut level = self.fifo_level(i2c)?;
        if level as usize >= FIFO_CAPACITY - 1 {
            defmt::warn!("Переполнение FIFO гироскопа");
        }

        let mut samples = GyroFifo::new();
        while level > 0 {
            let sample = self.read_sample(i2c)?;
            if samples.push(sample).is_err() {
                break;
            }
            level -= 1;
        }

        Ok(samples)
    }

    /// Чтение одного отсчета XYZ блочной операцией
    fn read_sample<I>(&self, i2c: &mut I2c<'_, I, Blocking>) -> Result<Vector3<f32>, I2cError>
    where
        I: embassy_rp::i2c::Instance,
    {
        let mut buf = [0u8; 6];
        self.read_registers(i2c, regs::OUT_X_L | regs::AUTO_INCREMENT, &mut buf)?;
        Ok(decode_block(&buf, self.gain_dps))
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

    fn read_registers<I>(
        &self,
        i2c: &mut I2c<'_, I, Blocking>,
        start_reg: u8,
        buf: &mut [u8],
    ) -> Result<(), I2cError>
    where
        I: embassy_rp::i2c::Instance,
    {
        i2c.write_read(self.addr, &[start_reg], buf)
    }
}

/// Преобразует блок из шести байтов (little-endian) в °/с
fn decode_block(buf: &[u8; 6], gain_dps: f32) -> Vector3<f32> {
    let x = i16::from_le_bytes([buf[0], buf[1]]) as f32 * gain_dps;
    let y = i16::from_le_bytes([buf[2], buf[3]]) as f32 * gain_dps;
    let z = i16::from_le_bytes([buf[4], buf[5]]) as f32 * gain_dps;
    Vector3::new(x, y, z)
}
