//! Драйвер акселерометра LSM303DLHC (плата Pololu AltIMU-10)
//!
//! Используется только акселерометрическая часть микросхемы.
//! Знаки осей приводятся к осям платформы прямо в драйвере,
//! поэтому наружу уходят значения в связанной системе координат.
use cortex_m::prelude::{_embedded_hal_blocking_i2c_Write, _embedded_hal_blocking_i2c_WriteRead};
use embassy_rp::i2c::{Blocking, Error as I2cError, I2c};
use embassy_time::{Duration, Timer};
use heapless::Vec;
use nalgebra::Vector3;

use crate::config::hardware::i2c_addresses;

/// Знаки осей при установке платы: ось X датчика направлена
/// против оси X платформы
const AXIS_SIGN: [f32; 3] = [-1.0, 1.0, 1.0];

/// Емкость аппаратного FIFO
pub const FIFO_CAPACITY: usize = 32;

/// Пакет отсчетов, вычитанный из FIFO за один заход
pub type AccelFifo = Vec<Vector3<f32>, FIFO_CAPACITY>;

/// Регистры акселерометрической части LSM303DLHC
#[allow(dead_code)]
mod regs {
    pub const CTRL_REG1: u8 = 0x20;      // Частота выборки, питание, оси
    pub const CTRL_REG2: u8 = 0x21;      // Фильтр высоких частот
    pub const CTRL_REG3: u8 = 0x22;      // Прерывания INT1
    pub const CTRL_REG4: u8 = 0x23;      // Диапазон, разрешение
    pub const CTRL_REG5: u8 = 0x24;      // FIFO и защелки прерываний
    pub const CTRL_REG6: u8 = 0x25;      // Прерывания INT2
    pub const REFERENCE: u8 = 0x26;      // Опорное значение прерываний
    pub const STATUS_REG: u8 = 0x27;     // Готовность данных
    pub const OUT_X_L: u8 = 0x28;        // Младший байт X, далее Y и Z
    pub const FIFO_CTRL_REG: u8 = 0x2E;  // Режим FIFO
    pub const FIFO_SRC_REG: u8 = 0x2F;   // Заполненность FIFO

    /// Бит автоинкремента адреса при блочном чтении
    pub const AUTO_INCREMENT: u8 = 0x80;
}

/// Диапазон измерения акселерометра (биты FS регистра CTRL_REG4)
#[derive(Debug, Clone, Copy)]
pub enum AccelScale {
    /// ±2g
    G2 = 0x00,
    /// ±4g
    G4 = 0x10,
    /// ±8g
    G8 = 0x20,
    /// ±16g
    G16 = 0x30,
}

impl AccelScale {
    /// Цена деления в g на единицу 12-битного кода
    pub const fn gain_g(self) -> f32 {
        match self {
            AccelScale::G2 => 0.001,
            AccelScale::G4 => 0.002,
            AccelScale::G8 => 0.004,
            AccelScale::G16 => 0.012,
        }
    }
}

/// Ошибки LSM303DLHC
#[derive(Debug)]
pub enum Lsm303Error {
    /// Ошибка I2C
    I2c(I2cError),
    /// Записанная конфигурация не подтвердилась при чтении
    ConfigError,
}

impl defmt::Format for Lsm303Error {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Lsm303Error::I2c(_) => defmt::write!(fmt, "LSM303: I2C error"),
            Lsm303Error::ConfigError => defmt::write!(fmt, "LSM303: Configuration error"),
        }
    }
}

impl From<I2cError> for Lsm303Error {
    fn from(error: I2cError) -> Self {
        Lsm303Error::I2c(error)
    }
}

/// Драйвер акселерометра LSM303DLHC
pub struct Lsm303 {
    /// Адрес устройства
    addr: u8,
    /// Цена деления в g
    gain_g: f32,
}

impl Lsm303 {
    /// Создание нового экземпляра драйвера
    pub async fn new<I>(i2c: &mut I2c<'_, I, Blocking>) -> Result<Self, Lsm303Error>
    where
        I: embassy_rp::i2c::Instance,
    {
        let mut accel = Self {
            addr: i2c_addresses::LSM303_ACCEL_ADDR,
            gain_g: AccelScale::G4.gain_g(),
        };

        accel.init(i2c).await?;

        Ok(accel)
    }

    /// Инициализация акселерометра
    async fn init<I>(&mut self, i2c: &mut I2c<'_, I, Blocking>) -> Result<(), Lsm303Error>
    where
        I: embassy_rp::i2c::Instance,
    {
        // Приведение регистров к известному состоянию
        self.write_register(i2c, regs::CTRL_REG1, 0x07)?; // Оси включены, питание выключено
        self.write_register(i2c, regs::CTRL_REG2, 0x00)?; // Фильтр высоких частот выключен
        self.write_register(i2c, regs::CTRL_REG3, 0x00)?; // Прерывания выключены
        self.write_register(i2c, regs::CTRL_REG4, 0x00)?;
        self.write_register(i2c, regs::CTRL_REG5, 0x00)?;
        self.write_register(i2c, regs::CTRL_REG6, 0x00)?;
        self.write_register(i2c, regs::REFERENCE, 0x00)?;
        self.write_register(i2c, regs::FIFO_CTRL_REG, 0x00)?;
        Timer::after(Duration::from_millis(10)).await;

        // Диапазон измерения ±4g
        self.set_scale(i2c, AccelScale::G4)?;

        // Частота выборки 100 Гц, нормальный режим, все оси
        self.write_register(i2c, regs::CTRL_REG1, 0x57)?;

        // Включение FIFO с проверкой
        self.write_register(i2c, regs::CTRL_REG5, 0x40)?; // FIFO_EN
        let ctrl5 = self.read_register(i2c, regs::CTRL_REG5)?;
        if ctrl5 & 0x40 == 0 {
            return Err(Lsm303Error::ConfigError);
        }

        // Потоковый режим FIFO с проверкой
        self.write_register(i2c, regs::FIFO_CTRL_REG, 0x80)?; // FM = stream
        let fifo_ctrl = self.read_register(i2c, regs::FIFO_CTRL_REG)?;
        if fifo_ctrl & 0xC0 != 0x80 {
            return Err(Lsm303Error::ConfigError);
        }

        Timer::after(Duration::from_millis(50)).await;

        defmt::info!("LSM303 инициализирован успешно");
        Ok(())
    }

    /// Установка диапазона измерения
    pub fn set_scale<I>(
        &mut self,
        i2c: &mut I2c<'_, I, Blocking>,
        scale: AccelScale,
    ) -> Result<(), Lsm303Error>
    where
        I: embassy_rp::i2c::Instance,
    {
        self.write_register(i2c, regs::CTRL_REG4, scale as u8)?;
        self.gain_g = scale.gain_g();
        Ok(())
    }

    /// Число отсчетов, накопленных в FIFO
    pub fn fifo_level<I>(&self, i2c: &mut I2c<'_, I, Blocking>) -> Result<u8, Lsm303Error>
    where
        I: embassy_rp::i2c::Instance,
    {
        let src = self.read_register(i2c, regs::FIFO_SRC_REG)?;
        Ok(src & 0x1F)
    }

    /// Вычитывает все накопленные отсчеты FIFO (g в осях платформы)
    pub fn read_fifo<I>(&self, i2c: &mut I2c<'_, I, Blocking>) -> Result<AccelFifo, Lsm303Error>
    where
        I: embassy_rp::i2c::Instance,
    {
        let mut level = self.fifo_level(i2c)?;
        if level as usize >= FIFO_CAPACITY - 1 {
            defmt::warn!("Переполнение FIFO акселерометра");
        }

        let mut samples = AccelFifo::new();
        while level > 0 {
            let sample = self.read_sample(i2c)?;
            if samples.push(sample).is_err() {
                break;
            }
            level -= 1;
        }

        Ok(samples)
    }

    /// Чтение одного отсчета XYZ блочной операцией (g в осях платформы)
    pub fn read_sample<I>(
        &self,
        i2c: &mut I2c<'_, I, Blocking>,
    ) -> Result<Vector3<f32>, Lsm303Error>
    where
        I: embassy_rp::i2c::Instance,
    {
        let mut buf = [0u8; 6];
        self.read_registers(i2c, regs::OUT_X_L | regs::AUTO_INCREMENT, &mut buf)?;
        Ok(decode_block(&buf, self.gain_g))
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

/// Преобразует блок из шести байтов в g с учетом знаков осей.
/// Значение 12-битное, выровнено по старшим разрядам.
fn decode_block(buf: &[u8; 6], gain_g: f32) -> Vector3<f32> {
    let x = (i16::from_le_bytes([buf[0], buf[1]]) >> 4) as f32 * gain_g * AXIS_SIGN[0];
    let y = (i16::from_le_bytes([buf[2], buf[3]]) >> 4) as f32 * gain_g * AXIS_SIGN[1];
    let z = (i16::from_le_bytes([buf[4], buf[5]]) >> 4) as f32 * gain_g * AXIS_SIGN[2];
    Vector3::new(x, y, z)
}

// Тесты для отладки
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_bits() {
        assert_eq!(AccelScale::G2 as u8, 0x00);
        assert_eq!(AccelScale::G4 as u8, 0x10);
    }

    #[test]
    fn test_gain_4g() {
        assert_eq!(AccelScale::G4.gain_g(), 0.002);
    }

    #[test]
    fn test_decode_block_z_one_g() {
        // 1g по Z при ±4g: 500 кодов, сдвинутых в старшие разряды
        let raw = (500i16) << 4;
        let [l, h] = raw.to_le_bytes();
        let buf = [0, 0, 0, 0, l, h];
        let v = decode_block(&buf, 0.002);
        assert!((v.z - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_decode_block_x_sign_inverted() {
        // Положительный код датчика дает отрицательное значение по X
        let raw = (500i16) << 4;
        let [l, h] = raw.to_le_bytes();
        let buf = [l, h, 0, 0, 0, 0];
        let v = decode_block(&buf, 0.002);
        assert!((v.x + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_decode_block_negative_value() {
        let raw = (-250i16) << 4;
        let [l, h] = raw.to_le_bytes();
        let buf = [0, 0, l, h, 0, 0];
        let v = decode_block(&buf, 0.002);
        assert!((v.y + 0.5).abs() < 1e-6);
    }
}
