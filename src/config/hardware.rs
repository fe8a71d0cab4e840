//! Конфигурация аппаратного обеспечения квадрокоптера

/// Конфигурация пинов GPIO
pub mod pins {
    /// I2C для датчиков и PWM контроллера
    pub mod i2c {
        /// Пин SDA для I2C0
        pub const SDA_PIN: u8 = 4; // GPIO4
        /// Пин SCL для I2C0
        pub const SCL_PIN: u8 = 5; // GPIO5
    }

    /// UART для консоли оператора
    pub mod console {
        /// Пин TX для UART0
        pub const TX_PIN: u8 = 0; // GPIO0
        /// Пин RX для UART0
        pub const RX_PIN: u8 = 1; // GPIO1
    }

    /// АЦП для контроля батареи
    pub mod battery {
        /// Отвод первой ячейки
        pub const TAP0_PIN: u8 = 26; // GPIO26 - ADC0
        /// Отвод второй ячейки
        pub const TAP1_PIN: u8 = 27; // GPIO27 - ADC1
        /// Отвод третьей ячейки
        pub const TAP2_PIN: u8 = 28; // GPIO28 - ADC2
    }

    /// Дополнительные пины
    pub mod misc {
        /// Встроенный светодиод на Pico
        pub const LED_PIN: u8 = 25; // GPIO25
    }
}

/// Конфигурация частот и скоростей
pub mod frequencies {
    /// Частота I2C шины (Гц)
    pub const I2C_FREQUENCY: u32 = 400_000; // 400 kHz

    /// Скорость UART консоли (бод)
    pub const CONSOLE_BAUDRATE: u32 = 115_200;

    /// Частота PWM сигнала для регуляторов моторов (Гц)
    pub const MOTOR_PWM_FREQUENCY: u32 = 400;
}

/// Адреса I2C устройств
pub mod i2c_addresses {
    /// Адрес гироскопа L3GD20
    pub const L3GD20_ADDR: u8 = 0x6B;

    /// Адрес акселерометра LSM303DLHC
    pub const LSM303_ACCEL_ADDR: u8 = 0x19;

    /// Адрес PWM контроллера PCA9685
    pub const PCA9685_ADDR: u8 = 0x40;
}

/// Каналы PWM контроллера и их назначение
pub mod motors {
    /// Первый используемый канал
    pub const MIN_CHANNEL: u8 = 12;

    /// Последний используемый канал
    pub const MAX_CHANNEL: u8 = 15;

    /// Количество моторов
    pub const COUNT: usize = (MAX_CHANNEL - MIN_CHANNEL + 1) as usize;

    /// Пара моторов оси тангажа: первый мотор при наборе мощности
    /// уводит угол в минус
    pub const PITCH_PAIR: [u8; 2] = [13, 15];

    /// Пара моторов оси крена
    pub const ROLL_PAIR: [u8; 2] = [14, 12];

    /// Минимальная скважность PWM, промилле периода
    pub const DUTY_MIN: f32 = 400.0;

    /// Максимальная скважность PWM, промилле периода
    pub const DUTY_MAX: f32 = 800.0;
}

/// Делители напряжения на отводах батареи
///
/// Отводы 3S батареи дают до 4.2/8.4/12.6 В, делители приводят
/// их в диапазон АЦП. Коэффициент = (R_верх + R_низ) / R_низ.
pub mod battery_dividers {
    /// Отвод первой ячейки: 10к/10к
    pub const TAP0_RATIO: f32 = 2.0;

    /// Отвод второй ячейки: 20к/10к
    pub const TAP1_RATIO: f32 = 3.0;

    /// Отвод третьей ячейки: 33к/10к
    pub const TAP2_RATIO: f32 = 4.3;

    /// Опорное напряжение АЦП (вольты)
    pub const VREF: f32 = 3.3;

    /// Разрядность АЦП
    pub const ADC_MAX: f32 = 4095.0;
}

/// Параметры системы
pub mod system {
    /// Количество попыток инициализации устройств
    pub const INIT_RETRY_COUNT: u8 = 3;

    /// Пауза между попытками инициализации (мс)
    pub const INIT_RETRY_DELAY_MS: u64 = 100;
}
