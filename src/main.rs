#![no_std]
#![no_main]

use embassy_executor::Spawner;
use embassy_rp::adc::{Adc, Channel, Config as AdcConfig};
use embassy_rp::gpio::{Level, Output, Pull};
use embassy_rp::i2c::{self, Config as I2cConfig};
use embassy_rp::uart::{self, Config as UartConfig};
use embassy_rp::{bind_interrupts, peripherals};
use embassy_time::{Duration, Timer};
use {defmt_rtt as _, panic_probe as _};

mod config;
mod control;
mod data;
mod drivers;
mod sensors;
mod tasks;
mod utils;

use crate::config::hardware::frequencies;
use crate::data::SYSTEM_STATE;
use crate::drivers::power::BatteryMonitor;
use crate::tasks::*;
use crate::utils::system_info;

bind_interrupts!(struct Irqs {
    UART0_IRQ => uart::InterruptHandler<peripherals::UART0>;
});

/// Точка входа в программу
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    // Инициализация HAL Raspberry Pi Pico
    let p = embassy_rp::init(Default::default());

    defmt::info!("=== Стабилизация квадрокоптера v0.1.0 ===");
    defmt::info!("Инициализация системы...");
    // Вывод информации о частотах
    system_info::print_clock_info();

    // Проверка корректности частот
    if let Err(e) = system_info::validate_clocks() {
        defmt::error!("Ошибка конфигурации частот: {}", e);
        panic!("Invalid clock configuration");
    }

    // Настройка светодиода для индикации состояния
    let mut led = Output::new(p.PIN_25, Level::Low);

    // Мигаем светодиодом при старте
    for _ in 0..3 {
        led.set_high();
        Timer::after(Duration::from_millis(100)).await;
        led.set_low();
        Timer::after(Duration::from_millis(100)).await;
    }

    // Инициализация I2C для датчиков и PWM контроллера
    let i2c = {
        let sda = p.PIN_4; // GPIO4 - SDA
        let scl = p.PIN_5; // GPIO5 - SCL

        let mut config = I2cConfig::default();
        config.frequency = frequencies::I2C_FREQUENCY;

        i2c::I2c::new_blocking(p.I2C0, scl, sda, config)
    };

    // Инициализация UART консоли оператора
    let uart_console = {
        let tx = p.PIN_0; // GPIO0 - TX
        let rx = p.PIN_1; // GPIO1 - RX

        let mut config = UartConfig::default();
        config.baudrate = frequencies::CONSOLE_BAUDRATE;

        uart::Uart::new(p.UART0, tx, rx, Irqs, p.DMA_CH0, p.DMA_CH1, config)
    };

    // Инициализация АЦП для отводов батареи
    let battery_monitor = {
        let adc = Adc::new_blocking(p.ADC, AdcConfig::default());
        let taps = [
            Channel::new_pin(p.PIN_26, Pull::None), // ADC0 - первая ячейка
            Channel::new_pin(p.PIN_27, Pull::None), // ADC1 - две ячейки
            Channel::new_pin(p.PIN_28, Pull::None), // ADC2 - весь пакет
        ];
        BatteryMonitor::new(adc, taps)
    };

    // Запуск асинхронных задач
    defmt::info!("Запуск задач...");

    // Цикл управления: датчики, оценка ориентации, моторы
    spawner.spawn(control_task::task(i2c, battery_monitor)).unwrap();

    // Консоль оператора
    spawner.spawn(console_task::task(uart_console)).unwrap();

    defmt::info!("Система инициализирована. Ожидание готовности датчиков...");

    // Ждем первую оценку ориентации
    loop {
        if SYSTEM_STATE.is_ready().await {
            defmt::info!("Датчики готовы, консоль ожидает команд");
            break;
        }
        Timer::after(Duration::from_millis(500)).await;
    }

    // Индикация состояния: мигание в работе, постоянное свечение
    // после остановки моторов
    loop {
        if SYSTEM_STATE.are_motors_stopped() {
            led.set_high();
        } else {
            led.toggle();
        }
        Timer::after(Duration::from_millis(500)).await;
    }
}
