//! Консоль оператора на UART
//!
//! Принимает односимвольные команды и целые приращения мощности,
//! переводит их во флаги `OperatorFlags`. Цикл управления читает
//! флаги на границе своего такта. Команда остановки завершает
//! работу консоли.

use core::fmt::Write as _;

use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{Async, Uart};
use heapless::{String, Vec};

use crate::config::flight::power;
use crate::data::SYSTEM_STATE;

/// Максимальная длина строки команды (байты)
const LINE_CAPACITY: usize = 32;

/// Подсказка оператору при старте консоли
const HELP: &str = concat!(
    "\r\nКонсоль оператора:\r\n",
    "  s - запуск контура стабилизации\r\n",
    "  r - сброс моторов к начальной мощности\r\n",
    "  c - остановка моторов\r\n",
    "  n - подтверждение шага\r\n",
    "  целое в пределах +/-100 - приращение общей мощности, %\r\n",
);

/// Команда оператора, разобранная из строки консоли
#[derive(Clone, Copy, Debug, PartialEq)]
enum Command {
    /// Остановка моторов и завершение консоли
    Stop,
    /// Запуск контура стабилизации
    Start,
    /// Сброс моторов к начальной мощности
    Reset,
    /// Подтверждение шага, наследие пошагового ручного режима
    Next,
    /// Приращение общей мощности (проценты)
    Increment(i32),
    /// Пустая строка
    Empty,
    /// Нераспознанный ввод
    Unknown,
}

/// Разбирает строку оператора в команду
fn parse_line(line: &[u8]) -> Command {
    let text = match core::str::from_utf8(line) {
        Ok(text) => text.trim(),
        Err(_) => return Command::Unknown,
    };

    match text {
        "" => Command::Empty,
        "c" => Command::Stop,
        "s" => Command::Start,
        "r" => Command::Reset,
        "n" => Command::Next,
        _ => match text.parse::<i32>() {
            Ok(value) if value.abs() <= power::MAX_POWER as i32 => Command::Increment(value),
            _ => Command::Unknown,
        },
    }
}

/// Пишет строку в UART, ошибка записи не прерывает консоль
async fn send(uart: &mut Uart<'static, UART0, Async>, text: &str) {
    if let Err(e) = uart.write(text.as_bytes()).await {
        defmt::warn!("Ошибка записи в консоль: {}", e);
    }
}

#[embassy_executor::task]
pub async fn task(mut uart: Uart<'static, UART0, Async>) {
    defmt::info!("Консоль оператора запущена");
    send(&mut uart, HELP).await;

    let mut line: Vec<u8, LINE_CAPACITY> = Vec::new();
    let mut byte = [0u8; 1];
    let mut prompt: String<48> = String::new();

    'console: loop {
        // Приглашение с текущим уровнем мощности
        prompt.clear();
        let current = *SYSTEM_STATE.current_power.lock().await;
        let _ = write!(prompt, "\r\nмощность {}% > ", current);
        send(&mut uart, prompt.as_str()).await;

        // Чтение строки побайтно с эхом
        line.clear();
        loop {
            if let Err(e) = uart.read(&mut byte).await {
                defmt::warn!("Ошибка чтения консоли: {}", e);
                continue;
            }
            match byte[0] {
                b'\r' | b'\n' => {
                    send(&mut uart, "\r\n").await;
                    break;
                }
                // Backspace и Delete стирают последний символ
                0x08 | 0x7f => {
                    if line.pop().is_some() {
                        send(&mut uart, "\x08 \x08").await;
                    }
                }
                value => {
                    if line.push(value).is_ok() {
                        let _ = uart.write(&byte).await;
                    }
                }
            }
        }

        match parse_line(&line) {
            Command::Stop => {
                SYSTEM_STATE.flags.request_stop();
                defmt::info!("Консоль: остановка моторов");
                send(&mut uart, "Остановка моторов\r\n").await;
                break 'console;
            }
            Command::Start => {
                SYSTEM_STATE.flags.request_start();
                defmt::info!("Консоль: запуск контура стабилизации");
                send(&mut uart, "Контур стабилизации запущен\r\n").await;
            }
            Command::Reset => {
                SYSTEM_STATE.flags.request_reset();
                defmt::info!("Консоль: сброс мощности");
                send(&mut uart, "Сброс моторов к начальной мощности\r\n").await;
            }
            Command::Next => {
                // Контур стабилизации подтверждений не требует
            }
            Command::Increment(delta) => {
                SYSTEM_STATE.flags.request_power_increment(delta);
                defmt::info!("Консоль: приращение мощности {}%", delta);
                send(&mut uart, "Приращение принято\r\n").await;
            }
            Command::Empty => {}
            Command::Unknown => {
                send(&mut uart, "Нераспознанная команда\r\n").await;
            }
        }
    }

    defmt::info!("Консоль оператора завершена");
}
