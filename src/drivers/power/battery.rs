//! Монитор батареи 3S через резистивные делители на АЦП RP2040
//!
//! Отводы подключены ступенчато: первый видит нижнюю ячейку,
//! второй две нижние, третий весь пакет. Напряжение отдельной
//! ячейки получается вычитанием напряжения предыдущего отвода.
use embassy_rp::adc::{Adc, Blocking, Channel, Error as AdcError};

use crate::config::flight::battery;
use crate::config::hardware::battery_dividers;
use crate::data::{BatteryState, CellReading};

/// Коэффициенты делителей по отводам, от нижней ячейки к полному пакету
const TAP_RATIOS: [f32; 3] = [
    battery_dividers::TAP0_RATIO,
    battery_dividers::TAP1_RATIO,
    battery_dividers::TAP2_RATIO,
];

/// Ошибки монитора батареи
#[derive(Debug)]
pub enum BatteryError {
    /// Ошибка АЦП
    Adc(AdcError),
}

impl defmt::Format for BatteryError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            BatteryError::Adc(_) => defmt::write!(fmt, "Battery: ADC error"),
        }
    }
}

impl From<AdcError> for BatteryError {
    fn from(error: AdcError) -> Self {
        BatteryError::Adc(error)
    }
}

/// Монитор батареи
pub struct BatteryMonitor<'d> {
    adc: Adc<'d, Blocking>,
    /// Каналы отводов: GPIO26, GPIO27, GPIO28
    taps: [Channel<'d>; 3],
}

impl<'d> BatteryMonitor<'d> {
    pub fn new(adc: Adc<'d, Blocking>, taps: [Channel<'d>; 3]) -> Self {
        Self { adc, taps }
    }

    /// Читает все отводы и возвращает состояние ячеек
    pub fn read(&mut self) -> Result<BatteryState, BatteryError> {
        let mut packs = [0.0f32; 3];
        for ((pack, tap), ratio) in packs
            .iter_mut()
            .zip(self.taps.iter_mut())
            .zip(TAP_RATIOS.iter())
        {
            let raw = self.adc.blocking_read(tap)?;
            *pack = raw as f32 / battery_dividers::ADC_MAX * battery_dividers::VREF * ratio;
        }

        Ok(BatteryState {
            cells: cells_from_packs(&packs),
        })
    }
}

/// Пересчитывает напряжения пакета в точках отводов в ячейки
fn cells_from_packs(packs: &[f32; 3]) -> [CellReading; 3] {
    let mut cells = [CellReading {
        volts: 0.0,
        percent: 0.0,
    }; 3];

    let mut below = 0.0;
    for (cell, pack) in cells.iter_mut().zip(packs.iter()) {
        let volts = pack - below;
        *cell = CellReading {
            volts,
            percent: cell_percent(volts),
        };
        below = *pack;
    }

    cells
}

/// Заряд ячейки в процентах линейной интерполяцией:
/// 4.2 В -> 100%, 3.6 В -> 0%
fn cell_percent(volts: f32) -> f32 {
    100.0
        + (volts - battery::CELL_VMAX)
            * ((0.0 - 100.0) / (battery::CELL_VMIN - battery::CELL_VMAX))
}

// Тесты для отладки
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_endpoints() {
        assert!((cell_percent(battery::CELL_VMAX) - 100.0).abs() < 1e-4);
        assert!(cell_percent(battery::CELL_VMIN).abs() < 1e-4);
    }

    #[test]
    fn test_percent_midpoint() {
        assert!((cell_percent(3.9) - 50.0).abs() < 1e-3);
    }

    #[test]
    fn test_percent_extrapolates_below_range() {
        assert!(cell_percent(3.0) < 0.0);
    }

    #[test]
    fn test_full_pack_stacking() {
        let cells = cells_from_packs(&[4.2, 8.4, 12.6]);
        for cell in &cells {
            assert!((cell.volts - 4.2).abs() < 1e-4);
            assert!((cell.percent - 100.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_unbalanced_pack() {
        // Средняя ячейка просела до 3.6 В
        let cells = cells_from_packs(&[4.2, 7.8, 12.0]);
        assert!((cells[0].volts - 4.2).abs() < 1e-4);
        assert!((cells[1].volts - 3.6).abs() < 1e-4);
        assert!((cells[2].volts - 4.2).abs() < 1e-4);
        assert!(cells[1].percent.abs() < 1e-3);
    }
}
