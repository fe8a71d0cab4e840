//! Фильтры для сглаживания показаний датчиков

use heapless::Vec;

/// Скользящее окно усреднения фиксированной длины
///
/// После заполнения окно всегда полное: новое значение вытесняет
/// самое старое. Начальное заполнение выполняется методом `seed`.
#[derive(Debug, Clone)]
pub struct MeanWindow<const N: usize> {
    buffer: Vec<f32, N>,
    sum: f32,
}

impl<const N: usize> MeanWindow<N> {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            sum: 0.0,
        }
    }

    /// Заполняет все окно одним значением
    pub fn seed(&mut self, value: f32) {
        self.buffer.clear();
        self.sum = 0.0;
        for _ in 0..N {
            let _ = self.buffer.push(value);
            self.sum += value;
        }
    }

    /// Добавляет значение, вытесняя самое старое
    pub fn push(&mut self, value: f32) {
        if self.buffer.len() >= N {
            self.sum -= self.buffer[0];
            self.buffer.remove(0);
        }
        let _ = self.buffer.push(value);
        self.sum += value;
    }

    /// Среднее по окну
    pub fn mean(&self) -> f32 {
        if self.buffer.is_empty() {
            0.0
        } else {
            self.sum / self.buffer.len() as f32
        }
    }

    pub fn is_seeded(&self) -> bool {
        self.buffer.len() >= N
    }
}

// Модульные тесты
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_fills_window() {
        let mut w: MeanWindow<20> = MeanWindow::new();
        w.seed(3.0);
        assert!(w.is_seeded());
        assert_eq!(w.mean(), 3.0);
    }

    #[test]
    fn test_push_displaces_oldest() {
        let mut w: MeanWindow<4> = MeanWindow::new();
        w.seed(0.0);
        w.push(4.0);
        // окно: [0, 0, 0, 4]
        assert_eq!(w.mean(), 1.0);
        w.push(4.0);
        w.push(4.0);
        w.push(4.0);
        // все нули вытеснены
        assert_eq!(w.mean(), 4.0);
    }

    #[test]
    fn test_mean_of_empty_is_zero() {
        let w: MeanWindow<8> = MeanWindow::new();
        assert_eq!(w.mean(), 0.0);
        assert!(!w.is_seeded());
    }

    #[test]
    fn test_reseed_resets_history() {
        let mut w: MeanWindow<4> = MeanWindow::new();
        w.seed(10.0);
        w.push(-10.0);
        w.seed(1.0);
        assert_eq!(w.mean(), 1.0);
    }
}
