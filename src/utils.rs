//! Вспомогательные функции и утилиты

use std::time::{Duration, Instant};

/// Измеряет время выполнения функции по часам хоста
pub fn measure_time<F, T>(f: F) -> (T, Duration)
where
    F: FnOnce() -> T,
{
    let start = Instant::now();
    let result = f();
    (result, start.elapsed())
}

/// Длительность в миллисекундах с дробной частью
pub fn millis(duration: Duration) -> f64 {
    duration.as_nanos() as f64 / 1e6
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measure_time_returns_the_closure_result() {
        let (value, duration) = measure_time(|| 6 * 7);
        assert_eq!(value, 42);
        assert!(duration < Duration::from_secs(5));
    }

    #[test]
    fn millis_keeps_fraction() {
        assert_eq!(millis(Duration::from_micros(1500)), 1.5);
        assert_eq!(millis(Duration::ZERO), 0.0);
    }
}
