//! Бенчмарк вариантов ядер: драйвер и отчёт

mod driver;
mod report;

pub use driver::{BenchmarkDriver, MatmulDispatch, Operands};
pub use report::{BenchReport, VariantResult};
