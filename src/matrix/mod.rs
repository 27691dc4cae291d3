//! Модуль для работы с матрицами
//!
//! Предоставляет:
//! - Контейнер матрицы хоста
//! - Эталонные операции (наивное умножение, норма, сравнение)
//! - Описания вариантов ядер для бенчмарка

mod types;
pub mod operations;
pub mod kernels;

pub use types::Matrix;
pub use kernels::{default_variants, KernelVariant};
