//! Разбор аргументов командной строки и конфигурация бенчмарка

use crate::matrix::kernels::{CONSTANTS_FILE, KERNELS_FILE};
use clap::Parser;
use std::path::PathBuf;

/// Размер квадратной матрицы по умолчанию
pub const MATRIX_SIZE: usize = 512;
/// Число итераций по умолчанию
pub const N_ITERATION: usize = 20;
/// Каталог с исходниками ядер по умолчанию
pub const KERNEL_DIR: &str = "kernels";
/// Переменная окружения, переопределяющая каталог ядер
pub const KERNEL_DIR_ENV: &str = "OCLGEMM_KERNEL_DIR";

/// Аргументы командной строки
#[derive(Debug, Clone, Parser)]
#[command(name = "oclgemm")]
#[command(about = "Benchmark OpenCL GEMM kernel variants", long_about = None)]
pub struct CliArgs {
    /// Reduced mode: no reference check, one mean time per line
    #[arg(short = 'r')]
    pub reduced: bool,

    /// Square matrix size (zero or malformed values fall back to 512)
    #[arg(short = 's', value_name = "SIZE", allow_hyphen_values = true)]
    pub size: Option<String>,

    /// Number of iterations (zero or malformed values fall back to 20)
    #[arg(short = 'i', value_name = "COUNT", allow_hyphen_values = true)]
    pub iterations: Option<String>,

    /// Directory with constants.h and kernels.cl
    #[arg(short = 'd', value_name = "DIR", env = KERNEL_DIR_ENV, default_value = KERNEL_DIR)]
    pub kernel_dir: PathBuf,

    /// Print the report as JSON
    #[arg(short = 'j')]
    pub json: bool,

    /// Seed for the operand generator
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Параметры одного запуска
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchConfig {
    pub matrix_size: usize,
    pub n_iteration: usize,
    /// Без эталона и проверки, только времена
    pub reduced: bool,
    /// Отчёт в JSON на stdout
    pub json: bool,
    pub kernel_dir: PathBuf,
    /// Зерно генератора операндов; без него берётся энтропия
    pub seed: Option<u64>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            matrix_size: MATRIX_SIZE,
            n_iteration: N_ITERATION,
            reduced: false,
            json: false,
            kernel_dir: PathBuf::from(KERNEL_DIR),
            seed: None,
        }
    }
}

impl BenchConfig {
    /// Нулевые и некорректные числа молча заменяются значениями по умолчанию
    pub fn from_args(args: &CliArgs) -> Self {
        Self {
            matrix_size: non_zero_or(args.size.as_deref(), MATRIX_SIZE),
            n_iteration: non_zero_or(args.iterations.as_deref(), N_ITERATION),
            reduced: args.reduced,
            json: args.json,
            kernel_dir: args.kernel_dir.clone(),
            seed: args.seed,
        }
    }

    /// Исходники в порядке загрузки: сначала константы, затем ядра
    pub fn source_paths(&self) -> [PathBuf; 2] {
        [self.kernel_dir.join(CONSTANTS_FILE), self.kernel_dir.join(KERNELS_FILE)]
    }
}

fn non_zero_or(value: Option<&str>, default: usize) -> usize {
    value
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&v| v != 0)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> BenchConfig {
        let argv = std::iter::once("oclgemm").chain(args.iter().copied());
        BenchConfig::from_args(&CliArgs::try_parse_from(argv).unwrap())
    }

    #[test]
    fn defaults_without_arguments() {
        let config = parse(&["-d", "kernels"]);
        assert_eq!(config.matrix_size, 512);
        assert_eq!(config.n_iteration, 20);
        assert!(!config.reduced);
        assert!(!config.json);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn flags_and_values_are_read() {
        let config = parse(&["-r", "-s", "64", "-i", "3", "-d", "/tmp/k", "--seed", "9", "-j"]);
        assert!(config.reduced);
        assert!(config.json);
        assert_eq!(config.matrix_size, 64);
        assert_eq!(config.n_iteration, 3);
        assert_eq!(config.kernel_dir, PathBuf::from("/tmp/k"));
        assert_eq!(config.seed, Some(9));
    }

    #[test]
    fn zero_and_malformed_numbers_fall_back() {
        let config = parse(&["-s", "0", "-i", "abc"]);
        assert_eq!(config.matrix_size, MATRIX_SIZE);
        assert_eq!(config.n_iteration, N_ITERATION);

        let config = parse(&["-s", "-5", "-i", "2.5"]);
        assert_eq!(config.matrix_size, MATRIX_SIZE);
        assert_eq!(config.n_iteration, N_ITERATION);
    }

    #[test]
    fn unknown_flags_are_rejected() {
        let argv = ["oclgemm", "-x"];
        assert!(CliArgs::try_parse_from(argv).is_err());
    }

    #[test]
    fn sources_load_constants_first() {
        let config = parse(&["-d", "k"]);
        let [first, second] = config.source_paths();
        assert_eq!(first, PathBuf::from("k").join("constants.h"));
        assert_eq!(second, PathBuf::from("k").join("kernels.cl"));
    }
}
