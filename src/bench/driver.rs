//! Многократный замер всех вариантов ядер с проверкой результата

use super::report::{BenchReport, VariantResult};
use crate::error::Result;
use crate::matrix::{KernelVariant, Matrix};
use crate::utils::{measure_time, millis};
use indicatif::ProgressBar;
use rand::Rng;
use tracing::{info, warn};

/// Исполнитель умножения на устройстве, с которым работает драйвер
pub trait MatmulDispatch {
    /// Делает ядро с данным именем текущим
    fn select_kernel(&mut self, name: &str) -> Result<()>;
    /// Глобальный диапазон grid x grid, локальный block x block
    fn set_geometry(&mut self, grid: usize, block: usize);
    /// C = A x B текущим ядром; блокирует до завершения
    fn invoke(&mut self, a: &Matrix, b: &Matrix, c: &mut Matrix) -> Result<()>;
    /// Время последнего `invoke` в миллисекундах
    fn elapsed_ms(&self) -> f64;
}

/// Операнды бенчмарка и эталонный результат
#[derive(Debug, Clone)]
pub struct Operands {
    pub a: Matrix,
    pub b: Matrix,
    pub c: Matrix,
    /// `None` в сокращённом режиме
    pub reference: Option<Matrix>,
}

impl Operands {
    /// Случайные квадратные A и B, пустая C; эталон R = A x B считается
    /// на хосте, если режим не сокращённый
    pub fn prepare<R: Rng + ?Sized>(size: usize, reduced: bool, rng: &mut R) -> Self {
        let a = Matrix::random(size, size, rng);
        let b = Matrix::random(size, size, rng);
        let c = Matrix::zeros(size, size);

        let reference = if reduced {
            None
        } else {
            let (r, duration) = measure_time(|| &a * &b);
            info!(size, elapsed_ms = millis(duration), "computed the reference result");
            Some(r)
        };

        Self { a, b, c, reference }
    }
}

/// Драйвер бенчмарка.
///
/// Внешний цикл по итерациям, внутренний по вариантам: каждая итерация
/// меряет все варианты по кругу в фиксированном порядке.
pub struct BenchmarkDriver {
    variants: Vec<KernelVariant>,
    n_iteration: usize,
    progress: Option<ProgressBar>,
}

impl BenchmarkDriver {
    pub fn new(variants: Vec<KernelVariant>, n_iteration: usize) -> Self {
        Self {
            variants,
            n_iteration,
            progress: None,
        }
    }

    /// Показывать прогресс по итерациям
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn variants(&self) -> &[KernelVariant] {
        &self.variants
    }

    pub fn run<D: MatmulDispatch + ?Sized>(
        &self,
        dispatch: &mut D,
        operands: &mut Operands,
    ) -> Result<BenchReport> {
        let size = operands.a.rows();
        for variant in self.variants.iter().filter(|v| !v.tiles(size)) {
            warn!(
                kernel = %variant.name,
                grid = variant.grid_size,
                block = variant.block_size,
                size,
                "geometry does not evenly tile the operands"
            );
        }

        let n = self.n_iteration;
        let mut time_records = vec![0.0f64; self.variants.len()];
        let mut error_counts = vec![0usize; self.variants.len()];

        for _ in 0..n {
            for (idx, variant) in self.variants.iter().enumerate() {
                dispatch.select_kernel(&variant.name)?;
                dispatch.set_geometry(variant.grid_size, variant.block_size);
                dispatch.invoke(&operands.a, &operands.b, &mut operands.c)?;

                time_records[idx] += dispatch.elapsed_ms() / n as f64;

                if let Some(reference) = &operands.reference {
                    if (reference - &operands.c).norm() != 0.0 {
                        warn!(kernel = %variant.name, "result differs from the reference");
                        error_counts[idx] += 1;
                    }
                }
            }
            if let Some(pb) = &self.progress {
                pb.inc(1);
            }
        }

        if let Some(pb) = &self.progress {
            pb.finish_and_clear();
        }

        let results = self
            .variants
            .iter()
            .zip(time_records)
            .zip(error_counts)
            .map(|((variant, mean_ms), mismatches)| VariantResult {
                name: variant.name.clone(),
                mean_ms,
                mismatches,
            })
            .collect();

        Ok(BenchReport {
            matrix_size: size,
            n_iteration: n,
            reduced: operands.reference.is_none(),
            results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BenchError;
    use crate::matrix::default_variants;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Хостовый исполнитель: считает произведение на CPU и выдаёт
    /// заданное время. Ядро "BROKEN" портит первый элемент результата.
    struct HostDispatch {
        current: Option<String>,
        calls: Vec<(String, usize, usize)>,
        geometry: (usize, usize),
        times: Vec<f64>,
        last: f64,
    }

    impl HostDispatch {
        fn new(times: Vec<f64>) -> Self {
            Self {
                current: None,
                calls: Vec::new(),
                geometry: (0, 0),
                times,
                last: 0.0,
            }
        }
    }

    impl MatmulDispatch for HostDispatch {
        fn select_kernel(&mut self, name: &str) -> Result<()> {
            if name == "MISSING" {
                return Err(BenchError::KernelNotFound { name: name.into() });
            }
            self.current = Some(name.to_string());
            Ok(())
        }

        fn set_geometry(&mut self, grid: usize, block: usize) {
            self.geometry = (grid, block);
        }

        fn invoke(&mut self, a: &Matrix, b: &Matrix, c: &mut Matrix) -> Result<()> {
            let name = self.current.clone().ok_or(BenchError::NoKernelSelected)?;
            *c = a * b;
            if name == "BROKEN" {
                c.as_mut_slice()[0] += 1.0;
            }
            self.calls.push((name, self.geometry.0, self.geometry.1));
            self.last = self.times[(self.calls.len() - 1) % self.times.len()];
            Ok(())
        }

        fn elapsed_ms(&self) -> f64 {
            self.last
        }
    }

    fn operands(size: usize, reduced: bool) -> Operands {
        let mut rng = StdRng::seed_from_u64(3);
        Operands::prepare(size, reduced, &mut rng)
    }

    #[test]
    fn one_iteration_reports_each_variant_in_order() {
        let variants = default_variants(64);
        let driver = BenchmarkDriver::new(variants.clone(), 1);
        let mut dispatch = HostDispatch::new(vec![1.0]);
        let mut ops = operands(64, false);

        let report = driver.run(&mut dispatch, &mut ops).unwrap();

        assert!(!report.reduced);
        assert_eq!(report.results.len(), variants.len());
        for (result, variant) in report.results.iter().zip(&variants) {
            assert_eq!(result.name, variant.name);
            assert_eq!(result.mean_ms, 1.0);
            assert!(result.mismatches <= 1);
            assert_eq!(result.mismatches, 0);
        }
    }

    #[test]
    fn iterations_are_round_robin_across_variants() {
        let variants = vec![KernelVariant::new("A", 8, 4), KernelVariant::new("B", 4, 2)];
        let driver = BenchmarkDriver::new(variants, 3);
        let mut dispatch = HostDispatch::new(vec![1.0]);
        let mut ops = operands(8, true);

        driver.run(&mut dispatch, &mut ops).unwrap();

        let order: Vec<_> = dispatch.calls.iter().map(|(n, g, b)| (n.as_str(), *g, *b)).collect();
        assert_eq!(
            order,
            [("A", 8, 4), ("B", 4, 2), ("A", 8, 4), ("B", 4, 2), ("A", 8, 4), ("B", 4, 2)]
        );
    }

    #[test]
    fn mean_time_averages_over_iterations() {
        let variants = vec![KernelVariant::new("A", 8, 4), KernelVariant::new("B", 8, 4)];
        let driver = BenchmarkDriver::new(variants, 2);
        // A: 2 и 6, B: 4 и 8
        let mut dispatch = HostDispatch::new(vec![2.0, 4.0, 6.0, 8.0]);
        let mut ops = operands(8, true);

        let report = driver.run(&mut dispatch, &mut ops).unwrap();

        assert!(report.reduced);
        assert_eq!(report.results[0].mean_ms, 4.0);
        assert_eq!(report.results[1].mean_ms, 6.0);
    }

    #[test]
    fn wrong_kernel_counts_one_mismatch_per_iteration() {
        let variants = vec![KernelVariant::new("GOOD", 8, 4), KernelVariant::new("BROKEN", 8, 4)];
        let driver = BenchmarkDriver::new(variants, 5);
        let mut dispatch = HostDispatch::new(vec![0.5]);
        let mut ops = operands(8, false);

        let report = driver.run(&mut dispatch, &mut ops).unwrap();

        assert_eq!(report.results[0].mismatches, 0);
        assert_eq!(report.results[1].mismatches, 5);
    }

    #[test]
    fn reduced_mode_skips_reference_and_mismatches() {
        let variants = vec![KernelVariant::new("BROKEN", 8, 4)];
        let driver = BenchmarkDriver::new(variants, 2);
        let mut dispatch = HostDispatch::new(vec![1.0]);
        let mut ops = operands(8, true);
        assert!(ops.reference.is_none());

        let report = driver.run(&mut dispatch, &mut ops).unwrap();
        assert_eq!(report.results[0].mismatches, 0);
    }

    #[test]
    fn zero_iterations_or_no_variants_is_not_a_fault() {
        let mut dispatch = HostDispatch::new(vec![1.0]);
        let mut ops = operands(8, false);

        let report = BenchmarkDriver::new(default_variants(8), 0)
            .run(&mut dispatch, &mut ops)
            .unwrap();
        assert_eq!(report.results.len(), 5);
        assert!(report.results.iter().all(|r| r.mean_ms == 0.0 && r.mismatches == 0));
        assert!(dispatch.calls.is_empty());

        let report = BenchmarkDriver::new(Vec::new(), 10)
            .run(&mut dispatch, &mut ops)
            .unwrap();
        assert!(report.results.is_empty());
    }

    #[test]
    fn kernel_lookup_failure_aborts_the_run() {
        let driver = BenchmarkDriver::new(vec![KernelVariant::new("MISSING", 8, 4)], 1);
        let mut dispatch = HostDispatch::new(vec![1.0]);
        let mut ops = operands(8, true);

        let err = driver.run(&mut dispatch, &mut ops).unwrap_err();
        assert!(matches!(err, BenchError::KernelNotFound { .. }));
    }

    #[test]
    fn identity_operands_match_reference() {
        let mut ops = Operands {
            a: Matrix::identity(2),
            b: Matrix::identity(2),
            c: Matrix::zeros(2, 2),
            reference: Some(&Matrix::identity(2) * &Matrix::identity(2)),
        };
        let driver = BenchmarkDriver::new(vec![KernelVariant::new("GEMM", 2, 1)], 1);
        let mut dispatch = HostDispatch::new(vec![0.1]);

        let report = driver.run(&mut dispatch, &mut ops).unwrap();
        assert_eq!(report.results[0].mismatches, 0);
        assert_eq!((ops.reference.as_ref().unwrap() - &ops.c).norm(), 0.0);
    }
}
