//! Итоги бенчмарка и их вывод

use prettytable::{format, row, Table};
use serde::Serialize;

/// Результат одного варианта ядра
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantResult {
    pub name: String,
    /// Среднее время устройства, мс
    pub mean_ms: f64,
    /// Число итераций, где результат отличался от эталона
    pub mismatches: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchReport {
    pub matrix_size: usize,
    pub n_iteration: usize,
    pub reduced: bool,
    pub results: Vec<VariantResult>,
}

impl BenchReport {
    /// Эффективная производительность: 2 n^3 операций за среднее время
    pub fn gflops(&self, result: &VariantResult) -> f64 {
        if result.mean_ms <= 0.0 {
            return 0.0;
        }
        let n = self.matrix_size as f64;
        2.0 * n * n * n / result.mean_ms * 1e-6
    }

    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
        table.set_titles(row!["Kernel", "Time (ms)", "GFLOPS", "Miss"]);

        for result in &self.results {
            table.add_row(row![
                result.name,
                r->format!("{:.3}", result.mean_ms),
                r->format!("{:.1}", self.gflops(result)),
                r->format!("{}/{}", result.mismatches, self.n_iteration)
            ]);
        }
        table
    }

    /// По одному среднему времени на строку, в порядке вариантов
    pub fn reduced_lines(&self) -> String {
        self.results
            .iter()
            .map(|r| format!("{}\n", r.mean_ms))
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Таблица в полном режиме, столбец времён в сокращённом
    pub fn render(&self) -> String {
        if self.reduced {
            self.reduced_lines()
        } else {
            self.to_table().to_string()
        }
    }
}
