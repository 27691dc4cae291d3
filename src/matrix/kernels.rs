//! Варианты ядер матричного умножения

/// Файл общих констант, загружается первым
pub const CONSTANTS_FILE: &str = "constants.h";
/// Файл с телами ядер
pub const KERNELS_FILE: &str = "kernels.cl";

// Значения совпадают с kernels/constants.h
/// Сторона рабочей группы наивного ядра
pub const WGS: usize = 16;
/// Сторона тайла в локальной памяти (SMB)
pub const SMB_TS: usize = 16;
/// Сторона тайла, кэшируемого рабочей группой (CRB)
pub const CRB_TS: usize = 32;
/// Сторона подблока, считаемого одним work-item в регистрах (CRB)
pub const CRB_STS: usize = 4;

/// Именованная точка входа и её геометрия запуска
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelVariant {
    pub name: String,
    pub grid_size: usize,
    pub block_size: usize,
}

impl KernelVariant {
    pub fn new(name: impl Into<String>, grid_size: usize, block_size: usize) -> Self {
        Self {
            name: name.into(),
            grid_size,
            block_size,
        }
    }

    /// Покрывает ли геометрия квадратную матрицу `size` без остатка
    pub fn tiles(&self, size: usize) -> bool {
        self.block_size != 0 && self.grid_size % self.block_size == 0 && self.grid_size <= size
    }
}

/// Фиксированный упорядоченный список вариантов для матрицы `size x size`
pub fn default_variants(size: usize) -> Vec<KernelVariant> {
    vec![
        // Наивное: каждый work-item считает одно скалярное произведение
        KernelVariant::new("GEMM", size, WGS),
        // SMB: поблочная обработка через локальную память
        KernelVariant::new("GEMM_SMB", size, SMB_TS),
        // CRB: кэш в локальной памяти и в регистрах
        KernelVariant::new("GEMM_CRB", size / CRB_STS, CRB_TS / CRB_STS),
        // CRB-T: тайлы левого операнда хранятся транспонированными
        KernelVariant::new("GEMM_CRB_T", size / CRB_STS, CRB_TS / CRB_STS),
        // CRB-TR: меньше приватных регистров
        KernelVariant::new("GEMM_CRB_TR", size / CRB_STS, CRB_TS / CRB_STS),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_variants_keep_order_and_geometry() {
        let variants = default_variants(512);
        let names: Vec<_> = variants.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["GEMM", "GEMM_SMB", "GEMM_CRB", "GEMM_CRB_T", "GEMM_CRB_TR"]);

        assert_eq!((variants[0].grid_size, variants[0].block_size), (512, 16));
        assert_eq!((variants[2].grid_size, variants[2].block_size), (128, 8));
    }

    #[test]
    fn all_default_variants_tile_multiples_of_crb_tile() {
        for size in [64, 128, 512] {
            assert!(default_variants(size).iter().all(|v| v.tiles(size)), "size {size}");
        }
    }

    #[test]
    fn odd_sizes_do_not_tile() {
        let v = KernelVariant::new("GEMM", 100, 16);
        assert!(!v.tiles(100));
        assert!(!KernelVariant::new("X", 16, 0).tiles(16));
    }
}
