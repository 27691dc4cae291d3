//! Операции над матрицами
//!
//! Размерности операндов не проверяются в release-сборке: сложение и
//! вычитание требуют одинаковых размеров, умножение `lhs.cols == rhs.rows`.

use super::types::Matrix;
use rand::Rng;
use std::ops::{Add, Mul, Sub};

impl Matrix {
    /// Заполняет матрицу значениями `(r % 256) / 256` из [0, 1)
    pub fn random<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Self {
        let data = (0..rows * cols)
            .map(|_| rng.gen_range(0..256u32) as f32 / 256.0)
            .collect();
        Self { rows, cols, data }
    }

    pub fn transpose(&self) -> Matrix {
        let mut transposed = Matrix::zeros(self.cols, self.rows);
        for i in 0..self.rows {
            for j in 0..self.cols {
                transposed.data[j * self.rows + i] = self.data[i * self.cols + j];
            }
        }
        transposed
    }

    /// Норма Фробениуса: корень из суммы квадратов элементов
    pub fn norm(&self) -> f32 {
        self.data.iter().map(|v| v * v).sum::<f32>().sqrt()
    }

    fn zip_with(&self, rhs: &Matrix, op: impl Fn(f32, f32) -> f32) -> Matrix {
        debug_assert_eq!((self.rows, self.cols), (rhs.rows, rhs.cols));
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().zip(&rhs.data).map(|(&a, &b)| op(a, b)).collect(),
        }
    }

    /// Наивное умножение. Правый операнд транспонируется, чтобы оба
    /// скалярных произведения читали память подряд; сумма копится по
    /// возрастанию k, как и в ядрах устройства.
    fn naive_product(&self, rhs: &Matrix) -> Matrix {
        debug_assert_eq!(self.cols, rhs.rows);
        let transposed = rhs.transpose();
        let inner = self.cols;
        let mut result = Matrix::zeros(self.rows, rhs.cols);

        for i in 0..self.rows {
            let lhs_row = &self.data[i * inner..(i + 1) * inner];
            for j in 0..rhs.cols {
                let rhs_col = &transposed.data[j * inner..(j + 1) * inner];
                let mut acc = 0.0f32;
                for k in 0..inner {
                    acc += lhs_row[k] * rhs_col[k];
                }
                result.data[i * rhs.cols + j] = acc;
            }
        }
        result
    }
}

impl Add<&Matrix> for &Matrix {
    type Output = Matrix;

    fn add(self, rhs: &Matrix) -> Matrix {
        self.zip_with(rhs, |a, b| a + b)
    }
}

impl Sub<&Matrix> for &Matrix {
    type Output = Matrix;

    fn sub(self, rhs: &Matrix) -> Matrix {
        self.zip_with(rhs, |a, b| a - b)
    }
}

impl Mul<&Matrix> for &Matrix {
    type Output = Matrix;

    fn mul(self, rhs: &Matrix) -> Matrix {
        self.naive_product(rhs)
    }
}

macro_rules! forward_owned_binop {
    ($($trait:ident :: $method:ident),*) => {$(
        impl $trait for Matrix {
            type Output = Matrix;

            fn $method(self, rhs: Matrix) -> Matrix {
                $trait::$method(&self, &rhs)
            }
        }

        impl $trait<&Matrix> for Matrix {
            type Output = Matrix;

            fn $method(self, rhs: &Matrix) -> Matrix {
                $trait::$method(&self, rhs)
            }
        }
    )*};
}

forward_owned_binop!(Add::add, Sub::sub, Mul::mul);

/// Точное поэлементное равенство
impl PartialEq for Matrix {
    fn eq(&self, other: &Matrix) -> bool {
        self.rows == other.rows && self.cols == other.cols && self.data == other.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn triple_loop(a: &Matrix, b: &Matrix) -> Vec<f64> {
        let mut out = vec![0.0f64; a.rows() * b.cols()];
        for i in 0..a.rows() {
            for j in 0..b.cols() {
                for k in 0..a.cols() {
                    out[i * b.cols() + j] += a[(i, k)] as f64 * b[(k, j)] as f64;
                }
            }
        }
        out
    }

    #[test]
    fn default_matrix_is_empty() {
        let m = Matrix::default();
        assert_eq!((m.rows(), m.cols()), (0, 0));
        assert!(m.is_empty());
        assert_eq!(m.norm(), 0.0);
    }

    #[test]
    fn product_matches_triple_loop_on_rectangular_operands() {
        let mut rng = StdRng::seed_from_u64(7);
        let a = Matrix::random(5, 3, &mut rng);
        let b = Matrix::random(3, 4, &mut rng);

        let c = &a * &b;
        assert_eq!((c.rows(), c.cols()), (5, 4));

        for (got, want) in c.as_slice().iter().zip(triple_loop(&a, &b)) {
            assert!((*got as f64 - want).abs() < 1e-5, "{got} vs {want}");
        }
    }

    #[test]
    fn identity_product_is_identity() {
        let id = Matrix::identity(2);
        let r = &id * &id;
        assert_eq!(r, id);
        assert_eq!((&r - &id).norm(), 0.0);
    }

    #[test]
    fn norm_is_root_of_sum_of_squares() {
        let m = Matrix::from_vec(2, 2, vec![3.0, 0.0, 0.0, 4.0]);
        assert_eq!(m.norm(), 5.0);
        assert_eq!(Matrix::zeros(8, 8).norm(), 0.0);
    }

    #[test]
    fn self_difference_has_zero_norm() {
        let mut rng = StdRng::seed_from_u64(42);
        let a = Matrix::random(16, 16, &mut rng);
        assert_eq!(a, a.clone());
        assert_eq!((&a - &a).norm(), 0.0);
    }

    #[test]
    fn add_and_sub_are_elementwise() {
        let a = Matrix::from_vec(1, 3, vec![1.0, 2.0, 3.0]);
        let b = Matrix::from_vec(1, 3, vec![0.5, 0.5, 0.5]);
        assert_eq!((&a + &b).as_slice(), &[1.5, 2.5, 3.5]);
        assert_eq!((a - b).as_slice(), &[0.5, 1.5, 2.5]);
    }

    #[test]
    fn clone_has_independent_storage() {
        let original = Matrix::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0]);
        let mut copy = original.clone();
        copy[(0, 1)] = 9.0;

        assert_eq!(original[(0, 1)], 2.0);
        assert_ne!(original, copy);

        let mut assigned = Matrix::default();
        assigned.clone_from(&original);
        assigned.as_mut_slice()[3] = 0.0;
        assert_eq!(original[(1, 1)], 4.0);
    }

    #[test]
    fn random_fill_stays_in_unit_interval() {
        let mut rng = StdRng::seed_from_u64(1);
        let m = Matrix::random(32, 32, &mut rng);
        assert_eq!(m.len(), 32 * 32);
        assert!(m.as_slice().iter().all(|&v| (0.0..1.0).contains(&v)));
        // Шаг сетки 1/256
        assert!(m.as_slice().iter().all(|&v| (v * 256.0).fract() == 0.0));
    }

    #[test]
    fn transpose_swaps_indices() {
        let m = Matrix::from_vec(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let t = m.transpose();
        assert_eq!((t.rows(), t.cols()), (3, 2));
        assert_eq!(t[(2, 1)], 6.0);
        assert_eq!(t[(0, 1)], 4.0);
    }
}
