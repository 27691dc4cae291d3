//! Запуск выбранного ядра над матрицами хоста с замером времени устройства

use super::program::{Kernel, KernelProgram};
use super::resources::{Buffer, Event};
use super::types::*;
use crate::bench::MatmulDispatch;
use crate::error::{BenchError, Result};
use crate::matrix::Matrix;
use std::ptr;
use tracing::trace;

/// Геометрия запуска: глобальный диапазон grid x grid и локальный block x block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub grid: usize,
    pub block: usize,
}

impl Geometry {
    pub fn new(grid: usize, block: usize) -> Self {
        Self { grid, block }
    }

    pub fn global_range(&self) -> [usize; 2] {
        [self.grid, self.grid]
    }

    pub fn local_range(&self) -> [usize; 2] {
        [self.block, self.block]
    }
}

/// Исполнитель ядер.
///
/// Соглашение о вызове для всех ядер: (int) число столбцов A,
/// (int) число столбцов B, буфер A, буфер B, буфер C.
pub struct KernelInvoker<'a> {
    program: &'a KernelProgram<'a>,
    kernel: Option<Kernel>,
    geometry: Option<Geometry>,
    processing_time: f64,
}

impl<'a> KernelInvoker<'a> {
    pub fn new(program: &'a KernelProgram<'a>) -> Self {
        Self {
            program,
            kernel: None,
            geometry: None,
            processing_time: 0.0,
        }
    }

    /// Делает текущим ядро с заданным именем; предыдущее освобождается
    pub fn select_kernel(&mut self, name: &str) -> Result<()> {
        self.kernel = Some(self.program.select_kernel(name)?);
        Ok(())
    }

    pub fn set_geometry(&mut self, grid: usize, block: usize) {
        self.geometry = Some(Geometry::new(grid, block));
    }

    pub fn geometry(&self) -> Option<Geometry> {
        self.geometry
    }

    pub fn current_kernel(&self) -> Option<&str> {
        self.kernel.as_ref().map(Kernel::name)
    }

    /// Вычисляет C = A x B текущим ядром.
    ///
    /// Запись операндов, запуск и чтение результата выполняются строго
    /// последовательно; ожидание завершения не ограничено по времени.
    pub fn invoke(&mut self, a: &Matrix, b: &Matrix, c: &mut Matrix) -> Result<()> {
        let kernel = self.kernel.as_ref().ok_or(BenchError::NoKernelSelected)?;
        if a.cols() != b.rows() || c.rows() != a.rows() || c.cols() != b.cols() {
            return Err(BenchError::DimensionMismatch {
                lhs: (a.rows(), a.cols()),
                rhs: (b.rows(), b.cols()),
                out: (c.rows(), c.cols()),
            });
        }

        let device = self.program.device();
        let api = device.api();
        let context = device.context();
        let queue = device.queue();

        // Буферы устройства
        let a_buffer = Buffer::read_write(context, a.byte_size())?;
        let b_buffer = Buffer::read_write(context, b.byte_size())?;
        let c_buffer = Buffer::read_write(context, c.byte_size())?;

        // Операнды копируются до запуска
        queue.write_buffer(&a_buffer, a.as_slice())?;
        queue.write_buffer(&b_buffer, b.as_slice())?;

        kernel.set_arg_int(0, a.cols() as i32)?;
        kernel.set_arg_int(1, b.cols() as i32)?;
        kernel.set_arg_buffer(2, &a_buffer)?;
        kernel.set_arg_buffer(3, &b_buffer)?;
        kernel.set_arg_buffer(4, &c_buffer)?;

        let (global, local) = match self.geometry {
            Some(g) => (g.global_range(), Some(g.local_range())),
            None => ([c.cols(), c.rows()], None),
        };
        let local_ptr = local.as_ref().map_or(ptr::null(), |l| l.as_ptr());

        let mut raw_event: cl_event = ptr::null_mut();
        cl_check!(api.enqueue_nd_range_kernel(
            queue.raw(),
            kernel.raw(),
            2,
            ptr::null(),
            global.as_ptr(),
            local_ptr,
            0,
            ptr::null(),
            &mut raw_event
        ));
        let event = Event::from_raw(api, raw_event);
        event.wait()?;

        let elapsed = event.elapsed_ms()?;

        queue.finish()?;
        queue.read_buffer(&c_buffer, c.as_mut_slice())?;

        trace!(kernel = kernel.name(), ?global, ?local, elapsed_ms = elapsed, "kernel finished");
        self.processing_time = elapsed;
        Ok(())
    }

    /// Время последнего запуска в миллисекундах по меткам устройства
    pub fn processing_time(&self) -> f64 {
        self.processing_time
    }
}

impl MatmulDispatch for KernelInvoker<'_> {
    fn select_kernel(&mut self, name: &str) -> Result<()> {
        KernelInvoker::select_kernel(self, name)
    }

    fn set_geometry(&mut self, grid: usize, block: usize) {
        KernelInvoker::set_geometry(self, grid, block)
    }

    fn invoke(&mut self, a: &Matrix, b: &Matrix, c: &mut Matrix) -> Result<()> {
        KernelInvoker::invoke(self, a, b, c)
    }

    fn elapsed_ms(&self) -> f64 {
        self.processing_time()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_is_square() {
        let g = Geometry::new(512, 16);
        assert_eq!(g.global_range(), [512, 512]);
        assert_eq!(g.local_range(), [16, 16]);
    }
}
