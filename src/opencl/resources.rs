//! Владеющие обёртки над объектами OpenCL
//!
//! Каждый объект освобождается в `Drop`. OpenCL сам удерживает контекст,
//! пока на него ссылаются буферы, программы и очереди, поэтому порядок
//! освобождения не важен.

use super::bindings::OpenCl;
use super::types::*;
use super::utils::status;
use crate::error::Result;
use std::ffi::c_void;
use std::ptr;

/// Контекст выполнения, привязанный к одному устройству
pub struct Context {
    api: &'static OpenCl,
    raw: cl_context,
}

impl Context {
    pub fn new(api: &'static OpenCl, device: cl_device_id) -> Result<Self> {
        let raw = cl_create!(api.create_context(ptr::null(), 1, &device, None, ptr::null_mut()));
        Ok(Self { api, raw })
    }

    pub fn raw(&self) -> cl_context {
        self.raw
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        unsafe {
            (self.api.release_context)(self.raw);
        }
    }
}

/// Упорядоченная очередь команд с включённым профилированием
pub struct CommandQueue {
    api: &'static OpenCl,
    raw: cl_command_queue,
}

impl CommandQueue {
    pub fn with_profiling(context: &Context, device: cl_device_id) -> Result<Self> {
        let api = context.api;
        let raw = cl_create!(api.create_command_queue(
            context.raw,
            device,
            CL_QUEUE_PROFILING_ENABLE
        ));
        Ok(Self { api, raw })
    }

    pub fn raw(&self) -> cl_command_queue {
        self.raw
    }

    /// Блокирующая запись хост-данных в буфер устройства
    pub fn write_buffer(&self, buffer: &Buffer, data: &[f32]) -> Result<()> {
        let api = self.api;
        let bytes = std::mem::size_of_val(data).min(buffer.size);
        cl_check!(api.enqueue_write_buffer(
            self.raw,
            buffer.raw,
            CL_TRUE,
            0,
            bytes,
            data.as_ptr() as *const c_void,
            0,
            ptr::null(),
            ptr::null_mut()
        ));
        Ok(())
    }

    /// Блокирующее чтение буфера устройства в хост-память
    pub fn read_buffer(&self, buffer: &Buffer, data: &mut [f32]) -> Result<()> {
        let api = self.api;
        let bytes = std::mem::size_of_val(data).min(buffer.size);
        cl_check!(api.enqueue_read_buffer(
            self.raw,
            buffer.raw,
            CL_TRUE,
            0,
            bytes,
            data.as_mut_ptr() as *mut c_void,
            0,
            ptr::null(),
            ptr::null_mut()
        ));
        Ok(())
    }

    /// Дожидается завершения всех поставленных команд
    pub fn finish(&self) -> Result<()> {
        status("clFinish", unsafe { (self.api.finish)(self.raw) })
    }
}

impl Drop for CommandQueue {
    fn drop(&mut self) {
        unsafe {
            (self.api.release_command_queue)(self.raw);
        }
    }
}

/// Буфер в памяти устройства
pub struct Buffer {
    api: &'static OpenCl,
    raw: cl_mem,
    size: usize,
}

impl Buffer {
    /// Выделяет буфер чтения-записи размером `size` байт
    pub fn read_write(context: &Context, size: usize) -> Result<Self> {
        let api = context.api;
        // Буфер нулевого размера недопустим в OpenCL
        let alloc = size.max(std::mem::size_of::<f32>());
        let raw = cl_create!(api.create_buffer(
            context.raw,
            CL_MEM_READ_WRITE,
            alloc,
            ptr::null_mut()
        ));
        Ok(Self { api, raw, size })
    }

    pub fn raw(&self) -> cl_mem {
        self.raw
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            (self.api.release_mem_object)(self.raw);
        }
    }
}

/// Событие завершения команды с метками профилирования
pub struct Event {
    api: &'static OpenCl,
    raw: cl_event,
}

impl Event {
    /// Принимает владение событием, возвращённым из enqueue-вызова
    pub(crate) fn from_raw(api: &'static OpenCl, raw: cl_event) -> Self {
        Self { api, raw }
    }

    /// Ждёт завершения команды без ограничения по времени
    pub fn wait(&self) -> Result<()> {
        status("clWaitForEvents", unsafe { (self.api.wait_for_events)(1, &self.raw) })
    }

    /// Метка времени устройства в наносекундах
    pub fn profiling(&self, param: cl_profiling_info) -> Result<cl_ulong> {
        let api = self.api;
        let mut value: cl_ulong = 0;
        cl_check!(api.get_event_profiling_info(
            self.raw,
            param,
            std::mem::size_of::<cl_ulong>(),
            &mut value as *mut cl_ulong as *mut c_void,
            ptr::null_mut()
        ));
        Ok(value)
    }

    /// Время выполнения команды в миллисекундах
    pub fn elapsed_ms(&self) -> Result<f64> {
        let start = self.profiling(CL_PROFILING_COMMAND_START)?;
        let end = self.profiling(CL_PROFILING_COMMAND_END)?;
        Ok(profiling_delta_ms(start, end))
    }
}

/// Разность меток профилирования (нс) в миллисекундах; обратный порядок даёт 0
pub fn profiling_delta_ms(start: cl_ulong, end: cl_ulong) -> f64 {
    end.saturating_sub(start) as f64 / 1e6
}

impl Drop for Event {
    fn drop(&mut self) {
        unsafe {
            (self.api.release_event)(self.raw);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiling_delta_is_converted_to_milliseconds() {
        assert_eq!(profiling_delta_ms(1_000, 1_501_000), 1.5);
        assert_eq!(profiling_delta_ms(0, 20_000_000), 20.0);
    }

    #[test]
    fn equal_or_reversed_stamps_give_zero() {
        assert_eq!(profiling_delta_ms(42, 42), 0.0);
        assert_eq!(profiling_delta_ms(2_000_000, 1_000_000), 0.0);
    }
}
