//! Сборка программы из исходников ядер и извлечение ядер по имени

use super::bindings::OpenCl;
use super::device::ComputeDevice;
use super::resources::Buffer;
use super::types::*;
use super::utils::{build_log, status, to_c_string};
use crate::error::{BenchError, Result};
use std::ffi::{c_char, c_void};
use std::fs;
use std::path::{Path, PathBuf};
use std::ptr;
use tracing::{debug, info};

/// Накопленный текст исходников ядер.
///
/// Файлы дописываются в конец в порядке загрузки, поэтому общие
/// константы можно загрузить раньше тел ядер.
#[derive(Debug, Default, Clone)]
pub struct KernelSources {
    text: String,
    files: Vec<PathBuf>,
}

impl KernelSources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Читает файл целиком и дописывает его к накопленному тексту
    pub fn append_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| BenchError::SourceUnreadable {
            path: path.to_path_buf(),
            source,
        })?;
        self.append_str(&text);
        self.files.push(path.to_path_buf());
        debug!(path = %path.display(), bytes = text.len(), "appended kernel source");
        Ok(())
    }

    pub fn append_str(&mut self, text: &str) {
        self.text.push_str(text);
        if !text.ends_with('\n') {
            self.text.push('\n');
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Скомпилированная программа OpenCL
struct Program {
    api: &'static OpenCl,
    raw: cl_program,
}

impl Drop for Program {
    fn drop(&mut self) {
        unsafe {
            (self.api.release_program)(self.raw);
        }
    }
}

/// Программа, собираемая из накопленных исходников
pub struct KernelProgram<'d> {
    device: &'d ComputeDevice,
    sources: KernelSources,
    program: Option<Program>,
}

impl<'d> KernelProgram<'d> {
    pub fn new(device: &'d ComputeDevice) -> Self {
        Self {
            device,
            sources: KernelSources::new(),
            program: None,
        }
    }

    /// Дописывает файл к исходникам и пересобирает всю программу.
    ///
    /// После каждого успешного вызова программа валидна. Ошибка чтения
    /// возвращается до любой попытки компиляции.
    pub fn load_source(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.sources.append_file(path)?;
        self.build()
    }

    /// Дописывает текст без пересборки; собрать можно позже через `build`
    pub fn append_source(&mut self, text: &str) {
        self.sources.append_str(text);
    }

    /// Компилирует весь накопленный текст заново
    pub fn build(&mut self) -> Result<()> {
        let api = self.device.api();
        let device = self.device.raw();

        let source = self.sources.as_str();
        let source_ptr = source.as_ptr() as *const c_char;
        let source_len = source.len();
        let raw = cl_create!(api.create_program_with_source(
            self.device.context().raw(),
            1,
            &source_ptr,
            &source_len
        ));
        let program = Program { api, raw };

        let code =
            unsafe { (api.build_program)(raw, 1, &device, ptr::null(), None, ptr::null_mut()) };
        if code != CL_SUCCESS {
            let log = build_log(api, raw, device)
                .unwrap_or_else(|e| format!("<build log unavailable: {e}>"));
            return Err(BenchError::BuildFailed { log });
        }

        info!(
            files = self.sources.files().len(),
            bytes = source_len,
            "built kernel program"
        );
        self.program = Some(program);
        Ok(())
    }

    /// Извлекает точку входа с заданным именем из собранной программы
    pub fn select_kernel(&self, name: &str) -> Result<Kernel> {
        let program = self.program.as_ref().ok_or_else(|| BenchError::KernelNotFound {
            name: name.to_string(),
        })?;
        let api = program.api;
        let c_name = to_c_string(name);

        let mut code: cl_int = CL_SUCCESS;
        let raw = unsafe { (api.create_kernel)(program.raw, c_name.as_ptr(), &mut code) };
        if raw.is_null() || code != CL_SUCCESS {
            debug!(kernel = name, code, "kernel lookup failed");
            return Err(BenchError::KernelNotFound {
                name: name.to_string(),
            });
        }

        Ok(Kernel {
            api,
            raw,
            name: name.to_string(),
        })
    }

    pub fn device(&self) -> &'d ComputeDevice {
        self.device
    }

    pub fn sources(&self) -> &KernelSources {
        &self.sources
    }

    pub fn is_built(&self) -> bool {
        self.program.is_some()
    }
}

/// Ядро, извлечённое из программы
pub struct Kernel {
    api: &'static OpenCl,
    raw: cl_kernel,
    name: String,
}

impl Kernel {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn raw(&self) -> cl_kernel {
        self.raw
    }

    /// Устанавливает скалярный аргумент int
    pub fn set_arg_int(&self, index: u32, value: i32) -> Result<()> {
        let code = unsafe {
            (self.api.set_kernel_arg)(
                self.raw,
                index,
                std::mem::size_of::<i32>(),
                &value as *const i32 as *const c_void,
            )
        };
        status("set_kernel_arg", code)
    }

    /// Устанавливает аргумент-буфер
    pub fn set_arg_buffer(&self, index: u32, buffer: &Buffer) -> Result<()> {
        let mem = buffer.raw();
        let code = unsafe {
            (self.api.set_kernel_arg)(
                self.raw,
                index,
                std::mem::size_of::<cl_mem>(),
                &mem as *const cl_mem as *const c_void,
            )
        };
        status("set_kernel_arg", code)
    }
}

impl Drop for Kernel {
    fn drop(&mut self) {
        unsafe {
            (self.api.release_kernel)(self.raw);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn sources_accumulate_in_load_order() {
        let mut constants = tempfile::NamedTempFile::new().unwrap();
        writeln!(constants, "#define TS 16").unwrap();
        let mut kernels = tempfile::NamedTempFile::new().unwrap();
        write!(kernels, "__kernel void K() {{}}").unwrap();

        let mut sources = KernelSources::new();
        sources.append_file(constants.path()).unwrap();
        sources.append_file(kernels.path()).unwrap();

        assert_eq!(sources.as_str(), "#define TS 16\n__kernel void K() {}\n");
        assert_eq!(
            sources.files(),
            &[constants.path().to_path_buf(), kernels.path().to_path_buf()]
        );
    }

    #[test]
    fn missing_file_is_source_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.cl");

        let mut sources = KernelSources::new();
        sources.append_str("#define KEEP 1");
        let err = sources.append_file(&missing).unwrap_err();

        match err {
            BenchError::SourceUnreadable { path, .. } => assert_eq!(path, missing),
            other => panic!("unexpected error: {other}"),
        }
        // Накопленный текст не меняется
        assert_eq!(sources.as_str(), "#define KEEP 1\n");
        assert!(sources.files().is_empty());
    }
}
