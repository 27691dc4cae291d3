//! Низкоуровневые привязки к OpenCL API
//!
//! Функции разрешаются из ICD-загрузчика во время выполнения, поэтому
//! отсутствие драйвера превращается в `BenchError::NoPlatform`, а не в
//! ошибку компоновки.

use super::types::*;
use crate::error::{BenchError, Result};
use libloading::Library;
use std::ffi::{c_char, c_void};
use std::sync::OnceLock;
use tracing::debug;

#[cfg(target_os = "linux")]
const LIBRARY_NAMES: &[&str] = &["libOpenCL.so.1", "libOpenCL.so"];
#[cfg(target_os = "macos")]
const LIBRARY_NAMES: &[&str] = &["/System/Library/Frameworks/OpenCL.framework/OpenCL"];
#[cfg(target_os = "windows")]
const LIBRARY_NAMES: &[&str] = &["OpenCL.dll"];
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
const LIBRARY_NAMES: &[&str] = &["libOpenCL.so"];

pub type ClGetPlatformIds = unsafe extern "C" fn(
    num_entries: cl_uint,
    platforms: *mut cl_platform_id,
    num_platforms: *mut cl_uint,
) -> cl_int;

pub type ClGetDeviceIds = unsafe extern "C" fn(
    platform: cl_platform_id,
    device_type: cl_device_type,
    num_entries: cl_uint,
    devices: *mut cl_device_id,
    num_devices: *mut cl_uint,
) -> cl_int;

pub type ClGetDeviceInfo = unsafe extern "C" fn(
    device: cl_device_id,
    param_name: cl_device_info,
    param_value_size: usize,
    param_value: *mut c_void,
    param_value_size_ret: *mut usize,
) -> cl_int;

pub type ClCreateContext = unsafe extern "C" fn(
    properties: *const cl_context_properties,
    num_devices: cl_uint,
    devices: *const cl_device_id,
    pfn_notify: Option<unsafe extern "C" fn(*const c_char, *const c_void, usize, *mut c_void)>,
    user_data: *mut c_void,
    errcode_ret: *mut cl_int,
) -> cl_context;

pub type ClCreateCommandQueue = unsafe extern "C" fn(
    context: cl_context,
    device: cl_device_id,
    properties: cl_command_queue_properties,
    errcode_ret: *mut cl_int,
) -> cl_command_queue;

pub type ClCreateProgramWithSource = unsafe extern "C" fn(
    context: cl_context,
    count: cl_uint,
    strings: *const *const c_char,
    lengths: *const usize,
    errcode_ret: *mut cl_int,
) -> cl_program;

pub type ClBuildProgram = unsafe extern "C" fn(
    program: cl_program,
    num_devices: cl_uint,
    device_list: *const cl_device_id,
    options: *const c_char,
    pfn_notify: Option<unsafe extern "C" fn(cl_program, *mut c_void)>,
    user_data: *mut c_void,
) -> cl_int;

pub type ClGetProgramBuildInfo = unsafe extern "C" fn(
    program: cl_program,
    device: cl_device_id,
    param_name: cl_program_build_info,
    param_value_size: usize,
    param_value: *mut c_void,
    param_value_size_ret: *mut usize,
) -> cl_int;

pub type ClCreateKernel = unsafe extern "C" fn(
    program: cl_program,
    kernel_name: *const c_char,
    errcode_ret: *mut cl_int,
) -> cl_kernel;

pub type ClSetKernelArg = unsafe extern "C" fn(
    kernel: cl_kernel,
    arg_index: cl_uint,
    arg_size: usize,
    arg_value: *const c_void,
) -> cl_int;

pub type ClCreateBuffer = unsafe extern "C" fn(
    context: cl_context,
    flags: cl_mem_flags,
    size: usize,
    host_ptr: *mut c_void,
    errcode_ret: *mut cl_int,
) -> cl_mem;

pub type ClEnqueueWriteBuffer = unsafe extern "C" fn(
    command_queue: cl_command_queue,
    buffer: cl_mem,
    blocking_write: cl_bool,
    offset: usize,
    size: usize,
    ptr: *const c_void,
    num_events_in_wait_list: cl_uint,
    event_wait_list: *const cl_event,
    event: *mut cl_event,
) -> cl_int;

pub type ClEnqueueReadBuffer = unsafe extern "C" fn(
    command_queue: cl_command_queue,
    buffer: cl_mem,
    blocking_read: cl_bool,
    offset: usize,
    size: usize,
    ptr: *mut c_void,
    num_events_in_wait_list: cl_uint,
    event_wait_list: *const cl_event,
    event: *mut cl_event,
) -> cl_int;

pub type ClEnqueueNdRangeKernel = unsafe extern "C" fn(
    command_queue: cl_command_queue,
    kernel: cl_kernel,
    work_dim: cl_uint,
    global_work_offset: *const usize,
    global_work_size: *const usize,
    local_work_size: *const usize,
    num_events_in_wait_list: cl_uint,
    event_wait_list: *const cl_event,
    event: *mut cl_event,
) -> cl_int;

pub type ClWaitForEvents =
    unsafe extern "C" fn(num_events: cl_uint, event_list: *const cl_event) -> cl_int;

pub type ClGetEventProfilingInfo = unsafe extern "C" fn(
    event: cl_event,
    param_name: cl_profiling_info,
    param_value_size: usize,
    param_value: *mut c_void,
    param_value_size_ret: *mut usize,
) -> cl_int;

pub type ClFinish = unsafe extern "C" fn(command_queue: cl_command_queue) -> cl_int;

pub type ClReleaseMemObject = unsafe extern "C" fn(memobj: cl_mem) -> cl_int;
pub type ClReleaseKernel = unsafe extern "C" fn(kernel: cl_kernel) -> cl_int;
pub type ClReleaseProgram = unsafe extern "C" fn(program: cl_program) -> cl_int;
pub type ClReleaseEvent = unsafe extern "C" fn(event: cl_event) -> cl_int;
pub type ClReleaseCommandQueue = unsafe extern "C" fn(command_queue: cl_command_queue) -> cl_int;
pub type ClReleaseContext = unsafe extern "C" fn(context: cl_context) -> cl_int;

/// Таблица точек входа OpenCL, разрешённых из загруженной библиотеки
pub struct OpenCl {
    _lib: Library,
    pub get_platform_ids: ClGetPlatformIds,
    pub get_device_ids: ClGetDeviceIds,
    pub get_device_info: ClGetDeviceInfo,
    pub create_context: ClCreateContext,
    pub create_command_queue: ClCreateCommandQueue,
    pub create_program_with_source: ClCreateProgramWithSource,
    pub build_program: ClBuildProgram,
    pub get_program_build_info: ClGetProgramBuildInfo,
    pub create_kernel: ClCreateKernel,
    pub set_kernel_arg: ClSetKernelArg,
    pub create_buffer: ClCreateBuffer,
    pub enqueue_write_buffer: ClEnqueueWriteBuffer,
    pub enqueue_read_buffer: ClEnqueueReadBuffer,
    pub enqueue_nd_range_kernel: ClEnqueueNdRangeKernel,
    pub wait_for_events: ClWaitForEvents,
    pub get_event_profiling_info: ClGetEventProfilingInfo,
    pub finish: ClFinish,
    pub release_mem_object: ClReleaseMemObject,
    pub release_kernel: ClReleaseKernel,
    pub release_program: ClReleaseProgram,
    pub release_event: ClReleaseEvent,
    pub release_command_queue: ClReleaseCommandQueue,
    pub release_context: ClReleaseContext,
}

static API: OnceLock<std::result::Result<OpenCl, String>> = OnceLock::new();

/// Возвращает таблицу функций, загружая библиотеку при первом обращении
pub fn api() -> Result<&'static OpenCl> {
    API.get_or_init(OpenCl::load)
        .as_ref()
        .map_err(|e| BenchError::NoPlatform(e.clone()))
}

/// Проверяет, доступен ли ICD-загрузчик OpenCL
pub fn runtime_available() -> bool {
    api().is_ok()
}

unsafe fn symbol<T: Copy>(lib: &Library, name: &[u8]) -> std::result::Result<T, libloading::Error> {
    Ok(*lib.get::<T>(name)?)
}

impl OpenCl {
    fn load() -> std::result::Result<Self, String> {
        let mut last_error = String::from("no candidate library names");
        for name in LIBRARY_NAMES {
            match unsafe { Library::new(name) } {
                Ok(lib) => {
                    debug!(library = *name, "loaded OpenCL ICD loader");
                    return unsafe { Self::resolve(lib) }
                        .map_err(|e| format!("{name}: {e}"));
                }
                Err(e) => last_error = format!("{name}: {e}"),
            }
        }
        Err(last_error)
    }

    unsafe fn resolve(lib: Library) -> std::result::Result<Self, libloading::Error> {
        Ok(Self {
            get_platform_ids: symbol(&lib, b"clGetPlatformIDs\0")?,
            get_device_ids: symbol(&lib, b"clGetDeviceIDs\0")?,
            get_device_info: symbol(&lib, b"clGetDeviceInfo\0")?,
            create_context: symbol(&lib, b"clCreateContext\0")?,
            create_command_queue: symbol(&lib, b"clCreateCommandQueue\0")?,
            create_program_with_source: symbol(&lib, b"clCreateProgramWithSource\0")?,
            build_program: symbol(&lib, b"clBuildProgram\0")?,
            get_program_build_info: symbol(&lib, b"clGetProgramBuildInfo\0")?,
            create_kernel: symbol(&lib, b"clCreateKernel\0")?,
            set_kernel_arg: symbol(&lib, b"clSetKernelArg\0")?,
            create_buffer: symbol(&lib, b"clCreateBuffer\0")?,
            enqueue_write_buffer: symbol(&lib, b"clEnqueueWriteBuffer\0")?,
            enqueue_read_buffer: symbol(&lib, b"clEnqueueReadBuffer\0")?,
            enqueue_nd_range_kernel: symbol(&lib, b"clEnqueueNDRangeKernel\0")?,
            wait_for_events: symbol(&lib, b"clWaitForEvents\0")?,
            get_event_profiling_info: symbol(&lib, b"clGetEventProfilingInfo\0")?,
            finish: symbol(&lib, b"clFinish\0")?,
            release_mem_object: symbol(&lib, b"clReleaseMemObject\0")?,
            release_kernel: symbol(&lib, b"clReleaseKernel\0")?,
            release_program: symbol(&lib, b"clReleaseProgram\0")?,
            release_event: symbol(&lib, b"clReleaseEvent\0")?,
            release_command_queue: symbol(&lib, b"clReleaseCommandQueue\0")?,
            release_context: symbol(&lib, b"clReleaseContext\0")?,
            _lib: lib,
        })
    }
}
