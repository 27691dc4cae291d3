//! Вспомогательные функции для OpenCL

use super::bindings::OpenCl;
use super::types::*;
use crate::error::{BenchError, Result};
use std::ffi::{c_void, CString};
use std::ptr;

/// Преобразует строку в null-terminated строку для C
pub fn to_c_string(s: &str) -> CString {
    // Внутренние нули обрезают имя так же, как это сделал бы C-код
    let bytes: Vec<u8> = s.bytes().take_while(|&b| b != 0).collect();
    CString::new(bytes).unwrap_or_default()
}

/// Читает строковое свойство устройства
pub fn device_info_string(
    api: &OpenCl,
    device: cl_device_id,
    param: cl_device_info,
) -> Result<String> {
    let mut size = 0usize;
    cl_check!(api.get_device_info(device, param, 0, ptr::null_mut(), &mut size));

    let mut raw = vec![0u8; size];
    cl_check!(api.get_device_info(
        device,
        param,
        size,
        raw.as_mut_ptr() as *mut c_void,
        ptr::null_mut()
    ));

    Ok(trim_c_string(&raw))
}

/// Читает скалярное свойство устройства (cl_uint, cl_ulong, size_t)
pub fn device_info_scalar<T: Copy + Default>(
    api: &OpenCl,
    device: cl_device_id,
    param: cl_device_info,
) -> Result<T> {
    let mut value = T::default();
    cl_check!(api.get_device_info(
        device,
        param,
        std::mem::size_of::<T>(),
        &mut value as *mut T as *mut c_void,
        ptr::null_mut()
    ));
    Ok(value)
}

/// Читает свойство-массив size_t (например, CL_DEVICE_MAX_WORK_ITEM_SIZES)
pub fn device_info_sizes(
    api: &OpenCl,
    device: cl_device_id,
    param: cl_device_info,
) -> Result<Vec<usize>> {
    let mut size = 0usize;
    cl_check!(api.get_device_info(device, param, 0, ptr::null_mut(), &mut size));

    let mut values = vec![0usize; size / std::mem::size_of::<usize>()];
    cl_check!(api.get_device_info(
        device,
        param,
        values.len() * std::mem::size_of::<usize>(),
        values.as_mut_ptr() as *mut c_void,
        ptr::null_mut()
    ));
    Ok(values)
}

/// Получает лог компиляции программы для устройства
pub fn build_log(api: &OpenCl, program: cl_program, device: cl_device_id) -> Result<String> {
    let mut log_size = 0usize;
    cl_check!(api.get_program_build_info(
        program,
        device,
        CL_PROGRAM_BUILD_LOG,
        0,
        ptr::null_mut(),
        &mut log_size
    ));

    let mut log = vec![0u8; log_size];
    cl_check!(api.get_program_build_info(
        program,
        device,
        CL_PROGRAM_BUILD_LOG,
        log_size,
        log.as_mut_ptr() as *mut c_void,
        ptr::null_mut()
    ));

    Ok(trim_c_string(&log))
}

/// Превращает код возврата в `BenchError::Cl`
pub fn status(call: &'static str, code: cl_int) -> Result<()> {
    if code == CL_SUCCESS {
        Ok(())
    } else {
        Err(BenchError::Cl { call, code })
    }
}

fn trim_c_string(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}
