//! Выбор вычислительного устройства, контекст и очередь команд

use super::bindings::{api, OpenCl};
use super::resources::{CommandQueue, Context};
use super::types::*;
use super::utils::{device_info_scalar, device_info_sizes, device_info_string};
use crate::error::{BenchError, Result};
use std::fmt;
use std::ptr;
use tracing::{debug, info, warn};

/// Выбранное устройство вместе с контекстом и профилирующей очередью.
///
/// Создаётся один раз на сессию бенчмарка и используется последовательно
/// всеми вариантами ядер.
pub struct ComputeDevice {
    api: &'static OpenCl,
    device: cl_device_id,
    context: Context,
    queue: CommandQueue,
}

impl ComputeDevice {
    /// Находит первый GPU (порядок платформ, затем порядок устройств),
    /// иначе берёт устройство по умолчанию первой платформы.
    pub fn acquire() -> Result<Self> {
        let api = api()?;
        let platforms = platform_ids(api)?;
        if platforms.is_empty() {
            return Err(BenchError::NoPlatform("the ICD loader reports zero platforms".into()));
        }

        let mut gpus = Vec::new();
        for &platform in &platforms {
            let devices = device_ids(api, platform, CL_DEVICE_TYPE_GPU)?;
            debug!(gpus = devices.len(), "scanned OpenCL platform");
            gpus.extend(devices);
        }

        let device = match gpus.first() {
            Some(&gpu) => gpu,
            None => {
                warn!("no GPU found, falling back to the default device");
                device_ids(api, platforms[0], CL_DEVICE_TYPE_DEFAULT)?
                    .first()
                    .copied()
                    .ok_or(BenchError::NoDevice)?
            }
        };

        let context = Context::new(api, device)?;
        let queue = CommandQueue::with_profiling(&context, device)?;

        let name = device_info_string(api, device, CL_DEVICE_NAME).unwrap_or_default();
        info!(device = %name, "selected OpenCL device");

        Ok(Self {
            api,
            device,
            context,
            queue,
        })
    }

    /// Свойства устройства для информационного вывода
    pub fn describe(&self) -> Result<DeviceInfo> {
        let api = self.api;
        let device = self.device;
        Ok(DeviceInfo {
            name: device_info_string(api, device, CL_DEVICE_NAME)?,
            vendor: device_info_string(api, device, CL_DEVICE_VENDOR)?,
            compute_units: device_info_scalar::<cl_uint>(api, device, CL_DEVICE_MAX_COMPUTE_UNITS)?,
            max_work_item_sizes: device_info_sizes(api, device, CL_DEVICE_MAX_WORK_ITEM_SIZES)?,
            max_work_group_size: device_info_scalar::<usize>(
                api,
                device,
                CL_DEVICE_MAX_WORK_GROUP_SIZE,
            )?,
            global_mem_size: device_info_scalar::<cl_ulong>(
                api,
                device,
                CL_DEVICE_GLOBAL_MEM_SIZE,
            )?,
            local_mem_size: device_info_scalar::<cl_ulong>(api, device, CL_DEVICE_LOCAL_MEM_SIZE)?,
            max_constant_args: device_info_scalar::<cl_uint>(
                api,
                device,
                CL_DEVICE_MAX_CONSTANT_ARGS,
            )?,
        })
    }

    pub fn api(&self) -> &'static OpenCl {
        self.api
    }

    pub fn raw(&self) -> cl_device_id {
        self.device
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }
}

fn platform_ids(api: &OpenCl) -> Result<Vec<cl_platform_id>> {
    let mut count: cl_uint = 0;
    let code = unsafe { (api.get_platform_ids)(0, ptr::null_mut(), &mut count) };
    // ICD-загрузчик без установленных драйверов отвечает CL_PLATFORM_NOT_FOUND_KHR
    if code == CL_PLATFORM_NOT_FOUND_KHR || count == 0 {
        return Ok(Vec::new());
    }
    if code != CL_SUCCESS {
        return Err(BenchError::Cl { call: "get_platform_ids", code });
    }

    let mut platforms = vec![ptr::null_mut(); count as usize];
    cl_check!(api.get_platform_ids(count, platforms.as_mut_ptr(), ptr::null_mut()));
    Ok(platforms)
}

fn device_ids(
    api: &OpenCl,
    platform: cl_platform_id,
    device_type: cl_device_type,
) -> Result<Vec<cl_device_id>> {
    let mut count: cl_uint = 0;
    let code =
        unsafe { (api.get_device_ids)(platform, device_type, 0, ptr::null_mut(), &mut count) };
    if code == CL_DEVICE_NOT_FOUND || count == 0 {
        return Ok(Vec::new());
    }
    if code != CL_SUCCESS {
        return Err(BenchError::Cl { call: "get_device_ids", code });
    }

    let mut devices = vec![ptr::null_mut(); count as usize];
    cl_check!(api.get_device_ids(
        platform,
        device_type,
        count,
        devices.as_mut_ptr(),
        ptr::null_mut()
    ));
    Ok(devices)
}

/// Характеристики устройства. Только для вывода, на выбор не влияют.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    pub name: String,
    pub vendor: String,
    pub compute_units: u32,
    pub max_work_item_sizes: Vec<usize>,
    pub max_work_group_size: usize,
    pub global_mem_size: u64,
    pub local_mem_size: u64,
    pub max_constant_args: u32,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ranges = self
            .max_work_item_sizes
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(":");

        writeln!(f, " {}", "-".repeat(46))?;
        writeln!(f, " Device used           : {}", self.name)?;
        writeln!(f, " Vendor                : {}", self.vendor)?;
        writeln!(f, " Compute Units         : {}", self.compute_units)?;
        writeln!(f, " Max Work Group Ranges : [{}]", ranges)?;
        writeln!(f, " Max Work Group Size   : {}", self.max_work_group_size)?;
        writeln!(f, " Global Cache Size     : {} GB", self.global_mem_size as f64 / 1e9)?;
        writeln!(f, " Local Cache Size      : {} KB", self.local_mem_size as f64 / 1e3)?;
        writeln!(f, " Constants per Kernel  : {}", self.max_constant_args)?;
        write!(f, " {}", "-".repeat(46))
    }
}
