//! Модуль для работы с OpenCL
//!
//! Содержит низкоуровневые привязки и безопасные обертки для OpenCL

pub mod bindings;
pub mod types;
pub mod utils;
pub mod resources;
pub mod device;
pub mod program;
pub mod invoker;

pub use device::{ComputeDevice, DeviceInfo};
pub use invoker::{Geometry, KernelInvoker};
pub use program::{Kernel, KernelProgram, KernelSources};
