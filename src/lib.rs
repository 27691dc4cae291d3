//! Бенчмарк вариантов ядер матричного умножения на OpenCL

// Макросы объявлены до модулей, чтобы быть видимыми в них
#[macro_use]
mod macros {
    /// Вызывает функцию OpenCL и возвращает `BenchError::Cl`, если код
    /// возврата не `CL_SUCCESS`
    #[macro_export]
    macro_rules! cl_check {
        ($api:ident . $func:ident ( $($arg:expr),* $(,)? )) => {{
            let code = unsafe { ($api.$func)($($arg),*) };
            if code != $crate::opencl::types::CL_SUCCESS {
                return Err($crate::error::BenchError::Cl { call: stringify!($func), code }.into());
            }
        }};
    }

    /// Создаёт объект OpenCL. Последний аргумент `errcode_ret`
    /// подставляется автоматически; нулевой указатель или код ошибки
    /// превращаются в `BenchError::Cl`
    #[macro_export]
    macro_rules! cl_create {
        ($api:ident . $func:ident ( $($arg:expr),* $(,)? )) => {{
            let mut code: $crate::opencl::types::cl_int = $crate::opencl::types::CL_SUCCESS;
            let obj = unsafe { ($api.$func)($($arg,)* &mut code) };
            if obj.is_null() || code != $crate::opencl::types::CL_SUCCESS {
                return Err($crate::error::BenchError::Cl { call: stringify!($func), code }.into());
            }
            obj
        }};
    }
}

pub mod args;
pub mod bench;
pub mod error;
pub mod matrix;
pub mod opencl;
pub mod utils;

// Реэкспорт основных типов для удобства
pub use args::{BenchConfig, CliArgs};
pub use bench::{BenchReport, BenchmarkDriver, MatmulDispatch, Operands, VariantResult};
pub use error::{BenchError, Result};
pub use matrix::{default_variants, KernelVariant, Matrix};
pub use opencl::{ComputeDevice, DeviceInfo, KernelInvoker, KernelProgram};
