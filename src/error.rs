//! Ошибки бенчмарка

use std::path::PathBuf;
use thiserror::Error;

use crate::opencl::types::cl_int;

/// Ошибки подготовки и выполнения бенчмарка.
///
/// Все варианты, кроме расхождения результатов, считаются фатальными:
/// бинарник печатает сообщение и завершается с кодом 1.
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("No OpenCL platforms found. Please ensure that OpenCL is installed ({0})")]
    NoPlatform(String),

    #[error("No OpenCL compatible devices found. Please check the OpenCL installation")]
    NoDevice,

    #[error("Failed to open the kernel file {path}: {source}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error building the CL sources:\n{log}")]
    BuildFailed { log: String },

    #[error("Failed to extract the kernel `{name}`")]
    KernelNotFound { name: String },

    #[error("No kernel selected")]
    NoKernelSelected,

    #[error("Operand dimensions do not match: {lhs:?} x {rhs:?} -> {out:?}")]
    DimensionMismatch {
        lhs: (usize, usize),
        rhs: (usize, usize),
        out: (usize, usize),
    },

    #[error("OpenCL call {call} failed with code {code}")]
    Cl { call: &'static str, code: cl_int },
}

pub type Result<T> = std::result::Result<T, BenchError>;
