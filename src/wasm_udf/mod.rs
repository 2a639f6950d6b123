use datafusion_common::DataFusionError;
use strum_macros::Display;

use crate::wasm_udf::data_types::WasmType;

pub mod data_types;
pub mod runtime;
pub mod signature;
pub mod wasm;

/// Name of the export every UDF module has to provide.
pub const ENTRYPOINT: &str = "udf_main";

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum ReturnShape {
    Void,
    Multi,
}

#[derive(Debug, thiserror::Error)]
pub enum WasmUdfError {
    #[error("Invalid WASM bytecode: {reason}")]
    InvalidBytecode { reason: String },

    #[error("UDF entry function {:?} not found", ENTRYPOINT)]
    EntryNotFound,

    #[error("Unsupported return shape: {0}")]
    UnsupportedReturn(ReturnShape),

    #[error("Unsupported WASM data type {0}")]
    UnsupportedType(String),

    #[error("Invalid signature encoding {encoded:?}")]
    InvalidSignatureEncoding { encoded: String },

    #[error(
        "Persisted signature {persisted} doesn't match the module's entry point signature {actual}"
    )]
    SignatureMismatch { persisted: String, actual: String },

    #[error("Incorrect parameter count in the call to {name:?}: expected {expected}, got {actual}")]
    IncorrectParameterCount {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Type mismatch in {context}: expected {expected}, got {actual}")]
    TypeMismatch {
        context: &'static str,
        expected: WasmType,
        actual: String,
    },

    #[error("Error executing function {name:?}: {reason}")]
    ExecutionFault { name: String, reason: String },
}

pub type WasmUdfResult<T> = Result<T, WasmUdfError>;

impl From<WasmUdfError> for DataFusionError {
    fn from(val: WasmUdfError) -> Self {
        match val {
            WasmUdfError::ExecutionFault { .. } => {
                DataFusionError::Execution(val.to_string())
            }
            WasmUdfError::TypeMismatch { .. } => DataFusionError::Internal(val.to_string()),
            _ => DataFusionError::Plan(val.to_string()),
        }
    }
}
