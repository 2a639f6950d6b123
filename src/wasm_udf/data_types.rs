use std::fmt;

use arrow_schema::DataType;
use itertools::Itertools;
use strum_macros::{Display, EnumString};

use super::{WasmUdfError, WasmUdfResult};

/// Scalar kinds a UDF can accept and return.
///
/// The single-character codes are persisted in the metastore and have to stay stable.
#[derive(Debug, Display, EnumString, Clone, Copy, PartialEq, Eq, Hash)]
#[strum(serialize_all = "lowercase")]
pub enum WasmType {
    I64,
    F64,
}

impl WasmType {
    pub const fn code(self) -> char {
        match self {
            WasmType::I64 => 'I',
            WasmType::F64 => 'F',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'I' => Some(WasmType::I64),
            'F' => Some(WasmType::F64),
            _ => None,
        }
    }

    pub fn arrow_type(self) -> DataType {
        match self {
            WasmType::I64 => DataType::Int64,
            WasmType::F64 => DataType::Float64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionSignature {
    pub return_type: WasmType,
    pub param_types: Vec<WasmType>,
}

impl FunctionSignature {
    pub fn new(return_type: WasmType, param_types: Vec<WasmType>) -> Self {
        Self {
            return_type,
            param_types,
        }
    }

    pub fn arity(&self) -> usize {
        self.param_types.len()
    }

    /// Encode into the persisted form: one code for the return type and
    /// one code per parameter, in declaration order.
    pub fn serialize(&self) -> (char, String) {
        (
            self.return_type.code(),
            self.param_types.iter().map(|t| t.code()).collect(),
        )
    }

    pub fn serialize_return(&self) -> String {
        self.return_type.code().to_string()
    }

    pub fn serialize_params(&self) -> String {
        self.serialize().1
    }

    pub fn deserialize(return_code: &str, param_codes: &str) -> WasmUdfResult<Self> {
        let invalid = || WasmUdfError::InvalidSignatureEncoding {
            encoded: format!("{return_code}:{param_codes}"),
        };

        let mut chars = return_code.chars();
        let return_type = match (chars.next(), chars.next()) {
            (Some(code), None) => WasmType::from_code(code).ok_or_else(invalid)?,
            _ => return Err(invalid()),
        };

        let param_types = param_codes
            .chars()
            .map(|c| WasmType::from_code(c).ok_or_else(invalid))
            .collect::<WasmUdfResult<Vec<_>>>()?;

        Ok(Self {
            return_type,
            param_types,
        })
    }
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}) -> {}",
            self.param_types.iter().join(", "),
            self.return_type
        )
    }
}

/// A single scalar value flowing in or out of a UDF call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Datum {
    Integer(i64),
    Float(f64),
    Null,
}

impl Datum {
    /// The WASM kind of this value; `None` for SQL NULL.
    pub fn kind(&self) -> Option<WasmType> {
        match self {
            Datum::Integer(_) => Some(WasmType::I64),
            Datum::Float(_) => Some(WasmType::F64),
            Datum::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    pub(crate) fn describe(&self) -> String {
        match self.kind() {
            Some(kind) => kind.to_string(),
            None => "null".to_string(),
        }
    }
}

impl From<i64> for Datum {
    fn from(value: i64) -> Self {
        Datum::Integer(value)
    }
}

impl From<f64> for Datum {
    fn from(value: f64) -> Self {
        Datum::Float(value)
    }
}

impl<T: Into<Datum>> From<Option<T>> for Datum {
    fn from(value: Option<T>) -> Self {
        value.map_or(Datum::Null, Into::into)
    }
}
