//! Binding UDF calls into row-at-a-time expression trees.
//!
//! A call is resolved against the catalog once, when the expression is built. The
//! result is tagged with the function's return kind, so evaluating a row never has to
//! look at the signature again.
use std::fmt;
use std::sync::Arc;

use crate::catalog::functions::{CatalogHandle, FunctionEntry};
use crate::catalog::{CatalogError, CatalogResult};
use crate::wasm_udf::data_types::{Datum, WasmType};
use crate::wasm_udf::runtime::WasmRuntime;
use crate::wasm_udf::wasm::{invoke_float, invoke_int};
use crate::wasm_udf::{WasmUdfError, WasmUdfResult};

pub trait RowExpr: fmt::Debug + Send + Sync {
    fn evaluate(&self, row: &[Datum]) -> WasmUdfResult<Datum>;
}

/// Reference to a column of the input row.
#[derive(Debug, Clone, Copy)]
pub struct Column(pub usize);

impl RowExpr for Column {
    fn evaluate(&self, row: &[Datum]) -> WasmUdfResult<Datum> {
        row.get(self.0)
            .copied()
            .ok_or_else(|| WasmUdfError::ExecutionFault {
                name: format!("#{}", self.0),
                reason: format!("row only has {} columns", row.len()),
            })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Literal(pub Datum);

impl RowExpr for Literal {
    fn evaluate(&self, _row: &[Datum]) -> WasmUdfResult<Datum> {
        Ok(self.0)
    }
}

/// Evaluate the arguments left to right, stopping at the first NULL. `None` means
/// the call result is NULL.
fn evaluate_args(
    args: &[Arc<dyn RowExpr>],
    row: &[Datum],
) -> WasmUdfResult<Option<Vec<Datum>>> {
    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        match arg.evaluate(row)? {
            Datum::Null => return Ok(None),
            value => values.push(value),
        }
    }
    Ok(Some(values))
}

pub struct FunctionCall {
    runtime: Arc<WasmRuntime>,
    entry: Arc<FunctionEntry>,
    args: Vec<Arc<dyn RowExpr>>,
}

impl fmt::Debug for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionCall")
            .field("function", &self.entry.qualified_name())
            .field("args", &self.args)
            .finish()
    }
}

#[derive(Debug)]
pub struct IntegerFunction(FunctionCall);

impl IntegerFunction {
    pub fn eval_int(&self, row: &[Datum]) -> WasmUdfResult<Option<i64>> {
        match evaluate_args(&self.0.args, row)? {
            Some(args) => invoke_int(&self.0.runtime, &self.0.entry, &args),
            None => Ok(None),
        }
    }
}

#[derive(Debug)]
pub struct FloatFunction(FunctionCall);

impl FloatFunction {
    pub fn eval_float(&self, row: &[Datum]) -> WasmUdfResult<Option<f64>> {
        match evaluate_args(&self.0.args, row)? {
            Some(args) => invoke_float(&self.0.runtime, &self.0.entry, &args),
            None => Ok(None),
        }
    }
}

/// A resolved UDF call.
#[derive(Debug)]
pub enum BoundFunction {
    Integer(IntegerFunction),
    Float(FloatFunction),
}

impl BoundFunction {
    fn call(&self) -> &FunctionCall {
        match self {
            BoundFunction::Integer(f) => &f.0,
            BoundFunction::Float(f) => &f.0,
        }
    }

    pub fn entry(&self) -> &Arc<FunctionEntry> {
        &self.call().entry
    }

    pub fn arity(&self) -> usize {
        self.call().entry.signature.arity()
    }

    pub fn return_kind(&self) -> WasmType {
        match self {
            BoundFunction::Integer(_) => WasmType::I64,
            BoundFunction::Float(_) => WasmType::F64,
        }
    }
}

impl RowExpr for BoundFunction {
    fn evaluate(&self, row: &[Datum]) -> WasmUdfResult<Datum> {
        Ok(match self {
            BoundFunction::Integer(f) => f.eval_int(row)?.into(),
            BoundFunction::Float(f) => f.eval_float(row)?.into(),
        })
    }
}

/// Look up `namespace.name` in the current catalog and bind it to its arguments.
pub fn resolve(
    catalog: &CatalogHandle,
    runtime: Arc<WasmRuntime>,
    namespace: &str,
    name: &str,
    args: Vec<Arc<dyn RowExpr>>,
) -> CatalogResult<BoundFunction> {
    let entry = catalog.lookup_by_name(namespace, name).ok_or_else(|| {
        CatalogError::FunctionNotFound {
            names: format!("{namespace}.{name}"),
        }
    })?;

    if args.len() != entry.signature.arity() {
        return Err(WasmUdfError::IncorrectParameterCount {
            name: entry.qualified_name(),
            expected: entry.signature.arity(),
            actual: args.len(),
        }
        .into());
    }

    let return_type = entry.signature.return_type;
    let call = FunctionCall {
        runtime,
        entry,
        args,
    };
    Ok(match return_type {
        WasmType::I64 => BoundFunction::Integer(IntegerFunction(call)),
        WasmType::F64 => BoundFunction::Float(FloatFunction(call)),
    })
}
