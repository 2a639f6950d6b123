//! Calling compiled UDFs, one row at a time, and exposing them to DataFusion
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, Int64Array};
use datafusion::{error::Result, physical_plan::functions::make_scalar_function};
use datafusion_common::cast::{as_float64_array, as_int64_array};
use datafusion_expr::{create_udf, ScalarUDF, Volatility};
use tracing::warn;
use wasmtime::{Instance, Trap, Val};

use super::data_types::{Datum, WasmType};
use super::runtime::WasmRuntime;
use super::{WasmUdfError, WasmUdfResult, ENTRYPOINT};
use crate::catalog::functions::FunctionEntry;

fn to_wasm_val(arg: &Datum, expected: WasmType) -> WasmUdfResult<Val> {
    match (arg, expected) {
        (Datum::Integer(v), WasmType::I64) => Ok(Val::I64(*v)),
        (Datum::Float(v), WasmType::F64) => Ok(Val::F64(v.to_bits())),
        _ => Err(WasmUdfError::TypeMismatch {
            context: "argument",
            expected,
            actual: arg.describe(),
        }),
    }
}

fn from_wasm_val(val: &Val, expected: WasmType) -> WasmUdfResult<Datum> {
    match (val, expected) {
        (Val::I64(v), WasmType::I64) => Ok(Datum::Integer(*v)),
        (Val::F64(bits), WasmType::F64) => Ok(Datum::Float(f64::from_bits(*bits))),
        _ => Err(WasmUdfError::TypeMismatch {
            context: "result",
            expected,
            actual: describe_val(val).to_string(),
        }),
    }
}

fn describe_val(val: &Val) -> &'static str {
    match val {
        Val::I32(_) => "i32",
        Val::I64(_) => "i64",
        Val::F32(_) => "f32",
        Val::F64(_) => "f64",
        Val::V128(_) => "v128",
        _ => "reference",
    }
}

fn placeholder(return_type: WasmType) -> Val {
    match return_type {
        WasmType::I64 => Val::I64(0),
        WasmType::F64 => Val::F64(0),
    }
}

fn execution_fault(entry: &FunctionEntry, error: wasmtime::Error) -> WasmUdfError {
    let reason = match error.downcast_ref::<Trap>() {
        Some(Trap::OutOfFuel) => "fuel exhausted".to_string(),
        _ => format!("{error:?}"),
    };
    warn!(
        function = %entry.qualified_name(),
        "UDF call failed: {reason}"
    );
    WasmUdfError::ExecutionFault {
        name: entry.qualified_name(),
        reason,
    }
}

/// Call the entry point with a single row of arguments.
///
/// A NULL in any argument makes the whole result NULL and the module isn't called
/// at all. Every call runs in a fresh instance with its own fuel budget, so nothing
/// (globals, linear memory) carries over between rows.
pub fn invoke(
    runtime: &WasmRuntime,
    entry: &FunctionEntry,
    args: &[Datum],
) -> WasmUdfResult<Datum> {
    let signature = &entry.signature;
    if args.len() != signature.arity() {
        return Err(WasmUdfError::IncorrectParameterCount {
            name: entry.qualified_name(),
            expected: signature.arity(),
            actual: args.len(),
        });
    }

    if args.iter().any(Datum::is_null) {
        return Ok(Datum::Null);
    }

    let params = args
        .iter()
        .zip(&signature.param_types)
        .map(|(arg, ty)| to_wasm_val(arg, *ty))
        .collect::<WasmUdfResult<Vec<_>>>()?;

    let mut store = runtime.new_store(&entry.qualified_name())?;
    let instance = Instance::new(&mut store, &entry.module, &[])
        .map_err(|e| execution_fault(entry, e))?;
    let func = instance
        .get_func(&mut store, ENTRYPOINT)
        .ok_or(WasmUdfError::EntryNotFound)?;

    let mut results = [placeholder(signature.return_type)];
    func.call(&mut store, &params, &mut results)
        .map_err(|e| execution_fault(entry, e))?;

    from_wasm_val(&results[0], signature.return_type)
}

fn check_return_kind(
    entry: &FunctionEntry,
    expected: WasmType,
    context: &'static str,
) -> WasmUdfResult<()> {
    if entry.signature.return_type != expected {
        return Err(WasmUdfError::TypeMismatch {
            context,
            expected,
            actual: entry.signature.return_type.to_string(),
        });
    }
    Ok(())
}

/// Call site for functions declared to return an integer.
pub fn invoke_int(
    runtime: &WasmRuntime,
    entry: &FunctionEntry,
    args: &[Datum],
) -> WasmUdfResult<Option<i64>> {
    check_return_kind(entry, WasmType::I64, "integer call site")?;

    match invoke(runtime, entry, args)? {
        Datum::Integer(v) => Ok(Some(v)),
        Datum::Null => Ok(None),
        other => Err(WasmUdfError::TypeMismatch {
            context: "integer call site",
            expected: WasmType::I64,
            actual: other.describe(),
        }),
    }
}

/// Call site for functions declared to return a float.
pub fn invoke_float(
    runtime: &WasmRuntime,
    entry: &FunctionEntry,
    args: &[Datum],
) -> WasmUdfResult<Option<f64>> {
    check_return_kind(entry, WasmType::F64, "float call site")?;

    match invoke(runtime, entry, args)? {
        Datum::Float(v) => Ok(Some(v)),
        Datum::Null => Ok(None),
        other => Err(WasmUdfError::TypeMismatch {
            context: "float call site",
            expected: WasmType::F64,
            actual: other.describe(),
        }),
    }
}

enum ArgColumn<'a> {
    Integer(&'a Int64Array),
    Float(&'a Float64Array),
}

impl<'a> ArgColumn<'a> {
    fn try_new(array: &'a ArrayRef, ty: WasmType) -> Result<Self> {
        Ok(match ty {
            WasmType::I64 => ArgColumn::Integer(as_int64_array(array)?),
            WasmType::F64 => ArgColumn::Float(as_float64_array(array)?),
        })
    }

    fn datum(&self, row: usize) -> Datum {
        match self {
            ArgColumn::Integer(a) if a.is_valid(row) => Datum::Integer(a.value(row)),
            ArgColumn::Float(a) if a.is_valid(row) => Datum::Float(a.value(row)),
            _ => Datum::Null,
        }
    }
}

/// Build a DataFusion scalar function that calls a catalog entry row by row.
pub fn create_udf_from_entry(
    runtime: Arc<WasmRuntime>,
    entry: Arc<FunctionEntry>,
) -> ScalarUDF {
    let input_types = entry
        .signature
        .param_types
        .iter()
        .map(|t| t.arrow_type())
        .collect();
    let return_type = Arc::new(entry.signature.return_type.arrow_type());
    let name = entry.name.clone();

    let inner = move |args: &[ArrayRef]| -> Result<ArrayRef> {
        // Zero-argument calls may not come with any column to size the output by
        let num_rows = args.first().map(|a| a.len()).unwrap_or(1);

        let columns = args
            .iter()
            .zip(&entry.signature.param_types)
            .map(|(array, ty)| ArgColumn::try_new(array, *ty))
            .collect::<Result<Vec<_>>>()?;

        let rows = (0..num_rows)
            .map(|i| columns.iter().map(|c| c.datum(i)).collect::<Vec<_>>());

        let array = match entry.signature.return_type {
            WasmType::I64 => Arc::new(
                rows.map(|row| invoke_int(&runtime, &entry, &row))
                    .collect::<WasmUdfResult<Int64Array>>()?,
            ) as ArrayRef,
            WasmType::F64 => Arc::new(
                rows.map(|row| invoke_float(&runtime, &entry, &row))
                    .collect::<WasmUdfResult<Float64Array>>()?,
            ) as ArrayRef,
        };
        Ok(array)
    };

    create_udf(
        &name,
        input_types,
        return_type,
        Volatility::Immutable,
        make_scalar_function(inner),
    )
}
