//! Deriving a UDF's calling convention from its compiled module
use wasmtime::{ExternType, Module, ValType};

use super::data_types::{FunctionSignature, WasmType};
use super::runtime::WasmRuntime;
use super::{ReturnShape, WasmUdfError, WasmUdfResult, ENTRYPOINT};

fn wasm_type_from_val_type(t: &ValType) -> WasmUdfResult<WasmType> {
    match t {
        ValType::I64 => Ok(WasmType::I64),
        ValType::F64 => Ok(WasmType::F64),
        other => Err(WasmUdfError::UnsupportedType(other.to_string())),
    }
}

/// Read the signature of the module's entry point.
pub fn signature_of(module: &Module) -> WasmUdfResult<FunctionSignature> {
    let func_type = match module.get_export(ENTRYPOINT) {
        Some(ExternType::Func(func_type)) => func_type,
        _ => return Err(WasmUdfError::EntryNotFound),
    };

    let results = func_type.results().collect::<Vec<_>>();
    let return_type = match results.as_slice() {
        [] => return Err(WasmUdfError::UnsupportedReturn(ReturnShape::Void)),
        [single] => wasm_type_from_val_type(single)?,
        _ => return Err(WasmUdfError::UnsupportedReturn(ReturnShape::Multi)),
    };

    let param_types = func_type
        .params()
        .map(|p| wasm_type_from_val_type(&p))
        .collect::<WasmUdfResult<Vec<_>>>()?;

    Ok(FunctionSignature {
        return_type,
        param_types,
    })
}

/// Compile the bytecode and extract the entry point signature. The compiled module is
/// handed back so that callers don't need to compile it again.
pub fn extract_signature(
    runtime: &WasmRuntime,
    bytecode: &[u8],
) -> WasmUdfResult<(Module, FunctionSignature)> {
    let module = runtime.compile(bytecode)?;
    let signature = signature_of(&module)?;
    Ok((module, signature))
}

/// Like [`extract_signature`], but checks the result against a previously persisted
/// signature encoding.
pub fn extract_and_validate(
    runtime: &WasmRuntime,
    bytecode: &[u8],
    return_code: &str,
    param_codes: &str,
) -> WasmUdfResult<(Module, FunctionSignature)> {
    let persisted = FunctionSignature::deserialize(return_code, param_codes)?;
    let (module, actual) = extract_signature(runtime, bytecode)?;

    if persisted != actual {
        return Err(WasmUdfError::SignatureMismatch {
            persisted: persisted.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok((module, persisted))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::testutils::*;
    use crate::wasm_udf::runtime::tests::test_runtime;

    #[rstest]
    #[case::double(DOUBLE_I64, WasmType::I64, vec![WasmType::I64])]
    #[case::add(ADD_F64, WasmType::F64, vec![WasmType::F64, WasmType::F64])]
    #[case::no_params(PI_F64, WasmType::F64, vec![])]
    #[case::mixed(MIXED_ARGS, WasmType::I64, vec![WasmType::I64, WasmType::F64])]
    fn test_extract_signature(
        #[case] wat: &str,
        #[case] return_type: WasmType,
        #[case] param_types: Vec<WasmType>,
    ) {
        let (_, sig) = extract_signature(&test_runtime(), wat.as_bytes()).unwrap();
        assert_eq!(sig, FunctionSignature::new(return_type, param_types));
    }

    #[test]
    fn test_extract_signature_entry_not_found() {
        let runtime = test_runtime();

        let err = extract_signature(&runtime, NO_ENTRYPOINT.as_bytes()).unwrap_err();
        assert!(matches!(err, WasmUdfError::EntryNotFound));

        let err = extract_signature(&runtime, ENTRYPOINT_NOT_A_FUNCTION.as_bytes())
            .unwrap_err();
        assert!(matches!(err, WasmUdfError::EntryNotFound));
    }

    #[test]
    fn test_extract_signature_unsupported_returns() {
        let runtime = test_runtime();

        let err = extract_signature(&runtime, VOID_RETURN.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            WasmUdfError::UnsupportedReturn(ReturnShape::Void)
        ));

        let err = extract_signature(&runtime, MULTI_RETURN.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            WasmUdfError::UnsupportedReturn(ReturnShape::Multi)
        ));
    }

    #[test]
    fn test_extract_signature_unsupported_types() {
        let runtime = test_runtime();

        let err = extract_signature(&runtime, I32_RETURN.as_bytes()).unwrap_err();
        assert!(matches!(err, WasmUdfError::UnsupportedType(ref t) if t == "i32"));

        let err = extract_signature(&runtime, F32_PARAM.as_bytes()).unwrap_err();
        assert!(matches!(err, WasmUdfError::UnsupportedType(ref t) if t == "f32"));
    }

    #[test]
    fn test_extract_signature_invalid_bytecode() {
        let err = extract_signature(&test_runtime(), b"\x00asm\x02").unwrap_err();
        assert!(matches!(err, WasmUdfError::InvalidBytecode { .. }));
    }

    #[test]
    fn test_extract_and_validate() {
        let runtime = test_runtime();

        let (_, sig) =
            extract_and_validate(&runtime, DOUBLE_I64.as_bytes(), "I", "I").unwrap();
        assert_eq!(sig.param_types, vec![WasmType::I64]);

        let err = extract_and_validate(&runtime, DOUBLE_I64.as_bytes(), "F", "I")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Persisted signature (i64) -> f64 doesn't match the module's entry point signature (i64) -> i64"
        );

        let err = extract_and_validate(&runtime, DOUBLE_I64.as_bytes(), "", "I")
            .unwrap_err();
        assert!(matches!(err, WasmUdfError::InvalidSignatureEncoding { .. }));
    }
}
