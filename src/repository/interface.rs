use std::fmt::Debug;

use async_trait::async_trait;

use crate::data_types::FunctionId;
use crate::wasm_udf::data_types::FunctionSignature;

/// A registered function as stored in the metastore. The signature columns are
/// optional: rows written by older versions may not have them.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct FunctionRecord {
    pub id: FunctionId,
    pub namespace: String,
    pub name: String,
    pub bytecode: Vec<u8>,
    pub return_type: Option<String>,
    pub param_types: Option<String>,
}

/// Wrapper for conversion of database-specific error codes into actual errors
#[derive(Debug)]
pub enum Error {
    UniqueConstraintViolation(sqlx::Error),

    // All other errors
    SqlxError(sqlx::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[async_trait]
pub trait Repository: Send + Sync + Debug {
    async fn setup(&self) -> Result<(), sqlx::migrate::MigrateError>;

    #[allow(clippy::too_many_arguments)]
    async fn create_function(
        &self,
        namespace: &str,
        function_name: &str,
        or_replace: bool,
        checksum: &str,
        bytecode: &[u8],
        signature: &FunctionSignature,
    ) -> Result<FunctionId, Error>;

    async fn get_all_functions(&self) -> Result<Vec<FunctionRecord>, Error>;

    async fn get_functions_in_namespace(
        &self,
        namespace: &str,
    ) -> Result<Vec<FunctionRecord>, Error>;

    async fn drop_function(
        &self,
        namespace: &str,
        func_names: &[String],
    ) -> Result<(), Error>;
}

#[cfg(test)]
pub mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::wasm_udf::data_types::WasmType;

    /// A metastore row holding the given module, with an optional persisted signature
    pub fn function_record(
        id: FunctionId,
        namespace: &str,
        name: &str,
        wat: &str,
        signature: Option<(&str, &str)>,
    ) -> FunctionRecord {
        FunctionRecord {
            id,
            namespace: namespace.to_string(),
            name: name.to_string(),
            bytecode: wat.as_bytes().to_vec(),
            return_type: signature.map(|(ret, _)| ret.to_string()),
            param_types: signature.map(|(_, params)| params.to_string()),
        }
    }

    fn double_signature() -> FunctionSignature {
        FunctionSignature::new(WasmType::I64, vec![WasmType::I64])
    }

    pub async fn run_generic_repository_tests(repository: Arc<dyn Repository>) {
        test_get_functions_empty(repository.clone()).await;
        let function_id = test_create_functions(repository.clone()).await;
        test_replace_function(repository.clone(), function_id).await;
        test_drop_functions(repository.clone()).await;
        test_error_propagation(repository).await;
    }

    async fn test_get_functions_empty(repository: Arc<dyn Repository>) {
        assert_eq!(
            repository
                .get_all_functions()
                .await
                .expect("error getting functions"),
            Vec::<FunctionRecord>::new()
        );
    }

    async fn test_create_functions(repository: Arc<dyn Repository>) -> FunctionId {
        let function_id = repository
            .create_function(
                "testns",
                "double_it",
                false,
                "0011aabb",
                b"\x00asm\x01\x00\x00\x00",
                &double_signature(),
            )
            .await
            .expect("Error creating function");

        let other_id = repository
            .create_function(
                "otherns",
                "pi",
                false,
                "ccdd",
                b"\x00asm",
                &FunctionSignature::new(WasmType::F64, vec![]),
            )
            .await
            .expect("Error creating function");
        assert_ne!(function_id, other_id);

        let all_functions = repository.get_all_functions().await.unwrap();
        assert_eq!(
            all_functions,
            vec![
                FunctionRecord {
                    id: function_id,
                    namespace: "testns".to_string(),
                    name: "double_it".to_string(),
                    bytecode: b"\x00asm\x01\x00\x00\x00".to_vec(),
                    return_type: Some("I".to_string()),
                    param_types: Some("I".to_string()),
                },
                FunctionRecord {
                    id: other_id,
                    namespace: "otherns".to_string(),
                    name: "pi".to_string(),
                    bytecode: b"\x00asm".to_vec(),
                    return_type: Some("F".to_string()),
                    param_types: Some("".to_string()),
                }
            ]
        );

        let in_namespace = repository
            .get_functions_in_namespace("otherns")
            .await
            .unwrap();
        assert_eq!(in_namespace.len(), 1);
        assert_eq!(in_namespace[0].name, "pi");

        function_id
    }

    async fn test_replace_function(repository: Arc<dyn Repository>, function_id: FunctionId) {
        // Same name without OR REPLACE: constraint violation
        let err = repository
            .create_function(
                "testns",
                "double_it",
                false,
                "0011aabb",
                b"\x00asm\x01\x00\x00\x00",
                &double_signature(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UniqueConstraintViolation(_)));

        // With OR REPLACE: the row keeps its ID but gets the new contents
        let new_signature = FunctionSignature::new(WasmType::F64, vec![WasmType::F64]);
        let replaced_id = repository
            .create_function(
                "testns",
                "double_it",
                true,
                "eeff",
                b"\x00asm\x01\x00\x00\x00\x00",
                &new_signature,
            )
            .await
            .unwrap();
        assert_eq!(replaced_id, function_id);

        let functions = repository.get_functions_in_namespace("testns").await.unwrap();
        assert_eq!(functions.len(), 1);
        assert_eq!(functions[0].return_type, Some("F".to_string()));
        assert_eq!(functions[0].bytecode.len(), 9);
    }

    async fn test_drop_functions(repository: Arc<dyn Repository>) {
        repository
            .drop_function("testns", &["double_it".to_string()])
            .await
            .unwrap();

        let remaining = repository.get_all_functions().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].namespace, "otherns");
    }

    async fn test_error_propagation(repository: Arc<dyn Repository>) {
        let err = repository
            .drop_function("testns", &["missing".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SqlxError(sqlx::Error::RowNotFound)));
    }
}
