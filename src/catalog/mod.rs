use async_trait::async_trait;
use datafusion_common::DataFusionError;

use crate::data_types::FunctionId;
use crate::repository::interface::FunctionRecord;
use crate::wasm_udf::data_types::FunctionSignature;
use crate::wasm_udf::WasmUdfError;

pub mod functions;
pub mod memory;
pub mod repository;

pub const DEFAULT_NAMESPACE: &str = "default";

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("{reason}")]
    Generic { reason: String },

    #[error("Function {name:?} already exists")]
    FunctionAlreadyExists { name: String },

    #[error("Function {names:?} not found")]
    FunctionNotFound { names: String },

    #[error("Function {name:?} is registered more than once")]
    DuplicateFunction { name: String },

    #[error("Error loading function {namespace}.{name}: {source}")]
    InvalidFunction {
        namespace: String,
        name: String,
        #[source]
        source: WasmUdfError,
    },

    #[error(transparent)]
    Function(#[from] WasmUdfError),

    #[error("Catalog method not implemented: {reason}")]
    NotImplemented { reason: String },

    // Metastore implementation errors
    #[error(transparent)]
    ObjectStoreError(#[from] object_store::Error),

    #[error("Internal SQL error: {0:?}")]
    SqlxError(sqlx::Error),
}

/// Implement a global converter into a DataFusionError from the catalog error type.
/// These might be raised from different parts of query planning and execution, but we
/// want roughly the same message in each case anyway, so we can take advantage of
/// the ? operator and automatic error conversion.
impl From<CatalogError> for DataFusionError {
    fn from(val: CatalogError) -> Self {
        match val {
            CatalogError::NotImplemented { reason } => {
                DataFusionError::NotImplemented(reason)
            }
            CatalogError::Function(e) => e.into(),
            _ => DataFusionError::Plan(val.to_string()),
        }
    }
}

fn not_impl<T>() -> CatalogResult<T> {
    Err(CatalogError::NotImplemented {
        reason: "Metastore method not supported".to_string(),
    })
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Source of truth for registered functions. A catalog reload reads everything
/// through `list` in one go.
#[async_trait]
pub trait FunctionStore: Sync + Send {
    async fn create(
        &self,
        _namespace: &str,
        _function_name: &str,
        _or_replace: bool,
        _bytecode: &[u8],
        _signature: &FunctionSignature,
    ) -> CatalogResult<FunctionId> {
        not_impl()
    }

    async fn list(&self) -> CatalogResult<Vec<FunctionRecord>>;

    async fn list_namespace(&self, namespace: &str) -> CatalogResult<Vec<FunctionRecord>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|f| f.namespace == namespace)
            .collect())
    }

    async fn delete(
        &self,
        _namespace: &str,
        _if_exists: bool,
        _func_names: &[String],
    ) -> CatalogResult<()> {
        not_impl()
    }
}
