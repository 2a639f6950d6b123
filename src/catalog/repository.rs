use std::sync::Arc;

use async_trait::async_trait;

use crate::catalog::{CatalogError, CatalogResult, FunctionStore};
use crate::data_types::FunctionId;
use crate::object_store::content::checksum;
use crate::repository::interface::{Error as RepositoryError, FunctionRecord, Repository};
use crate::wasm_udf::data_types::FunctionSignature;

// The native function store, backed by a SQL metastore.
pub struct RepositoryStore {
    pub repository: Arc<dyn Repository>,
}

impl From<RepositoryError> for CatalogError {
    fn from(err: RepositoryError) -> CatalogError {
        CatalogError::SqlxError(match err {
            RepositoryError::UniqueConstraintViolation(e) => e,
            RepositoryError::SqlxError(e) => e,
        })
    }
}

#[async_trait]
impl FunctionStore for RepositoryStore {
    async fn create(
        &self,
        namespace: &str,
        function_name: &str,
        or_replace: bool,
        bytecode: &[u8],
        signature: &FunctionSignature,
    ) -> CatalogResult<FunctionId> {
        self.repository
            .create_function(
                namespace,
                function_name,
                or_replace,
                &checksum(bytecode).to_hex(),
                bytecode,
                signature,
            )
            .await
            .map_err(|e| match e {
                RepositoryError::UniqueConstraintViolation(_) => {
                    CatalogError::FunctionAlreadyExists {
                        name: function_name.to_string(),
                    }
                }
                e => e.into(),
            })
    }

    async fn list(&self) -> CatalogResult<Vec<FunctionRecord>> {
        Ok(self.repository.get_all_functions().await?)
    }

    async fn list_namespace(&self, namespace: &str) -> CatalogResult<Vec<FunctionRecord>> {
        Ok(self.repository.get_functions_in_namespace(namespace).await?)
    }

    async fn delete(
        &self,
        namespace: &str,
        if_exists: bool,
        func_names: &[String],
    ) -> CatalogResult<()> {
        match self.repository.drop_function(namespace, func_names).await {
            Ok(()) => Ok(()),
            Err(RepositoryError::SqlxError(sqlx::error::Error::RowNotFound)) => {
                if if_exists {
                    Ok(())
                } else {
                    Err(CatalogError::FunctionNotFound {
                        names: func_names.join(", "),
                    })
                }
            }
            Err(e) => Err(e.into()),
        }
    }
}
