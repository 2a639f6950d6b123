use async_trait::async_trait;
use parking_lot::RwLock;

use crate::catalog::{CatalogError, CatalogResult, FunctionStore};
use crate::data_types::FunctionId;
use crate::repository::interface::FunctionRecord;
use crate::wasm_udf::data_types::FunctionSignature;

/// Function store kept entirely in memory; used for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryFunctionStore {
    functions: RwLock<Vec<FunctionRecord>>,
}

impl MemoryFunctionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<FunctionRecord>) -> Self {
        Self {
            functions: RwLock::new(records),
        }
    }

    /// Add a raw row, bypassing any validation, as if it was written by another process.
    pub fn insert_record(&self, record: FunctionRecord) {
        self.functions.write().push(record);
    }

    fn next_id(functions: &[FunctionRecord]) -> FunctionId {
        functions.iter().map(|f| f.id).max().unwrap_or(0) + 1
    }
}

#[async_trait]
impl FunctionStore for MemoryFunctionStore {
    async fn create(
        &self,
        namespace: &str,
        function_name: &str,
        or_replace: bool,
        bytecode: &[u8],
        signature: &FunctionSignature,
    ) -> CatalogResult<FunctionId> {
        let mut functions = self.functions.write();

        let existing = functions
            .iter_mut()
            .find(|f| f.namespace == namespace && f.name == function_name);

        match existing {
            Some(_) if !or_replace => Err(CatalogError::FunctionAlreadyExists {
                name: function_name.to_string(),
            }),
            Some(record) => {
                record.bytecode = bytecode.to_vec();
                record.return_type = Some(signature.serialize_return());
                record.param_types = Some(signature.serialize_params());
                Ok(record.id)
            }
            None => {
                let id = Self::next_id(&functions);
                functions.push(FunctionRecord {
                    id,
                    namespace: namespace.to_string(),
                    name: function_name.to_string(),
                    bytecode: bytecode.to_vec(),
                    return_type: Some(signature.serialize_return()),
                    param_types: Some(signature.serialize_params()),
                });
                Ok(id)
            }
        }
    }

    async fn list(&self) -> CatalogResult<Vec<FunctionRecord>> {
        Ok(self.functions.read().clone())
    }

    async fn delete(
        &self,
        namespace: &str,
        if_exists: bool,
        func_names: &[String],
    ) -> CatalogResult<()> {
        let mut functions = self.functions.write();
        let before = functions.len();
        functions.retain(|f| !(f.namespace == namespace && func_names.contains(&f.name)));

        if functions.len() == before && !if_exists {
            return Err(CatalogError::FunctionNotFound {
                names: func_names.join(", "),
            });
        }
        Ok(())
    }
}
