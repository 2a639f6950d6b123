use std::sync::Arc;

use arrow::record_batch::RecordBatch;
pub use datafusion::error::{DataFusionError as Error, Result};
use datafusion::prelude::{SessionConfig, SessionContext};
use tracing::{debug, info, warn};

use crate::catalog::functions::{CatalogHandle, CatalogSnapshot, FunctionEntry};
use crate::catalog::{CatalogError, CatalogResult, FunctionStore};
use crate::expression::{resolve, BoundFunction, RowExpr};
use crate::object_store::content::ContentStore;
use crate::wasm_udf::runtime::WasmRuntime;
use crate::wasm_udf::signature::extract_signature;
use crate::wasm_udf::wasm::create_udf_from_entry;

fn normalize_identifier(kind: &str, identifier: &str) -> CatalogResult<String> {
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return Err(CatalogError::Generic {
            reason: format!("Function {kind} can't be empty"),
        });
    }
    Ok(identifier.to_ascii_lowercase())
}

// The core object: owns the WASM engine, the function store and the catalog built from it
pub struct WasmFnContext {
    pub runtime: Arc<WasmRuntime>,
    pub functions: Arc<dyn FunctionStore>,
    pub content_store: ContentStore,
    pub catalog: Arc<CatalogHandle>,
}

impl WasmFnContext {
    pub fn new(
        runtime: Arc<WasmRuntime>,
        functions: Arc<dyn FunctionStore>,
        content_store: ContentStore,
    ) -> Self {
        Self {
            runtime,
            functions,
            content_store,
            catalog: Arc::new(CatalogHandle::new()),
        }
    }

    /// Pick up every function currently in the store
    pub async fn reload(&self) -> CatalogResult<Arc<CatalogSnapshot>> {
        self.catalog
            .reload(self.functions.as_ref(), &self.runtime)
            .await
    }

    /// Register a function. The bytecode is validated before anything gets written,
    /// so a bad upload is rejected here rather than breaking the next reload.
    ///
    /// Once the row is written the function counts as registered: if the following
    /// reload fails (say, because of some other bad row) the error is logged and the
    /// entry built from the upload is returned.
    pub async fn create_function(
        &self,
        namespace: &str,
        function_name: &str,
        bytecode: &[u8],
        or_replace: bool,
    ) -> CatalogResult<Arc<FunctionEntry>> {
        let namespace = normalize_identifier("namespace", namespace)?;
        let function_name = normalize_identifier("name", function_name)?;

        let (module, signature) = extract_signature(&self.runtime, bytecode)?;

        // Don't leave bytecode behind in the content store for a name that's taken
        if !or_replace
            && self
                .functions
                .list_namespace(&namespace)
                .await?
                .iter()
                .any(|f| f.name == function_name)
        {
            return Err(CatalogError::FunctionAlreadyExists {
                name: function_name,
            });
        }

        let checksum = self.content_store.persist(bytecode).await?;

        let id = self
            .functions
            .create(&namespace, &function_name, or_replace, bytecode, &signature)
            .await?;
        info!(
            id,
            %checksum,
            "Registered function {namespace}.{function_name} {signature}"
        );

        let entry = Arc::new(FunctionEntry {
            id,
            namespace,
            name: function_name,
            checksum,
            module,
            signature,
        });

        if let Err(e) = self.reload().await {
            warn!(
                "Function {} is registered but the catalog couldn't be reloaded: {e}",
                entry.qualified_name()
            );
            return Ok(entry);
        }
        Ok(self.catalog.lookup_by_id(id).unwrap_or(entry))
    }

    pub async fn drop_function(
        &self,
        namespace: &str,
        func_names: &[String],
        if_exists: bool,
    ) -> CatalogResult<()> {
        let namespace = normalize_identifier("namespace", namespace)?;
        let func_names = func_names
            .iter()
            .map(|name| normalize_identifier("name", name))
            .collect::<CatalogResult<Vec<_>>>()?;

        self.functions
            .delete(&namespace, if_exists, &func_names)
            .await?;
        info!("Dropped function(s) {} from {namespace}", func_names.join(", "));

        self.reload().await?;
        Ok(())
    }

    /// Functions visible in the current snapshot, optionally only one namespace
    pub fn list_functions(&self, namespace: Option<&str>) -> Vec<Arc<FunctionEntry>> {
        let snapshot = self.catalog.snapshot();
        match namespace {
            Some(namespace) => snapshot.functions_in(namespace).cloned().collect(),
            None => snapshot.entries().to_vec(),
        }
    }

    pub fn resolve(
        &self,
        namespace: &str,
        name: &str,
        args: Vec<Arc<dyn RowExpr>>,
    ) -> CatalogResult<BoundFunction> {
        resolve(&self.catalog, self.runtime.clone(), namespace, name, args)
    }

    /// Register every function in the namespace as a DataFusion scalar UDF
    pub fn register_udfs(&self, ctx: &SessionContext, namespace: &str) {
        let snapshot = self.catalog.snapshot();
        for entry in snapshot.functions_in(namespace) {
            debug!(
                "Registering UDF {} {}",
                entry.qualified_name(),
                entry.signature
            );
            ctx.register_udf(create_udf_from_entry(self.runtime.clone(), entry.clone()));
        }
    }

    /// A DataFusion session that can call the namespace's functions by bare name
    pub fn session_context(&self, namespace: &str) -> Result<SessionContext> {
        let session_config = SessionConfig::from_env()?.with_information_schema(true);
        let ctx = SessionContext::new_with_config(session_config);
        self.register_udfs(&ctx, namespace);
        Ok(ctx)
    }

    pub async fn collect_sql(&self, namespace: &str, sql: &str) -> Result<Vec<RecordBatch>> {
        let ctx = self.session_context(namespace)?;
        ctx.sql(sql).await?.collect().await
    }
}
