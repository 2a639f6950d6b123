use std::sync::Arc;

use tracing::info;

use crate::{
    catalog::{repository::RepositoryStore, CatalogError, CatalogResult},
    context::WasmFnContext,
    object_store::{content::ContentStore, factory::build_object_store},
    repository::{interface::Repository, sqlite::SqliteRepository},
    wasm_udf::runtime::WasmRuntime,
};

use super::schema;

async fn build_repository(
    config: &schema::WasmFnConfig,
) -> Result<Arc<dyn Repository>, sqlx::Error> {
    let repository: Arc<dyn Repository> = match &config.catalog {
        schema::Catalog::Sqlite(schema::Sqlite {
            dsn,
            journal_mode,
            read_only: false,
        }) => Arc::new(
            SqliteRepository::try_new(dsn.to_string(), (*journal_mode).into()).await?,
        ),
        schema::Catalog::Sqlite(schema::Sqlite {
            dsn,
            journal_mode,
            read_only: true,
        }) => Arc::new(
            SqliteRepository::try_new_read_only(dsn.to_string(), (*journal_mode).into())
                .await?,
        ),
    };
    Ok(repository)
}

pub async fn build_context(cfg: &schema::WasmFnConfig) -> CatalogResult<WasmFnContext> {
    let runtime = WasmRuntime::try_new(cfg.runtime.fuel_limit).map_err(|e| {
        CatalogError::Generic {
            reason: format!("Error setting up the WASM engine: {e}"),
        }
    })?;

    let repository = build_repository(cfg)
        .await
        .map_err(CatalogError::SqlxError)?;
    let object_store = build_object_store(&cfg.object_store)?;

    let context = WasmFnContext::new(
        Arc::new(runtime),
        Arc::new(RepositoryStore { repository }),
        ContentStore::new(object_store),
    );

    let snapshot = context.reload().await?;
    info!("Loaded {} function(s) from the catalog", snapshot.len());

    Ok(context)
}
