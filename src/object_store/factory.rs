//! Constructing the object store that backs the content-addressed bytecode store
use std::sync::Arc;

use object_store::{local::LocalFileSystem, memory::InMemory, ObjectStore};
use tracing::info;

use crate::config::schema;

pub fn build_object_store(
    object_store_cfg: &schema::ObjectStore,
) -> Result<Arc<dyn ObjectStore>, object_store::Error> {
    match object_store_cfg {
        schema::ObjectStore::Local(schema::Local { data_dir }) => {
            // LocalFileSystem requires the prefix to exist already
            std::fs::create_dir_all(data_dir).map_err(|e| object_store::Error::Generic {
                store: "LocalFileSystem",
                source: Box::new(e),
            })?;
            info!("Storing function bytecode in {data_dir}");
            Ok(Arc::new(LocalFileSystem::new_with_prefix(data_dir)?))
        }
        schema::ObjectStore::InMemory(_) => Ok(Arc::new(InMemory::new())),
    }
}
