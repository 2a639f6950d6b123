//! In-memory function catalog: immutable snapshots swapped in wholesale on reload.
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::{debug, info, warn};
use wasmtime::Module;

use super::{CatalogError, CatalogResult, FunctionStore};
use crate::data_types::FunctionId;
use crate::object_store::content::{checksum, Checksum};
use crate::repository::interface::FunctionRecord;
use crate::wasm_udf::data_types::FunctionSignature;
use crate::wasm_udf::runtime::WasmRuntime;
use crate::wasm_udf::signature::{extract_and_validate, extract_signature};
use crate::wasm_udf::WasmUdfError;

fn normalize(identifier: &str) -> Cow<'_, str> {
    if identifier.bytes().any(|b| b.is_ascii_uppercase()) {
        Cow::Owned(identifier.to_ascii_lowercase())
    } else {
        Cow::Borrowed(identifier)
    }
}

/// A compiled function, ready to be called. Never mutated after it's built.
pub struct FunctionEntry {
    pub id: FunctionId,
    pub namespace: String,
    pub name: String,
    pub checksum: Checksum,
    pub module: Module,
    pub signature: FunctionSignature,
}

impl FunctionEntry {
    /// Compile a metastore row. If the row carries a persisted signature, it has to
    /// agree with the one declared by the module itself.
    pub fn try_from_record(
        runtime: &WasmRuntime,
        record: &FunctionRecord,
    ) -> Result<Self, WasmUdfError> {
        let (module, signature) = match (&record.return_type, &record.param_types) {
            (Some(return_type), param_types) => extract_and_validate(
                runtime,
                &record.bytecode,
                return_type,
                param_types.as_deref().unwrap_or(""),
            )?,
            (None, Some(param_types)) => {
                return Err(WasmUdfError::InvalidSignatureEncoding {
                    encoded: param_types.clone(),
                })
            }
            (None, None) => extract_signature(runtime, &record.bytecode)?,
        };

        Ok(Self {
            id: record.id,
            namespace: normalize(&record.namespace).into_owned(),
            name: normalize(&record.name).into_owned(),
            checksum: checksum(&record.bytecode),
            module,
            signature,
        })
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }
}

impl fmt::Debug for FunctionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionEntry")
            .field("id", &self.id)
            .field("namespace", &self.namespace)
            .field("name", &self.name)
            .field("checksum", &self.checksum)
            .field("signature", &self.signature.to_string())
            .finish()
    }
}

/// Point-in-time view of every registered function. The id and name indexes are
/// built together with `entries` and point into it.
#[derive(Debug, Default)]
pub struct CatalogSnapshot {
    entries: Vec<Arc<FunctionEntry>>,
    by_id: HashMap<FunctionId, usize>,
    by_name: HashMap<String, HashMap<String, usize>>,
    generation: u64,
}

impl CatalogSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Index a set of entries. Fails if two of them share an id or a qualified name.
    pub fn try_new(entries: Vec<FunctionEntry>, generation: u64) -> CatalogResult<Self> {
        let mut by_id = HashMap::with_capacity(entries.len());
        let mut by_name: HashMap<String, HashMap<String, usize>> = HashMap::new();

        for (index, entry) in entries.iter().enumerate() {
            if by_id.insert(entry.id, index).is_some() {
                return Err(CatalogError::DuplicateFunction {
                    name: format!("id {}", entry.id),
                });
            }
            if by_name
                .entry(entry.namespace.clone())
                .or_default()
                .insert(entry.name.clone(), index)
                .is_some()
            {
                return Err(CatalogError::DuplicateFunction {
                    name: entry.qualified_name(),
                });
            }
        }

        Ok(Self {
            entries: entries.into_iter().map(Arc::new).collect(),
            by_id,
            by_name,
            generation,
        })
    }

    /// Compile every record and index the result. The first bad record aborts the build.
    pub fn build(
        runtime: &WasmRuntime,
        records: &[FunctionRecord],
        generation: u64,
    ) -> CatalogResult<Self> {
        let entries = records
            .iter()
            .map(|record| {
                FunctionEntry::try_from_record(runtime, record).map_err(|source| {
                    CatalogError::InvalidFunction {
                        namespace: record.namespace.clone(),
                        name: record.name.clone(),
                        source,
                    }
                })
            })
            .collect::<CatalogResult<Vec<_>>>()?;

        Self::try_new(entries, generation)
    }

    pub fn lookup_by_id(&self, id: FunctionId) -> Option<&Arc<FunctionEntry>> {
        self.by_id.get(&id).map(|index| &self.entries[*index])
    }

    pub fn lookup_by_name(
        &self,
        namespace: &str,
        name: &str,
    ) -> Option<&Arc<FunctionEntry>> {
        self.by_name
            .get(&*normalize(namespace))?
            .get(&*normalize(name))
            .map(|index| &self.entries[*index])
    }

    pub fn functions_in<'a>(
        &'a self,
        namespace: &str,
    ) -> impl Iterator<Item = &'a Arc<FunctionEntry>> + 'a {
        let namespace = normalize(namespace).into_owned();
        self.entries
            .iter()
            .filter(move |entry| entry.namespace == namespace)
    }

    pub fn entries(&self) -> &[Arc<FunctionEntry>] {
        &self.entries
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Owner of the current snapshot. Readers never block: they grab whatever snapshot is
/// installed and keep using it even if a reload swaps in a newer one meanwhile.
#[derive(Debug)]
pub struct CatalogHandle {
    current: ArcSwap<CatalogSnapshot>,
    generation: AtomicU64,
}

impl Default for CatalogHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogHandle {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(CatalogSnapshot::empty()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.current.load_full()
    }

    pub fn lookup_by_id(&self, id: FunctionId) -> Option<Arc<FunctionEntry>> {
        self.current.load().lookup_by_id(id).cloned()
    }

    pub fn lookup_by_name(&self, namespace: &str, name: &str) -> Option<Arc<FunctionEntry>> {
        self.current.load().lookup_by_name(namespace, name).cloned()
    }

    pub fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Make the snapshot current unless a newer generation is already installed.
    /// Returns whichever snapshot is current afterwards.
    pub fn install(&self, snapshot: CatalogSnapshot) -> Arc<CatalogSnapshot> {
        let snapshot = Arc::new(snapshot);
        let previous = self.current.rcu(|current| {
            if current.generation > snapshot.generation {
                current.clone()
            } else {
                snapshot.clone()
            }
        });

        if previous.generation > snapshot.generation {
            debug!(
                generation = snapshot.generation,
                current = previous.generation,
                "Discarding stale function catalog snapshot"
            );
            previous
        } else {
            snapshot
        }
    }

    /// Rebuild the catalog from everything in the store. On any error the currently
    /// installed snapshot stays in place.
    ///
    /// The generation is taken before the store is read, so a reload that started
    /// later always saw at least as much as one that started earlier and never gets
    /// overwritten by it.
    pub async fn reload(
        &self,
        store: &dyn FunctionStore,
        runtime: &WasmRuntime,
    ) -> CatalogResult<Arc<CatalogSnapshot>> {
        let generation = self.next_generation();
        let records = store.list().await?;
        debug!(
            generation,
            rows = records.len(),
            "Building function catalog snapshot"
        );

        match CatalogSnapshot::build(runtime, &records, generation) {
            Ok(snapshot) => {
                info!(
                    generation,
                    functions = snapshot.len(),
                    "Installed function catalog snapshot"
                );
                Ok(self.install(snapshot))
            }
            Err(e) => {
                warn!(
                    generation,
                    "Function catalog reload failed, keeping the previous snapshot: {e}"
                );
                Err(e)
            }
        }
    }
}
