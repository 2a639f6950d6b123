use wasmtime::{Config, Engine, Module, Store};

use super::{WasmUdfError, WasmUdfResult};

pub const DEFAULT_FUEL_LIMIT: u64 = 1_000_000_000;

/// Shared WASM engine. Compiled modules are tied to the engine that built them, so the
/// same runtime has to be used for compilation and for every later call.
#[derive(Clone)]
pub struct WasmRuntime {
    engine: Engine,
    fuel_limit: u64,
}

impl WasmRuntime {
    pub fn try_new(fuel_limit: u64) -> wasmtime::Result<Self> {
        let mut config = Config::new();
        // Every call runs on a fuel budget so that a runaway UDF traps instead of
        // pinning the query thread.
        config.consume_fuel(true);

        Ok(Self {
            engine: Engine::new(&config)?,
            fuel_limit,
        })
    }

    pub fn fuel_limit(&self) -> u64 {
        self.fuel_limit
    }

    /// Compile module bytecode. Both the binary and the text format are accepted.
    pub fn compile(&self, bytecode: &[u8]) -> WasmUdfResult<Module> {
        Module::new(&self.engine, bytecode).map_err(|e| WasmUdfError::InvalidBytecode {
            reason: e.to_string(),
        })
    }

    /// Fresh store for a single call, topped up with the configured fuel.
    pub(crate) fn new_store(&self, name: &str) -> WasmUdfResult<Store<()>> {
        let mut store = Store::new(&self.engine, ());
        store
            .set_fuel(self.fuel_limit)
            .map_err(|e| WasmUdfError::ExecutionFault {
                name: name.to_string(),
                reason: format!("Error setting fuel: {e}"),
            })?;
        Ok(store)
    }
}

impl std::fmt::Debug for WasmRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WasmRuntime")
            .field("fuel_limit", &self.fuel_limit)
            .finish()
    }
}
