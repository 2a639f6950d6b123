use std::path::PathBuf;
use std::process::exit;

use clap::{Parser, Subcommand};
use datafusion::arrow::util::pretty::pretty_format_batches;
use serde::Serialize;

use wasmfn::{
    catalog::{functions::FunctionEntry, DEFAULT_NAMESPACE},
    config::{context::build_context, schema::load_config},
    context::WasmFnContext,
    logging::init_logging,
};

type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Manage and query WebAssembly user-defined functions
#[derive(Debug, Parser)]
#[clap(name = "wasmfn", version, about, long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[clap(short, long = "config", default_value = "wasmfn.toml")]
    config_path: PathBuf,

    /// Emit logs as JSON lines
    #[clap(long)]
    json_logs: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Register a function from a WASM module (binary or text format)
    Register {
        name: String,
        path: PathBuf,
        #[clap(short, long, default_value = DEFAULT_NAMESPACE)]
        namespace: String,
        /// Replace the function if it already exists
        #[clap(long)]
        or_replace: bool,
    },
    /// Remove one or more functions
    Drop {
        #[clap(required = true)]
        names: Vec<String>,
        #[clap(short, long, default_value = DEFAULT_NAMESPACE)]
        namespace: String,
        #[clap(long)]
        if_exists: bool,
    },
    /// List registered functions
    List {
        #[clap(short, long)]
        namespace: Option<String>,
        /// Print one JSON object per function
        #[clap(long)]
        json: bool,
    },
    /// Run a SQL query with the namespace's functions available
    Query {
        sql: String,
        #[clap(short, long, default_value = DEFAULT_NAMESPACE)]
        namespace: String,
    },
}

#[derive(Serialize)]
struct FunctionListing<'a> {
    id: i64,
    namespace: &'a str,
    name: &'a str,
    signature: String,
    checksum: String,
}

impl<'a> From<&'a FunctionEntry> for FunctionListing<'a> {
    fn from(entry: &'a FunctionEntry) -> Self {
        Self {
            id: entry.id,
            namespace: &entry.namespace,
            name: &entry.name,
            signature: entry.signature.to_string(),
            checksum: entry.checksum.to_hex(),
        }
    }
}

async fn run_command(context: &WasmFnContext, command: Command) -> CliResult<()> {
    match command {
        Command::Register {
            name,
            path,
            namespace,
            or_replace,
        } => {
            let bytecode = tokio::fs::read(&path).await?;
            let entry = context
                .create_function(&namespace, &name, &bytecode, or_replace)
                .await?;
            println!(
                "Registered {} {} (id {})",
                entry.qualified_name(),
                entry.signature,
                entry.id
            );
        }
        Command::Drop {
            names,
            namespace,
            if_exists,
        } => {
            context.drop_function(&namespace, &names, if_exists).await?;
            println!("Dropped {}", names.join(", "));
        }
        Command::List { namespace, json } => {
            for entry in context.list_functions(namespace.as_deref()) {
                if json {
                    println!(
                        "{}",
                        serde_json::to_string(&FunctionListing::from(entry.as_ref()))?
                    );
                } else {
                    println!(
                        "{}\t{}\t{}",
                        entry.qualified_name(),
                        entry.signature,
                        entry.checksum
                    );
                }
            }
        }
        Command::Query { sql, namespace } => {
            let batches = context.collect_sql(&namespace, &sql).await?;
            println!("{}", pretty_format_batches(&batches)?);
        }
    }
    Ok(())
}

async fn run(args: Args) -> CliResult<()> {
    let config = load_config(&args.config_path)?;
    let context = build_context(&config).await?;
    run_command(&context, args.command).await
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = init_logging(args.json_logs) {
        eprintln!("Error setting up logging: {e}");
        exit(1);
    }

    if let Err(e) = run(args).await {
        eprintln!("Error: {e}");
        exit(1);
    }
}
