//! Command-line interface for edmschema

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
use std::path::{Path, PathBuf};
#[cfg(feature = "cli")]
use std::sync::Arc;

#[cfg(feature = "cli")]
use edmschema::schema::{ElementKind, ManifestCatalog};
#[cfg(feature = "cli")]
use edmschema::{CompileOptions, Limits, SchemaManager};

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "edmschema")]
#[command(author, version, about = "Entity data model schema compiler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile schema documents and report diagnostics
    Check {
        /// Conceptual, storage or provider manifest documents
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /// Output diagnostics as JSON
        #[arg(short, long)]
        json: bool,

        /// Stop after this many errors
        #[arg(long)]
        max_errors: Option<usize>,

        /// Provider manifest supplying the storage primitive types
        #[arg(short, long, value_name = "MANIFEST")]
        manifest: Option<PathBuf>,

        /// JSON file with processing limits
        #[arg(long, value_name = "LIMITS")]
        limits: Option<PathBuf>,
    },

    /// Compile schema documents and list what they define
    Inspect {
        /// Conceptual, storage or provider manifest documents
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /// Provider manifest supplying the storage primitive types
        #[arg(short, long, value_name = "MANIFEST")]
        manifest: Option<PathBuf>,

        /// Include primitive types
        #[arg(long)]
        primitives: bool,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

#[cfg(feature = "cli")]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Check {
            files,
            json,
            max_errors,
            manifest,
            limits,
        } => cmd_check(files, json, max_errors, manifest, limits),
        Commands::Inspect {
            files,
            manifest,
            primitives,
            json,
        } => cmd_inspect(files, manifest, primitives, json),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

#[cfg(feature = "cli")]
fn build_options(
    manifest: Option<PathBuf>,
    limits: Option<PathBuf>,
    max_errors: Option<usize>,
) -> Result<CompileOptions, Box<dyn std::error::Error>> {
    let mut limits = match limits {
        Some(path) => Limits::from_json_file(path)?,
        None => Limits::default(),
    };
    if let Some(max_errors) = max_errors {
        limits = limits.with_max_errors(max_errors);
    }
    let mut options = CompileOptions::new().with_limits(limits.clone());
    if let Some(path) = manifest {
        options = options.with_store_provider(Arc::new(load_manifest(&path, limits)?));
    }
    Ok(options)
}

#[cfg(feature = "cli")]
fn load_manifest(path: &Path, limits: Limits) -> Result<ManifestCatalog, Box<dyn std::error::Error>> {
    let mut manager = SchemaManager::with_options(CompileOptions::new().with_limits(limits));
    let document = manager.load_file(path);
    let compiled = manager.compile();
    match document {
        Some(document) if compiled => Ok(ManifestCatalog::from_model(manager.model(), document)?),
        _ => {
            for diagnostic in manager.diagnostics().items() {
                eprintln!("{}", diagnostic);
            }
            Err(format!("cannot use provider manifest {}", path.display()).into())
        }
    }
}

#[cfg(feature = "cli")]
fn compile(files: &[PathBuf], options: CompileOptions) -> SchemaManager {
    let mut manager = SchemaManager::with_options(options);
    for file in files {
        manager.load_file(file);
    }
    manager.compile();
    manager
}

#[cfg(feature = "cli")]
fn cmd_check(
    files: Vec<PathBuf>,
    json: bool,
    max_errors: Option<usize>,
    manifest: Option<PathBuf>,
    limits: Option<PathBuf>,
) -> Result<bool, Box<dyn std::error::Error>> {
    let options = build_options(manifest, limits, max_errors)?;
    let manager = compile(&files, options);
    let diagnostics = manager.diagnostics();

    if json {
        println!("{}", serde_json::to_string_pretty(diagnostics.items())?);
    } else {
        for diagnostic in diagnostics.items() {
            println!("{}", diagnostic);
        }
        println!(
            "{} documents: {} errors, {} warnings",
            manager.documents().len(),
            diagnostics.error_count(),
            diagnostics.warning_count()
        );
    }
    Ok(!diagnostics.has_errors())
}

#[cfg(feature = "cli")]
fn cmd_inspect(
    files: Vec<PathBuf>,
    manifest: Option<PathBuf>,
    primitives: bool,
    json: bool,
) -> Result<bool, Box<dyn std::error::Error>> {
    use serde_json::{json, Map, Value};

    let options = build_options(manifest, None, None)?;
    let manager = compile(&files, options);
    let model = manager.model();

    let types: Vec<(String, ElementKind)> = manager
        .types()
        .map(|(name, id)| (name.to_string(), model[id].element_kind()))
        .filter(|(_, kind)| primitives || *kind != ElementKind::PrimitiveType)
        .collect();
    let functions: Vec<String> = manager.functions().map(|(signature, _)| signature.to_string()).collect();
    let containers: Vec<String> = manager.containers().map(|(name, _)| name.to_string()).collect();

    if json {
        let mut output = Map::new();
        output.insert("state".to_string(), json!(manager.state().to_string()));
        let type_map: Map<String, Value> = types
            .iter()
            .map(|(name, kind)| (name.clone(), json!(kind.as_str())))
            .collect();
        output.insert("types".to_string(), Value::Object(type_map));
        output.insert("functions".to_string(), json!(functions));
        output.insert("containers".to_string(), json!(containers));
        output.insert("errors".to_string(), json!(manager.diagnostics().error_count()));
        println!("{}", serde_json::to_string_pretty(&Value::Object(output))?);
    } else {
        println!("edmschema v{}", edmschema::VERSION);
        println!();
        println!("Compilation: {} ({} documents)", manager.state(), manager.documents().len());

        println!("\n=== Types ===");
        for (name, kind) in &types {
            println!("  {} ({})", name, kind);
        }
        println!("\n=== Functions ===");
        for signature in &functions {
            println!("  {}", signature);
        }
        println!("\n=== Entity Containers ===");
        for name in &containers {
            println!("  {}", name);
        }
        if manager.diagnostics().has_errors() {
            println!();
            for diagnostic in manager.diagnostics().errors() {
                println!("{}", diagnostic);
            }
        }
    }
    Ok(!manager.diagnostics().has_errors())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(1);
}
