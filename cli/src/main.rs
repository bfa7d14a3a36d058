mod formatter;
mod server;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use formatter::Formatter;
use rulemorph::{Engine, FunctionRegistry};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "rulemorph")]
#[command(about = "Declarative cleanup rules for extracted JSON documents.")]
#[command(
    long_about = "Rulemorph applies an ordered list of condition/action rules to JSON documents.\nThe CLI runs a rule file against documents, checks rule files, reconciles single line items, or serves the engine over HTTP."
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform documents with a rule file
    ///
    /// INPUT is a JSON file, or a directory whose .json files are each
    /// transformed. The transformed documents are printed to stdout.
    Run {
        /// Rule configuration (a JSON array of rules)
        rules: PathBuf,
        /// Document file or directory of documents
        input: PathBuf,
        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
        /// Start from an empty function registry
        #[arg(long)]
        no_builtins: bool,
    },
    /// Validate a rule file and summarise its rules
    Check {
        /// Rule configuration (a JSON array of rules)
        rules: PathBuf,
    },
    /// Reconcile one quantity / unit price / total price triple
    ///
    /// Values are read as JSON where possible, so `3`, `"3"` and `2.50` all work.
    Reconcile {
        quantity: String,
        unit_price: String,
        total_price: String,
    },
    /// Start HTTP REST API server (default: localhost:3000)
    ///
    /// API: POST /transform with the document as body, GET /health
    Server {
        /// Rule configuration (a JSON array of rules)
        #[arg(short, long)]
        rules: PathBuf,
        /// Host address to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Port number to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Run {
            rules,
            input,
            pretty,
            no_builtins,
        } => run_command(rules, input, *pretty, *no_builtins),
        Commands::Check { rules } => check_command(rules),
        Commands::Reconcile {
            quantity,
            unit_price,
            total_price,
        } => reconcile_command(quantity, unit_price, total_price),
        Commands::Server { rules, host, port } => server_command(rules, host, *port),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("RULEMORPH_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("rulemorph=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_command(rules: &Path, input: &Path, pretty: bool, no_builtins: bool) -> Result<()> {
    let functions = if no_builtins {
        FunctionRegistry::new()
    } else {
        FunctionRegistry::with_builtins()
    };
    let engine = load_engine(rules, functions)?;

    for file in documents(input)? {
        let mut document = read_json(&file)?;
        engine
            .transform(&mut document)
            .with_context(|| format!("failed to transform {}", file.display()))?;
        let output = if pretty {
            serde_json::to_string_pretty(&document)?
        } else {
            serde_json::to_string(&document)?
        };
        println!("{}", output);
    }

    Ok(())
}

fn check_command(rules: &Path) -> Result<()> {
    let engine = load_engine(rules, FunctionRegistry::with_builtins())?;
    let formatter = Formatter::default();
    print!("{}", formatter.format_rules(engine.rules(), engine.functions()));
    Ok(())
}

fn reconcile_command(quantity: &str, unit_price: &str, total_price: &str) -> Result<()> {
    let quantity = loose_json(quantity);
    let unit_price = loose_json(unit_price);
    let total_price = loose_json(total_price);

    let outcome = rulemorph::reconcile(&quantity, &unit_price, &total_price);
    println!(
        "{}",
        serde_json::to_string_pretty(&outcome.to_json(&quantity, &unit_price, &total_price))?
    );
    Ok(())
}

fn server_command(rules: &Path, host: &str, port: u16) -> Result<()> {
    #[cfg(feature = "server")]
    {
        use tokio::runtime::Runtime;
        let engine = load_engine(rules, FunctionRegistry::with_builtins())?;
        println!(
            "Starting HTTP server with {} rule(s) loaded",
            engine.rules().len()
        );
        let rt = Runtime::new()?;
        rt.block_on(server::http::start_server(engine, host, port))?;
    }

    #[cfg(not(feature = "server"))]
    {
        let _ = (rules, host, port);
        eprintln!("Error: Server feature not enabled");
        eprintln!("Recompile with: cargo build --features server");
        std::process::exit(1);
    }

    Ok(())
}

fn load_engine(rules: &Path, functions: FunctionRegistry) -> Result<Engine> {
    let config = read_json(rules)?;
    Engine::new(&config, functions)
        .with_context(|| format!("invalid rule configuration in {}", rules.display()))
}

fn read_json(file: &Path) -> Result<Value> {
    let text = fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", file.display()))
}

/// The file itself, or every .json file below a directory in path order
fn documents(input: &Path) -> Result<Vec<PathBuf>> {
    if !input.is_dir() {
        return Ok(vec![input.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(input).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file()
            && entry.path().extension().and_then(|s| s.to_str()) == Some("json")
        {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Parse an argument as JSON, falling back to a plain string
fn loose_json(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
