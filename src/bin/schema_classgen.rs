//! Schema Class Generator CLI
//!
//! Resolves schema roots into a class model and writes class descriptors.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use schema_classgen::config::OutputFormat;
use schema_classgen::pipeline::roots_from_directory;
use schema_classgen::{
    Draft, Emitter, GeneratedModel, GeneratorConfig, JsonDescriptorEmitter, Pipeline, RootConfig,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-classgen")]
#[command(about = "Generate a typed class model from JSON Schema documents")]
struct Cli {
    /// Config file (defaults to classgen.toml lookup)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Log at debug level when RUST_LOG is not set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct Inputs {
    /// Root document URI or path (repeatable)
    #[arg(short, long)]
    root: Vec<String>,

    /// Package for roots given on the command line
    #[arg(short, long, default_value = "generated")]
    package: String,

    /// Use every *.json file under this directory as a root
    #[arg(long)]
    schema_dir: Option<PathBuf>,

    /// Extra search location for relative references (repeatable)
    #[arg(short, long)]
    search: Vec<String>,

    /// Fix the dialect instead of detecting it from $schema
    #[arg(long, value_enum)]
    dialect: Option<Draft>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the roots and write one descriptor per class
    Generate {
        #[command(flatten)]
        inputs: Inputs,

        /// Output directory
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Write compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Print the class -> URI mapping and diagnostics without writing files
    Inspect {
        #[command(flatten)]
        inputs: Inputs,

        /// Print the mapping as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = GeneratorConfig::load_from(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Generate { inputs, out, compact } => {
            let mut config = apply_inputs(config, inputs)?;
            if let Some(out) = out {
                config.output.dir = out;
            }
            if compact {
                config.output.format = OutputFormat::Compact;
            }

            let emitter = JsonDescriptorEmitter::from_config(&config.output);
            let model = Pipeline::new(config)?.run()?;
            let written = emitter.emit(&model)?;

            println!(
                "Generated {} classes from {} schemas ({} documents), {} files written",
                model.types.classes().len(),
                model.schema_count,
                model.document_count,
                written.len()
            );
            print_diagnostics(&model);
            println!("Fingerprint: {}", model.fingerprint);
            Ok(())
        }

        Commands::Inspect { inputs, json } => {
            let config = apply_inputs(config, inputs)?;
            let model = Pipeline::new(config)?.run()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&model.class_uris)?);
                return Ok(());
            }
            for id in model.types.inheritance_order() {
                let class = model.types.class(id);
                let extends = class
                    .superclass
                    .map(|s| format!(" extends {}", model.types.class(s).name))
                    .unwrap_or_default();
                println!("{}{} ({} fields)", class.name, extends, class.fields.len());
                for uri in &model.class_uris[&class.name] {
                    println!("    {}", uri);
                }
            }
            print_diagnostics(&model);
            Ok(())
        }
    }
}

/// Command-line roots and search locations come on top of the configured ones
fn apply_inputs(mut config: GeneratorConfig, inputs: Inputs) -> Result<GeneratorConfig> {
    for uri in inputs.root {
        config.roots.push(RootConfig {
            uri,
            package: inputs.package.clone(),
            header: None,
        });
    }
    if let Some(dir) = inputs.schema_dir {
        let found = roots_from_directory(&dir, &inputs.package)
            .with_context(|| format!("Failed to scan {}", dir.display()))?;
        config.roots.extend(found);
    }
    config.search_locations.extend(inputs.search);
    if inputs.dialect.is_some() {
        config.dialect = inputs.dialect;
    }
    Ok(config)
}

fn print_diagnostics(model: &GeneratedModel) {
    if !model.diagnostics.is_empty() {
        eprintln!("{}", model.diagnostics);
    }
}
