//! SbExport CLI
//!
//! Command-line interface for decoding, extracting and rebuilding
//! automation-tool export tokens.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sbexport_core::{decode_token, encode_document, extract, inject, Extraction, FileSource};

#[derive(Parser)]
#[command(name = "sbexport")]
#[command(about = "Export token decoder and rebuilder")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode an export token into JSON and extracted scripts
    Decode {
        /// File containing the export token
        input: PathBuf,

        /// Where to write the decoded JSON (default: decoded_export.json)
        #[arg(short, long)]
        json: Option<PathBuf>,

        /// Directory to write extracted .cs files to (default: scripts)
        #[arg(short, long)]
        scripts: Option<PathBuf>,
    },

    /// Extract scripts from an already-decoded JSON document
    Extract {
        /// Decoded JSON document
        input: PathBuf,

        /// Directory to write extracted .cs files to (default: scripts)
        #[arg(short, long)]
        scripts: Option<PathBuf>,
    },

    /// Rebuild an export token from a JSON template and a scripts folder
    Encode {
        /// Template JSON with byteCode fields referencing .cs files
        input: PathBuf,

        /// Directory containing the referenced .cs files
        #[arg(short, long, default_value = "scripts")]
        scripts: PathBuf,

        /// Where to write the token (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sbexport=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Decode {
            input,
            json,
            scripts,
        } => cmd_decode(input, json, scripts),
        Commands::Extract { input, scripts } => cmd_extract(input, scripts),
        Commands::Encode {
            input,
            scripts,
            output,
        } => cmd_encode(input, scripts, output),
    }
}

/// Decode a token file and extract its scripts
fn cmd_decode(input: PathBuf, json: Option<PathBuf>, scripts: Option<PathBuf>) -> Result<()> {
    let token = fs::read_to_string(&input)
        .with_context(|| format!("Failed to read token file: {}", input.display()))?;

    let document = decode_token(&token)?;

    let json_path = json.unwrap_or_else(|| PathBuf::from("decoded_export.json"));
    let pretty = serde_json::to_string_pretty(&document)?;
    fs::write(&json_path, pretty)
        .with_context(|| format!("Failed to write {}", json_path.display()))?;
    println!("Decoded document written to {}", json_path.display());

    let scripts_dir = scripts.unwrap_or_else(|| PathBuf::from("scripts"));
    let extraction = extract(&document);
    write_payloads(&extraction, &scripts_dir)?;

    Ok(())
}

/// Extract scripts from a decoded JSON file
fn cmd_extract(input: PathBuf, scripts: Option<PathBuf>) -> Result<()> {
    let content = fs::read_to_string(&input)
        .with_context(|| format!("Failed to read JSON file: {}", input.display()))?;
    let document: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON file: {}", input.display()))?;

    let scripts_dir = scripts.unwrap_or_else(|| PathBuf::from("scripts"));
    let extraction = extract(&document);
    write_payloads(&extraction, &scripts_dir)?;

    Ok(())
}

/// Rebuild a token from a template and scripts folder
fn cmd_encode(input: PathBuf, scripts: PathBuf, output: Option<PathBuf>) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("JSON file not found: {}", input.display());
    }
    if !scripts.exists() {
        anyhow::bail!("Scripts folder not found: {}", scripts.display());
    }

    let content = fs::read_to_string(&input)
        .with_context(|| format!("Failed to read JSON file: {}", input.display()))?;
    let mut document: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON file: {}", input.display()))?;

    let source = DirSource::new(&scripts);
    let injection = inject(&mut document, &source);
    for filename in &injection.missing {
        tracing::warn!("Script file not found: {}", filename);
    }

    let token = encode_document(&document)?;

    match output {
        Some(path) => {
            fs::write(&path, &token)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "Injected {} scripts; token written to {}",
                injection.injected,
                path.display()
            );
        }
        None => {
            println!("{}", token);
            tracing::info!("Injected {} scripts", injection.injected);
        }
    }

    Ok(())
}

/// Write extracted payloads to a directory, reporting skipped records
fn write_payloads(extraction: &Extraction, dir: &Path) -> Result<()> {
    for record in &extraction.skipped {
        tracing::warn!("Skipped payload at {}: {}", record.path, record.reason);
    }

    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create scripts directory: {}", dir.display()))?;

    for (filename, content) in &extraction.payloads {
        let path = dir.join(filename);
        fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    println!(
        "Extracted {} scripts to {}",
        extraction.payloads.len(),
        dir.display()
    );
    Ok(())
}

/// File source backed by a directory of .cs files
struct DirSource {
    root: PathBuf,
}

impl DirSource {
    fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }
}

impl FileSource for DirSource {
    fn resolve(&self, filename: &str) -> Option<String> {
        fs::read_to_string(self.root.join(filename)).ok()
    }
}
