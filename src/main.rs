//! corpus CLI - Command line interface for corpus_store
//!
//! Inspects and edits test documents and drives the image store.

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use corpus_store::{Corpus, StorageConfig, StorageRoot, TestElement};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "corpus")]
#[command(about = "Inspect OCR test documents and manage stored test images")]
#[command(version)]
struct Cli {
    /// Storage root (defaults to $CORPUS_STORE_ROOT or the user data directory)
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Storage config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format (json or text)
    #[arg(short, long, default_value = "json")]
    format: OutputFormat,

    /// Log lookups and misses at debug level
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Subcommand)]
enum Commands {
    // === Document Commands ===
    /// Show every field of a test document
    Show {
        /// Path to the JSON document
        document: PathBuf,
        /// Picture to attach to the test
        #[arg(short, long)]
        image: Option<PathBuf>,
    },

    /// Set the recognition confidence of a test or one of its alterations
    SetConfidence {
        /// Path to the JSON document
        document: PathBuf,
        /// Confidence value
        #[arg(allow_negative_numbers = true)]
        value: f32,
        /// Alteration to update instead of the test itself
        #[arg(short, long)]
        alteration: Option<String>,
    },

    /// Set the recognized text of a test or one of its alterations
    SetText {
        /// Path to the JSON document
        document: PathBuf,
        /// Recognized text
        text: String,
        /// Alteration to update instead of the test itself
        #[arg(short, long)]
        alteration: Option<String>,
    },

    /// Summarize every test of a corpus directory
    List {
        /// Corpus directory
        dir: PathBuf,
    },

    // === Image Commands ===
    /// Store an image under a directory and file key
    SaveImage {
        /// Directory key
        dir_key: String,
        /// File key
        file_key: String,
        /// Image file to store
        image: PathBuf,
    },

    /// Write a stored image to a file
    LoadImage {
        /// Directory key
        dir_key: String,
        /// File key
        file_key: String,
        /// Destination file (format follows the extension)
        out: PathBuf,
    },

    /// Check whether an image is stored
    Exists {
        /// Directory key
        dir_key: String,
        /// File key
        file_key: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Show {
            document,
            image: picture_path,
        } => {
            let mut element = open_element(document)?;
            if let Some(picture_path) = picture_path {
                let picture = open_picture(picture_path)?;
                element.set_picture(picture);
            }
            output(&cli.format, &element_json(&element));
        }

        Commands::SetConfidence {
            document,
            value,
            alteration,
        } => {
            let mut element = open_element(document)?;
            let updated = match alteration {
                Some(name) => element.set_alteration_confidence(name, *value),
                None => element.set_confidence(*value),
            };
            finish_edit(&cli.format, &element, document, updated, alteration.as_deref())?;
        }

        Commands::SetText {
            document,
            text,
            alteration,
        } => {
            let mut element = open_element(document)?;
            let updated = match alteration {
                Some(name) => element.set_alteration_recognized_text(name, text.as_str()),
                None => element.set_recognized_text(text.as_str()),
            };
            finish_edit(&cli.format, &element, document, updated, alteration.as_deref())?;
        }

        Commands::List { dir } => {
            let corpus = Corpus::load_dir(dir)?;
            let items: Vec<_> = corpus
                .iter()
                .map(|e| {
                    json!({
                        "file_name": e.file_name(),
                        "confidence": confidence_json(e.confidence_opt()),
                        "has_picture": e.picture().is_some(),
                        "alterations": e.alteration_names().unwrap_or_default(),
                    })
                })
                .collect();
            output(
                &cli.format,
                &json!({
                    "count": items.len(),
                    "tests": items
                }),
            );
        }

        Commands::SaveImage {
            dir_key,
            file_key,
            image: picture_path,
        } => {
            let picture = open_picture(picture_path)?;
            let root = open_root(&cli)?;
            let mut store = root.image_store(dir_key, file_key);
            if !store.save(&picture) {
                bail!("Failed to save image {}/{}", dir_key, file_key);
            }
            output(
                &cli.format,
                &json!({
                    "status": "ok",
                    "path": store.path(),
                    "file": store.file_name()
                }),
            );
        }

        Commands::LoadImage {
            dir_key,
            file_key,
            out,
        } => {
            let root = open_root(&cli)?;
            let store = root.image_store(dir_key, file_key);
            let picture = store
                .load()
                .ok_or_else(|| anyhow!("No stored image for {}/{}", dir_key, file_key))?;
            picture
                .save(out)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            output(
                &cli.format,
                &json!({
                    "status": "ok",
                    "out": out.display().to_string(),
                    "width": picture.width(),
                    "height": picture.height()
                }),
            );
        }

        Commands::Exists { dir_key, file_key } => {
            let root = open_root(&cli)?;
            let store = root.image_store(dir_key, file_key);
            output(
                &cli.format,
                &json!({
                    "exists": store.exists(),
                    "dir": store.dir_name(),
                    "path": store.path()
                }),
            );
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_root(cli: &Cli) -> anyhow::Result<StorageRoot> {
    let config = match (&cli.root, &cli.config) {
        (Some(root), _) => StorageConfig::new(root),
        (None, Some(path)) => StorageConfig::load(path)?,
        (None, None) => StorageConfig::from_env()?,
    };
    Ok(StorageRoot::open(&config)?)
}

fn open_picture(path: &Path) -> anyhow::Result<image::DynamicImage> {
    image::open(path).with_context(|| format!("Failed to open image {}", path.display()))
}

fn open_element(path: &Path) -> anyhow::Result<TestElement> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let picture = corpus_store::corpus::load_picture(path);
    Ok(TestElement::from_json_str(picture, &content, name)?)
}

fn finish_edit(
    format: &OutputFormat,
    element: &TestElement,
    path: &Path,
    updated: bool,
    alteration: Option<&str>,
) -> anyhow::Result<()> {
    if !updated {
        bail!(
            "No alteration named '{}' in {}",
            alteration.unwrap_or_default(),
            path.display()
        );
    }
    std::fs::write(path, element.to_json_pretty()?)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    output(format, &element_json(element));
    Ok(())
}

fn element_json(element: &TestElement) -> Value {
    let alterations: Vec<_> = element
        .alteration_names()
        .unwrap_or_default()
        .iter()
        .map(|name| {
            json!({
                "name": name,
                "extracted_text": element.alteration_recognized_text(name),
                "confidence": confidence_json(element.alteration_confidence_opt(name)),
                "notes": element.alteration_notes(name),
                "tags": element.alteration_tags(name),
            })
        })
        .collect();

    json!({
        "file_name": element.file_name(),
        "has_picture": element.picture().is_some(),
        "ingredients": element.ingredients_array(),
        "tags": element.tags(),
        "notes": element.notes(),
        "confidence": confidence_json(element.confidence_opt()),
        "extracted_text": element.recognized_text(),
        "alterations": alterations
    })
}

/// Confidence in its stored text form, so 0.87 prints as 0.87
fn confidence_json(confidence: Option<f32>) -> Value {
    confidence
        .and_then(|c| format!("{}", c).parse::<f64>().ok())
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(value).unwrap());
        }
        OutputFormat::Text => {
            println!("{}", serde_json::to_string_pretty(value).unwrap());
        }
    }
}
