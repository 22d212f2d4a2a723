//! `docprops` CLI -- read and write document properties in a JSON snapshot file.
//!
//! ## Usage
//!
//! ```sh
//! # Store a nested object; it becomes a sub-document
//! docprops --db people.json set --doc jim address '{"city":"galaxy city","zip":12345}'
//!
//! # Read a nested value with a typed coercion
//! docprops --db people.json get --doc jim address.zip --as int
//!
//! # Store a date instead of a string
//! docprops --db people.json set --doc jim born 1990-04-01T00:00:00Z --date
//!
//! # Export a whole document
//! docprops --db people.json dump --doc jim
//! ```
//!
//! `--db` falls back to `DOCPROPS_DB`, then `docprops.json`. Set `RUST_LOG=debug`
//! to trace document and sub-document activity on stderr.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use docprops_core::date::{format_date, parse_date};
use docprops_core::{persist, Database, Properties, PropertyView, Value};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "docprops",
    version,
    about = "Typed document properties with nested sub-documents"
)]
struct Cli {
    /// Snapshot file holding the database (created on first write)
    #[arg(long, env = "DOCPROPS_DB", default_value = "docprops.json", global = true)]
    db: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a property; PATH is dot-separated, numeric segments index arrays
    Get {
        #[arg(long)]
        doc: String,
        path: String,
        /// How to render the value
        #[arg(long = "as", value_enum, default_value_t = Render::Json)]
        render: Render,
    },
    /// Write a property from JSON text
    Set {
        #[arg(long)]
        doc: String,
        key: String,
        /// JSON value, or ISO-8601 text with --date
        value: String,
        /// Store VALUE as a date
        #[arg(long)]
        date: bool,
    },
    /// Remove a property
    Remove {
        #[arg(long)]
        doc: String,
        key: String,
    },
    /// Print a document as pretty JSON
    Dump {
        #[arg(long)]
        doc: String,
    },
    /// List the keys of a document
    Keys {
        #[arg(long)]
        doc: String,
    },
    /// List saved document ids
    Docs,
}

#[derive(Clone, Copy, ValueEnum)]
enum Render {
    Json,
    Kind,
    Bool,
    Int,
    Float,
    Double,
    String,
    Date,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut db = open_database(&cli.db)?;

    match cli.command {
        Commands::Get { doc, path, render } => {
            let value = {
                let mut props = open_document(&mut db, &doc)?;
                resolve_path(&mut props, &path)
            };
            println!("{}", render_value(&db, value.as_ref(), render, &path)?);
        }
        Commands::Set {
            doc,
            key,
            value,
            date,
        } => {
            let value = if date {
                match parse_date(&value) {
                    Some(d) => Value::Date(d),
                    None => bail!("Not an ISO-8601 date with a timezone: '{}'", value),
                }
            } else {
                let json: serde_json::Value = serde_json::from_str(&value)
                    .with_context(|| format!("Invalid JSON value for '{}'", key))?;
                Value::from(json)
            };
            open_document(&mut db, &doc)?
                .set(&key, value)
                .with_context(|| format!("Failed to set '{}' on '{}'", key, doc))?;
            commit(&mut db, &doc, &cli.db)?;
        }
        Commands::Remove { doc, key } => {
            open_document(&mut db, &doc)?
                .remove(&key)
                .with_context(|| format!("Failed to remove '{}' from '{}'", key, doc))?;
            commit(&mut db, &doc, &cli.db)?;
        }
        Commands::Dump { doc } => {
            let json = open_document(&mut db, &doc)?
                .to_json()
                .with_context(|| format!("Failed to export '{}'", doc))?;
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        Commands::Keys { doc } => {
            for key in open_document(&mut db, &doc)?.keys() {
                println!("{}", key);
            }
        }
        Commands::Docs => {
            for id in db.document_ids() {
                println!("{}", id);
            }
        }
    }

    Ok(())
}

fn open_database(path: &Path) -> Result<Database> {
    if !path.exists() {
        debug!(path = %path.display(), "no database file, starting empty");
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        return Ok(Database::new(name));
    }
    Database::load_file(path)
        .with_context(|| format!("Failed to load database: {}", path.display()))
}

fn open_document<'a>(db: &'a mut Database, id: &str) -> Result<Properties<'a>> {
    db.document(id)
        .with_context(|| format!("Failed to open document '{}'", id))
}

fn commit(db: &mut Database, doc: &str, path: &Path) -> Result<()> {
    db.save(doc)
        .with_context(|| format!("Failed to save document '{}'", doc))?;
    db.save_file(path)
        .with_context(|| format!("Failed to write database: {}", path.display()))?;
    debug!(doc, path = %path.display(), "document committed");
    Ok(())
}

/// Follow a dotted path from a top-level key. A numeric segment indexes an
/// array; on anything else it is used as a key.
fn resolve_path(props: &mut Properties<'_>, path: &str) -> Option<Value> {
    let mut segments = path.split('.');
    let mut view = props.view(segments.next()?);
    for segment in segments {
        view = match (view.value(), segment.parse::<usize>()) {
            (Some(Value::Array(_)), Ok(index)) => view.at(index),
            _ => view.get(segment),
        };
    }
    view.value().cloned()
}

fn render_value(db: &Database, value: Option<&Value>, render: Render, path: &str) -> Result<String> {
    let view = match value {
        Some(v) => db.graph().view(v),
        None => PropertyView::absent(),
    };
    let text = match render {
        Render::Json => {
            let Some(value) = value else {
                bail!("No value at '{}'", path);
            };
            let json = persist::encode_value(db.graph(), value)
                .with_context(|| format!("Failed to export '{}'", path))?;
            serde_json::to_string_pretty(&json)?
        }
        Render::Kind => view
            .kind()
            .map(|k| k.to_string())
            .unwrap_or_else(|| "absent".to_string()),
        Render::Bool => view.bool().to_string(),
        Render::Int => view.int().to_string(),
        Render::Float => view.float().to_string(),
        Render::Double => view.double().to_string(),
        Render::String => view.string().unwrap_or_default().to_string(),
        Render::Date => view.date().map(|d| format_date(&d)).unwrap_or_default(),
    };
    Ok(text)
}
