//! # folio
//!
//! Command-line access to an on-disk Folio document store: list, create,
//! rename and delete documents, and export them as PNG/JPG archives, PDF or
//! JSON.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use folio_core::{DocumentId, DocumentStore, MemoryStore, NewPage, PageStore};
use folio_editor::EditorConfig;
use folio_renderer::{ExportFormat, ExportOptions, ExportPipeline, OffscreenFactory};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "folio", version, about = "Folio document store and exporter")]
struct Cli {
    /// Directory holding one JSON file per document.
    #[arg(long, env = "FOLIO_DATA_DIR", default_value = "folio-data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List documents, most recently updated first.
    Documents,
    /// Create a document with one or more blank pages.
    Create {
        /// Display name.
        #[arg(long)]
        name: String,
        /// Number of pages.
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Rename a document.
    Rename {
        /// Document id.
        #[arg(long)]
        document: String,
        /// New display name.
        #[arg(long)]
        name: String,
    },
    /// Delete a document and its pages.
    Delete {
        /// Document id.
        #[arg(long)]
        document: String,
    },
    /// Export a document.
    Export {
        /// Document id.
        #[arg(long)]
        document: String,
        /// png, jpg, pdf or json.
        #[arg(long, default_value = "pdf")]
        format: ExportFormat,
        /// Output directory.
        #[arg(long, default_value = ".")]
        out: PathBuf,
        /// Base name of the artifact; defaults to the document name.
        #[arg(long)]
        file_name: Option<String>,
    },
}

/// Initialize structured tracing with optional JSON format.
///
/// Set `RUST_LOG` to control log levels (default: info,folio_editor=debug).
/// Set `RUST_LOG_FORMAT=json` for JSON output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,folio_editor=debug"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

fn open_store(data_dir: &Path) -> anyhow::Result<MemoryStore> {
    let store = MemoryStore::with_data_dir(data_dir)
        .with_context(|| format!("cannot use data directory {}", data_dir.display()))?;
    let loaded = store.load_from_disk()?;
    tracing::debug!("Loaded {} documents from {}", loaded.len(), data_dir.display());
    Ok(store)
}

fn parse_document(id: &str) -> anyhow::Result<DocumentId> {
    DocumentId::parse(id).with_context(|| format!("invalid document id '{id}'"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = EditorConfig::from_env();
    let store = open_store(&cli.data_dir)?;

    match cli.cmd {
        Command::Documents => {
            for doc in store.list_documents().await? {
                let pages = store.list_pages(doc.id).await?;
                println!("{}\t{}\t{} pages", doc.id, doc.name, pages.len());
            }
        }
        Command::Create { name, pages } => {
            let (doc, _) = store.create_document(&name).await?;
            for position in 2..=pages {
                let page = NewPage::with_default_scene(
                    doc.id,
                    position,
                    config.page_width,
                    config.page_height,
                )?;
                store.create_page(page).await?;
            }
            println!("{}", doc.id);
        }
        Command::Rename { document, name } => {
            let doc = store
                .rename_document(parse_document(&document)?, &name)
                .await?;
            tracing::info!("Renamed {} to {}", doc.id, doc.name);
        }
        Command::Delete { document } => {
            let id = store.delete_document(parse_document(&document)?).await?;
            tracing::info!("Deleted document {id}");
        }
        Command::Export {
            document,
            format,
            out,
            file_name,
        } => {
            let id = parse_document(&document)?;
            let document_name = store.get_document(id).await?.name;
            let options = ExportOptions { file_name }.or_named(document_name);
            let factory = OffscreenFactory::with_system_fonts(config.export.raster_config());
            let pipeline =
                ExportPipeline::new(Arc::new(store), Arc::new(factory), config.export.clone());
            let artifact = pipeline
                .export(id, format, &options)
                .await
                .with_context(|| format!("export of document {id} failed"))?;

            std::fs::create_dir_all(&out)?;
            let path = out.join(&artifact.file_name);
            std::fs::write(&path, &artifact.bytes)
                .with_context(|| format!("cannot write {}", path.display()))?;
            println!("{}", path.display());
        }
    }

    Ok(())
}
