//! coreprops CLI - edit DOCX core properties from the terminal
//!
//! Shows and edits the title, creators, keywords and description stored in
//! `docProps/core.xml`, leaving the rest of the document untouched.

mod prompt;

use clap::{Parser, Subcommand};
use colored::*;
use coreprops::render::{to_json, to_text, JsonFormat};
use coreprops::{
    DocxContainer, EditOptions, EditReport, Error, MetadataSource, CORE_PROPERTIES_PATH,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use crate::prompt::PromptEditor;

/// Edit Dublin Core metadata in DOCX files
#[derive(Parser)]
#[command(
    name = "coreprops",
    version,
    about = "Edit Dublin Core metadata in DOCX files",
    long_about = "coreprops - edit the core properties of DOCX documents.\n\n\
                  Run with a file path to edit it in place (a .backup copy is made first)."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// DOCX file to edit in place
    file: Option<PathBuf>,

    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Edit metadata with the terminal form
    #[command(visible_alias = "e")]
    Edit {
        /// Input file path
        input: PathBuf,

        /// Output file (default: overwrite the input after a backup)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// View current metadata
    #[command(visible_alias = "v")]
    View {
        /// DOCX file to view
        #[arg(short, long)]
        file: PathBuf,

        /// Print the full record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the raw metadata entry and how it was decoded
    #[command(visible_alias = "d")]
    Debug {
        /// DOCX file to inspect
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match (cli.command, cli.file) {
        (Some(Commands::Edit { input, output }), _) => edit(&input, output)?,
        (Some(Commands::View { file, json }), _) => view(&file, json)?,
        (Some(Commands::Debug { file }), _) => debug(&file)?,
        (Some(Commands::Version), _) => print_version(),
        (None, Some(file)) => edit(&file, None)?,
        (None, None) => {
            return Err(
                "please provide a DOCX file path and command\nUse --help for usage information"
                    .into(),
            );
        }
    }
    Ok(())
}

fn ensure_exists(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("file does not exist: {}", path.display()).into());
    }
    Ok(())
}

fn edit(input: &Path, output: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    ensure_exists(input)?;

    let doc = DocxContainer::open(input)?;
    println!("{} {}", "Opening:".cyan().bold(), input.display());
    println!("{}", "Current metadata:".bold());
    println!("{}", to_text(doc.metadata()));
    warn_on_fallback(doc.source());
    println!();
    drop(doc);

    let mut options = EditOptions::new();
    if let Some(output) = output {
        options = options.with_output(output);
    }
    tracing::debug!(?options, "starting edit session");

    let mut editor = PromptEditor::stdio();
    match coreprops::edit_file(input, &options, &mut editor)? {
        EditReport::Cancelled => {
            println!("{} Edit cancelled. No changes made.", "✗".yellow().bold());
        }
        EditReport::Unchanged => {
            println!("{} No changes made. File remains unchanged.", "✓".green().bold());
        }
        EditReport::Saved {
            output,
            backup,
            metadata,
        } => {
            if let Some(backup) = backup {
                println!("{} Created backup: {}", "✓".green().bold(), backup.display());
            }
            println!(
                "{} Metadata updated successfully in {}",
                "✓".green().bold(),
                output.display()
            );
            println!("\n{}", "Updated metadata:".bold());
            println!("{}", to_text(&metadata));
        }
    }

    Ok(())
}

fn view(file: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    ensure_exists(file)?;
    let doc = DocxContainer::open(file)?;

    if json {
        println!("{}", to_json(doc.metadata(), JsonFormat::Pretty)?);
        return Ok(());
    }

    println!("{} {}", "File:".cyan().bold(), file.display());
    println!("{}", "─".repeat(40));
    println!("{}", to_text(doc.metadata()));
    warn_on_fallback(doc.source());
    Ok(())
}

fn debug(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    ensure_exists(file)?;
    println!("{} {}", "Debugging:".cyan().bold(), file.display());

    let doc = DocxContainer::open(file)?;
    let raw = doc
        .raw_core_xml()?
        .ok_or_else(|| Error::MissingComponent(CORE_PROPERTIES_PATH.to_string()))?;

    println!("{}", "=== Raw core.xml content ===".bold());
    println!("{}", raw);
    println!("{}", "============================".bold());

    let source = match doc.source() {
        MetadataSource::Missing => "missing".to_string(),
        MetadataSource::Decoded(strategy) => format!("decoded ({})", strategy),
        MetadataSource::Fallback(reason) => format!("defaults ({})", reason),
    };
    println!("{}: {}", "Source".bold(), source);

    println!("{}", "=== Parsed metadata ===".bold());
    println!("{}", to_json(doc.metadata(), JsonFormat::Pretty)?);
    Ok(())
}

fn warn_on_fallback(source: &MetadataSource) {
    if let MetadataSource::Fallback(reason) = source {
        println!(
            "{} existing metadata could not be decoded ({}); showing defaults",
            "!".yellow().bold(),
            reason
        );
    }
}

fn print_version() {
    println!("{} {}", "coreprops".green().bold(), env!("CARGO_PKG_VERSION"));
    println!("Edit Dublin Core metadata in DOCX files");
}
