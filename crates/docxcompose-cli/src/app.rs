//! CLI Application logic
//!
//! Contains the command-line interface implementation.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use log::LevelFilter;

use docxcompose_core::{ComposeOptions, ComposeReport, Composer};
use docxcompose_ooxml::WordDocument;

use crate::settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "docxcompose")]
#[command(author, version, about = "Compose Word documents into one", long_about = None)]
pub struct Cli {
    /// Master document the others are appended to
    pub master: PathBuf,

    /// Documents to append, in order
    #[arg(required = true)]
    pub documents: Vec<PathBuf>,

    /// Output DOCX file
    #[arg(short, long, default_value = "composed.docx")]
    pub output: PathBuf,

    /// Configuration file path (default: ./docxcompose.toml if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Keep DOCPROPERTY fields of appended documents
    #[arg(long)]
    pub keep_property_fields: bool,

    /// Do not restart numbered lists in appended documents
    #[arg(long)]
    pub no_restart_numbering: bool,

    /// Log more (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Compose options from `settings` with the command-line flags applied
    pub fn options(&self, settings: &Settings) -> ComposeOptions {
        let mut options = settings.to_options();
        if self.keep_property_fields {
            options.remove_property_fields = false;
        }
        if self.no_restart_numbering {
            options.restart_numbering = false;
        }
        options
    }
}

/// Run the CLI application
///
/// This is the main entry point for the command-line interface.
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run(&cli)
}

/// Run an already parsed command line
pub fn run(cli: &Cli) -> Result<()> {
    let cwd = env::current_dir().context("Failed to determine working directory")?;
    let settings = Settings::discover(cli.config.as_deref(), &cwd)?;
    init_logging(cli.verbose, &settings.log.level);

    println!("docxcompose v{}", docxcompose_core::VERSION);
    let reports = compose_command(&cli.master, &cli.documents, &cli.output, cli.options(&settings))?;

    let blocks: usize = reports.iter().map(|report| report.blocks).sum();
    println!(
        "  Appended {} document(s), {} block(s)",
        reports.len(),
        blocks
    );
    println!("  Output: {}", cli.output.display());
    Ok(())
}

/// Set up `env_logger`
///
/// `-v` flags win over `RUST_LOG`, which wins over `default_level`.
pub fn init_logging(verbose: u8, default_level: &str) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));
    let level = match verbose {
        0 => None,
        1 => Some(LevelFilter::Info),
        2 => Some(LevelFilter::Debug),
        _ => Some(LevelFilter::Trace),
    };
    if let Some(level) = level {
        builder
            .filter_module("docxcompose_core", level)
            .filter_module("docxcompose_ooxml", level)
            .filter_module("docxcompose_cli", level);
    }
    // A logger may already be installed, e.g. when running in tests
    let _ = builder.format_timestamp(None).try_init();
}

/// Append `documents` to `master` and write the result to `output`
pub fn compose_command(
    master: &Path,
    documents: &[PathBuf],
    output: &Path,
    options: ComposeOptions,
) -> Result<Vec<ComposeReport>> {
    println!("Composing: {}", master.display());

    if !master.exists() {
        anyhow::bail!("Master document not found: {}", master.display());
    }
    let target = WordDocument::open(master)
        .with_context(|| format!("Failed to open master document: {}", master.display()))?;

    let mut composer = Composer::with_options(target, options);
    let mut reports = Vec::with_capacity(documents.len());
    for path in documents {
        println!("  + {}", path.display());
        let mut source = WordDocument::open(path)
            .with_context(|| format!("Failed to open document: {}", path.display()))?;
        let report = composer
            .append(&mut source)
            .with_context(|| format!("Failed to append document: {}", path.display()))?;
        log::debug!("{}: {:?}", path.display(), report);
        reports.push(report);
    }

    composer
        .save(output)
        .with_context(|| format!("Failed to write output file: {}", output.display()))?;
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_arguments() {
        let cli = Cli::try_parse_from([
            "docxcompose",
            "master.docx",
            "a.docx",
            "b.docx",
            "-o",
            "out.docx",
            "--keep-property-fields",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.master, PathBuf::from("master.docx"));
        assert_eq!(cli.documents, vec![PathBuf::from("a.docx"), PathBuf::from("b.docx")]);
        assert_eq!(cli.output, PathBuf::from("out.docx"));
        assert!(cli.keep_property_fields);
        assert!(!cli.no_restart_numbering);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_documents_required() {
        assert!(Cli::try_parse_from(["docxcompose", "master.docx"]).is_err());
    }

    #[test]
    fn test_default_output() {
        let cli = Cli::try_parse_from(["docxcompose", "m.docx", "a.docx"]).unwrap();
        assert_eq!(cli.output, PathBuf::from("composed.docx"));
    }

    #[test]
    fn test_flags_override_settings() {
        let settings = Settings::from_toml_str("[compose]\nnsid_seed = 9\n").unwrap();
        let cli = Cli::try_parse_from([
            "docxcompose",
            "m.docx",
            "a.docx",
            "--keep-property-fields",
            "--no-restart-numbering",
        ])
        .unwrap();
        let options = cli.options(&settings);
        assert!(!options.remove_property_fields);
        assert!(!options.restart_numbering);
        assert_eq!(options.nsid_seed, Some(9));

        let plain = Cli::try_parse_from(["docxcompose", "m.docx", "a.docx"]).unwrap();
        assert_eq!(plain.options(&settings), settings.to_options());
    }
}
