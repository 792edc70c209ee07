//! docxcompose CLI - Command-line interface library
//!
//! Appends Word documents to a master document and writes the result.
//!
//! # Library Usage
//!
//! ```ignore
//! use docxcompose_cli::{compose_command, Settings};
//!
//! let options = Settings::default().to_options();
//! compose_command(&master, &[chapter], &output, options)?;
//! ```
//!
//! # Binary Usage
//!
//! ```bash
//! # Append two chapters to a master document
//! docxcompose master.docx intro.docx body.docx -o book.docx
//!
//! # Keep DOCPROPERTY fields and read options from a file
//! docxcompose master.docx body.docx --keep-property-fields --config compose.toml
//! ```

pub mod app;
pub mod settings;

pub use app::{compose_command, init_logging, run, run_cli, Cli};
pub use settings::{BookmarkMode, Settings};
