//! Defines the command-line arguments for the vouch CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::Parser;
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "vouch",
    version,
    about = "Generates validation code from an inert, fluent constraints DSL."
)]
pub struct VouchArgs {
    /// The path to a source file to generate validation code for.
    #[arg(required = true)]
    pub source: PathBuf,

    /// Where to write the generated file. Defaults to
    /// `<source-without-extension>_validate.<ext>`.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// The struct tag consulted for field aliases in violation paths.
    #[arg(long, default_value = "vouch")]
    pub tag: String,

    /// Print the extracted rules as JSON instead of generating code.
    #[arg(long)]
    pub dump_rules: bool,
}
