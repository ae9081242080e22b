//! The vouch command-line interface.
//!
//! Orchestrates the whole pipeline for one invocation: read the source
//! file, parse it, extract the rules, generate the validation code, and
//! write it out. Warnings collected along the way go to stderr; any fatal
//! error terminates the run with a non-zero exit and no output file.

use std::fs;
use std::process::ExitCode;

use clap::Parser;
use miette::{miette, IntoDiagnostic, WrapErr};

use crate::cli::args::VouchArgs;
use crate::codegen::{write, Generator};
use crate::constraints;
use crate::diagnostics::Warning;
use crate::extract;
use crate::source::Source;
use crate::syntax;

pub mod args;

/// The main entry point for the CLI.
pub fn run() -> ExitCode {
    let args = VouchArgs::parse();

    match execute(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => {
            eprintln!("{:?}", report);
            ExitCode::FAILURE
        }
    }
}

fn execute(args: &VouchArgs) -> miette::Result<()> {
    let text = fs::read_to_string(&args.source)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read source file {:?}", args.source))?;

    let file_name = args
        .source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| miette!("source path {:?} has no file name", args.source))?;

    let parsed = syntax::parse(&text, &file_name)?;
    let source = Source::from_file(parsed, &file_name, &text);

    let extraction = extract::extract(&source)?;
    report_warnings(&extraction.warnings);

    if args.dump_rules {
        let rendered = serde_json::to_string_pretty(&extraction.rules).into_diagnostic()?;
        println!("{}", rendered);
        return Ok(());
    }

    let generator = Generator::new(constraints::built_in(), &args.tag);
    let generated = generator.generate(&extraction.rules, &source)?;
    report_warnings(&generated.warnings);

    let dest = args
        .out
        .clone()
        .unwrap_or_else(|| write::destination_for(&args.source));

    write::write(&generated.text, &dest)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to write generated source to {:?}", dest))?;

    Ok(())
}

fn report_warnings(warnings: &[Warning]) {
    for warning in warnings {
        eprintln!("vouch: {}", warning);
    }
}
