//! sourcegen's main application entry point and orchestration logic.
//! Handles command-line argument parsing, wires the configuration, template
//! loader, and manifest into a processor run, and reports diagnostics.

use sourcegen::{
    cli::{get_args, Args},
    config::ProjectConfig,
    error::{source_highlight, Error, Result},
    loader::TemplateLoader,
    logger::init_logger,
    manifest::Manifest,
    processor::{Processor, RunSummary},
};

/// Main application entry point.
fn main() {
    let args = get_args();
    init_logger(args.verbose);

    if let Err(err) = run(&args) {
        report_error(&err, &args);
        std::process::exit(err.exit_code());
    }
}

/// Prints the diagnostic, followed by the offending source line with a caret
/// underline when the error points into a loadable template.
fn report_error(err: &Error, args: &Args) {
    eprintln!("{}", err);
    if let Some((template, span)) = err.template_span() {
        if let Ok(source) = std::fs::read_to_string(args.templates.join(template)) {
            eprint!("{}", source_highlight(&source, span));
        }
    }
}

/// Main application logic execution.
///
/// # Flow
/// 1. Loads and validates the project configuration
/// 2. Derives the variable and flag maps
/// 3. Loads and validates the output manifest
/// 4. Runs the processor over every manifest entry
fn run(args: &Args) -> Result<RunSummary> {
    let config = ProjectConfig::load(&args.config)?;
    let variables = config.variable_map()?;
    let manifest = Manifest::load(&args.manifest)?;
    let loader = TemplateLoader::new(&args.templates);

    let processor =
        Processor::new(&loader, &variables, &args.out, args.dry_run, args.jobs);
    let summary = processor.run(&manifest)?;

    if args.dry_run {
        println!(
            "Dry run completed: {} planned, {} skipped.",
            summary.written, summary.skipped
        );
    } else {
        println!(
            "Generation completed in '{}': {} written, {} skipped.",
            args.out.display(),
            summary.written,
            summary.skipped
        );
    }
    Ok(summary)
}
