//! Command-line interface implementation for sourcegen.
//! Provides argument parsing and help text formatting using clap.

use clap::{error::ErrorKind, CommandFactory, Parser};
use std::path::PathBuf;

/// Command-line arguments structure for sourcegen.
#[derive(Parser, Debug)]
#[command(author, version, about = "sourcegen: deterministic template-driven source tree generator", long_about = None)]
pub struct Args {
    /// Path to the project configuration file (JSON or YAML)
    #[arg(long, value_name = "PATH")]
    pub config: PathBuf,

    /// Root directory of the template tree
    #[arg(long, value_name = "DIR")]
    pub templates: PathBuf,

    /// Path to the output manifest (JSON or YAML)
    #[arg(long, value_name = "PATH")]
    pub manifest: PathBuf,

    /// Directory under which all generated files are written
    #[arg(long, value_name = "DIR")]
    pub out: PathBuf,

    /// Resolve and compose every entry without writing any file
    #[arg(long)]
    pub dry_run: bool,

    /// Number of manifest entries processed in parallel
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub jobs: usize,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Parses command line arguments and returns the Args structure.
///
/// # Exits
/// * With status code 2 if required arguments are missing
/// * With clap's default error handling for other argument errors
pub fn get_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            if e.kind() == ErrorKind::MissingRequiredArgument {
                Args::command()
                    .help_template(
                        r#"{about-section}
{usage-heading} {usage}

{all-args}
{after-help}
"#,
                    )
                    .print_help()
                    .unwrap();
                std::process::exit(2);
            } else {
                e.exit();
            }
        }
    }
}
