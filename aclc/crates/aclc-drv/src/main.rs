//! The `aclc` command-line entry point.

use aclc_drv::{run, DriverOptions};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Front-end compiler for Accele modules.
#[derive(Parser, Debug)]
#[command(name = "aclc", version, about)]
struct Cli {
    /// Input modules (`.accele`, or `.acldef` declaration headers).
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Add a directory to the import search path.
    #[arg(short = 'I', long = "import-dir")]
    import_dirs: Vec<PathBuf>,

    /// The global import directory, searched after `-I` directories.
    #[arg(long = "global-import-dir")]
    global_import_dir: Option<PathBuf>,

    /// Disable the built-in type table for every module.
    #[arg(long = "no-builtins")]
    no_builtins: bool,

    /// Enable a warning by its diagnostic id (e.g. `static-access-via-instance`).
    #[arg(long = "warn", value_name = "ID")]
    enable_warnings: Vec<String>,

    /// Disable a warning by its diagnostic id.
    #[arg(long = "no-warn", value_name = "ID")]
    disable_warnings: Vec<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let options = DriverOptions {
        inputs: cli.inputs,
        import_dirs: cli.import_dirs,
        global_import_dir: cli.global_import_dir,
        no_builtins: cli.no_builtins,
        enable_warnings: cli.enable_warnings,
        disable_warnings: cli.disable_warnings,
    };

    match run(&options) {
        Ok(output) => {
            for rendered in &output.rendered {
                eprintln!("{}", rendered);
            }
            ExitCode::from(output.exit_code as u8)
        }
        Err(error) => {
            eprintln!("aclc: {:#}", error);
            ExitCode::from(1)
        }
    }
}
