//! absm CLI: load an ABS-M program image and run it, optionally tracing
//! architectural state to a log file.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use absm_executor::{load_program, Core, Tracer, DEFAULT_MEM_SIZE};

#[derive(Parser, Debug)]
#[command(name = "absm", version, about = "Run an ABS-M program image")]
struct Opts {
    /// Path to the program image (.bin)
    #[arg(value_name = "BIN")]
    binary: Option<PathBuf>,

    /// Trace log path; tracing is enabled when present
    #[arg(value_name = "LOG")]
    log: Option<PathBuf>,

    /// Memory size in words
    #[arg(long, default_value_t = DEFAULT_MEM_SIZE)]
    mem_size: usize,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();
    let Some(binary) = opts.binary else {
        eprintln!("usage: absm <BIN> [<LOG>]");
        return ExitCode::from(1);
    };

    match run(&binary, opts.log.as_deref(), opts.mem_size) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("absm: {err:#}");
            ExitCode::from(1)
        }
    }
}

fn run(binary: &Path, log: Option<&Path>, mem_size: usize) -> anyhow::Result<()> {
    let program = load_program(binary, mem_size)?;

    match log {
        Some(path) => {
            let mut tracer = Tracer::create(path)?;
            let mut core = Core::with_tracer(mem_size, program.segments, &mut tracer)?;
            core.load_instructions(&program.instructions);
            core.load_data(&program.data);
            core.run()?;
        }
        None => {
            let mut core = Core::new(mem_size, program.segments)?;
            core.load_instructions(&program.instructions);
            core.load_data(&program.data);
            core.run()?;
        }
    }
    Ok(())
}
