use std::io;

use bef93::{ExecError, Options, Process, Program, Step};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "bef93", about = "Executes a Befunge-93 program file")]
struct Cli {
    /// Program file to execute.
    file: String,

    /// `&` pushes an undefined number instead of -1 on a read error.
    #[arg(long)]
    read_error_undefined: bool,

    /// Ignore unsupported instructions instead of failing.
    #[arg(long)]
    ignore_unsupported_instructions: bool,

    /// Allow code larger than 80x25. Non-standard.
    #[arg(long)]
    allow_arbitrary_code_size: bool,

    /// Allow unicode in the interpreted code. Non-standard.
    #[arg(long)]
    allow_unicode: bool,

    /// Terminate on division by 0 instead of asking for a result. Non-standard.
    #[arg(long)]
    disallow_div_zero: bool,

    /// Fixed random seed; 0 seeds from the clock. Non-standard.
    #[arg(long, default_value_t = 0)]
    rand_seed: u64,

    /// Terminate on I/O errors instead of ignoring them. Non-standard.
    #[arg(long)]
    terminate_on_io_err: bool,

    /// Terminate on out-of-bounds `g`/`p` instead of reading 0 or
    /// discarding the write. Non-standard.
    #[arg(long)]
    terminate_on_put_get_out_of_bounds: bool,

    /// Print the program grid to stderr before execution.
    #[arg(long)]
    print_prog: bool,

    /// Stop with an error after this many instructions.
    #[arg(long)]
    max_steps: Option<u64>,
}

impl Cli {
    fn options(&self) -> Options {
        Options {
            read_error_undefined: self.read_error_undefined,
            ignore_unsupported_instructions: self.ignore_unsupported_instructions,
            allow_arbitrary_code_size: self.allow_arbitrary_code_size,
            allow_unicode: self.allow_unicode,
            disallow_div_zero: self.disallow_div_zero,
            rand_seed: self.rand_seed,
            terminate_on_io_err: self.terminate_on_io_err,
            terminate_on_put_get_out_of_bounds: self.terminate_on_put_get_out_of_bounds,
            ..Default::default()
        }
    }
}

/// Log to stderr; `RUST_LOG` overrides the default `warn` filter.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> Result<(), String> {
    let code = std::fs::read_to_string(&cli.file)
        .map_err(|e| format!("Failed to read {}: {e}", cli.file))?;
    let prog = Program::build(&code, cli.options()).map_err(|e| e.to_string())?;

    if cli.print_prog {
        eprintln!("{prog}");
    }

    let stdin = io::stdin().lock();
    let stdout = io::stdout().lock();
    let stderr = io::stderr();
    let mut proc = Process::new(&prog, stdin, stdout, stderr);

    let result = match cli.max_steps {
        None => proc.exec(),
        Some(limit) => run_bounded(&mut proc, limit)?,
    };

    match result {
        Ok(()) => Ok(()),
        Err(ExecError::Runtime(e)) => {
            if cli.print_prog {
                eprintln!("{}", e.program);
            }
            Err(e.to_string())
        }
        Err(e) => Err(e.to_string()),
    }
}

fn run_bounded<R, W, E>(
    proc: &mut Process<R, W, E>,
    limit: u64,
) -> Result<Result<(), ExecError>, String>
where
    R: io::BufRead,
    W: io::Write,
    E: io::Write,
{
    for _ in 0..limit {
        match proc.step() {
            Ok(Step::Continue) => {}
            Ok(Step::Terminated) => return Ok(Ok(())),
            Err(e) => return Ok(Err(e)),
        }
    }
    let (x, y) = proc.pc();
    Err(format!("Step limit of {limit} reached at ({x}, {y})"))
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
