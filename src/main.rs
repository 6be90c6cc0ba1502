use std::{
    fs::File,
    io::{self, BufReader, IsTerminal, Write},
    path::PathBuf,
    process::ExitCode,
    time::Instant,
};

use bf2::{
    interpreter::{Config, Interpreter, Runtime, RuntimeError},
    tape::TapeSnapshot,
    terminal::{CrlfWriter, RawMode},
};
use clap::Parser;
use colored::Colorize;

/// Brainf**k interpreter with `2` (repeat the last run), executing straight off the source file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The file to run
    #[arg()]
    file: PathBuf,

    /// Byte stored by `,` once input runs out
    #[arg(long, default_value_t = 255)]
    eof: u8,

    /// Put the terminal in raw mode so single keystrokes reach `,` (Ctrl-C becomes byte 3).
    /// Without it the terminal keeps line buffering and echo
    #[arg(long)]
    raw: bool,

    /// Print the touched tape cells after a successful run
    #[arg(long)]
    dump_tape: bool,

    /// Report progress and timing on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    // Only initialize if RUST_LOG is set
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn format_snapshot(snapshot: &TapeSnapshot) -> String {
    snapshot
        .cells
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            if i == snapshot.pointer {
                format!("[{cell}]")
            } else {
                cell.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn run(args: &Args, file: File) -> Result<Interpreter<BufReader<File>>, RuntimeError> {
    // held until the run is over, on every path
    let raw_mode = if args.raw && io::stdin().is_terminal() {
        match RawMode::enable() {
            Ok(raw) => Some(raw),
            Err(e) => {
                eprintln!("{}: could not switch to raw mode ({})", "Warning".yellow(), e);
                None
            }
        }
    } else {
        None
    };

    let out_stream: Box<dyn Write> = if raw_mode.is_some() && io::stdout().is_terminal() {
        Box::new(CrlfWriter::new(io::stdout()))
    } else {
        Box::new(io::stdout())
    };
    let runtime = Runtime::new(Config { eof: args.eof }, Box::new(io::stdin()), out_stream)?;

    let mut interpreter = Interpreter::new(BufReader::new(file), runtime)?;
    interpreter.run()?;
    Ok(interpreter)
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        // clap would exit with 2, which means the file couldn't be opened
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            return ExitCode::from(1);
        }
        Err(e) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
    };
    init_tracing();

    let file = match File::open(&args.file) {
        Ok(file) => file,
        Err(e) => {
            eprintln!(
                "{}: could not open '{}' ({})",
                "Error".red(),
                args.file.display(),
                e
            );
            return ExitCode::from(2);
        }
    };

    if args.verbose {
        eprintln!("{} {}", "Running".blue(), args.file.display());
    }
    let now = Instant::now();

    match run(&args, file) {
        Ok(interpreter) => {
            if args.verbose {
                eprintln!();
                eprintln!("{} {:.2?}", "Finished in".green(), now.elapsed());
            }
            if args.dump_tape {
                eprintln!("{}", format_snapshot(&interpreter.runtime().tape.snapshot()));
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            let _ = io::stdout().flush();
            if args.verbose {
                eprintln!();
            }
            eprintln!("{}: {}", "Error".red(), e);
            ExitCode::from(e.exit_code())
        }
    }
}
