//! tirflow command line driver.
//!
//! Reads a `.tir` file (or stdin when no file is given), runs the backend
//! passes on every method body and prints the requested reports.
//!
//! ```bash
//! tirflow --print-cfg --print-trace tests/filetests/if_else.tir
//! tirflow --print-liveness --func count -v loop.tir
//! ```

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;
use tirflow::core::{CompilationSession, PrintOptions};
use tirflow::tir::Program;

#[derive(Parser)]
#[command(name = "tirflow")]
#[command(about = "CFG construction, liveness and block layout for TIR", long_about = None)]
struct Cli {
    /// TIR input file, stdin when omitted
    file: Option<PathBuf>,

    /// Print the parsed statements
    #[arg(long)]
    print_ir: bool,

    /// Print the control flow graph
    #[arg(long)]
    print_cfg: bool,

    /// Print per-block liveness sets
    #[arg(long)]
    print_liveness: bool,

    /// Print the greedy block traces
    #[arg(long)]
    print_trace: bool,

    /// Print the statements after block layout and jump fixing
    #[arg(long)]
    print_linear: bool,

    /// Print dead stores and unreachable blocks
    #[arg(long)]
    print_dead: bool,

    /// Only process this function
    #[arg(long, value_name = "NAME")]
    func: Option<String>,

    /// Print session statistics at the end
    #[arg(long)]
    stats: bool,

    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn print_options(&self) -> PrintOptions {
        let print = PrintOptions {
            ir: self.print_ir,
            cfg: self.print_cfg,
            liveness: self.print_liveness,
            trace: self.print_trace,
            linear: self.print_linear,
            dead: self.print_dead,
        };
        if print == PrintOptions::default() {
            PrintOptions {
                cfg: true,
                ..print
            }
        } else {
            print
        }
    }
}

fn read_input(file: Option<&PathBuf>) -> io::Result<String> {
    match file {
        Some(path) => fs::read_to_string(path),
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let text = read_input(cli.file.as_ref())?;
    let program = Program::parse(&text)?;
    log::info!("parsed {} functions", program.functions.len());

    let print = cli.print_options();
    let mut session = CompilationSession::new(print.pipeline());
    let bodies = session.compile_program(&program, cli.func.as_deref())?;

    for body in &bodies {
        println!("{}", body.render(&print));
    }

    if cli.stats {
        println!("{}", session.stats());
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
