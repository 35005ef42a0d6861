use clap::Parser;
use std::path::PathBuf;
use std::process;

use neanderc::assembly;
use neanderc::compiler::Compilation;
use neanderc::config::CompilerConfig;
use neanderc::error::format_error;
use neanderc::vm::{Machine, DEFAULT_MAX_STEPS};

#[derive(Parser)]
#[command(name = "neanderc")]
#[command(about = "Compiles arithmetic assignments to Neander assembly", long_about = None)]
struct Cli {
    /// Source file to compile.
    input: PathBuf,

    /// Write the assembly here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Simulate the compiled program and print the final values.
    #[arg(long)]
    run: bool,

    /// Instruction bound for `--run`.
    #[arg(long, default_value_t = DEFAULT_MAX_STEPS)]
    max_steps: u64,

    #[arg(long, default_value = "INICIO")]
    start_marker: String,

    #[arg(long, default_value = "FIM")]
    end_marker: String,
}

fn main() {
    let cli = Cli::parse();
    let path = cli.input.display().to_string();

    let source = match std::fs::read_to_string(&cli.input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading '{}': {}", path, e);
            process::exit(1);
        }
    };

    let config = CompilerConfig {
        start_marker: cli.start_marker.clone(),
        end_marker: cli.end_marker.clone(),
        ..CompilerConfig::default()
    };

    let compilation = match neanderc::compile_with(&source, config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", format_error(&e, &source, &path));
            process::exit(1);
        }
    };

    for diagnostic in &compilation.diagnostics {
        eprintln!("{}", format_error(diagnostic, &source, &path));
    }

    let listing = assembly::render(&compilation.program);
    match &cli.output {
        Some(out) => {
            if let Err(e) = std::fs::write(out, &listing) {
                eprintln!("Error writing '{}': {}", out.display(), e);
                process::exit(1);
            }
        }
        None => print!("{listing}"),
    }

    if cli.run && !simulate(&compilation, cli.max_steps, &path) {
        process::exit(1);
    }

    if !compilation.is_clean() {
        process::exit(1);
    }
}

/// Runs the program and reports the accumulator and every variable.
/// Returns false if the simulation failed.
fn simulate(compilation: &Compilation, max_steps: u64, path: &str) -> bool {
    let mut machine = Machine::new(&compilation.program);
    match machine.run(max_steps) {
        Ok(halt) => {
            eprintln!("AC = {} ({} steps)", halt.accumulator, halt.steps);
            for variable in compilation.program.variables() {
                eprintln!("{} = {}", variable.name, machine.memory(variable.address));
            }
            true
        }
        Err(e) => {
            eprintln!("{path}: {e}");
            false
        }
    }
}
