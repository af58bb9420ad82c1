use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser as ClapParser, ValueEnum};
use env_logger::Builder;
use log::{debug, info};

use rox::ast_printer::AstPrinter;
use rox::diagnostics::Diagnostics;
use rox::scanner::Scanner;
use rox::session::{decode_source, parse_source, Session};

/// Native stack for the evaluator thread: enough for
/// [`rox::interpreter::MAX_CALL_DEPTH`] nested calls in an unoptimised build.
const EVALUATOR_STACK_SIZE: usize = 256 * 1024 * 1024;

#[derive(ClapParser, Debug)]
#[command(version, about = "Rox language interpreter", long_about = None)]
pub struct Cli {
    /// Script to run; without one an interactive prompt is started
    scripts: Vec<PathBuf>,

    /// Enable logging to app.log
    #[arg(long)]
    log: bool,

    /// Stop after the front end and print one of its products instead of running
    #[arg(long, value_enum)]
    emit: Option<Emit>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Emit {
    /// One `TYPE lexeme literal` line per token
    Tokens,
    /// One JSON object per token
    Json,
    /// The parsed program in parenthesised prefix form
    Ast,
}

/// Reads the whole script; invalid UTF-8 sequences become U+FFFD.
fn read_file(filename: &Path) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    Ok(decode_source(&buf).into_owned())
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("rox::").unwrap_or(module);
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

/// Front-end only: print the requested product of `source`.
fn emit(source: &str, what: Emit, diagnostics: &mut Diagnostics) -> Result<()> {
    match what {
        Emit::Tokens | Emit::Json => {
            for result in Scanner::new(source) {
                match result {
                    Ok(token) if matches!(what, Emit::Json) => {
                        println!("{}", serde_json::to_string(&token)?)
                    }
                    Ok(token) => println!("{}", token),
                    Err(e) => diagnostics.report(e),
                }
            }
        }

        Emit::Ast => {
            let statements = parse_source(source, diagnostics);

            if !diagnostics.had_error() {
                println!("{}", AstPrinter.print_program(&statements));
            }
        }
    }

    Ok(())
}

fn run_file(path: &Path, emit_mode: Option<Emit>) -> Result<()> {
    let source = read_file(path)?;

    let (had_error, had_runtime_error) = match emit_mode {
        Some(what) => {
            let mut diagnostics = Diagnostics::new();
            emit(&source, what, &mut diagnostics)?;
            (diagnostics.had_error(), false)
        }
        None => {
            let mut session = Session::new();
            session.run(&source);
            (session.had_error(), session.had_runtime_error())
        }
    };

    if had_error {
        debug!("Static errors, exiting with code 65");
        std::process::exit(65);
    }

    if had_runtime_error {
        debug!("Runtime error, exiting with code 70");
        std::process::exit(70);
    }

    Ok(())
}

fn run_prompt(emit_mode: Option<Emit>) -> Result<()> {
    let mut session = Session::new();
    let mut diagnostics = Diagnostics::new();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut bytes = Vec::new();
        if stdin.lock().read_until(b'\n', &mut bytes)? == 0 {
            break;
        }

        let line = decode_source(&bytes);

        match emit_mode {
            Some(what) => {
                emit(&line, what, &mut diagnostics)?;
                diagnostics.reset();
            }
            None => {
                session.run(&line);
                // An error ends this line, not the session.
                session.reset_errors();
            }
        }
    }

    println!();
    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger()?;
    } else {
        Builder::new().filter_level(log::LevelFilter::Off).init();
    }

    info!("CLI arguments: {:?}", args);

    let emit_mode = args.emit;
    let script = match args.scripts.as_slice() {
        [] => None,
        [script] => Some(script.clone()),
        _ => {
            println!("Usage: rox [script]");
            std::process::exit(1);
        }
    };

    // Deep user recursion is bounded by the interpreter's call depth, not by
    // the main thread's stack.
    let evaluator = std::thread::Builder::new()
        .name("evaluator".into())
        .stack_size(EVALUATOR_STACK_SIZE)
        .spawn(move || match script {
            None => run_prompt(emit_mode),
            Some(script) => run_file(&script, emit_mode),
        })
        .context("Failed to start the evaluator thread")?;

    evaluator
        .join()
        .map_err(|_| anyhow!("Evaluator thread panicked"))?
}
