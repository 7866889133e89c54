use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use jaql::ast::NodeIds;
use jaql::ast_printer::AstPrinter;
use jaql::error::Diagnostics;
use jaql::interpreter::Interpreter;
use jaql::parser::Parser;
use jaql::pipeline::Session;
use jaql::scanner::Scanner;
use jaql::token::Token;

#[derive(ClapParser, Debug)]
#[command(version, about = "Jaql language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize { filename: PathBuf },

    /// Parses input from a file as a single expression and prints its AST
    Parse { filename: PathBuf },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: PathBuf },

    /// Runs input from a file as a Jaql program, or enters the REPL
    Run { filename: Option<PathBuf> },
}

/// Reads the contents of a file into a Vec<u8>
fn read_file(filename: &PathBuf) -> Result<Vec<u8>> {
    info!("Reading file: {:?}", filename);
    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    Ok(buf)
}

fn init_logger() -> Result<()> {
    // Create or open the log file
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    // Configure env_logger to write to file with module path and source line
    Builder::new()
        .format(|buf, record| {
            // Strip 'jaql::' from module path
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("jaql::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

/// Scan a whole buffer, printing lexical errors to stderr.
/// Returns the tokens plus whether any error occurred.
fn scan_all(buf: &[u8]) -> (Vec<Token>, bool) {
    let mut tokens: Vec<Token> = Vec::new();
    let mut had_error = false;

    for item in Scanner::new(buf) {
        match item {
            Ok(token) => tokens.push(token),
            Err(e) => {
                had_error = true;
                eprintln!("{}", e);
            }
        }
    }

    (tokens, had_error)
}

/// Print every recorded diagnostic to stderr.
fn drain_errors(diag: &Diagnostics) {
    for error in diag.errors() {
        eprintln!("{}", error);
    }
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename } => {
            info!("Running Tokenize subcommand");
            let buf = read_file(&filename)?;

            let (tokens, had_error) = scan_all(&buf);

            for token in &tokens {
                debug!("Scanned token: {}", token);
                println!("{}", token);
            }

            if had_error {
                debug!("Tokenization failed, exiting with code 65");

                std::process::exit(65);
            }

            info!("Tokenization completed successfully");
        }

        Commands::Parse { filename } => {
            info!("Running Parse subcommand");
            let buf = read_file(&filename)?;

            let (tokens, had_error) = scan_all(&buf);
            if had_error {
                std::process::exit(65);
            }

            let mut ids = NodeIds::new();
            let mut diag = Diagnostics::new();

            let parsed = Parser::new(&tokens, &mut ids, &mut diag).parse_expression();

            match parsed {
                Some(expr) if !diag.had_error() => {
                    let ast_str = AstPrinter::print(&expr);

                    debug!("AST: {}", ast_str);
                    println!("{}", ast_str);
                }

                _ => {
                    drain_errors(&diag);
                    std::process::exit(65);
                }
            }

            info!("Parse subcommand completed");
        }

        Commands::Evaluate { filename } => {
            info!("Running Evaluate subcommand");

            let buf = read_file(&filename)?;

            let (tokens, had_error) = scan_all(&buf);
            if had_error {
                std::process::exit(65);
            }

            let mut ids = NodeIds::new();
            let mut diag = Diagnostics::new();

            let parsed = Parser::new(&tokens, &mut ids, &mut diag).parse_expression();

            let Some(expr) = parsed else {
                drain_errors(&diag);
                std::process::exit(65);
            };

            let mut interpreter = Interpreter::new();
            let mut stdout = std::io::stdout();

            match interpreter.evaluate(&expr, &mut stdout) {
                Ok(value) => {
                    debug!("Evaluated to: {}", value);
                    println!("{}", value);
                }

                Err(e) => {
                    eprintln!("{}", e);
                    std::process::exit(70);
                }
            }

            info!("Evaluate subcommand completed");
        }

        Commands::Run { filename } => match filename {
            Some(filename) => {
                info!("Running Run subcommand");
                let buf = read_file(&filename)?;

                let mut session = Session::new();
                let mut diag = Diagnostics::new();
                let mut stdout = std::io::stdout();

                session.run(&buf, &mut diag, &mut stdout);

                drain_errors(&diag);

                if diag.had_error() {
                    debug!("Static errors, exiting with code 65");
                    std::process::exit(65);
                }

                if diag.had_runtime_error() {
                    debug!("Runtime error, exiting with code 70");
                    std::process::exit(70);
                }

                info!("Program executed successfully");
            }

            None => repl()?,
        },
    }

    Ok(())
}

/// Interactive mode: one pipeline run per line, interpreter state and
/// global definitions persisting across lines.
fn repl() -> Result<()> {
    info!("Entering REPL");

    println!("Jaql interpreter. Empty line exits.");

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    let mut session = Session::new();
    let mut diag = Diagnostics::new();

    loop {
        print!(">> ");
        stdout.flush()?;

        let mut line = String::new();
        let bytes = stdin.lock().read_line(&mut line)?;

        let line = line.trim_end();
        if bytes == 0 || line.is_empty() {
            println!("Exiting jaql");
            break;
        }

        session.run(line.as_bytes(), &mut diag, &mut stdout);

        drain_errors(&diag);
        diag.reset();
    }

    Ok(())
}
