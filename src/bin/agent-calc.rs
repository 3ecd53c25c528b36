use agent_calc::{CalcConfig, Calculator, Error, InternalResult, Outcome, ParenPolicy};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Expressions to evaluate. Starts a prompt on stdin when none are given.
    expressions: Vec<String>,

    /// Path to config file
    #[arg(short, long, default_value = "agent-calc.json")]
    config: PathBuf,

    /// Give up on a session after this many ticks
    #[arg(long)]
    max_ticks: Option<u64>,

    /// Reject unmatched parentheses
    #[arg(long)]
    strict_parens: bool,

    /// Append trace records as JSON lines to this file
    #[arg(long)]
    trace_file: Option<PathBuf>,

    /// Enable debug mode
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(cli: &Cli) -> InternalResult<CalcConfig> {
    let mut config = if cli.config.exists() {
        CalcConfig::from_file(&cli.config)?
    } else {
        CalcConfig::default()
    };
    if let Some(max_ticks) = cli.max_ticks {
        config.tick_budget = max_ticks;
    }
    if cli.strict_parens {
        config.parentheses = ParenPolicy::Strict;
    }
    if let Some(path) = &cli.trace_file {
        config.trace.file = Some(path.clone());
    }
    debug!("config: {:?}", config);
    Ok(config)
}

/// Evaluates one line and prints the outcome. Returns false unless it finished.
fn evaluate(calculator: &mut Calculator, expression: &str) -> InternalResult<bool> {
    match calculator.evaluate(expression) {
        Ok(report) => {
            debug!(postfix = %report.postfix, ticks = report.ticks, "session ended");
            match &report.outcome {
                Outcome::Finished(value) => println!("{}", value),
                Outcome::Failed(error) => println!("error: {}", error),
                Outcome::TimedOut { ticks } => println!("timed out after {} ticks", ticks),
            }
            Ok(report.outcome.is_finished())
        }
        Err(Error::Syntax(e)) => {
            println!("syntax error: {}", e);
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

async fn repl(calculator: &mut Calculator) -> InternalResult<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout()
            .flush()
            .map_err(|e| Error::internal(format!("Failed to write prompt: {}", e)))?;

        let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| Error::internal(format!("Failed to read stdin: {}", e)))?
        else {
            println!();
            break;
        };

        let line = line.trim();
        match line {
            "" => continue,
            "quit" | "exit" => break,
            _ => {
                evaluate(calculator, line)?;
            }
        }
    }
    Ok(())
}

async fn run(cli: &Cli) -> InternalResult<bool> {
    let config = load_config(cli)?;
    let mut calculator = Calculator::new(&config)?;

    if cli.expressions.is_empty() {
        info!("reading expressions from stdin");
        repl(&mut calculator).await?;
        return Ok(true);
    }

    let mut all_finished = true;
    for expression in &cli.expressions {
        all_finished &= evaluate(&mut calculator, expression)?;
    }
    Ok(all_finished)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(&cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
