use std::fs::File;
use std::sync::Arc;

use clap::Parser;
use quiz_session::config::Args;
use quiz_session::engine::{PersistenceStatus, ScoreReport};
use quiz_session::{Quiz, QuizError};
use tracing_subscriber::EnvFilter;

fn init_tracing(args: &Args) -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_ansi(false);

    // Stdout belongs to the TUI, so logs only go to a file when asked.
    match &args.log_file {
        Some(path) => builder.with_writer(Arc::new(File::create(path)?)).init(),
        None => builder.with_writer(std::io::sink).init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(e) = init_tracing(&args) {
        eprintln!("Failed to open log file: {}", e);
        std::process::exit(1);
    }

    match Quiz::new(args.into_config()).run().await {
        Ok(outcome) => {
            if let Some(summary) = outcome.summary {
                println!(
                    "{} / {} correct ({}%) - {}",
                    summary.correct,
                    summary.total,
                    summary.percentage(),
                    summary.rating().label()
                );
            }
            if let PersistenceStatus::Failed(reason) = outcome.persistence {
                eprintln!("Result was not saved: {}", reason);
            }
            if let ScoreReport::Failed(reason) = outcome.score {
                eprintln!("Score was not submitted: {}", reason);
            }
        }
        Err(QuizError::Unavailable { attempts }) => {
            eprintln!("Quiz unavailable after {} attempts", attempts);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error running quiz: {}", e);
            std::process::exit(1);
        }
    }
}
