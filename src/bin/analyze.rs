use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use contract_analyzer::client::subscriber::{ExecutionSubscriber, SubscriptionPhase};
use contract_analyzer::client::AnalyzerClient;
use contract_analyzer::models::criteria::{Criterion, CriterionKind};
use contract_analyzer::models::execution::ExecutionStatus;
use tracing_subscriber::EnvFilter;

/// Submit a contract for analysis and follow its progress.
#[derive(Parser, Debug)]
#[command(name = "analyze", version)]
struct Args {
    /// Contract file (PDF or DOCX)
    file: PathBuf,

    /// Base URL of the contract-analyzer server
    #[arg(long, env = "API_BASE_URL", default_value = "http://localhost:3000")]
    server: String,

    /// Analysis criterion as TYPE:VALUE, e.g. MUSS:Laufzeit (repeatable)
    #[arg(long = "criterion", value_parser = parse_criterion)]
    criteria: Vec<Criterion>,

    /// Callback URL for the workflow engine (only without --criterion)
    #[arg(long, conflicts_with = "criteria")]
    callback_url: Option<String>,
}

fn parse_criterion(raw: &str) -> Result<Criterion, String> {
    let (kind, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected TYPE:VALUE, got {raw:?}"))?;
    let kind: CriterionKind = kind
        .trim()
        .parse()
        .map_err(|_| format!("unknown criterion type {kind:?} (MUSS, SOLL, KANN, ANALYSE)"))?;
    let value = value.trim();
    if value.is_empty() {
        return Err("criterion value must not be empty".to_string());
    }
    Ok(Criterion::new(kind, value))
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    let content = match std::fs::read(&args.file) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Cannot read {}: {e}", args.file.display());
            return ExitCode::FAILURE;
        }
    };
    let file_name = args
        .file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());

    let client = AnalyzerClient::new(&args.server);
    let submitted = if args.criteria.is_empty() {
        client
            .submit_for_callback(&file_name, content, args.callback_url.as_deref())
            .await
    } else {
        client
            .submit_contract(&file_name, content, &args.criteria)
            .await
    };

    let execution_id = match submitted {
        Ok(id) => id,
        Err(e) => {
            eprintln!("Submission failed: {e}");
            return ExitCode::FAILURE;
        }
    };
    println!("Submitted {file_name} as {execution_id}");

    let mut subscriber = ExecutionSubscriber::new(&args.server);
    let mut updates = subscriber.updates();
    subscriber.listen(execution_id);

    loop {
        if updates.changed().await.is_err() {
            return ExitCode::FAILURE;
        }
        let state = updates.borrow_and_update().clone();
        match state.phase {
            SubscriptionPhase::Idle | SubscriptionPhase::Listening => {
                println!("[{:>3}%] {} - {}", state.progress, state.title, state.description);
            }
            SubscriptionPhase::Complete => {
                println!("[{:>3}%] {} - {}", state.progress, state.title, state.description);
                if let Some(results) = &state.results {
                    match serde_json::to_string_pretty(results) {
                        Ok(pretty) => println!("{pretty}"),
                        Err(e) => eprintln!("Cannot render results: {e}"),
                    }
                }
                return match state.status {
                    Some(ExecutionStatus::Completed) => ExitCode::SUCCESS,
                    _ => ExitCode::FAILURE,
                };
            }
            SubscriptionPhase::Interrupted => {
                eprintln!("Stream closed before the analysis finished");
                return ExitCode::FAILURE;
            }
            SubscriptionPhase::Failed { message } => {
                eprintln!("Update stream failed: {message}");
                return ExitCode::FAILURE;
            }
        }
    }
}
