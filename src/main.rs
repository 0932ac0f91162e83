#![forbid(unsafe_code)]

//! `meeting-tasks`: command-line front end for the extraction client.
//!
//! Uploads transcripts, streams task extraction with live progress, and
//! previews or creates tracker issues from the extracted tasks.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use meeting_tasks::backend::http::HttpBackend;
use meeting_tasks::backend::{ExtractRequest, TaskBackend};
use meeting_tasks::config::{ClientConfig, K_RANGE};
use meeting_tasks::issues::pipeline::IssuePipeline;
use meeting_tasks::models::state::SessionState;
use meeting_tasks::models::task::Task;
use meeting_tasks::notify::{Notifier, TracingNotifier};
use meeting_tasks::orchestrator::aggregator::run_queries;
use meeting_tasks::orchestrator::session::ExtractionSession;
use meeting_tasks::recent::store::RecentStore;
use meeting_tasks::recent::{RECENT_MEETINGS, RECENT_REPOS};
use meeting_tasks::upload::{request_from_file, upload_transcript};
use meeting_tasks::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "meeting-tasks", about = "Meeting transcripts to engineering tasks", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Override the backend base URL.
    #[arg(long)]
    api_base: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upload and index a transcript file.
    Upload {
        /// Transcript file to upload.
        file: PathBuf,
        /// Meeting identifier to index under.
        #[arg(long)]
        meeting_id: String,
        /// Optional meeting title.
        #[arg(long, default_value = "")]
        title: String,
    },

    /// Stream task extraction for a meeting.
    ///
    /// One query runs a single session; several (or `--all-presets`) run
    /// sequentially and merge their deduplicated results.
    Extract {
        /// Meeting identifier.
        #[arg(long)]
        meeting_id: String,
        /// Retrieval query; repeat for a multi-query run.
        #[arg(long = "query", short = 'q')]
        queries: Vec<String>,
        /// Run every configured preset query.
        #[arg(long, conflicts_with = "queries")]
        all_presets: bool,
        /// Transcript chunks fed to the model as context.
        #[arg(long, short = 'k', value_parser = clap::value_parser!(u32).range(i64::from(*K_RANGE.start())..=i64::from(*K_RANGE.end())))]
        k: Option<u32>,
        /// Write the extracted tasks to this JSON file.
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Dry-run issue creation for a task file.
    Preview {
        /// Target repository (`owner/name`).
        #[arg(long)]
        repo: String,
        /// Meeting the tasks came from.
        #[arg(long)]
        meeting_id: String,
        /// JSON file holding the task list.
        #[arg(long)]
        tasks: PathBuf,
    },

    /// Create tracker issues from a task file.
    Create {
        /// Target repository (`owner/name`).
        #[arg(long)]
        repo: String,
        /// Meeting the tasks came from.
        #[arg(long)]
        meeting_id: String,
        /// JSON file holding the task list.
        #[arg(long)]
        tasks: PathBuf,
    },

    /// Print recently used meeting ids and repositories.
    Recent,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = match &args.config {
        Some(path) => ClientConfig::load_from_path(path)?,
        None => ClientConfig::default(),
    };
    config.apply_env_overrides()?;
    if let Some(base) = args.api_base {
        config.api_base = base;
        config.validate()?;
    }
    info!(api_base = %config.api_base, "configuration loaded");

    let backend: Arc<dyn TaskBackend> = Arc::new(HttpBackend::new(&config)?);
    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);
    let mut recent = RecentStore::open(&config.recent_store)?;

    match args.command {
        Command::Upload {
            file,
            meeting_id,
            title,
        } => {
            let request = request_from_file(&file, &meeting_id, &title).await?;
            let reply =
                upload_transcript(backend.as_ref(), notifier.as_ref(), Some(&mut recent), &request)
                    .await?;
            print_json(&reply)?;
        }

        Command::Extract {
            meeting_id,
            queries,
            all_presets,
            k,
            save,
        } => {
            let queries = if all_presets {
                config.presets.clone()
            } else if queries.is_empty() {
                vec![config.presets.first().cloned().unwrap_or_default()]
            } else {
                queries
            };
            let k = k.unwrap_or(config.default_k);

            if let Err(err) = recent.record(RECENT_MEETINGS, &meeting_id) {
                warn!(error = %err, "failed to record recent meeting");
            }

            let session = ExtractionSession::new(Arc::clone(&backend), Arc::clone(&notifier));
            let progress = spawn_progress_printer(session.subscribe());
            let state = extract_with_ctrl_c(&session, &meeting_id, &queries, k).await?;
            drop(session);
            if let Err(err) = progress.await {
                warn!(error = %err, "progress printer task failed");
            }

            if let Some(path) = save {
                write_tasks(&path, &state.tasks)?;
                info!(path = %path.display(), "tasks saved");
            }
            print_json(&state.tasks)?;
        }

        Command::Preview {
            repo,
            meeting_id,
            tasks,
        } => {
            let tasks = read_tasks(&tasks)?;
            let mut pipeline = IssuePipeline::new(backend, notifier)
                .with_assignees(config.assignees.clone())
                .with_recent(recent);
            let items = pipeline.preview(&repo, &meeting_id, &tasks).await?;
            print_json(&items)?;
        }

        Command::Create {
            repo,
            meeting_id,
            tasks,
        } => {
            let tasks = read_tasks(&tasks)?;
            let mut pipeline = IssuePipeline::new(backend, notifier)
                .with_assignees(config.assignees.clone())
                .with_recent(recent);
            let report = pipeline.create(&repo, &meeting_id, &tasks).await?;
            println!("{}", report.summary.message());
            print_json(&report.items)?;
        }

        Command::Recent => {
            println!("meetings: {}", recent.list(RECENT_MEETINGS).join(", "));
            println!("repos:    {}", recent.list(RECENT_REPOS).join(", "));
        }
    }

    Ok(())
}

/// Run a single or multi-query extraction; Ctrl-C aborts the live session.
async fn extract_with_ctrl_c(
    session: &ExtractionSession,
    meeting_id: &str,
    queries: &[String],
    k: u32,
) -> Result<SessionState> {
    let extraction = async {
        if let [query] = queries {
            session
                .extract(&ExtractRequest::new(meeting_id, query.as_str(), k))
                .await
        } else {
            run_queries(session, meeting_id, queries, k).await
        }
    };
    tokio::pin!(extraction);

    tokio::select! {
        result = &mut extraction => result,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, cancelling extraction");
            session.cancel();
            extraction.await
        }
    }
}

/// Render visible state changes on stderr until the session is dropped.
fn spawn_progress_printer(mut rx: watch::Receiver<SessionState>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let state = rx.borrow_and_update().clone();
            let mode = state
                .mode
                .as_ref()
                .map(|m| format!(" • mode: {m}"))
                .unwrap_or_default();
            eprintln!("stage: {} ({}%){mode}", state.stage, state.progress);
        }
    })
}

fn read_tasks(path: &Path) -> Result<Vec<Task>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|err| AppError::Io(format!("cannot read {}: {err}", path.display())))?;
    Ok(serde_json::from_str(&raw)?)
}

fn write_tasks(path: &Path, tasks: &[Task]) -> Result<()> {
    let json = serde_json::to_string_pretty(tasks)?;
    std::fs::write(path, json)
        .map_err(|err| AppError::Io(format!("cannot write {}: {err}", path.display())))
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter).with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
