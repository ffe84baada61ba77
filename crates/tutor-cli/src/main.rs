//! Guided Tutor CLI
//!
//! Runs a tutoring dialogue in the terminal or serves sessions over HTTP.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use tutor_engine::{
    create_router, AppState, Config, Curriculum, TurnOrchestrator, TutorEvent, TutorMode,
    TutorSession,
};

/// Default port for the HTTP API server.
const DEFAULT_PORT: u16 = 3000;

/// Guided Tutor - checkpoint-based tutoring dialogues
///
/// Walks a learner through an exercise of checkpoints and guiding steps,
/// assessing each reply and deciding when to move on.
#[derive(Parser, Debug)]
#[command(name = "tutor")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (default: tutor.json in current directory)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Work through an exercise in the terminal
    Chat {
        /// Path to the exercise JSON file (overrides the config)
        #[arg(value_name = "CURRICULUM")]
        curriculum: Option<String>,

        /// Tutor mode: socratic or instructional
        #[arg(short, long, value_name = "MODE")]
        mode: Option<String>,
    },

    /// Serve tutoring sessions over HTTP
    Serve {
        /// Path to the exercise JSON file (overrides the config)
        #[arg(value_name = "CURRICULUM")]
        curriculum: Option<String>,

        /// Port for the HTTP API server
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(config = ?args.config, "Config file");

    let result = match args.command {
        Command::Chat { curriculum, mode } => {
            run_chat(args.config.as_deref(), curriculum, mode.as_deref()).await
        }
        Command::Serve { curriculum, port } => {
            run_server(args.config.as_deref(), curriculum, port).await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

/// Runs an interactive dialogue on stdin/stdout.
async fn run_chat(
    config_path: Option<&str>,
    curriculum: Option<String>,
    mode: Option<&str>,
) -> anyhow::Result<()> {
    let mut config = load_config(config_path, curriculum)?;
    if let Some(mode) = mode {
        config.tutor_mode = TutorMode::from_str_case_insensitive(mode).ok_or_else(|| {
            anyhow::anyhow!(
                "Unknown tutor mode: '{mode}'\n\nSuggestion: Use 'socratic' or 'instructional'"
            )
        })?;
    }

    let curriculum = load_curriculum(&config)?;
    let orchestrator = TurnOrchestrator::from_config(&config);
    let mut session = TutorSession::new(curriculum, config.tutor_mode, config.budget);

    println!("Type your answers below. Use /goto <n> to jump to a checkpoint.");
    println!();
    print_events(&orchestrator.opening(&mut session));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let outcome = orchestrator.handle_input(&mut session, &line).await;
        print_events(&outcome.events);

        if outcome.finished {
            break;
        }
    }

    let summary = session.summary();
    tracing::info!(
        session_id = %summary.session_id,
        interactions = summary.total_interactions,
        complete = summary.exercise_complete,
        "Session ended"
    );
    Ok(())
}

/// Serves the HTTP session API until interrupted.
async fn run_server(
    config_path: Option<&str>,
    curriculum: Option<String>,
    port: u16,
) -> anyhow::Result<()> {
    let config = load_config(config_path, curriculum)?;
    let curriculum = load_curriculum(&config)?;

    let addr: SocketAddr = ([127, 0, 0, 1], port).into();
    let router = create_router(AppState::new(config, curriculum));

    let listener = TcpListener::bind(addr).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to bind to {addr}: {e}\n\nSuggestion: Try a different port with --port"
        )
    })?;

    println!("HTTP API server running on http://{addr}");
    tracing::info!(%addr, "Serving tutoring sessions");

    axum::serve(listener, router).await?;
    Ok(())
}

/// Loads configuration from the specified path or default location.
///
/// A relative curriculum path from an explicit config file is resolved
/// against that file's directory. `curriculum` overrides the config value.
fn load_config(config_path: Option<&str>, curriculum: Option<String>) -> anyhow::Result<Config> {
    let mut config = match config_path {
        Some(path_str) => {
            let path = Path::new(path_str);
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: '{}'\n\nSuggestion: Check the path or remove the --config flag to use defaults",
                    path.display()
                );
            }
            let mut config = Config::load_from_file(path).map_err(|e| anyhow::anyhow!("{e}"))?;
            if let Some(dir) = path.parent() {
                config.curriculum = resolve_relative(dir, &config.curriculum);
            }
            config
        }
        None => Config::load().map_err(|e| anyhow::anyhow!("{e}"))?,
    };

    if let Some(curriculum) = curriculum {
        config.curriculum = curriculum;
        config.validate()?;
    }

    Ok(config)
}

fn resolve_relative(dir: &Path, path: &str) -> String {
    let candidate = PathBuf::from(path);
    if candidate.is_absolute() {
        path.to_string()
    } else {
        dir.join(candidate).display().to_string()
    }
}

/// Loads the exercise named by the config.
fn load_curriculum(config: &Config) -> anyhow::Result<Arc<Curriculum>> {
    tracing::info!(curriculum = %config.curriculum, "Loading exercise");
    let curriculum = Curriculum::load(&config.curriculum)?;

    println!("Exercise loaded:");
    println!("  Title: {}", curriculum.metadata.title);
    println!("  Checkpoints: {}", curriculum.len());
    println!("  Tutor mode: {}", config.tutor_mode);
    println!();

    Ok(Arc::new(curriculum))
}

/// Prints events the way a chat window would show them.
fn print_events(events: &[TutorEvent]) {
    for event in events {
        match event {
            TutorEvent::Message(payload) => {
                println!("Tutor: {}", payload.text);
                if let Some(image) = &payload.image {
                    let place = if payload.side_panel {
                        "side panel"
                    } else {
                        "image"
                    };
                    println!("  [{place}: {image}]");
                }
            }
            TutorEvent::ExerciseComplete(payload) => {
                println!("Tutor: {}", payload.message);
                println!();
                println!("Exercise complete.");
            }
            TutorEvent::Error(payload) => {
                eprintln!("{}", payload.message);
            }
        }
        println!();
    }
}
