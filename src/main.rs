//! Parlay: adaptive gameplay agent for a remote session service
//!
//! Subcommands:
//!
//! - `train`    -- Run the multi-episode training loop
//! - `episode`  -- Run a single orchestrated episode
//! - `export`   -- Export a session's experiences as Gymnasium JSONL
//! - `health`   -- Probe the session service

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use parlay::config::ParlayConfig;
use parlay::experience::write_jsonl;
use parlay::orchestrator::{AnyPacer, InstantPacer, Orchestrator, TokioPacer};
use parlay::profile::BehaviorType;
use parlay::service::{
    AnyService, HttpSessionService, MockSessionService, SessionId, SessionService,
};
use parlay::training::{TrainingLoop, TrainingReport};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// Parlay: adaptive gameplay agent for a remote session service
#[derive(Parser)]
#[command(name = "parlay", version, about)]
struct Cli {
    /// Path to a JSON configuration file (uses defaults if not provided).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use the in-process mock service instead of the remote one.
    #[arg(long, global = true)]
    mock: bool,

    /// Seed for exploration, delays and the mock service.
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Do not actually wait between actions.
    #[arg(long, global = true)]
    instant: bool,

    /// Play as this behavior; stake and delay bounds left at their
    /// defaults take the behavior's preset.
    #[arg(long, global = true)]
    behavior: Option<BehaviorType>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the training loop over many episodes.
    Train {
        /// Number of episodes (defaults to `training.episodes`).
        #[arg(long)]
        episodes: Option<usize>,

        /// Directory for per-episode exports and `summary.json`.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Run one episode and print its outcome.
    Episode,

    /// Fetch a session's experiences and write them as JSONL.
    Export {
        /// Session to export.
        #[arg(long)]
        session_id: Uuid,

        /// Output file.
        #[arg(long, default_value = "data/export.jsonl")]
        output: PathBuf,
    },

    /// Call the service health endpoint.
    Health,
}

// ---------------------------------------------------------------------------
// Entrypoint
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing (reads RUST_LOG env var, defaults to info).
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = ParlayConfig::load(cli.config.as_deref())?;
    config.apply_env();
    if let Some(behavior) = cli.behavior {
        config.profile = config.profile.clone().with_behavior(behavior);
    }
    if let Commands::Train {
        episodes,
        output_dir,
    } = &cli.command
    {
        if let Some(episodes) = episodes {
            config.training.episodes = *episodes;
        }
        if let Some(dir) = output_dir {
            config.training.output_dir = dir.clone();
        }
    }
    config.validate(!cli.mock)?;

    let seed = cli.seed.unwrap_or_else(rand::random);
    tracing::info!(seed, mock = cli.mock, "configuration loaded");

    let service = create_service(&config, cli.mock, seed)?;
    let pacer = if cli.instant {
        AnyPacer::Instant(InstantPacer)
    } else {
        AnyPacer::Tokio(TokioPacer)
    };
    let orchestrator = Orchestrator::new(
        service,
        pacer,
        config.retrier(),
        config.episode_settings(),
    );
    let mut rng = StdRng::seed_from_u64(seed);

    match cli.command {
        Commands::Train { .. } => cmd_train(&config, orchestrator, &mut rng).await,
        Commands::Episode => cmd_episode(&config, &orchestrator, &mut rng).await,
        Commands::Export { session_id, output } => {
            cmd_export(&orchestrator, SessionId(session_id), &output).await
        }
        Commands::Health => cmd_health(orchestrator.service()).await,
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_train(
    config: &ParlayConfig,
    orchestrator: Orchestrator<AnyService, AnyPacer>,
    rng: &mut StdRng,
) -> Result<()> {
    tracing::info!("Starting training loop");

    let settings = config.training_settings();
    let output_dir = settings.output_dir.clone();
    let training = TrainingLoop::new(orchestrator, settings);

    let report = training
        .run(config.profile.clone(), config.initial_policy()?, rng)
        .await?;

    let summary_path = output_dir.join("summary.json");
    report.save(&summary_path)?;
    print_report(&report);

    tracing::info!(path = %summary_path.display(), "Training summary saved");
    Ok(())
}

async fn cmd_episode(
    config: &ParlayConfig,
    orchestrator: &Orchestrator<AnyService, AnyPacer>,
    rng: &mut StdRng,
) -> Result<()> {
    let outcome = orchestrator
        .run_episode(&config.profile, &config.initial_policy()?, rng)
        .await
        .context("Episode failed")?;

    println!("Session:       {}", outcome.session_id);
    println!("Final state:   {}", outcome.final_observation.state);
    println!("Termination:   {:?}", outcome.termination);
    println!("Steps:         {}", outcome.steps);
    println!("Total spins:   {}", outcome.final_observation.metrics.total_spins);
    println!("Total payout:  {:.2}", outcome.final_observation.metrics.total_payout);
    println!("Experiences:   {}", outcome.experiences.len());
    println!("Human-likeness (mean): {:.3}", outcome.mean_human_likeness);
    Ok(())
}

async fn cmd_export(
    orchestrator: &Orchestrator<AnyService, AnyPacer>,
    session_id: SessionId,
    output: &Path,
) -> Result<()> {
    let records = orchestrator
        .fetch_experiences(session_id)
        .await
        .with_context(|| format!("Failed to export session {session_id}"))?;
    let written = write_jsonl(output, &records)?;

    tracing::info!(path = %output.display(), records = written, "Experiences exported");
    Ok(())
}

async fn cmd_health(service: &AnyService) -> Result<()> {
    let health = service
        .health()
        .await
        .context("Health check failed")?;
    println!("Service status: {}", health.status);
    Ok(())
}

fn print_report(report: &TrainingReport) {
    println!(
        "{:>7}  {:>10}  {:>7}  {:>5}  {:<11}  {:>7}  {:>7}  {}",
        "episode", "reward", "epsilon", "steps", "final", "min_bet", "max_bet", "export"
    );
    for s in &report.summaries {
        let export = match (&s.export_path, &s.error, &s.export_error) {
            (_, Some(err), _) => format!("error: {err}"),
            (_, None, Some(err)) => format!("export failed: {err}"),
            (Some(path), None, None) => path.display().to_string(),
            (None, None, None) => "-".to_string(),
        };
        println!(
            "{:>7}  {:>10.3}  {:>7.3}  {:>5}  {:<11}  {:>7.2}  {:>7.2}  {}",
            s.episode,
            s.total_reward,
            s.epsilon,
            s.steps,
            s.final_state_label(),
            s.min_bet,
            s.max_bet,
            export
        );
    }
    println!();
    println!(
        "Completed {}/{} episodes; final epsilon {:.3}, stakes {:.2}..{:.2}",
        report.completed_episodes(),
        report.summaries.len(),
        report.final_policy.epsilon,
        report.final_profile.min_bet,
        report.final_profile.max_bet
    );
}

// ---------------------------------------------------------------------------
// Service construction
// ---------------------------------------------------------------------------

fn create_service(config: &ParlayConfig, mock: bool, seed: u64) -> Result<AnyService> {
    if mock {
        tracing::info!("Using mock session service");
        return Ok(AnyService::Mock(MockSessionService::new(
            config.mock.clone(),
            seed,
        )));
    }
    tracing::info!(base_url = %config.service.base_url, "Using remote session service");
    let http = HttpSessionService::new(
        &config.service.base_url,
        &config.service.api_key,
        config.service_timeout(),
    )?;
    Ok(AnyService::Http(http))
}
