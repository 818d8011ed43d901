use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use flight_control::{plan, CommandExecutor, DroneController, FlightSession, PilotMetrics};
use intent_matcher::{create_matcher, DroneCommand, MatcherKind};
use sim_client::{MockMultirotor, MultirotorClient};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use voice_input::plugin::{new_command_source, new_translator, SourceKind};

/// How long shutdown waits for an utterance in progress.
const VOICE_LOOP_GRACE: Duration = Duration::from_secs(2);

mod config;
mod pipeline;

use config::PilotConfig;
use pipeline::Pipeline;

#[derive(Parser, Debug)]
#[command(
    name = "voice-pilot",
    version,
    about = "Fly a simulated quadrotor with spoken commands",
    disable_help_subcommand = true
)]
struct Cli {
    /// YAML or JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Listen for commands and fly
    Fly(FlyArgs),
    /// Classify a phrase and print the result
    Classify {
        #[arg(long)]
        text: String,
        /// Matcher to use; all of them when omitted
        #[arg(long, value_parser = parse_matcher)]
        matcher: Option<MatcherKind>,
        /// Print JSON instead of text
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
    },
    /// Show the maneuver a command turns into
    Plan {
        /// Command label, e.g. `forward` or `rotate_left`
        #[arg(long)]
        command: String,
        /// Matcher whose motion profile applies
        #[arg(long, value_parser = parse_matcher, default_value = "keyword")]
        matcher: MatcherKind,
    },
    /// List matcher kinds and voice sources
    Matchers,
}

#[derive(Args, Debug)]
struct FlyArgs {
    #[arg(long, value_parser = parse_matcher)]
    matcher: Option<MatcherKind>,
    /// script, stdin or mic
    #[arg(long, value_parser = parse_source)]
    source: Option<SourceKind>,
    /// Phrase file for the script source
    #[arg(long)]
    script: Option<PathBuf>,
    /// Spoken language code, e.g. `hi`
    #[arg(long)]
    language: Option<String>,
    /// Where scan and analyse images go
    #[arg(long)]
    capture_dir: Option<PathBuf>,
    /// Trailing silence that ends a phrase (mic source)
    #[arg(long)]
    pause_ms: Option<u32>,
    /// Print Prometheus metrics on exit
    #[arg(long, action = ArgAction::SetTrue)]
    metrics: bool,
}

fn parse_matcher(s: &str) -> Result<MatcherKind, String> {
    s.parse().map_err(|e: intent_matcher::IntentError| e.to_string())
}

fn parse_source(s: &str) -> Result<SourceKind, String> {
    s.parse().map_err(|e: voice_input::VoiceError| e.to_string())
}

fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => PilotConfig::load(path)?,
        None => PilotConfig::default(),
    };

    match cli.command {
        Commands::Fly(args) => {
            apply_overrides(&mut config, &args);
            fly(config, args.metrics)
        }
        Commands::Classify {
            text,
            matcher,
            json,
        } => classify(&config, &text, matcher, json),
        Commands::Plan { command, matcher } => {
            let command: DroneCommand = command.parse()?;
            let profile = config.profile(matcher);
            println!("{} -> {}", command, plan(command, &profile));
            Ok(())
        }
        Commands::Matchers => {
            for kind in MatcherKind::ALL {
                let profile = config.profile(kind);
                println!(
                    "{}\tnegation={:?}\tstep={}m/{}m\tmovement={:?}",
                    kind,
                    config.matcher.negation_policy(kind),
                    profile.horizontal_step_m,
                    profile.vertical_step_m,
                    profile.movement
                );
            }
            println!("sources: script, stdin, mic");
            Ok(())
        }
    }
}

fn apply_overrides(config: &mut PilotConfig, args: &FlyArgs) {
    if let Some(kind) = args.matcher {
        config.matcher.kind = kind;
    }
    if let Some(language) = &args.language {
        config.language = language.clone();
    }
    if let Some(dir) = &args.capture_dir {
        config.capture_dir = dir.clone();
    }
    if let Some(pause_ms) = args.pause_ms {
        config.voice.endpointer.pause_ms = pause_ms;
    }
    if let Some(script) = &args.script {
        config.voice.script_path = Some(script.clone());
        config.voice.source = SourceKind::Script;
    }
    if let Some(source) = args.source {
        config.voice.source = source;
    }
}

fn classify(
    config: &PilotConfig,
    text: &str,
    only: Option<MatcherKind>,
    json: bool,
) -> Result<()> {
    let kinds: Vec<MatcherKind> = match only {
        Some(kind) => vec![kind],
        None => MatcherKind::ALL.to_vec(),
    };
    for kind in kinds {
        let matcher = create_matcher(kind, &config.matcher)
            .with_context(|| format!("creating {} matcher", kind))?;
        let result = match matcher.classify(text) {
            Ok(result) => result,
            Err(e) => {
                warn!("{} matcher failed: {}", kind, e);
                continue;
            }
        };
        if json {
            println!("{}", serde_json::to_string(&result)?);
            continue;
        }
        match result {
            Some(c) => println!("{}\t{}\t{:.2}", kind, c.intent, c.confidence),
            None => println!("{}\tnot recognized", kind),
        }
    }
    Ok(())
}

fn fly(config: PilotConfig, print_metrics: bool) -> Result<()> {
    let kind = config.matcher.kind;
    info!("voice-pilot starting with the {} matcher", kind);

    let matcher = create_matcher(kind, &config.matcher)
        .with_context(|| format!("creating {} matcher", kind))?;
    let translator = new_translator(&config.voice.translator).context("creating translator")?;
    let source = new_command_source(config.voice.source, &config.source_options())
        .context("opening voice source")?;

    let sim = MockMultirotor::new(config.mock.to_mock_config()).context("starting simulator")?;
    let client: Arc<dyn MultirotorClient> = Arc::new(sim);
    let session = FlightSession::open(Arc::clone(&client)).context("opening flight session")?;

    let metrics = Arc::new(PilotMetrics::new()?);
    let controller = DroneController::new(client, config.profile(kind), &config.capture_dir)?;
    let executor = Arc::new(CommandExecutor::new(Arc::new(controller), Arc::clone(&metrics)));

    let mut pipeline = Pipeline::new(
        source,
        translator,
        matcher,
        Arc::clone(&executor),
        Arc::clone(&metrics),
        config.matcher.negation_policy(kind),
    )
    .with_poll_interval(config.poll_interval());

    // Signal handling only; the voice loop itself is blocking.
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .context("building runtime")?;
    let stop = pipeline.stop_flag();
    rt.block_on(async move {
        let mut voice_loop = tokio::task::spawn_blocking(move || pipeline.run());
        let res = tokio::select! {
            res = &mut voice_loop => res,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, shutting down");
                stop.store(true, Ordering::Release);
                match tokio::time::timeout(VOICE_LOOP_GRACE, &mut voice_loop).await {
                    Ok(res) => res,
                    Err(_) => {
                        // Blocked reading input; the stop flag keeps it from dispatching.
                        warn!("voice loop still busy, leaving it behind");
                        return;
                    }
                }
            }
        };
        match res {
            Ok(Ok(n)) => info!("voice loop finished after {} utterances", n),
            Ok(Err(e)) => error!("voice loop failed: {:#}", e),
            Err(e) => error!("voice loop panicked: {}", e),
        }
    });

    // Final stop, then hand the vehicle back.
    match executor.dispatch(DroneCommand::Stop) {
        Ok(_) => executor.wait_idle(),
        Err(e) => warn!("final stop: {}", e),
    }
    executor.shutdown();
    session.close().context("closing flight session")?;

    if print_metrics {
        print!("{}", metrics.encode_text());
    }
    // The voice thread may still be blocked reading input.
    rt.shutdown_timeout(Duration::from_millis(200));
    Ok(())
}

fn setup_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
