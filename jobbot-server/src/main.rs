use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use jobbot_common::Error;
use jobbot_common::traits::{ChatTransport, PlatformIntegration};
use jobbot_core::jobboard::{JobBoardPolicy, JobBoardService};
use jobbot_core::platforms::discord::DiscordPlatform;
use jobbot_core::tasks::jobboard_sweep::spawn_sweep_task;

#[derive(Parser, Debug, Clone)]
#[command(name = "jobbot")]
#[command(author, version, about = "Job-board moderation bot")]
struct Args {
    /// Channel the job board lives in
    #[arg(long)]
    job_channel: String,

    /// Channel that receives removal and circumvention reports
    #[arg(long)]
    report_channel: String,

    /// Guild the bot moderates (needed for member timeouts)
    #[arg(long)]
    guild: String,

    /// Discord bot token; falls back to the DISCORD_BOT_TOKEN env var
    #[arg(long)]
    discord_token: Option<String>,

    /// Seconds between aged-post sweeps
    #[arg(long, default_value_t = 3600)]
    sweep_interval_secs: u64,

    /// JSON file with board policy overrides; CLI flags win over the file
    #[arg(long)]
    policy_file: Option<std::path::PathBuf>,

    /// Override: days an author must wait between posts
    #[arg(long)]
    repost_window_days: Option<i64>,

    /// Override: forward bias (hours) applied to repost eviction
    #[arg(long)]
    repost_bias_hours: Option<i64>,

    /// Override: minutes a for-hire listing stays on the board
    #[arg(long)]
    for_hire_max_age_minutes: Option<i64>,
}

fn init_tracing() {
    let filter = EnvFilter::from_default_env()
        .add_directive("jobbot=info".parse().unwrap_or_default());
    let sub = fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(sub).expect("Failed to set global subscriber");
}

fn build_policy(args: &Args) -> Result<JobBoardPolicy, Error> {
    let mut policy = match &args.policy_file {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => JobBoardPolicy::default(),
    };
    if let Some(days) = args.repost_window_days {
        policy.repost_window_days = days;
    }
    if let Some(hours) = args.repost_bias_hours {
        policy.repost_bias_hours = hours;
    }
    if let Some(minutes) = args.for_hire_max_age_minutes {
        policy.for_hire_max_age_minutes = minutes;
    }
    Ok(policy)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    init_tracing();

    let args = Args::parse();
    info!(
        "JobBot starting. job_channel={}, report_channel={}, guild={}",
        args.job_channel, args.report_channel, args.guild
    );

    if let Err(e) = run(args).await {
        error!("Server error: {:?}", e);
    }
    info!("Main finished. Goodbye!");
    Ok(())
}

async fn run(args: Args) -> Result<(), Error> {
    let token = match args
        .discord_token
        .clone()
        .or_else(|| std::env::var("DISCORD_BOT_TOKEN").ok())
    {
        Some(token) => token,
        None => {
            return Err(Error::Auth(
                "No Discord token: pass --discord-token or set DISCORD_BOT_TOKEN".to_string(),
            ));
        }
    };

    let policy = build_policy(&args)?;

    let mut platform = DiscordPlatform::new(token, args.guild.clone());
    platform.connect().await?;
    let platform = Arc::new(platform);

    let service = Arc::new(JobBoardService::new(
        platform.clone() as Arc<dyn ChatTransport>,
        policy,
        args.job_channel.clone(),
        args.report_channel.clone(),
    ));

    // Handlers are attached first; the window until the bootstrap finishes
    // runs with reduced accuracy, which is acceptable.
    let bootstrap_service = service.clone();
    tokio::spawn(async move {
        match bootstrap_service.bootstrap().await {
            Ok(count) => info!("Bootstrap scanned {count} message(s)"),
            Err(e) => warn!("Bootstrap failed: {e:?}"),
        }
    });

    let sweep_handle = spawn_sweep_task(
        service.clone(),
        Duration::from_secs(args.sweep_interval_secs),
    );

    while let Some(event) = platform.next_event().await {
        if let Err(e) = service.handle_event(event).await {
            error!("Event handling error: {e:?}");
        }
    }

    sweep_handle.abort();
    info!("Event stream ended; shutting down");
    Ok(())
}
