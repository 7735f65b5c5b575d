use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use tag_claimer::{
    claimer::{ClaimClient, ClientConfig, Dispatcher, WorkerConfig},
    loader,
    webhook::Notifier,
    Config,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Reserve and claim gamertags using token and proxy pools
#[derive(Parser)]
#[command(name = "tag-claimer")]
#[command(about = "Reserve and claim gamertags using token and proxy pools")]
struct Cli {
    /// File containing auth tokens, one per line
    #[arg(short, long, default_value = "tokens.txt")]
    tokens: String,

    /// File containing proxies, one per line
    #[arg(short, long, default_value = "proxies.txt")]
    proxies: String,

    /// File containing target gamertags, one per line
    #[arg(short, long, default_value = "gamertags.txt")]
    gamertags: String,

    /// Discord webhook URL for outcome notifications
    #[arg(short, long)]
    webhook_url: String,

    /// Maximum reserve attempts per gamertag
    #[arg(long, default_value = "1000")]
    max_attempts: u32,

    /// Number of gamertags processed concurrently
    #[arg(short = 'n', long, default_value = "10")]
    concurrency: usize,

    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config {
        proxies_file: cli.proxies,
        tokens_file: cli.tokens,
        gamertags_file: cli.gamertags,
        webhook_url: cli.webhook_url,
    };

    let tokens = loader::load_lines(&config.tokens_file);
    let proxies = loader::load_lines(&config.proxies_file);
    let gamertags = loader::load_lines(&config.gamertags_file);

    if tokens.is_empty() {
        error!(file = %config.tokens_file, "no tokens loaded, nothing to authenticate with");
        return ExitCode::from(2);
    }
    if gamertags.is_empty() {
        error!(file = %config.gamertags_file, "no gamertags loaded, nothing to do");
        return ExitCode::from(2);
    }

    info!(
        tokens = tokens.len(),
        proxies = proxies.len(),
        gamertags = gamertags.len(),
        concurrency = cli.concurrency,
        "starting"
    );

    let client_config = ClientConfig::new().with_timeout(Duration::from_secs(cli.timeout));
    let client = match ClaimClient::with_config(client_config) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "failed to build HTTP client");
            return ExitCode::from(2);
        }
    };

    let notifier = Notifier::new(config.webhook_url.clone());
    let worker_config = WorkerConfig::new()
        .with_max_attempts(cli.max_attempts)
        .with_concurrency(cli.concurrency);

    let dispatcher = Dispatcher::new(client, notifier, tokens, proxies, worker_config);
    let outcomes = dispatcher.run(gamertags).await;

    let claimed = outcomes.iter().filter(|(_, o)| o.is_claimed()).count();
    info!(
        claimed,
        failed = outcomes.len() - claimed,
        total = outcomes.len(),
        "finished"
    );

    if claimed == outcomes.len() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}
