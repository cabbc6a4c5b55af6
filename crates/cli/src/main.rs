mod commands;

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "authflow",
    about = "authflow — OAuth2 authorization-code flow driver"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the authorization-code flow for a provider and store the token.
    Login {
        /// Provider name ("google-drive" or "salesforce").
        #[arg(long)]
        provider: String,

        /// Port for the local redirect callback listener.
        #[arg(long, default_value_t = 8000)]
        port: u16,

        /// Paste the redirect URL by hand instead of listening for the
        /// callback (for redirect URIs that are not loopback).
        #[arg(long, default_value_t = false)]
        manual: bool,
    },
    /// Obtain a fresh access token from the stored refresh token.
    Refresh {
        /// Provider name ("google-drive" or "salesforce").
        #[arg(long)]
        provider: String,
    },
    /// Show stored tokens for all providers.
    Status,
    /// Delete the stored token for a provider.
    Logout {
        /// Provider name ("google-drive" or "salesforce").
        #[arg(long)]
        provider: String,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "authflow starting");

    match cli.command {
        Commands::Login {
            provider,
            port,
            manual,
        } => commands::login(&provider, port, manual).await,
        Commands::Refresh { provider } => commands::refresh(&provider).await,
        Commands::Status => commands::status(),
        Commands::Logout { provider } => commands::logout(&provider),
    }
}
