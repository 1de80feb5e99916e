//! Warranty Tracker CLI - Identity, status, and backend tools.
//!
//! # Usage
//!
//! ```bash
//! # Resolve (or create) the account key for an auth provider id
//! wt identity assign 9f2c1b7e
//!
//! # Show the stored key without creating one
//! wt identity show 9f2c1b7e
//!
//! # Classify a warranty
//! wt classify --purchase 2024-01-01 --expiry 2026-01-01
//!
//! # List warranties from the backend with their status
//! wt warranties list 9f2c1b7e
//!
//! # Save a warranty
//! wt warranties add 9f2c1b7e --product "Laptop" --purchase 2024-01-01 --expiry 2026-01-01
//! ```
//!
//! # Commands
//!
//! - `identity` - Account key assignment and lookup
//! - `classify` - Offline status classification
//! - `warranties` - List and submit warranties
//! - `recommendations` - Suggested products
//! - `health` - Backend liveness check

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use warranty_app::api::WarrantyApiClient;
use warranty_app::config::AppConfig;
use warranty_app::error::{self, AppError};
use warranty_app::identity::IdentityAssigner;
use warranty_app::storage::Store;
use warranty_core::WarrantyDraft;

mod commands;

#[derive(Parser)]
#[command(name = "wt")]
#[command(author, version, about = "Warranty Tracker CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage local account keys
    Identity {
        #[command(subcommand)]
        action: IdentityAction,
    },
    /// Classify a warranty by its dates
    Classify {
        /// Purchase date (YYYY-MM-DD)
        #[arg(long)]
        purchase: String,

        /// Expiry date (YYYY-MM-DD)
        #[arg(long)]
        expiry: String,

        /// Date to classify on (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        now: Option<String>,

        /// Days before expiry that count as expiring
        #[arg(long)]
        horizon_days: Option<u32>,
    },
    /// List or submit warranties
    Warranties {
        #[command(subcommand)]
        action: WarrantiesAction,
    },
    /// Show recommended products
    Recommendations {
        /// External auth provider id
        external_id: String,
    },
    /// Check backend health
    Health,
}

#[derive(Subcommand)]
enum IdentityAction {
    /// Resolve the account key, creating one if needed
    Assign {
        /// External auth provider id
        external_id: String,
    },
    /// Show the stored account key without creating one
    Show {
        /// External auth provider id
        external_id: String,
    },
}

#[derive(Subcommand)]
enum WarrantiesAction {
    /// Fetch and classify the account's warranties
    List {
        /// External auth provider id
        external_id: String,
    },
    /// Submit a new warranty
    Add {
        /// External auth provider id
        external_id: String,

        /// Product name
        #[arg(short, long)]
        product: String,

        /// Purchase date (YYYY-MM-DD)
        #[arg(long)]
        purchase: String,

        /// Expiry date (YYYY-MM-DD)
        #[arg(long)]
        expiry: String,

        /// Brand name
        #[arg(short, long)]
        brand: Option<String>,

        /// Purchase price
        #[arg(long)]
        price: Option<String>,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &AppConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = AppConfig::from_env();
    let sentry_guard = config.as_ref().ok().and_then(init_sentry);

    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "warranty_cli=info,warranty_app=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(error::sentry_event_filter))
        .init();

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        error::capture(&e);
        // Flush pending events; process::exit skips destructors
        drop(sentry_guard);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: AppConfig) -> Result<(), AppError> {
    match cli.command {
        Commands::Classify {
            purchase,
            expiry,
            now,
            horizon_days,
        } => {
            let policy = horizon_days.map_or(config.status_policy, warranty_core::StatusPolicy::new);
            commands::classify::run(&purchase, &expiry, now.as_deref(), &policy)?;
        }
        Commands::Health => {
            let client = WarrantyApiClient::new(&config.api)?;
            commands::health::check(&client).await?;
        }
        Commands::Identity { action } => {
            let assigner = open_assigner(&config).await?;
            match action {
                IdentityAction::Assign { external_id } => {
                    commands::identity::assign(&assigner, &external_id).await?;
                }
                IdentityAction::Show { external_id } => {
                    commands::identity::show(&assigner, &external_id).await?;
                }
            }
        }
        Commands::Warranties { action } => {
            let assigner = open_assigner(&config).await?;
            let client = WarrantyApiClient::new(&config.api)?;
            match action {
                WarrantiesAction::List { external_id } => {
                    commands::warranties::list(
                        &assigner,
                        &client,
                        &external_id,
                        &config.status_policy,
                    )
                    .await?;
                }
                WarrantiesAction::Add {
                    external_id,
                    product,
                    purchase,
                    expiry,
                    brand,
                    price,
                } => {
                    let draft = WarrantyDraft {
                        product,
                        purchase_date: purchase,
                        expiry_date: expiry,
                        brand: brand.unwrap_or_default(),
                        price: price.unwrap_or_default(),
                        ..WarrantyDraft::default()
                    };
                    commands::warranties::add(&assigner, &client, &external_id, &draft).await?;
                }
            }
        }
        Commands::Recommendations { external_id } => {
            let assigner = open_assigner(&config).await?;
            let client = WarrantyApiClient::new(&config.api)?;
            commands::recommendations::list(&assigner, &client, &external_id).await?;
        }
    }
    Ok(())
}

async fn open_assigner(config: &AppConfig) -> Result<IdentityAssigner<Store>, AppError> {
    let store = Store::open(&config.storage).await?;
    Ok(IdentityAssigner::new(store, config.identity))
}
