//! Operator CLI, grounded on the same shape as the teacher's `xtask`/
//! `bookworm` auxiliary binaries: a `clap` subcommand dispatcher wired
//! directly against the shared store/broker rather than going through
//! the gateway's HTTP surface, for tasks an operator runs by hand
//! (seeding the first admin account, checking queue depth, force-failing
//! a stuck book).

use clap::{Parser, Subcommand};
use gen_audio_core::auth::{hash_password, validate_password, validate_username};
use gen_audio_core::broker::{Broker, RedisBroker};
use gen_audio_core::config::Config;
use gen_audio_core::models::BookState;
use gen_audio_core::store::{MetadataStore, PgMetadataStore};
use uuid::Uuid;

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the fixed startup admin account if it doesn't already exist.
    SeedAdmin,
    /// Report the current depth of a broker queue.
    QueueDepth { queue: String },
    /// Mark a book as failed, e.g. to clear one stuck by a dead worker.
    FailBook {
        book_id: Uuid,
        #[arg(long, default_value = "manually failed by operator")]
        reason: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    Config::init_tracing();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Command::SeedAdmin => seed_admin(&config).await,
        Command::QueueDepth { queue } => queue_depth(&config, &queue).await,
        Command::FailBook { book_id, reason } => fail_book(&config, book_id, &reason).await,
    }
}

const ADMIN_USERNAME: &str = "admin";
const ADMIN_EMAIL: &str = "admin@example.com";

/// Seeds the fixed startup admin account (§6): username and email are not
/// configurable, only the password (`ADMIN_PASSWORD`, default `admin123!`).
async fn seed_admin(config: &Config) -> anyhow::Result<()> {
    validate_username(ADMIN_USERNAME).map_err(|e| anyhow::anyhow!(e))?;
    validate_password(&config.admin_password).map_err(|e| anyhow::anyhow!(e))?;

    let store = PgMetadataStore::connect(&config.database_url).await?;
    if store.find_user_by_email(ADMIN_EMAIL).await?.is_some() {
        tracing::info!(username = ADMIN_USERNAME, "admin account already exists");
        return Ok(());
    }

    let hash = hash_password(&config.admin_password)?;
    let user = store.create_user(ADMIN_USERNAME, ADMIN_EMAIL, &hash).await?;
    tracing::info!(user_id = %user.id, username = ADMIN_USERNAME, "seeded admin account");
    Ok(())
}

async fn queue_depth(config: &Config, queue: &str) -> anyhow::Result<()> {
    let broker = RedisBroker::connect(&config.redis_url).await?;
    let depth = broker.queue_len(queue).await?;
    println!("{queue}: {depth}");
    Ok(())
}

async fn fail_book(config: &Config, book_id: Uuid, reason: &str) -> anyhow::Result<()> {
    let store = PgMetadataStore::connect(&config.database_url).await?;
    if store.find_book(book_id).await?.is_none() {
        anyhow::bail!("no such book: {book_id}");
    }
    store.transition_book(book_id, BookState::Failed, None, Some(reason)).await?;
    tracing::info!(%book_id, reason, "book marked failed by operator");
    Ok(())
}
