use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use restaurant_catalog::{
    aggregation::ScoreAggregator,
    config::Config,
    embedding::{backfill_embeddings, GeminiEmbedder},
    models::NewRestaurant,
    services::CatalogService,
    state::{EntityStore, SledStore},
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "catalog-cli")]
#[command(about = "Restaurant catalog maintenance CLI", long_about = None)]
struct Cli {
    /// Sled database directory; defaults to `state.path` from the configuration
    #[arg(short, long, env = "CATALOG_DATA")]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import restaurants from a JSON array of records, skipping known slugs
    Import {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Generate embeddings for restaurants that have none
    Embed,

    /// Recompute every restaurant's user score from its reviews
    Recalculate,

    /// Delete a restaurant by slug
    Remove {
        #[arg(value_name = "SLUG")]
        slug: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "restaurant_catalog=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load().context("Failed to load configuration")?;

    let Some(path) = cli.data.or_else(|| config.state.path.clone()) else {
        bail!("No database path: pass --data or set state.path");
    };
    let sled = Arc::new(
        SledStore::new(&path, &config.search)
            .with_context(|| format!("Failed to open database at {}", path.display()))?,
    );
    let store: Arc<dyn EntityStore> = sled.clone();

    match cli.command {
        Commands::Import { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let records: Vec<NewRestaurant> =
                serde_json::from_str(&raw).context("Import file must be a JSON array of restaurants")?;

            let summary = CatalogService::new(store).import(records).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Commands::Embed => {
            let embedder = GeminiEmbedder::from_env(&config.embedding)?;
            let summary = backfill_embeddings(store.as_ref(), &embedder).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Commands::Recalculate => {
            let summary = ScoreAggregator::new(store).recalculate_all().await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Commands::Remove { slug } => {
            let Some(restaurant) = store.find_by_slug(&slug).await? else {
                bail!("No restaurant with slug '{}'", slug);
            };
            store.delete_restaurant(&restaurant.id).await?;
            println!("Removed {} ({})", restaurant.name, restaurant.id);
        }
    }

    sled.flush().await?;
    tracing::info!(bytes = sled.size_on_disk()?, path = %path.display(), "Database flushed");
    Ok(())
}
