//! searchload CLI

use clap::{Parser, Subcommand, ValueEnum};
use searchload::common::redact_url;
use searchload::index::{merchant_index, probe_index};
use searchload::loader::{Seeder, SessionLoader, SustainedLoader};
use searchload::probe::ProbeSettings;
use searchload::{Config, IndexManager, LatencyStats, Prober, RedisStore, StopSignal};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "searchload")]
#[command(about = "Redis search load generator and visibility-latency probe")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./searchload.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Store URL, overrides REDIS_URL
    #[arg(long, global = true)]
    redis_url: Option<String>,

    /// Index name, overrides INDEX_NAME
    #[arg(long, global = true)]
    index_name: Option<String>,

    /// Document key prefix, overrides KEY_PREFIX
    #[arg(long, global = true)]
    key_prefix: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bulk-load merchant documents and ensure the index
    Seed {
        /// Documents to write
        #[arg(long)]
        total: Option<u64>,

        /// Writes per pipeline
        #[arg(long)]
        batch_size: Option<u64>,

        /// Create the index before loading instead of after
        #[arg(long)]
        index_first: bool,
    },

    /// Write merchants at a steady rate
    Sustain {
        /// Target writes per second
        #[arg(long)]
        target_rps: Option<f64>,

        /// Writes per pipeline
        #[arg(long)]
        batch_size: Option<u64>,

        /// Run time in seconds (0 = until interrupted)
        #[arg(long)]
        duration: Option<u64>,

        /// Extra attempts for a failed batch
        #[arg(long)]
        retries: Option<u32>,
    },

    /// Measure write-to-searchable latency
    Probe {
        /// Documents to probe
        #[arg(long)]
        iterations: Option<u64>,

        /// Poll interval in milliseconds
        #[arg(long)]
        sleep_ms: Option<u64>,

        /// Per-document timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Iterations between reports
        #[arg(long)]
        report_every: Option<u64>,
    },

    /// Load session hashes with random TTLs
    Sessions {
        /// Sessions to write
        #[arg(long)]
        total: Option<u64>,

        /// Writes per pipeline
        #[arg(long)]
        batch_size: Option<u64>,
    },

    /// Create the search index if it does not exist
    EnsureIndex {
        /// Schema to create
        #[arg(long, value_enum, default_value = "merchant")]
        schema: Schema,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Schema {
    /// Bulk-load schema (sortable company name)
    Merchant,
    /// Probe schema (adds the t0ms write timestamp)
    Probe,
}

fn override_with<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

impl Cli {
    /// Load file + environment config, then apply flags
    fn resolve_config(&self) -> anyhow::Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        override_with(&mut config.redis_url, self.redis_url.clone());
        override_with(&mut config.index_name, self.index_name.clone());
        override_with(&mut config.key_prefix, self.key_prefix.clone());

        match &self.command {
            Commands::Seed {
                total,
                batch_size,
                index_first,
            } => {
                override_with(&mut config.total_docs, *total);
                override_with(&mut config.batch_size, *batch_size);
                if *index_first {
                    config.create_index_after_load = false;
                }
            }
            Commands::Sustain {
                target_rps,
                batch_size,
                duration,
                retries,
            } => {
                override_with(&mut config.target_rps, *target_rps);
                override_with(&mut config.batch_size, *batch_size);
                override_with(&mut config.duration_s, *duration);
                override_with(&mut config.batch_retries, *retries);
            }
            Commands::Probe {
                iterations,
                sleep_ms,
                timeout_ms,
                report_every,
            } => {
                override_with(&mut config.iterations, *iterations);
                override_with(&mut config.sleep_ms, *sleep_ms);
                override_with(&mut config.timeout_ms, *timeout_ms);
                override_with(&mut config.report_every, *report_every);
            }
            Commands::Sessions { total, batch_size } => {
                override_with(&mut config.total_sessions, *total);
                override_with(&mut config.batch_size, *batch_size);
            }
            Commands::EnsureIndex { .. } => {}
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store = RedisStore::connect(&config.redis_url).await?;
    info!("Connected to Redis: {}", redact_url(&config.redis_url));

    let stop = StopSignal::new();
    stop.install_ctrl_c();

    match cli.command {
        Commands::Seed { .. } => {
            let mut seeder = Seeder::new(&store, &config);
            let result = seeder.run(&stop).await;
            println!("Seed report: {}", seeder.report());
            result?;
        }

        Commands::Sustain { .. } => {
            let mut loader = SustainedLoader::new(&store, &config);
            let result = loader.run(&stop).await;
            println!("Sustained load report: {}", loader.report());
            result?;
        }

        Commands::Probe { .. } => {
            IndexManager::new(&store)
                .ensure(&probe_index(&config.index_name, &config.key_prefix))
                .await?;

            let prober = Prober::new(&store, ProbeSettings::from(&config));
            let mut stats = LatencyStats::new(config.sample_window)?;
            let result = prober
                .run(config.iterations, config.report_every, &mut stats, &stop)
                .await;
            println!("Probe FINAL {}", stats.summary());
            result?;
        }

        Commands::Sessions { .. } => {
            let mut loader = SessionLoader::new(&store, &config);
            let result = loader.run(&stop).await;
            println!("Session load report: {}", loader.report());
            result?;
        }

        Commands::EnsureIndex { schema } => {
            let descriptor = match schema {
                Schema::Merchant => merchant_index(&config.index_name, &config.key_prefix),
                Schema::Probe => probe_index(&config.index_name, &config.key_prefix),
            };
            let outcome = IndexManager::new(&store).ensure(&descriptor).await?;
            println!("Index '{}': {:?}", descriptor.name, outcome);
        }
    }

    Ok(())
}
