// crates/extract/src/main.rs
use anyhow::Context;
use clap::{Parser, Subcommand};
use common::config::{EtlConfig, DEFAULT_CONFIG_PATH};
use common::{FileFormat, S3Credentials};
use extract::{csv_codec, ConnectorSettings, S3BucketConnector};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "etl", about = "List, read and write objects in an S3-compatible bucket")]
struct Cli {
    /// Config file; falls back to $ETL_CONFIG, then config/etl.toml
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print every key that starts with PREFIX
    List {
        #[arg(default_value = "")]
        prefix: String,
    },
    /// Read a CSV object and print it as JSON
    Read { key: String },
    /// Parse a local CSV file and write it to KEY
    Upload {
        path: PathBuf,
        key: String,
        /// parquet or csv; defaults to the config's [output] format
        #[arg(long)]
        format: Option<FileFormat>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install metrics recorder")?;

    let cli = Cli::parse();
    let result = run(cli).await;
    tracing::debug!("Run counters:\n{}", metrics.render());

    if let Err(e) = result {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli
        .config
        .or_else(|| std::env::var_os("ETL_CONFIG").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = EtlConfig::load(&config_path)?;
    let csv_options = config.csv_options()?;

    let credentials = S3Credentials::from_env(&config.s3.access_key_var, &config.s3.secret_key_var)?;
    let connector = S3BucketConnector::new(credentials, ConnectorSettings::from(&config.s3))?;

    match cli.command {
        Command::List { prefix } => {
            for key in connector.list_files_with_prefix(&prefix).await? {
                println!("{}", key);
            }
        }
        Command::Read { key } => {
            let table = connector.read_csv_to_table_with(&key, &csv_options).await?;
            println!("{}", serde_json::to_string_pretty(&table)?);
        }
        Command::Upload { path, key, format } => {
            let body = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let table = csv_codec::decode(&body, &csv_options)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            let format = match format {
                Some(format) => format,
                None => config.output_format()?,
            };

            connector.write_table_to_s3_as(&table, &key, format).await?;
            tracing::info!(rows = table.num_rows(), %format, "Uploaded {}", key);
        }
    }

    Ok(())
}
