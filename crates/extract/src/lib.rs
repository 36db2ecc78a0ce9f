// crates/extract/src/lib.rs
//! Connector between an S3-compatible bucket and in-memory tables:
//! prefix listing, CSV ingestion and Parquet (or CSV) egress.

pub mod csv_codec;
pub mod parquet_codec;
pub mod s3_store;
pub mod store;

pub use s3_store::S3ObjectStore;
pub use store::{MemoryObjectStore, ObjectStore};

use common::config::{DEFAULT_REGION, S3Section};
use common::*;
use std::sync::Arc;

/// Where the connector points
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorSettings {
    pub endpoint: String,
    pub bucket: String,
    pub region: String,
    pub force_path_style: bool,
}

impl ConnectorSettings {
    /// The region is taken from AWS endpoint hosts such as
    /// `s3.eu-central-1.amazonaws.com`; any other host gets `DEFAULT_REGION`.
    pub fn new(endpoint: impl Into<String>, bucket: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        Self {
            region: region_for_endpoint(&endpoint),
            endpoint,
            bucket: bucket.into(),
            force_path_style: true,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_force_path_style(mut self, force_path_style: bool) -> Self {
        self.force_path_style = force_path_style;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.bucket.is_empty() {
            return Err(Error::Config("bucket name is empty".to_string()));
        }
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(Error::Config(format!(
                "endpoint must be an http(s) URL, got {:?}",
                self.endpoint
            )));
        }
        Ok(())
    }
}

impl From<&S3Section> for ConnectorSettings {
    fn from(section: &S3Section) -> Self {
        let settings = ConnectorSettings::new(section.endpoint.clone(), section.bucket.clone())
            .with_force_path_style(section.force_path_style);
        match &section.region {
            Some(region) => settings.with_region(region.clone()),
            None => settings,
        }
    }
}

/// Region named by an AWS S3 endpoint host: `s3.<region>.amazonaws.com`,
/// `s3.dualstack.<region>.amazonaws.com`, `s3-<region>.amazonaws.com`,
/// optionally behind a virtual-hosted bucket label.
pub fn region_from_endpoint(endpoint: &str) -> Option<String> {
    let host = endpoint.split_once("://").map_or(endpoint, |(_, rest)| rest);
    let host = host.split(['/', '?']).next()?;
    let host = host.split(':').next()?;

    let labels: Vec<&str> = host.split('.').collect();
    let aws_at = labels.iter().position(|l| *l == "amazonaws")?;
    let service = &labels[..aws_at];

    for (i, label) in service.iter().enumerate() {
        if *label == "s3" || *label == "s3-fips" {
            return service[i + 1..]
                .iter()
                .find(|l| looks_like_region(l))
                .map(|l| l.to_string());
        }
        if let Some(rest) = label.strip_prefix("s3-") {
            if rest == "external-1" {
                return Some(DEFAULT_REGION.to_string());
            }
            if looks_like_region(rest) {
                return Some(rest.to_string());
            }
        }
    }
    None
}

fn region_for_endpoint(endpoint: &str) -> String {
    region_from_endpoint(endpoint).unwrap_or_else(|| DEFAULT_REGION.to_string())
}

// eu-central-1, us-gov-west-1, ap-southeast-3
fn looks_like_region(label: &str) -> bool {
    label.contains('-') && label.ends_with(|c: char| c.is_ascii_digit())
}

/// Connect and interact with one S3 bucket and its objects.
///
/// The bucket handle is bound once at construction and never changes, so a
/// connector can be shared across tasks behind an `Arc`.
///
/// Operations bump `etl_objects_listed`, `etl_objects_read` and
/// `etl_objects_written{format}` on whatever `metrics` recorder is installed.
pub struct S3BucketConnector {
    store: Arc<dyn ObjectStore>,
    endpoint: String,
    region: String,
    bucket: String,
}

impl S3BucketConnector {
    /// Bind to `settings.bucket` through the AWS SDK. No request is sent;
    /// an unreachable endpoint shows up on first use.
    pub fn new(credentials: S3Credentials, settings: ConnectorSettings) -> Result<Self> {
        settings.validate()?;
        let store = S3ObjectStore::connect(
            &credentials,
            &settings.endpoint,
            &settings.region,
            settings.force_path_style,
        );

        tracing::info!(
            endpoint = %settings.endpoint,
            bucket = %settings.bucket,
            region = %settings.region,
            "S3 connector bound"
        );

        Ok(Self {
            store: Arc::new(store),
            endpoint: settings.endpoint,
            region: settings.region,
            bucket: settings.bucket,
        })
    }

    /// Resolve credentials from the two named environment variables, then
    /// bind. Fails with `Error::Config` before any client is built if either
    /// variable is unset. Requests are signed for the region in `endpoint`
    /// when it is an AWS host, else for `DEFAULT_REGION`.
    pub fn from_env(
        access_key_var: &str,
        secret_key_var: &str,
        endpoint: &str,
        bucket: &str,
    ) -> Result<Self> {
        let credentials = S3Credentials::from_env(access_key_var, secret_key_var)?;
        Self::new(credentials, ConnectorSettings::new(endpoint, bucket))
    }

    /// Bind to a bucket on any `ObjectStore` backend
    pub fn with_store(store: Arc<dyn ObjectStore>, endpoint: impl Into<String>, bucket: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        Self {
            store,
            region: region_for_endpoint(&endpoint),
            endpoint,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Region requests are signed for
    pub fn region(&self) -> &str {
        &self.region
    }

    /// List all keys sharing `prefix`. An empty prefix lists the whole
    /// bucket; no match yields an empty vec.
    pub async fn list_files_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let keys = self.store.list_keys(&self.bucket, prefix).await?;
        tracing::debug!(bucket = %self.bucket, prefix, count = keys.len(), "Listed objects");
        metrics::counter!("etl_objects_listed").increment(keys.len() as u64);
        Ok(keys)
    }

    /// Read a comma-separated object into a table
    pub async fn read_csv_to_table(&self, key: &str) -> Result<Table> {
        self.read_csv_to_table_with(key, &CsvOptions::default()).await
    }

    pub async fn read_csv_to_table_with(&self, key: &str, options: &CsvOptions) -> Result<Table> {
        tracing::info!("Reading file {}/{}/{}", self.endpoint, self.bucket, key);
        let body = self.store.get_object(&self.bucket, key).await?;
        let table = csv_codec::decode(&body, options)?;

        tracing::debug!(
            key,
            bytes = body.len(),
            rows = table.num_rows(),
            columns = table.num_columns(),
            "Parsed CSV object"
        );
        metrics::counter!("etl_objects_read").increment(1);
        Ok(table)
    }

    /// Write a table as Parquet under `key`, replacing any existing object
    pub async fn write_table_to_s3(&self, table: &Table, key: &str) -> Result<()> {
        self.write_table_to_s3_as(table, key, FileFormat::Parquet).await
    }

    pub async fn write_table_to_s3_as(&self, table: &Table, key: &str, format: FileFormat) -> Result<()> {
        if table.is_empty() {
            tracing::warn!(key, "Table has no rows; writing header-only {} object", format);
        }

        let body = match format {
            FileFormat::Parquet => parquet_codec::encode(table)?,
            FileFormat::Csv => csv_codec::encode(table, &CsvOptions::default())?,
        };

        tracing::info!("Writing file to {}/{}/{}", self.endpoint, self.bucket, key);
        tracing::debug!(key, bytes = body.len(), %format, "Encoded table");

        self.store
            .put_object(&self.bucket, key, body, format.content_type())
            .await?;

        metrics::counter!("etl_objects_written", "format" => format.to_string()).increment(1);
        Ok(())
    }
}
