// crates/common/src/config.rs
use crate::{CsvOptions, Error, FileFormat, Result};
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config/etl.toml";
pub const DEFAULT_REGION: &str = "us-east-1";

#[derive(Debug, Clone, Deserialize)]
pub struct EtlConfig {
    pub s3: S3Section,
    #[serde(default)]
    pub csv: CsvSection,
    #[serde(default)]
    pub output: OutputSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Section {
    pub access_key_var: String,
    pub secret_key_var: String,
    pub endpoint: String,
    pub bucket: String,
    /// Signing region; when absent it is read from an AWS endpoint host,
    /// else `DEFAULT_REGION`
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default = "default_force_path_style")]
    pub force_path_style: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CsvSection {
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

impl Default for CsvSection {
    fn default() -> Self {
        Self { delimiter: default_delimiter() }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputSection {
    #[serde(default)]
    pub format: Option<String>,
}

fn default_force_path_style() -> bool {
    true
}

fn default_delimiter() -> String {
    ",".to_string()
}

impl EtlConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_str = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config {}: {}", path.display(), e)))?;
        Self::from_toml(&config_str)
    }

    pub fn from_toml(config_str: &str) -> Result<Self> {
        let config: EtlConfig = toml::from_str(config_str)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        // Surface bad delimiter/format values at load time, not first use
        config.csv_options()?;
        config.output_format()?;
        Ok(config)
    }

    pub fn csv_options(&self) -> Result<CsvOptions> {
        match self.csv.delimiter.as_bytes() {
            [byte] => Ok(CsvOptions::new(*byte)),
            _ => Err(Error::Config(format!(
                "CSV delimiter must be a single byte, got {:?}",
                self.csv.delimiter
            ))),
        }
    }

    pub fn output_format(&self) -> Result<FileFormat> {
        match &self.output.format {
            Some(format) => format.parse(),
            None => Ok(FileFormat::default()),
        }
    }
}
