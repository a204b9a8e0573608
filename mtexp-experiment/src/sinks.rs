use crate::config::ConfigError;
use mtexp_core::{ResultRecord, ResultSink, SinkError};
use reqwest::Url;
use reqwest::blocking::Client;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Collection endpoint used when no results file is given
pub const DEFAULT_ENDPOINT: &str = "https://p6drad-teel.net/~windo/mtexp/post.php";

/// Appends one row per record to a local file.
///
/// The file is opened, written and closed on every emit so a crash never
/// leaves a buffered row behind. Rows are written without a separator.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultSink for FileSink {
    fn emit(&mut self, record: &ResultRecord) -> Result<(), SinkError> {
        let io_err = |source| SinkError::File {
            path: self.path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(io_err)?;
        file.write_all(record.to_row().as_bytes()).map_err(io_err)?;
        debug!(path = %self.path.display(), "saved to file");
        Ok(())
    }
}

/// Submits each record as a form POST
#[derive(Debug, Clone)]
pub struct HttpSink {
    endpoint: Url,
    client: Client,
}

impl HttpSink {
    pub fn new(endpoint: &str) -> Result<Self, ConfigError> {
        let endpoint = Url::parse(endpoint).map_err(|e| ConfigError::Endpoint {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ConfigError::Endpoint {
                endpoint: endpoint.to_string(),
                reason: format!("unsupported scheme {:?}", endpoint.scheme()),
            });
        }
        let client = Client::builder()
            .build()
            .map_err(|e| ConfigError::Endpoint {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { endpoint, client })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl ResultSink for HttpSink {
    fn emit(&mut self, record: &ResultRecord) -> Result<(), SinkError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .form(&record.form_fields())
            .send()
            .map_err(|e| SinkError::Submit {
                endpoint: self.endpoint.to_string(),
                source: Box::new(e),
            })?;

        let status = response.status();
        info!(status = %status, "post response");
        if !status.is_success() {
            return Err(SinkError::Rejected {
                endpoint: self.endpoint.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
