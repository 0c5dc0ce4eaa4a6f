//! Catalog fetcher: one GET per partition, all partitions of a load in flight
//! at once, joined before the catalog is assembled.
//!
//! A partition that fails in any way (connect error, timeout, non-success
//! status, unreadable body) contributes zero channels.  Failures are logged
//! here and never reach the caller.

use std::time::{Duration, Instant};

use futures_util::future::join_all;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::CatalogConfig;
use crate::playlist::parse_playlist;
use crate::protocol::Channel;
use crate::registry::ALL_REGIONS;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to read body: {0}")]
    Body(reqwest::Error),
}

/// One unit of fetch: a category document or a region document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Partition {
    Category(String),
    Region(String),
}

impl Partition {
    /// Label used as the default category of the partition's channels.
    pub fn label(&self) -> &str {
        match self {
            Partition::Category(label) => label,
            Partition::Region(code) => code,
        }
    }

    /// Region code stamped on the partition's channels.
    pub fn region(&self) -> &str {
        match self {
            Partition::Category(_) => ALL_REGIONS,
            Partition::Region(code) => code,
        }
    }

    fn directory(&self) -> &'static str {
        match self {
            Partition::Category(_) => "categories",
            Partition::Region(_) => "countries",
        }
    }
}

pub struct CatalogFetcher {
    client: Client,
    base_url: String,
    extension: String,
    category_partitions: Vec<String>,
}

impl CatalogFetcher {
    pub fn new(config: &CatalogConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("tvgarden/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.read_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            extension: config.extension.clone(),
            category_partitions: config.category_partitions.clone(),
        })
    }

    /// Partitions fetched for a region selection.  `"all"` never touches a
    /// region document; it expands to the configured category partitions.
    pub fn partitions_for(&self, region: &str) -> Vec<Partition> {
        if region.eq_ignore_ascii_case(ALL_REGIONS) {
            self.category_partitions
                .iter()
                .map(|label| Partition::Category(label.clone()))
                .collect()
        } else {
            vec![Partition::Region(region.to_lowercase())]
        }
    }

    pub fn partition_url(&self, partition: &Partition) -> String {
        format!(
            "{}/{}/{}.{}",
            self.base_url,
            partition.directory(),
            partition.label(),
            self.extension
        )
    }

    /// Fetch every partition of `region` concurrently and concatenate the
    /// results in partition order.  Completes once all fetches have settled.
    pub async fn fetch_region(&self, region: &str) -> Vec<Channel> {
        let partitions = self.partitions_for(region);
        let started = Instant::now();

        // join_all keeps one result slot per partition, in issue order
        let results = join_all(partitions.iter().map(|p| self.fetch_partition(p))).await;

        let channels: Vec<Channel> = results.into_iter().flatten().collect();
        info!(
            "Fetched {} channels for region '{}' from {} partitions in {:?}",
            channels.len(),
            region,
            partitions.len(),
            started.elapsed()
        );
        channels
    }

    /// Fetch and parse one partition.  Any failure yields an empty list.
    pub async fn fetch_partition(&self, partition: &Partition) -> Vec<Channel> {
        let url = self.partition_url(partition);
        match self.fetch_text(&url).await {
            Ok(text) => {
                let channels = parse_playlist(&text, partition.label(), partition.region());
                debug!(
                    "Partition '{}': {} channels from {}",
                    partition.label(),
                    channels.len(),
                    url
                );
                channels
            }
            Err(e) => {
                warn!("Partition '{}' failed ({}): {}", partition.label(), url, e);
                Vec::new()
            }
        }
    }

    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        response.text().await.map_err(FetchError::Body)
    }
}
