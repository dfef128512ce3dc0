//! Resolution of channel ids to peer aliases through the node's graph.

use crate::error::SourceError;
use async_trait::async_trait;
use moka::future::Cache;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::debug;

/// A node on the other end of a channel, or the local node itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Peer {
    pub pub_key: String,
    pub alias: String,
}

/// Looks up who is behind a channel.
#[async_trait]
pub trait ChannelDirectory: Send + Sync {
    /// The node the event source is attached to.
    async fn local_node(&self) -> Result<Peer, SourceError>;

    /// The remote peer of one of the local node's channels.
    async fn channel_peer(&self, channel_id: u64) -> Result<Peer, SourceError>;
}

#[derive(Debug, Deserialize)]
struct GetInfoResponse {
    identity_pubkey: String,
    #[serde(default)]
    alias: String,
}

#[derive(Debug, Deserialize)]
struct ChannelEdge {
    node1_pub: String,
    node2_pub: String,
}

#[derive(Debug, Deserialize)]
struct NodeInfo {
    node: Option<LightningNode>,
}

#[derive(Debug, Deserialize)]
struct LightningNode {
    #[serde(default)]
    alias: String,
}

/// `ChannelDirectory` backed by LND's REST API.
pub struct LndGraphClient {
    http: reqwest::Client,
    base_url: String,
    local: OnceCell<Peer>,
    peers: Cache<u64, Peer>,
}

impl LndGraphClient {
    /// Creates a client for `https://{rpc_host}`. `http` must already carry
    /// the macaroon header.
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            local: OnceCell::new(),
            peers: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(Duration::from_secs(3600))
                .build(),
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, SourceError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::Lookup(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Lookup(format!(
                "GET {} returned {}: {}",
                path, status, body
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| SourceError::Lookup(e.to_string()))
    }

    async fn fetch_peer(&self, channel_id: u64) -> Result<Peer, SourceError> {
        let local = self.local_node().await?;
        let edge: ChannelEdge = self.get(&format!("/v1/graph/edge/{}", channel_id)).await?;
        let remote = if edge.node1_pub == local.pub_key {
            edge.node2_pub
        } else {
            edge.node1_pub
        };

        let info: NodeInfo = self
            .get(&format!("/v1/graph/node/{}?include_channels=false", remote))
            .await?;
        let alias = info.node.map(|n| n.alias).unwrap_or_default();
        debug!(channel_id, pub_key = %remote, alias = %alias, "Resolved channel peer");

        Ok(Peer {
            pub_key: remote,
            alias,
        })
    }
}

#[async_trait]
impl ChannelDirectory for LndGraphClient {
    async fn local_node(&self) -> Result<Peer, SourceError> {
        self.local
            .get_or_try_init(|| async {
                let info: GetInfoResponse = self.get("/v1/getinfo").await?;
                Ok::<_, SourceError>(Peer {
                    pub_key: info.identity_pubkey,
                    alias: info.alias,
                })
            })
            .await
            .cloned()
    }

    async fn channel_peer(&self, channel_id: u64) -> Result<Peer, SourceError> {
        self.peers
            .try_get_with(channel_id, self.fetch_peer(channel_id))
            .await
            .map_err(|e| SourceError::Lookup(e.to_string()))
    }
}
