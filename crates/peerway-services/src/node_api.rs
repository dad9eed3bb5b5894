//! Network backend that drives a local peer node over its HTTP API.
//!
//! The peer node runs the actual P2P stack. The gateway asks it to connect to
//! a remote peer and to relay a file read from that peer:
//!
//!   GET {api}/peer/connect?node=<hex>&timeout=<ms>
//!   GET {api}/peer/connect?public_key=<hex>&timeout=<ms>
//!   GET {api}/file/read?node=<hex>&hash=<hex>&offset=<n>&limit=<n>
//!
//! A file read answers with the raw bytes; `Content-Length` is the transfer
//! size and `X-File-Size` the total size of the file. 404 means no stream.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;

use peerway_core::{ContentHash, NodeId, PublicKey};

use crate::error::NetworkError;
use crate::network::{FileStream, PeerHandle, PeerInfo, PeerNetwork, StreamWindow};

/// Header carrying the total file size on file reads.
pub const FILE_SIZE_HEADER: &str = "x-file-size";

#[derive(Debug, Clone)]
pub struct NodeApiNetwork {
    api_url: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct ConnectResponse {
    node_id: String,
    blockchain_height: u64,
    blockchain_version: u64,
    user_agent: String,
}

impl NodeApiNetwork {
    pub fn new(api_url: &str, user_agent: &str) -> Result<Self, NetworkError> {
        if api_url.trim().is_empty() {
            return Err(NetworkError::Backend("node API URL is empty".to_string()));
        }

        let client = Client::builder()
            .user_agent(user_agent)
            .no_proxy()
            .build()?;

        Ok(Self {
            api_url: api_url.trim().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path.trim_start_matches('/'))
    }

    async fn connect(
        &self,
        selector: String,
        timeout: Duration,
    ) -> Result<Box<dyn PeerHandle>, NetworkError> {
        let url = self.endpoint(&format!(
            "peer/connect?{selector}&timeout={}",
            timeout.as_millis()
        ));

        let response: ConnectResponse = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let node_id = NodeId::from_hex(&response.node_id)
            .map_err(|e| NetworkError::Backend(format!("bad node_id in response: {e}")))?;

        Ok(Box::new(NodeApiSession {
            network: self.clone(),
            info: PeerInfo {
                node_id,
                blockchain_height: response.blockchain_height,
                blockchain_version: response.blockchain_version,
                user_agent: response.user_agent,
            },
        }))
    }
}

#[async_trait]
impl PeerNetwork for NodeApiNetwork {
    async fn connect_node_id(
        &self,
        node_id: &NodeId,
        timeout: Duration,
    ) -> Result<Box<dyn PeerHandle>, NetworkError> {
        self.connect(format!("node={node_id}"), timeout).await
    }

    async fn connect_public_key(
        &self,
        key: &PublicKey,
        timeout: Duration,
    ) -> Result<Box<dyn PeerHandle>, NetworkError> {
        self.connect(format!("public_key={key}"), timeout).await
    }
}

struct NodeApiSession {
    network: NodeApiNetwork,
    info: PeerInfo,
}

#[async_trait]
impl PeerHandle for NodeApiSession {
    fn info(&self) -> &PeerInfo {
        &self.info
    }

    async fn open_file(
        &self,
        hash: &ContentHash,
        window: StreamWindow,
        cancel: CancellationToken,
    ) -> Result<Option<FileStream>, NetworkError> {
        let url = self.network.endpoint(&format!(
            "file/read?node={}&hash={}&offset={}&limit={}",
            self.info.node_id, hash, window.offset, window.limit
        ));

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(NetworkError::Cancelled),
            r = self.network.client.get(url).send() => r?,
        };

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response.error_for_status()?;

        let transfer_size = response
            .content_length()
            .ok_or_else(|| NetworkError::Backend("file read without content length".into()))?;
        let file_size = response
            .headers()
            .get(FILE_SIZE_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(transfer_size);

        let body = response.bytes_stream().map_err(io::Error::other);
        Ok(Some(FileStream {
            reader: Box::new(StreamReader::new(Box::pin(body))),
            file_size,
            transfer_size,
        }))
    }
}
