//! Transaction relay submission
//!
//! Posts `{"tx": "<hex>"}` to a push endpoint and reports what the endpoint
//! answered. One attempt per call; retrying is left to the caller.

use crate::config::BroadcastConfig;
use crate::error::{MinicoinError, Result};
use crate::script::Script;
use crate::transaction::verify_transaction;
use crate::types::{Network, Transaction};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// JSON body accepted by push endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastRequest {
    pub tx: String,
}

/// What the endpoint answered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastResponse {
    pub status: u16,
    pub reason: String,
    pub body: String,
}

impl BroadcastResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Request body for `tx`
pub fn broadcast_request_body(tx: &Transaction) -> BroadcastRequest {
    BroadcastRequest { tx: tx.to_hex() }
}

pub struct Broadcaster {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl Broadcaster {
    /// Client for the endpoint configured for `network`.
    pub fn new(config: &BroadcastConfig, network: Network) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MinicoinError::Broadcast(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: config.endpoint(network).to_string(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Verify `tx` against the locking scripts of the outputs it spends, then
    /// submit it. Nothing is sent when an input fails verification.
    pub fn broadcast_verified(&self, tx: &Transaction, locking_scripts: &[Script]) -> Result<BroadcastResponse> {
        verify_transaction(tx, locking_scripts)?;
        self.broadcast(tx)
    }

    /// Submit `tx`. Any HTTP status is returned as a response; only
    /// transport failures are errors.
    ///
    /// `tx` is sent as given. Pass only transactions returned by
    /// `TransactionBuilder::create`, or use [`Broadcaster::broadcast_verified`].
    pub fn broadcast(&self, tx: &Transaction) -> Result<BroadcastResponse> {
        let request = broadcast_request_body(tx);
        info!(endpoint = %self.endpoint, txid = %tx.txid_hex(), "broadcasting transaction");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .map_err(|e| MinicoinError::Broadcast(format!("failed to send transaction: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| MinicoinError::Broadcast(format!("failed to read response: {}", e)))?;

        let result = BroadcastResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        };

        if result.is_success() {
            info!(status = result.status, "transaction accepted");
        } else {
            warn!(status = result.status, reason = %result.reason, "transaction rejected");
        }
        Ok(result)
    }
}
