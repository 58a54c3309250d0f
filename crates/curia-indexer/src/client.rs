use crate::error::{IndexerError, Result};
use crate::events::keccak256;
use async_trait::async_trait;
use curia_types::Address;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};

/// A raw event log as reported by the RPC endpoint.
#[derive(Debug, Clone)]
pub struct EventLog {
    pub address: Address,
    pub topics: Vec<[u8; 32]>,
    pub data: Vec<u8>,
    pub block_number: u64,
    pub tx_hash: String,
    pub log_index: u64,
}

/// Minimal chain access the reconciler needs. Kept as a trait so the
/// reconciliation algorithm is unit-testable against a scripted mock.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn chain_id(&self) -> Result<u64>;

    async fn latest_block(&self) -> Result<u64>;

    /// Logs for one contract and one event signature hash in an inclusive
    /// block range.
    async fn get_logs(
        &self,
        contract: &Address,
        topic0: [u8; 32],
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<EventLog>>;

    /// Current staked balance for an agent, in the vault's raw units.
    async fn stake_of(&self, vault: &Address, agent: &Address) -> Result<u128>;
}

/// JSON-RPC client over HTTP for any standard EVM endpoint.
pub struct HttpRpcClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpRpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response: Value = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| IndexerError::Rpc(e.to_string()))?
            .json()
            .await
            .map_err(|e| IndexerError::Rpc(e.to_string()))?;

        if let Some(err) = response.get("error") {
            if !err.is_null() {
                return Err(IndexerError::Rpc(format!("{} failed: {}", method, err)));
            }
        }

        response
            .get("result")
            .cloned()
            .ok_or_else(|| IndexerError::Rpc(format!("{}: missing result", method)))
    }
}

fn quantity_str(value: &Value) -> Result<&str> {
    value
        .as_str()
        .ok_or_else(|| IndexerError::Rpc(format!("expected quantity string, got {}", value)))
}

fn parse_u64(value: &Value) -> Result<u64> {
    let s = quantity_str(value)?;
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(stripped, 16).map_err(|e| IndexerError::Rpc(format!("{}: {}", s, e)))
}

fn parse_u128(value: &Value) -> Result<u128> {
    let s = quantity_str(value)?;
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    u128::from_str_radix(stripped, 16).map_err(|e| IndexerError::Rpc(format!("{}: {}", s, e)))
}

fn parse_bytes(value: &Value) -> Result<Vec<u8>> {
    let s = quantity_str(value)?;
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(stripped).map_err(|e| IndexerError::Rpc(format!("{}: {}", s, e)))
}

fn parse_topic(value: &Value) -> Result<[u8; 32]> {
    let bytes = parse_bytes(value)?;
    bytes
        .try_into()
        .map_err(|_| IndexerError::Rpc("topic is not 32 bytes".to_string()))
}

fn hex_block(block: u64) -> String {
    format!("0x{:x}", block)
}

fn parse_log(value: &Value) -> Result<EventLog> {
    let topics = value
        .get("topics")
        .and_then(|t| t.as_array())
        .ok_or_else(|| IndexerError::Rpc("log missing topics".to_string()))?
        .iter()
        .map(parse_topic)
        .collect::<Result<Vec<_>>>()?;

    Ok(EventLog {
        address: Address::new(
            value
                .get("address")
                .and_then(|a| a.as_str())
                .unwrap_or_default(),
        ),
        topics,
        data: parse_bytes(
            value
                .get("data")
                .ok_or_else(|| IndexerError::Rpc("log missing data".to_string()))?,
        )?,
        block_number: parse_u64(
            value
                .get("blockNumber")
                .ok_or_else(|| IndexerError::Rpc("log missing blockNumber".to_string()))?,
        )?,
        tx_hash: value
            .get("transactionHash")
            .and_then(|h| h.as_str())
            .ok_or_else(|| IndexerError::Rpc("log missing transactionHash".to_string()))?
            .to_string(),
        log_index: parse_u64(
            value
                .get("logIndex")
                .ok_or_else(|| IndexerError::Rpc("log missing logIndex".to_string()))?,
        )?,
    })
}

#[async_trait]
impl ChainClient for HttpRpcClient {
    async fn chain_id(&self) -> Result<u64> {
        parse_u64(&self.call("eth_chainId", json!([])).await?)
    }

    async fn latest_block(&self) -> Result<u64> {
        parse_u64(&self.call("eth_blockNumber", json!([])).await?)
    }

    async fn get_logs(
        &self,
        contract: &Address,
        topic0: [u8; 32],
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<EventLog>> {
        let params = json!([{
            "address": contract.as_str(),
            "topics": [format!("0x{}", hex::encode(topic0))],
            "fromBlock": hex_block(from_block),
            "toBlock": hex_block(to_block),
        }]);

        let result = self.call("eth_getLogs", params).await?;
        result
            .as_array()
            .ok_or_else(|| IndexerError::Rpc("eth_getLogs: expected array".to_string()))?
            .iter()
            .map(parse_log)
            .collect()
    }

    async fn stake_of(&self, vault: &Address, agent: &Address) -> Result<u128> {
        // stakeOf(address) view call.
        let selector = &keccak256(b"stakeOf(address)")[..4];

        let agent_hex = agent.as_str().strip_prefix("0x").unwrap_or(agent.as_str());
        let agent_bytes = hex::decode(agent_hex)
            .map_err(|e| IndexerError::Rpc(format!("bad agent address {}: {}", agent, e)))?;
        if agent_bytes.len() != 20 {
            return Err(IndexerError::Rpc(format!(
                "agent address {} is not 20 bytes",
                agent
            )));
        }

        let mut data = Vec::with_capacity(4 + 32);
        data.extend_from_slice(selector);
        data.extend_from_slice(&[0u8; 12]);
        data.extend_from_slice(&agent_bytes);

        let params = json!([
            {
                "to": vault.as_str(),
                "data": format!("0x{}", hex::encode(&data)),
            },
            "latest",
        ]);

        parse_u128(&self.call("eth_call", params).await?)
    }
}
