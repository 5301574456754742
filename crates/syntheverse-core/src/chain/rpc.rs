use super::{
    format_h256, parse_h256, parse_quantity, Address, ChainError, ChainResult, H256,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("rpc connection error: {0}")]
    Transport(String),

    #[error("rpc http error (status {status}): {body}")]
    Http { status: u16, body: String },

    #[error("rpc node error {code}: {message}")]
    Node {
        code: i64,
        message: String,
        data: Option<Value>,
    },

    #[error("invalid rpc response: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    Blocked(String),
}

#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError>;
}

/// JSON-RPC 2.0 over HTTP POST.
pub struct HttpTransport {
    url: String,
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            url: url.into(),
            client,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Unwraps a JSON-RPC envelope into its `result`.
pub fn parse_envelope(body: Value) -> Result<Value, RpcError> {
    if let Some(err) = body.get("error").filter(|e| !e.is_null()) {
        return Err(RpcError::Node {
            code: err.get("code").and_then(Value::as_i64).unwrap_or(0),
            message: err
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
            data: err.get("data").cloned(),
        });
    }
    body.get("result")
        .cloned()
        .ok_or_else(|| RpcError::InvalidResponse("missing result".to_string()))
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        crate::providers::network::check_outbound(&self.url)
            .map_err(|e| RpcError::Blocked(e.to_string()))?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });
        tracing::debug!(method, id, "json-rpc request");

        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RpcError::Transport(format!("{}: {}", self.url, e)))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RpcError::Http {
                status: status.as_u16(),
                body,
            });
        }
        let json: Value = resp
            .json()
            .await
            .map_err(|e| RpcError::InvalidResponse(e.to_string()))?;
        parse_envelope(json)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<H256>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub transaction_hash: H256,
    pub block_number: Option<u64>,
    /// 1 success, 0 reverted; absent on pre-Byzantium nodes.
    pub status: Option<u64>,
    pub gas_used: Option<u128>,
    pub logs: Vec<Log>,
}

impl Receipt {
    pub fn from_json(v: &Value) -> ChainResult<Self> {
        let field = |name: &str| v.get(name).and_then(Value::as_str);
        let bad = |detail: String| ChainError::UnexpectedValue {
            method: "eth_getTransactionReceipt".to_string(),
            detail,
        };
        let transaction_hash = parse_h256(
            field("transactionHash").ok_or_else(|| bad("missing transactionHash".into()))?,
        )?;
        let quantity = |name: &str| -> ChainResult<Option<u128>> {
            field(name).map(parse_quantity).transpose()
        };
        let mut logs = Vec::new();
        for l in v.get("logs").and_then(Value::as_array).into_iter().flatten() {
            let address = l
                .get("address")
                .and_then(Value::as_str)
                .ok_or_else(|| bad("log without address".into()))?
                .parse()?;
            let topics = l
                .get("topics")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .map(|t| parse_h256(t.as_str().unwrap_or_default()))
                .collect::<ChainResult<Vec<_>>>()?;
            let data = super::decode_hex(l.get("data").and_then(Value::as_str).unwrap_or("0x"))?;
            logs.push(Log {
                address,
                topics,
                data,
            });
        }
        Ok(Self {
            transaction_hash,
            block_number: quantity("blockNumber")?.map(|b| b as u64),
            status: quantity("status")?.map(|s| s as u64),
            gas_used: quantity("gasUsed")?,
            logs,
        })
    }

    pub fn succeeded(&self) -> bool {
        self.status != Some(0)
    }
}

/// Typed `eth_*` calls over any [`RpcTransport`].
#[derive(Clone)]
pub struct EthClient {
    transport: Arc<dyn RpcTransport>,
}

impl EthClient {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self { transport }
    }

    pub fn http(url: &str) -> Self {
        Self::new(Arc::new(HttpTransport::new(url)))
    }

    pub async fn request(&self, method: &str, params: Value) -> ChainResult<Value> {
        Ok(self.transport.call(method, params).await?)
    }

    async fn quantity(&self, method: &str, params: Value) -> ChainResult<u128> {
        let v = self.request(method, params).await?;
        let s = v.as_str().ok_or_else(|| ChainError::UnexpectedValue {
            method: method.to_string(),
            detail: format!("expected hex quantity, got {}", v),
        })?;
        parse_quantity(s)
    }

    pub async fn chain_id(&self) -> ChainResult<u64> {
        let id = self.quantity("eth_chainId", json!([])).await?;
        u64::try_from(id).map_err(|_| ChainError::UnexpectedValue {
            method: "eth_chainId".to_string(),
            detail: format!("chain id {} out of range", id),
        })
    }

    pub async fn gas_price(&self) -> ChainResult<u128> {
        self.quantity("eth_gasPrice", json!([])).await
    }

    pub async fn transaction_count(&self, address: &Address, block: &str) -> ChainResult<u64> {
        let n = self
            .quantity(
                "eth_getTransactionCount",
                json!([address.to_string(), block]),
            )
            .await?;
        Ok(n as u64)
    }

    pub async fn get_balance(&self, address: &Address) -> ChainResult<u128> {
        self.quantity("eth_getBalance", json!([address.to_string(), "latest"]))
            .await
    }

    /// `eth_call` against `latest`; returns raw return data.
    pub async fn call(&self, to: &Address, data: &[u8]) -> ChainResult<Vec<u8>> {
        let v = self
            .request(
                "eth_call",
                json!([{ "to": to.to_string(), "data": format!("0x{}", hex::encode(data)) }, "latest"]),
            )
            .await?;
        let s = v.as_str().ok_or_else(|| ChainError::UnexpectedValue {
            method: "eth_call".to_string(),
            detail: format!("expected hex data, got {}", v),
        })?;
        super::decode_hex(s)
    }

    pub async fn send_raw_transaction(&self, raw: &[u8]) -> ChainResult<H256> {
        let v = self
            .request(
                "eth_sendRawTransaction",
                json!([format!("0x{}", hex::encode(raw))]),
            )
            .await?;
        parse_h256(v.as_str().unwrap_or_default())
    }

    pub async fn transaction_receipt(&self, hash: &H256) -> ChainResult<Option<Receipt>> {
        let v = self
            .request("eth_getTransactionReceipt", json!([format_h256(hash)]))
            .await?;
        if v.is_null() {
            return Ok(None);
        }
        Receipt::from_json(&v).map(Some)
    }

    /// Polls until the receipt exists. A reverted receipt is an error.
    pub async fn wait_for_receipt(
        &self,
        hash: &H256,
        poll: Duration,
        timeout: Duration,
    ) -> ChainResult<Receipt> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(receipt) = self.transaction_receipt(hash).await? {
                if !receipt.succeeded() {
                    return Err(ChainError::Reverted {
                        hash: format_h256(hash),
                    });
                }
                return Ok(receipt);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(ChainError::ReceiptTimeout {
                    hash: format_h256(hash),
                    secs: timeout.as_secs(),
                });
            }
            tokio::time::sleep(poll).await;
        }
    }
}

#[cfg(test)]
pub(crate) mod scripted {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned results per method, in call order, and records requests.
    #[derive(Default)]
    pub struct ScriptedTransport {
        replies: Mutex<Vec<(String, VecDeque<Result<Value, RpcError>>)>>,
        pub calls: Mutex<Vec<(String, Value)>>,
    }

    impl ScriptedTransport {
        pub fn reply(&self, method: &str, result: Value) -> &Self {
            self.push(method, Ok(result))
        }

        pub fn fail(&self, method: &str, err: RpcError) -> &Self {
            self.push(method, Err(err))
        }

        fn push(&self, method: &str, r: Result<Value, RpcError>) -> &Self {
            let mut replies = self.replies.lock().unwrap();
            match replies.iter_mut().find(|(m, _)| m == method) {
                Some((_, q)) => q.push_back(r),
                None => replies.push((method.to_string(), VecDeque::from([r]))),
            }
            self
        }

        pub fn calls_to(&self, method: &str) -> Vec<Value> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(m, _)| m == method)
                .map(|(_, p)| p.clone())
                .collect()
        }
    }

    #[async_trait]
    impl RpcTransport for ScriptedTransport {
        async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
            self.calls
                .lock()
                .unwrap()
                .push((method.to_string(), params));
            let mut replies = self.replies.lock().unwrap();
            replies
                .iter_mut()
                .find(|(m, _)| m == method)
                .and_then(|(_, q)| q.pop_front())
                .unwrap_or_else(|| Err(RpcError::InvalidResponse(format!("unscripted {}", method))))
        }
    }
}
