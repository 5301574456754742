use super::{ChatRequest, LlmClient, LlmResponse};
use async_trait::async_trait;
use std::sync::Mutex;

/// Replays scripted responses in order and records every request it saw.
pub struct FakeClient {
    responses: Mutex<Vec<anyhow::Result<String>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl FakeClient {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Next call fails with `message`.
    pub fn push_error(&self, message: impl Into<String>) {
        let message = message.into();
        if let Ok(mut r) = self.responses.lock() {
            r.push(Err(anyhow::anyhow!(message)));
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for FakeClient {
    async fn complete(&self, req: &ChatRequest) -> anyhow::Result<LlmResponse> {
        if let Ok(mut seen) = self.requests.lock() {
            seen.push(req.clone());
        }
        let next = {
            let mut resps = self
                .responses
                .lock()
                .map_err(|_| anyhow::anyhow!("fake client mutex poisoned"))?;
            if resps.is_empty() {
                anyhow::bail!("No more fake responses");
            }
            resps.remove(0)
        };
        Ok(LlmResponse {
            text: next?,
            provider: "fake".to_string(),
            model: "fake".to_string(),
            cached: false,
            meta: serde_json::Value::Null,
        })
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}
