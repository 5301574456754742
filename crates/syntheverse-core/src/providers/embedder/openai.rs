use super::Embedder;
use crate::providers::{openai_base_url, send_error, status_error};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "text-embedding-3-small";

/// Inputs sent per embeddings request.
pub const EMBED_BATCH_SIZE: usize = 100;

pub struct OpenAIEmbedder {
    pub model: String,
    pub api_key: String,
    pub base_url: String,
    pub client: reqwest::Client,
}

impl OpenAIEmbedder {
    pub fn new(model: String, api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        Self {
            model,
            api_key,
            base_url: openai_base_url(),
            client,
        }
    }

    async fn request(&self, input: serde_json::Value) -> anyhow::Result<serde_json::Value> {
        let url = format!("{}/embeddings", self.base_url);
        crate::providers::network::check_outbound(&url)?;
        let body = json!({
            "input": input,
            "model": self.model,
            "encoding_format": "float"
        });
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error("openai", e))?;

        let status = resp.status();
        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            return Err(status_error("openai", "OpenAI embeddings", status, &error_text).into());
        }
        Ok(resp.json().await?)
    }
}

fn parse_vector(v: &serde_json::Value) -> anyhow::Result<Vec<f32>> {
    let arr = v
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("OpenAI API response missing embedding field"))?;
    Ok(arr
        .iter()
        .map(|x| x.as_f64().unwrap_or(0.0) as f32)
        .collect())
}

/// Vectors of one embeddings response, placed by their `index` field.
fn vectors_in_order(json: &serde_json::Value, expected: usize) -> anyhow::Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| anyhow::anyhow!("OpenAI API response missing data"))?;
    if data.len() != expected {
        anyhow::bail!(
            "OpenAI embeddings returned {} vectors for {} inputs",
            data.len(),
            expected
        );
    }
    let mut out = vec![Vec::new(); expected];
    for (pos, item) in data.iter().enumerate() {
        let idx = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(pos);
        let slot = out
            .get_mut(idx)
            .ok_or_else(|| anyhow::anyhow!("embedding index {} out of range", idx))?;
        *slot = parse_vector(item.get("embedding").unwrap_or(&serde_json::Value::Null))?;
    }
    Ok(out)
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let json = self.request(json!(text)).await?;
        let vec = json
            .pointer("/data/0/embedding")
            .ok_or_else(|| anyhow::anyhow!("OpenAI API response missing embedding field"))?;
        parse_vector(vec)
    }

    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(EMBED_BATCH_SIZE) {
            let json = self.request(json!(batch)).await?;
            out.extend(vectors_in_order(&json, batch.len())?);
        }
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "openai"
    }

    fn model_id(&self) -> String {
        self.model.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::network::{NetworkPolicy, NetworkPolicyGuard};
    use serial_test::serial;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;

    /// Answers each embeddings request with one vector per input whose single
    /// component is the input's number, and reports the batch sizes it saw.
    fn spawn_embeddings_server(requests: usize) -> (String, std::thread::JoinHandle<Vec<usize>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = std::thread::spawn(move || {
            let mut sizes = Vec::new();
            for _ in 0..requests {
                let (stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut len = 0usize;
                loop {
                    let mut line = String::new();
                    reader.read_line(&mut line).unwrap();
                    let line = line.trim_end();
                    if line.is_empty() {
                        break;
                    }
                    if let Some((k, v)) = line.split_once(':') {
                        if k.eq_ignore_ascii_case("content-length") {
                            len = v.trim().parse().unwrap();
                        }
                    }
                }
                let mut body = vec![0u8; len];
                reader.read_exact(&mut body).unwrap();
                let req: serde_json::Value = serde_json::from_slice(&body).unwrap();
                let inputs = req["input"].as_array().unwrap();
                sizes.push(inputs.len());
                // Reverse order so placement by `index` is exercised.
                let data: Vec<_> = inputs
                    .iter()
                    .enumerate()
                    .rev()
                    .map(|(i, t)| {
                        let n: f64 = t.as_str().unwrap().trim_start_matches('t').parse().unwrap();
                        json!({ "index": i, "embedding": [n] })
                    })
                    .collect();
                let resp = json!({ "data": data }).to_string();
                let mut stream = stream;
                write!(
                    stream,
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    resp.len(),
                    resp
                )
                .unwrap();
            }
            sizes
        });
        (base, handle)
    }

    #[tokio::test]
    #[serial]
    async fn large_batches_are_split_and_keep_input_order() {
        let _allow = NetworkPolicyGuard::set(NetworkPolicy::Allow);
        let total = EMBED_BATCH_SIZE * 2 + 7;
        let (base, server) = spawn_embeddings_server(3);
        let mut embedder = OpenAIEmbedder::new(DEFAULT_MODEL.into(), "sk-test".into());
        embedder.base_url = base;

        let texts: Vec<String> = (0..total).map(|i| format!("t{}", i)).collect();
        let vectors = embedder.embed_batch(&texts).await.unwrap();

        assert_eq!(vectors.len(), total);
        for (i, v) in vectors.iter().enumerate() {
            assert_eq!(v, &vec![i as f32]);
        }
        assert_eq!(
            server.join().unwrap(),
            vec![EMBED_BATCH_SIZE, EMBED_BATCH_SIZE, 7]
        );
    }

    #[tokio::test]
    async fn empty_input_sends_nothing() {
        let mut embedder = OpenAIEmbedder::new(DEFAULT_MODEL.into(), "sk-test".into());
        embedder.base_url = "http://127.0.0.1:9".into();
        assert!(embedder.embed_batch(&[]).await.unwrap().is_empty());
    }

    #[test]
    fn short_response_is_an_error() {
        let json = json!({ "data": [{ "index": 0, "embedding": [1.0] }] });
        let err = vectors_in_order(&json, 2).unwrap_err().to_string();
        assert!(err.contains("1 vectors for 2 inputs"));
    }
}
