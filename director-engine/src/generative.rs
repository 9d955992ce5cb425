use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;

/// Optional generative intervention backend. Absence, timeouts and
/// malformed responses are all normal conditions; the intervention policy
/// falls back to its static catalog on any failure.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn generate(&self, prompt: &str, system_instructions: &str) -> Result<String>;
}

/// HTTP implementation against a completion endpoint. The request timeout
/// here is a transport-level bound; the intervention policy applies its own
/// overall deadline on top.
pub struct HttpGenerativeBackend {
    client: reqwest::Client,
    url: String,
}

impl HttpGenerativeBackend {
    pub fn new(url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build generative backend client")?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl GenerativeBackend for HttpGenerativeBackend {
    async fn generate(&self, prompt: &str, system_instructions: &str) -> Result<String> {
        let body = serde_json::json!({
            "prompt": prompt,
            "system": system_instructions,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .context("Failed to call generative backend")?;

        if !response.status().is_success() {
            anyhow::bail!("Generative backend returned status: {}", response.status());
        }

        let body: serde_json::Value = response.json().await?;
        let text = body["completion"]
            .as_str()
            .or_else(|| body["text"].as_str())
            .ok_or_else(|| anyhow::anyhow!("Invalid response format"))?
            .to_string();

        Ok(text)
    }
}
