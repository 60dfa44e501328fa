use anyhow::Context;
use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, warn};

const PREDICTIONS_URL: &str = "https://api.replicate.com/v1/predictions";
const MAX_WAIT: Duration = Duration::from_secs(600);
const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;

#[derive(Debug, Deserialize)]
pub struct Prediction {
    #[serde(default)]
    pub id: Option<String>,
    pub status: String,
    pub urls: PredictionUrls,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct PredictionUrls {
    pub get: String,
}

impl Prediction {
    pub fn is_finished(&self) -> bool {
        matches!(self.status.as_str(), "succeeded" | "failed" | "canceled")
    }

    /// The output is a single URL for some models and a list for others.
    pub fn first_output_url(&self) -> Option<&str> {
        match self.output.as_ref()? {
            Value::String(url) => Some(url),
            Value::Array(items) => items.iter().find_map(Value::as_str),
            _ => None,
        }
    }
}

/// Turns a prompt into raster bytes.
pub trait ImageGenerator {
    async fn generate(&self, prompt: &str) -> anyhow::Result<Vec<u8>>;
}

pub struct Replicate {
    http: reqwest::Client,
    token: String,
    model: String,
    poll_interval: Duration,
}

impl Replicate {
    pub fn new(http: reqwest::Client, token: impl Into<String>, model: impl Into<String>, poll_interval: Duration) -> Self {
        Self {
            http,
            token: token.into(),
            model: model.into(),
            poll_interval,
        }
    }

    fn auth(&self) -> String {
        format!("Token {}", self.token)
    }

    async fn poll(&self, url: &str) -> anyhow::Result<Prediction> {
        let prediction = self
            .http
            .get(url)
            .header(AUTHORIZATION, self.auth())
            .send()
            .await?
            .error_for_status()?
            .json::<Prediction>()
            .await
            .context("unexpected prediction response")?;
        Ok(prediction)
    }
}

impl ImageGenerator for Replicate {
    async fn generate(&self, prompt: &str) -> anyhow::Result<Vec<u8>> {
        info!("Requesting image from Replicate ({}): {}", self.model, prompt);
        let payload = json!({
            "version": self.model,
            "input": { "prompt": prompt, "width": WIDTH, "height": HEIGHT },
        });

        let res = self
            .http
            .post(PREDICTIONS_URL)
            .header(AUTHORIZATION, self.auth())
            .json(&payload)
            .send()
            .await
            .context("prediction request failed")?;
        let status = res.status();
        let body = res.text().await?;
        if status != StatusCode::OK && status != StatusCode::CREATED {
            anyhow::bail!("Replicate API error {}: {}", status, body);
        }
        let mut prediction: Prediction =
            serde_json::from_str(&body).context("unexpected prediction response")?;
        debug!("Prediction {:?} is {}", prediction.id, prediction.status);

        let started = Instant::now();
        while !prediction.is_finished() {
            if started.elapsed() > MAX_WAIT {
                anyhow::bail!("image generation still {} after {:?}", prediction.status, MAX_WAIT);
            }
            sleep(self.poll_interval).await;
            prediction = self.poll(&prediction.urls.get).await?;
            debug!("Prediction {:?} is {}", prediction.id, prediction.status);
        }

        if prediction.status != "succeeded" {
            warn!("Prediction ended as {}", prediction.status);
            anyhow::bail!(
                "image generation {}: {}",
                prediction.status,
                prediction.error.map(|e| e.to_string()).unwrap_or_default()
            );
        }

        let url = prediction
            .first_output_url()
            .context("prediction succeeded without an output URL")?
            .to_string();
        let bytes = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        info!("Downloaded generated image ({} bytes) from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }
}
