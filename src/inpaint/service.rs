use anyhow::{anyhow, bail, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::inpaint::mode::Mode;
use crate::settings::ServiceSettings;

/// Everything the inpainting service gets to see for one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InpaintRequest {
    pub mode: Mode,
    /// Lossless PNG of the original image.
    pub image_png: Vec<u8>,
    /// Black/white PNG at the original's size; only present in manual mode.
    pub mask_png: Option<Vec<u8>>,
}

impl InpaintRequest {
    pub fn instruction(&self) -> &'static str {
        self.mode.instruction()
    }
}

/// The external image generator. Returns the encoded replacement image.
pub trait InpaintService {
    fn inpaint(&self, request: &InpaintRequest) -> Result<Vec<u8>>;
}

impl<F> InpaintService for F
where
    F: Fn(&InpaintRequest) -> Result<Vec<u8>>,
{
    fn inpaint(&self, request: &InpaintRequest) -> Result<Vec<u8>> {
        self(request)
    }
}

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    mode: Mode,
    instruction: &'a str,
    image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    mask: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// JSON-over-HTTP client. Images travel as base64 PNG.
pub struct HttpInpaintService {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpInpaintService {
    pub fn new(settings: &ServiceSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("masked_inpaint/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(settings.timeout_seconds.max(1)))
            .build()
            .context("build inpainting http client")?;

        let api_key = match settings.api_key_env.as_deref() {
            Some(var) => Some(
                std::env::var(var)
                    .with_context(|| format!("read inpainting api key from ${var}"))?,
            ),
            None => None,
        };

        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl InpaintService for HttpInpaintService {
    fn inpaint(&self, request: &InpaintRequest) -> Result<Vec<u8>> {
        let body = WireRequest {
            mode: request.mode,
            instruction: request.instruction(),
            image: STANDARD.encode(&request.image_png),
            mask: request.mask_png.as_ref().map(|mask| STANDARD.encode(mask)),
        };

        let mut builder = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder
            .send()
            .with_context(|| format!("send inpainting request to {}", self.endpoint))?;

        let status = response.status();
        let text = response.text().context("read inpainting response body")?;
        if !status.is_success() {
            bail!("inpainting service returned {status}: {}", text.trim());
        }

        let parsed: WireResponse =
            serde_json::from_str(&text).context("parse inpainting response json")?;
        if let Some(error) = parsed.error.filter(|e| !e.trim().is_empty()) {
            bail!("inpainting service reported an error: {error}");
        }
        let encoded = parsed
            .image
            .filter(|image| !image.is_empty())
            .ok_or_else(|| anyhow!("inpainting service response has no image"))?;

        STANDARD
            .decode(encoded.trim())
            .context("decode base64 image from inpainting response")
    }
}
