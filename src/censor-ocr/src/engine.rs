use crate::detection::{Point, Quad, TextDetection};
use crate::error::{OcrError, Result};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Connection settings for the OCR service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Full URL of the `readtext` endpoint
    pub endpoint: String,

    /// Recognition languages, in the service's own codes
    pub languages: Vec<String>,

    /// Per-request timeout; CPU-only recognition can take a while
    pub timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8866/readtext".to_string(),
            languages: vec!["en".to_string(), "ru".to_string()],
            timeout: Duration::from_secs(120),
        }
    }
}

/// One entry of an EasyOCR `readtext` response: `[[[x, y] x4], text, confidence]`
#[derive(Debug, Deserialize)]
struct RawDetection([[f64; 2]; 4], String, f64);

impl From<RawDetection> for TextDetection {
    fn from(raw: RawDetection) -> Self {
        let RawDetection(corners, text, confidence) = raw;
        // Truncate like the service's own integer conversion
        let quad = Quad(corners.map(|[x, y]| Point::new(x as i32, y as i32)));
        TextDetection::new(quad, text, confidence.clamp(0.0, 1.0) as f32)
    }
}

/// Client for an EasyOCR-compatible recognition service
pub struct Engine {
    client: Client,
    endpoint: Url,
    languages: String,
}

impl Engine {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        debug!("initializing OCR engine for {}", config.endpoint);

        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            OcrError::EngineInitFailed(format!("invalid endpoint '{}': {}", config.endpoint, e))
        })?;

        if config.languages.is_empty() {
            return Err(OcrError::EngineInitFailed(
                "at least one recognition language is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| OcrError::EngineInitFailed(format!("failed to build HTTP client: {}", e)))?;

        debug!("OCR engine initialized with languages {:?}", config.languages);
        Ok(Self {
            client,
            endpoint,
            languages: config.languages.join(","),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Run recognition on a PNG-encoded image
    pub fn recognize(&self, png: Vec<u8>) -> Result<Vec<TextDetection>> {
        debug!("sending {} bytes to OCR service", png.len());

        // width_ths=0 keeps words as separate regions instead of merging lines
        let response = self
            .client
            .post(self.endpoint.clone())
            .query(&[
                ("languages", self.languages.as_str()),
                ("gpu", "false"),
                ("width_ths", "0"),
            ])
            .header(CONTENT_TYPE, "image/png")
            .body(png)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(OcrError::ServiceError {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text()?;
        let detections = parse_response(&body)?;

        debug!("OCR completed: {} regions", detections.len());
        Ok(detections)
    }

    /// Check that the service answers at all; any HTTP status counts as reachable
    pub fn ping(&self) -> Result<()> {
        let response = self.client.get(self.endpoint.clone()).send()?;
        debug!("OCR service answered ping with {}", response.status());
        Ok(())
    }
}

/// Parse a `readtext` JSON body, preserving the service's ordering
pub(crate) fn parse_response(body: &str) -> Result<Vec<TextDetection>> {
    let raw: Vec<RawDetection> = serde_json::from_str(body)?;
    Ok(raw.into_iter().map(TextDetection::from).collect())
}
