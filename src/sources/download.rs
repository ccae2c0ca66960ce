//! HTTP downloads for map tiles, photos and weather data.
//!
//! Uses a shared HTTP client to avoid connection pool leaks and reduce
//! memory overhead from creating new clients for each request.

use image::DynamicImage;
use once_cell::sync::Lazy;
use std::time::Duration;
use thiserror::Error;

/// User agent sent with every request
const USER_AGENT: &str = concat!("manul-frame/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client for all downloads
///
/// Configured for a small board: 30 second timeout, a single idle
/// connection per host, idle connections released after 30 seconds.
static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .pool_max_idle_per_host(1)
        .pool_idle_timeout(Duration::from_secs(30))
        .build()
        .expect("Failed to create HTTP client")
});

/// Download errors
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    #[error("Image decode failed: {0}")]
    DecodeError(#[from] image::ImageError),

    #[error("Empty URL")]
    EmptyUrl,

    #[error("Download timeout")]
    Timeout,
}

/// Download configuration
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Maximum number of attempts
    pub max_retries: u32,
    /// Base delay between retries (doubled each attempt)
    pub retry_delay: Duration,
    /// Per-request timeout, overriding the client default
    pub timeout: Option<Duration>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
            timeout: None,
        }
    }
}

/// Download raw bytes with retry
pub async fn download_bytes(url: &str, config: &DownloadConfig) -> Result<bytes::Bytes, DownloadError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(DownloadError::EmptyUrl);
    }

    download_with_retry(&HTTP_CLIENT, url, config).await
}

/// Download and decode an image
pub async fn download_image(url: &str, config: &DownloadConfig) -> Result<DynamicImage, DownloadError> {
    tracing::info!("Downloading image from: {}", url.trim());

    let bytes = download_bytes(url, config).await?;
    tracing::debug!("Downloaded {} bytes, decoding image...", bytes.len());

    let img = decode_image(&bytes)?;
    tracing::info!("Image decoded: {}x{}", img.width(), img.height());
    Ok(img)
}

/// Decode an in-memory image, guessing its format (PNG, JPEG, WebP)
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, DownloadError> {
    let reader = image::ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| DownloadError::DecodeError(image::ImageError::IoError(e)))?;

    Ok(reader.decode()?)
}

/// Backoff before attempt `attempt` (0-based); the first attempt has none
fn retry_delay(config: &DownloadConfig, attempt: u32) -> Option<Duration> {
    (attempt > 0).then(|| config.retry_delay * 2u32.pow(attempt - 1))
}

/// Download with retry logic
async fn download_with_retry(
    client: &reqwest::Client,
    url: &str,
    config: &DownloadConfig,
) -> Result<bytes::Bytes, DownloadError> {
    let mut last_error = None;

    for attempt in 0..config.max_retries {
        if let Some(delay) = retry_delay(config, attempt) {
            tracing::debug!("Retry attempt {}/{}, waiting {:?}", attempt + 1, config.max_retries, delay);
            tokio::time::sleep(delay).await;
        }

        let mut request = client.get(url);
        if let Some(timeout) = config.timeout {
            request = request.timeout(timeout);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    match response.bytes().await {
                        Ok(bytes) => return Ok(bytes),
                        Err(e) => {
                            tracing::warn!("Failed to read response body: {}", e);
                            last_error = Some(DownloadError::RequestError(e));
                        }
                    }
                } else {
                    tracing::warn!("HTTP error: {} for {}", status, url);
                    last_error = Some(DownloadError::HttpError {
                        status: status.as_u16(),
                    });
                }
            }
            Err(e) => {
                tracing::warn!("Request failed: {} for {}", e, url);
                last_error = Some(DownloadError::RequestError(e));
            }
        }
    }

    Err(last_error.unwrap_or(DownloadError::Timeout))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delay_doubles() {
        let config = DownloadConfig {
            max_retries: 4,
            retry_delay: Duration::from_secs(2),
            timeout: None,
        };
        assert_eq!(retry_delay(&config, 0), None);
        assert_eq!(retry_delay(&config, 1), Some(Duration::from_secs(2)));
        assert_eq!(retry_delay(&config, 2), Some(Duration::from_secs(4)));
        assert_eq!(retry_delay(&config, 3), Some(Duration::from_secs(8)));
    }

    #[test]
    fn test_decode_png_bytes() {
        let img = image::GrayImage::from_pixel(3, 2, image::Luma([7]));
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let decoded = decode_image(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (3, 2));
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(decode_image(b"not an image").is_err());
    }

    #[tokio::test]
    async fn test_empty_url() {
        let err = download_bytes("  ", &DownloadConfig::default()).await.unwrap_err();
        assert!(matches!(err, DownloadError::EmptyUrl));
    }
}
