//! HTTP client with connection pooling and retry logic

use bytes::Bytes;
use futures::StreamExt;
use npmirror_config::RegistryConfig;
use npmirror_errors::{Error, NetworkError};
use reqwest::{Client, Response, StatusCode};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Network client configuration
#[derive(Debug, Clone)]
pub struct NetConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub pool_idle_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub retry_count: u32,
    pub retry_delay: Duration,
    pub user_agent: String,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(30),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 10,
            retry_count: 3,
            retry_delay: Duration::from_secs(1),
            user_agent: npmirror_config::constants::USER_AGENT.to_string(),
        }
    }
}

impl From<&RegistryConfig> for NetConfig {
    fn from(config: &RegistryConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout),
            retry_count: config.retries,
            retry_delay: Duration::from_secs(config.retry_delay),
            ..Self::default()
        }
    }
}

/// HTTP client wrapper with retry logic
#[derive(Clone)]
pub struct NetClient {
    client: Client,
    config: NetConfig,
}

impl NetClient {
    /// Create a new network client
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to initialize.
    pub fn new(config: NetConfig) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| NetworkError::ConnectionRefused(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Create with default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created with default settings.
    pub fn with_defaults() -> Result<Self, Error> {
        Self::new(NetConfig::default())
    }

    /// Execute a GET request with retries
    ///
    /// The response is returned for any status other than 429 and 5xx;
    /// callers decide what the remaining statuses mean.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after all retry attempts.
    pub async fn get(&self, url: &str) -> Result<Response, Error> {
        self.retry_request(|| self.client.get(url).send()).await
    }

    /// GET a body into memory, failing on non-success statuses
    ///
    /// # Errors
    ///
    /// Returns `NetworkError::HttpError` for non-success statuses and
    /// `NetworkError::DownloadFailed` if the body cannot be read.
    pub async fn get_bytes(&self, url: &str) -> Result<Bytes, Error> {
        let response = ensure_success(self.get(url).await?)?;
        response
            .bytes()
            .await
            .map_err(|e| NetworkError::DownloadFailed(e.to_string()).into())
    }

    /// Stream a body to `dest`, returning the number of bytes written
    ///
    /// # Errors
    ///
    /// Returns an error on non-success statuses, broken streams or I/O
    /// failures while writing `dest`.
    pub async fn download_to(&self, url: &str, dest: &Path) -> Result<u64, Error> {
        let response = ensure_success(self.get(url).await?)?;

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| Error::io_with_path(&e, dest))?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| NetworkError::DownloadFailed(e.to_string()))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| Error::io_with_path(&e, dest))?;
            written += chunk.len() as u64;
        }

        file.flush().await?;
        file.sync_all().await?;
        Ok(written)
    }

    /// Execute a request with retries
    async fn retry_request<F, Fut>(&self, mut f: F) -> Result<Response, Error>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<Response, reqwest::Error>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.config.retry_count {
            if attempt > 0 {
                tokio::time::sleep(self.config.retry_delay * attempt).await;
            }

            match f().await {
                Ok(response) if response.status() == StatusCode::TOO_MANY_REQUESTS => {
                    let seconds = response
                        .headers()
                        .get("retry-after")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(self.config.retry_delay.as_secs());
                    return Err(NetworkError::RateLimited { seconds }.into());
                }
                Ok(response) if response.status().is_server_error() => {
                    last_error = Some(NetworkError::HttpError {
                        status: response.status().as_u16(),
                        message: response.status().to_string(),
                    });
                }
                Ok(response) => return Ok(response),
                Err(e) => {
                    let retry = Self::should_retry(&e);
                    last_error = Some(Self::classify(&e));
                    if !retry {
                        break;
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| NetworkError::DownloadFailed("Unknown error".to_string()))
            .into())
    }

    fn classify(error: &reqwest::Error) -> NetworkError {
        if error.is_timeout() {
            NetworkError::Timeout {
                url: error
                    .url()
                    .map(std::string::ToString::to_string)
                    .unwrap_or_default(),
            }
        } else if error.is_connect() {
            NetworkError::ConnectionRefused(error.to_string())
        } else {
            NetworkError::DownloadFailed(error.to_string())
        }
    }

    /// Determine if an error should be retried
    fn should_retry(error: &reqwest::Error) -> bool {
        // Retry on timeout, connection errors, and server errors
        error.is_timeout()
            || error.is_connect()
            || error.status().is_none_or(|s| s.is_server_error())
    }
}

/// Turn a non-success response into `NetworkError::HttpError`
///
/// # Errors
///
/// Returns the status as an error when it is not 2xx.
pub fn ensure_success(response: Response) -> Result<Response, Error> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(NetworkError::HttpError {
            status: response.status().as_u16(),
            message: response.status().to_string(),
        }
        .into())
    }
}
