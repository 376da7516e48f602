//! Talking to vault. Everything in here is behind [`SecretSource`] so the rest of the crate
//! can be tested with an in-memory map

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    time::Duration,
};

use api::{SecretData, SecretRequest, Secrets};
use backon::{ConstantBuilder, Retryable as _};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

const RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(thiserror::Error, Debug)]
pub enum VaultError {
    #[error("invalid vault path {path:?}")]
    InvalidPath {
        path: String,
        #[source]
        source: url::ParseError,
    },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("vault responded with {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("secret does not exist")]
    NotFound,
    #[error("vault response contains no data")]
    NoData,
}

impl VaultError {
    /// Worth another try
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(err) => err.is_connect() || err.is_timeout(),
            Self::Status { status, .. } => status.is_server_error(),
            Self::InvalidPath { .. } | Self::NotFound | Self::NoData => false,
        }
    }
}

/// Failure to fetch a secret, with what it was fetched for
#[derive(thiserror::Error, Debug)]
#[error("could not fetch {path:?} for {}", display_paths(.destinations))]
pub struct TransportError {
    pub path: String,
    pub destinations: Vec<PathBuf>,
    #[source]
    pub source: VaultError,
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "no destination".to_owned();
    }
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[expect(async_fn_in_trait, reason = "only used on the current thread")]
pub trait SecretSource {
    /// Read a secret
    async fn read(&self, path: &str) -> Result<SecretData, VaultError>;

    /// Write style request for endpoints which issue credentials
    async fn write(&self, path: &str) -> Result<SecretData, VaultError>;
}

/// Version of the kv secrets engine. Version 2 wraps the secret in another `data` object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum KvVersion {
    #[default]
    V1,
    V2,
}

impl TryFrom<u8> for KvVersion {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::V1),
            2 => Ok(Self::V2),
            other => Err(format!("unknown kv version {other}, expected 1 or 2")),
        }
    }
}

impl From<KvVersion> for u8 {
    fn from(value: KvVersion) -> Self {
        match value {
            KvVersion::V1 => 1,
            KvVersion::V2 => 2,
        }
    }
}

#[derive(Deserialize)]
struct Response<T> {
    data: Option<T>,
}

#[derive(Deserialize)]
struct Versioned {
    data: Option<SecretData>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    errors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct VaultClient {
    client: reqwest::Client,
    addr: Url,
    token: String,
    kv_version: KvVersion,
    retries: usize,
}

impl VaultClient {
    pub fn new(mut addr: Url, token: String, kv_version: KvVersion, retries: usize) -> Self {
        if !addr.path().ends_with('/') {
            let path = format!("{}/", addr.path());
            addr.set_path(&path);
        }
        Self {
            client: reqwest::Client::new(),
            addr,
            token,
            kv_version,
            retries,
        }
    }

    fn url(&self, path: &str) -> Result<Url, VaultError> {
        self.addr
            .join(&format!("v1/{}", path.trim_start_matches('/')))
            .map_err(|source| VaultError::InvalidPath {
                path: path.to_owned(),
                source,
            })
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        versioned: bool,
    ) -> Result<SecretData, VaultError> {
        let url = &self.url(path)?;
        let method = &method;

        (|| async move { self.attempt(method.clone(), url.clone(), versioned).await })
            .retry(
                ConstantBuilder::new()
                    .with_delay(RETRY_DELAY)
                    .with_max_times(self.retries),
            )
            .when(VaultError::is_transient)
            .notify(|err: &VaultError, dur: Duration| {
                log::warn!("{err} - retrying in {dur:?}");
            })
            .await
    }

    async fn attempt(
        &self,
        method: Method,
        url: Url,
        versioned: bool,
    ) -> Result<SecretData, VaultError> {
        log::debug!("{method} {url}");
        let response = self
            .client
            .request(method, url)
            .header("X-Vault-Token", &self.token)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(VaultError::NotFound);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|err| err.errors.join("; "))
                .unwrap_or(body);
            return Err(VaultError::Status { status, message });
        }

        let data = if versioned {
            response
                .json::<Response<Versioned>>()
                .await?
                .data
                .and_then(|versioned| versioned.data)
        } else {
            response.json::<Response<SecretData>>().await?.data
        };
        data.ok_or(VaultError::NoData)
    }
}

impl SecretSource for VaultClient {
    async fn read(&self, path: &str) -> Result<SecretData, VaultError> {
        self.send(Method::GET, path, self.kv_version == KvVersion::V2)
            .await
    }

    async fn write(&self, path: &str) -> Result<SecretData, VaultError> {
        self.send(Method::PUT, path, false).await
    }
}

/// Fetches the secret of every request. Requests sharing a vault path only fetch it once
pub async fn fetch_secrets(
    source: &impl SecretSource,
    requests: &[SecretRequest],
    prefix: &str,
) -> Result<Secrets, TransportError> {
    let mut fetched: HashMap<String, SecretData> = HashMap::new();
    let mut secrets = Secrets::new();

    for request in requests {
        let path = request.vault_path(prefix);
        let data = if let Some(data) = fetched.get(&path) {
            data.clone()
        } else {
            log::info!("Fetching secret {path:?} for key {:?}", request.key);
            let data = source
                .read(&path)
                .await
                .map_err(|err| TransportError {
                    path: path.clone(),
                    destinations: request
                        .destinations()
                        .into_iter()
                        .map(Path::to_path_buf)
                        .collect(),
                    source: err,
                })?;
            fetched.insert(path, data.clone());
            data
        };
        secrets.insert(request.key.clone(), data);
    }

    Ok(secrets)
}
