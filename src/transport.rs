/*!
 # Bridge transport

 HTTP + JSON access to the bridge REST API. The controller only depends on the
 [`BridgeTransport`] trait; [`HttpTransport`] is the `reqwest` implementation
 used against a real bridge.
*/

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use std::time::Duration;
use tracing::{instrument, trace};

use crate::types::BridgeAddress;
use crate::{Error, Result};

/// HTTP methods used by the bridge API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Create a resource (pairing)
    Post,
    /// Update a resource (lamp state)
    Put,
}

/// Sends a JSON body to a bridge path and decodes the JSON answer
#[async_trait]
pub trait BridgeTransport: Send + Sync {
    /// `path` is absolute, e.g. `/api` or `/api/<username>/lights/1/state`
    async fn send(&self, method: Method, path: &str, body: Value) -> Result<Value>;
}

/// [`BridgeTransport`] over plain HTTP
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base: Url,
}

impl HttpTransport {
    /// Per-request timeout so a dead bridge does not stall a blink loop forever
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

    /// Creates a transport for `http://<address>/`
    pub fn new(address: &BridgeAddress) -> Result<Self> {
        let base = Url::parse(&format!("http://{address}/"))
            .map_err(|_| Error::InvalidAddress(address.to_string()))?;
        if base.host_str().is_none() {
            return Err(Error::InvalidAddress(address.to_string()));
        }

        let client = Client::builder().timeout(Self::REQUEST_TIMEOUT).build()?;
        Ok(Self { client, base })
    }

    /// Base URL every request path is resolved against
    pub fn base_url(&self) -> &Url {
        &self.base
    }
}

#[async_trait]
impl BridgeTransport for HttpTransport {
    #[instrument(skip(self, body))]
    async fn send(&self, method: Method, path: &str, body: Value) -> Result<Value> {
        let url = self
            .base
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::General(format!("invalid request path {path}: {e}")))?;

        let request = match method {
            Method::Post => self.client.post(url),
            Method::Put => self.client.put(url),
        };

        trace!("Sending bridge request");
        let response = request
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let value = response.json::<Value>().await?;
        trace!("Received bridge response");
        Ok(value)
    }
}
