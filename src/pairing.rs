/*!
 # Link-button pairing

 Obtains a bridge username. The bridge only grants one within a short window
 after its link button was pressed, so the negotiator keeps asking until it
 does.
*/

use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, instrument, trace};

use crate::transport::{BridgeTransport, Method};
use crate::types::Credential;
use crate::{Error, Result};

/// Wait between two pairing attempts
pub const DEFAULT_PAIRING_INTERVAL: Duration = Duration::from_millis(1000);

/// Application identifier sent as `devicetype`
pub const DEFAULT_DEVICE_TYPE: &str = "HueController#Anonymous";

/// Shown to the operator once per pairing run
pub const LINK_BUTTON_PROMPT: &str = "Press the link button on the bridge to continue";

/// One element of the bridge's answer to `POST /api`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PairingReply {
    Success { success: Granted },
    Failure { error: Value },
}

#[derive(Debug, Deserialize)]
struct Granted {
    username: String,
}

/// Polls the bridge for a username until one is granted
pub struct PairingNegotiator {
    transport: Arc<dyn BridgeTransport>,
    device_type: String,
    interval: Duration,
}

impl PairingNegotiator {
    /// Creates a negotiator
    pub fn new(
        transport: Arc<dyn BridgeTransport>,
        device_type: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            transport,
            device_type: device_type.into(),
            interval,
        }
    }

    /// Blocks until the bridge grants a username.
    ///
    /// There is no timeout and no attempt limit: every failure, whether the
    /// network, the response shape or "link button not pressed", is retried
    /// after the configured interval. The loop only ends early when `shutdown`
    /// turns `true` (or its sender is dropped), yielding [`Error::Shutdown`].
    #[instrument(skip(self, shutdown))]
    pub async fn obtain_credential(&self, shutdown: &mut watch::Receiver<bool>) -> Result<Credential> {
        info!("{}", LINK_BUTTON_PROMPT);

        let mut attempt: u64 = 0;
        loop {
            if *shutdown.borrow() {
                return Err(Error::Shutdown);
            }

            attempt += 1;
            match self.request_username().await {
                Ok(credential) => {
                    info!("Paired with bridge after {} attempt(s)", attempt);
                    return Ok(credential);
                }
                Err(e) => debug!("Pairing attempt {} not granted: {}", attempt, e),
            }

            // Keep the bridge from being flooded with requests
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return Err(Error::Shutdown);
                    }
                }
            }
        }
    }

    /// Performs one pairing attempt
    async fn request_username(&self) -> Result<Credential> {
        let body = json!({ "devicetype": self.device_type });
        let response = self.transport.send(Method::Post, "/api", body).await?;
        trace!("Pairing response: {}", response);
        parse_pairing_response(response)
    }
}

/// Extracts the username from the first element of the bridge's answer
fn parse_pairing_response(response: Value) -> Result<Credential> {
    let replies: Vec<PairingReply> = serde_json::from_value(response)?;
    match replies.into_iter().next() {
        Some(PairingReply::Success { success }) => Credential::new(success.username),
        Some(PairingReply::Failure { error }) => Err(Error::Bridge(error.to_string())),
        None => Err(Error::UnexpectedResponse("empty pairing response".into())),
    }
}
