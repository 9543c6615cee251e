use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument, trace};

use crate::transport::{BridgeTransport, Method};
use crate::types::{Credential, LampId, LightState};
use crate::{Error, Result};

/// Sends single state updates to lamps
pub struct LightStateApplier {
    transport: Arc<dyn BridgeTransport>,
}

impl LightStateApplier {
    /// Creates an applier over the given transport
    pub fn new(transport: Arc<dyn BridgeTransport>) -> Self {
        Self { transport }
    }

    /// Sends `state` to lamp `lamp`.
    ///
    /// Failures are returned as-is; nothing is retried here.
    #[instrument(skip(self, credential))]
    pub async fn apply_state(
        &self,
        credential: &Credential,
        lamp: LampId,
        state: LightState,
    ) -> Result<()> {
        let path = state_path(credential, lamp);
        let body = serde_json::to_value(state.body())?;
        debug!("Applying {} to lamp {}", body, lamp);

        let response = self.transport.send(Method::Put, &path, body).await?;
        trace!("State response: {}", response);
        check_acknowledgment(&response)
    }
}

fn state_path(credential: &Credential, lamp: LampId) -> String {
    format!("/api/{}/lights/{}/state", credential.as_str(), lamp)
}

/// The bridge answers with an array of `{"success": ..}` / `{"error": ..}` entries
fn check_acknowledgment(response: &Value) -> Result<()> {
    let entries = response
        .as_array()
        .ok_or_else(|| Error::UnexpectedResponse(response.to_string()))?;
    if entries.is_empty() {
        return Err(Error::UnexpectedResponse("empty state acknowledgment".into()));
    }

    match entries.iter().find_map(|entry| entry.get("error")) {
        Some(error) => Err(Error::Bridge(error.to_string())),
        None => Ok(()),
    }
}
