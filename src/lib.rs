/*!
 # Hue Bridge Lamp Controller Library

 A Rust library for switching Philips Hue lamps on and off, setting their hue,
 and running per-lamp blink effects through a Hue bridge.

 ## Features

 * Link-button pairing with the bridge (polls until the button is pressed)
 * Power on/off control per lamp
 * Hue color control (saturation and brightness fixed at maximum)
 * Independent, cancellable blink loops per lamp

 ## Example

 ```no_run
 use hue_blink::*;
 use std::time::Duration;

 #[tokio::main]
 async fn main() -> Result<()> {
     // Initialize tracing for logs
     tracing_subscriber::fmt::init();

     // No username yet: pairing runs on the first state change
     let controller = HueController::new("192.168.1.20")?;

     controller.set_light_state(1, true, 46920).await?; // Blue
     controller.set_blink_mode(2, 0).await?;             // Blink red at the default period

     tokio::time::sleep(Duration::from_secs(5)).await;
     controller.stop_blink(2);
     controller.shutdown().await;

     Ok(())
 }
 ```
*/

use thiserror::Error;

/// Custom error types for the Hue controller library
#[derive(Error, Debug)]
pub enum Error {
    /// Bridge address is empty or does not form a valid URL
    #[error("Invalid bridge address: {0:?}")]
    InvalidAddress(String),

    /// Bridge username is empty
    #[error("Invalid bridge username: {0:?}")]
    InvalidCredential(String),

    /// Hue value outside the range accepted by the bridge
    #[error("Color {0} out of range (0..={max})", max = types::Hue::MAX)]
    ColorOutOfRange(u32),

    /// Blink period of zero
    #[error("Invalid blink period: {0:?}")]
    InvalidPeriod(std::time::Duration),

    /// The bridge answered with an error payload
    #[error("Bridge error: {0}")]
    Bridge(String),

    /// The bridge answered with something other than the documented JSON shape
    #[error("Unexpected bridge response: {0}")]
    UnexpectedResponse(String),

    /// The controller was shut down while the operation was pending
    #[error("Controller has been shut down")]
    Shutdown,

    /// General error
    #[error("Error: {0}")]
    General(String),

    /// HTTP transport error
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// JSON encode/decode error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

// Import needed for Result type extension
pub type Result<T> = std::result::Result<T, Error>;

// Re-export modules
pub mod blink;
pub mod controller;
pub mod light;
pub mod pairing;
pub mod transport;
pub mod types;

// Re-export key types
pub use blink::{BlinkScheduler, DEFAULT_BLINK_PERIOD};
pub use controller::{ControllerConfig, HueController};
pub use light::LightStateApplier;
pub use pairing::{
    PairingNegotiator, DEFAULT_DEVICE_TYPE, DEFAULT_PAIRING_INTERVAL, LINK_BUTTON_PROMPT,
};
pub use transport::{BridgeTransport, HttpTransport, Method};
pub use types::{BridgeAddress, Credential, Hue, LampId, LightState};
