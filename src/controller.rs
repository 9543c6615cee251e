use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, OnceCell};
use tracing::{debug, info, instrument};

use crate::blink::{BlinkScheduler, DEFAULT_BLINK_PERIOD};
use crate::light::LightStateApplier;
use crate::pairing::{PairingNegotiator, DEFAULT_DEVICE_TYPE, DEFAULT_PAIRING_INTERVAL};
use crate::transport::{BridgeTransport, HttpTransport};
use crate::types::{BridgeAddress, Credential, Hue, LampId, LightState};
use crate::{Error, Result};

/// Settings for a [`HueController`]
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Bridge host name or IP address
    pub address: String,
    /// Username from an earlier pairing; pairing runs lazily when absent
    pub username: Option<String>,
    /// Wait between two pairing attempts
    pub pairing_interval: Duration,
    /// Blink period used by [`HueController::set_blink_mode`]
    pub blink_period: Duration,
    /// `devicetype` announced to the bridge when pairing
    pub device_type: String,
}

impl ControllerConfig {
    /// Default settings for the bridge at `address`
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            username: None,
            pairing_interval: DEFAULT_PAIRING_INTERVAL,
            blink_period: DEFAULT_BLINK_PERIOD,
            device_type: DEFAULT_DEVICE_TYPE.to_string(),
        }
    }

    /// Skips pairing by using a known username
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the wait between pairing attempts
    pub fn with_pairing_interval(mut self, interval: Duration) -> Self {
        self.pairing_interval = interval;
        self
    }

    /// Sets the default blink period
    pub fn with_blink_period(mut self, period: Duration) -> Self {
        self.blink_period = period;
        self
    }

    /// Sets the `devicetype` sent when pairing
    pub fn with_device_type(mut self, device_type: impl Into<String>) -> Self {
        self.device_type = device_type.into();
        self
    }
}

/// Controls the lamps behind one Hue bridge
///
/// Dropping the controller ends all blink loops; use [`HueController::shutdown`]
/// to also wait for them to exit.
pub struct HueController {
    address: BridgeAddress,
    credential: OnceCell<Credential>,
    blink_period: Duration,
    pairing: PairingNegotiator,
    applier: Arc<LightStateApplier>,
    blinker: BlinkScheduler,
    shutdown: watch::Sender<bool>,
}

impl HueController {
    /// Creates a controller that pairs with the bridge on first use
    pub fn new(address: &str) -> Result<Self> {
        Self::from_config(ControllerConfig::new(address))
    }

    /// Creates a controller with a known username; pairing is skipped
    pub fn with_username(address: &str, username: &str) -> Result<Self> {
        Self::from_config(ControllerConfig::new(address).with_username(username))
    }

    /// Creates a controller talking HTTP to the configured bridge
    pub fn from_config(config: ControllerConfig) -> Result<Self> {
        let address = BridgeAddress::new(config.address.clone())?;
        let transport = Arc::new(HttpTransport::new(&address)?);
        Self::with_transport(config, transport)
    }

    /// Creates a controller over a caller-supplied transport
    pub fn with_transport(
        config: ControllerConfig,
        transport: Arc<dyn BridgeTransport>,
    ) -> Result<Self> {
        let address = BridgeAddress::new(config.address)?;
        let credential = match config.username {
            Some(username) => OnceCell::new_with(Some(Credential::new(username)?)),
            None => OnceCell::new(),
        };

        let applier = Arc::new(LightStateApplier::new(Arc::clone(&transport)));
        let (shutdown, _) = watch::channel(false);

        debug!(
            "Controller for bridge {} created (paired: {})",
            address,
            credential.initialized()
        );

        Ok(Self {
            address,
            credential,
            blink_period: config.blink_period,
            pairing: PairingNegotiator::new(
                transport,
                config.device_type,
                config.pairing_interval,
            ),
            blinker: BlinkScheduler::new(Arc::clone(&applier)),
            applier,
            shutdown,
        })
    }

    /// Bridge this controller talks to
    pub fn address(&self) -> &BridgeAddress {
        &self.address
    }

    /// Username in use, once known
    pub fn credential(&self) -> Option<&Credential> {
        self.credential.get()
    }

    /// Pairs with the bridge now instead of on the first state change
    #[instrument(skip(self))]
    pub async fn pair(&self) -> Result<Credential> {
        self.ensure_credential().await.cloned()
    }

    /// Returns the cached username, pairing first if there is none yet.
    /// Concurrent first callers share a single pairing run.
    async fn ensure_credential(&self) -> Result<&Credential> {
        if *self.shutdown.borrow() {
            return Err(Error::Shutdown);
        }

        self.credential
            .get_or_try_init(|| async move {
                info!("No bridge username yet, pairing with {}", self.address);
                let mut shutdown = self.shutdown.subscribe();
                self.pairing.obtain_credential(&mut shutdown).await
            })
            .await
    }

    /// Switches lamp `lamp` on or off; `color` is a hue in 0..=65535 and only
    /// sent when switching on
    #[instrument(skip(self))]
    pub async fn set_light_state(&self, lamp: LampId, on: bool, color: u32) -> Result<()> {
        let hue = Hue::new(color)?;
        let credential = self.ensure_credential().await?;
        self.applier
            .apply_state(credential, lamp, LightState::new(on, hue))
            .await
    }

    /// Blinks lamp `lamp` in `color` with the default period
    pub async fn set_blink_mode(&self, lamp: LampId, color: u32) -> Result<()> {
        self.set_blink_mode_with_period(lamp, color, self.blink_period)
            .await
    }

    /// Blinks lamp `lamp` in `color`; one on+off cycle lasts `period`
    #[instrument(skip(self))]
    pub async fn set_blink_mode_with_period(
        &self,
        lamp: LampId,
        color: u32,
        period: Duration,
    ) -> Result<()> {
        let hue = Hue::new(color)?;
        if period.is_zero() {
            return Err(Error::InvalidPeriod(period));
        }

        let credential = self.ensure_credential().await?.clone();
        self.blinker.start_blink(credential, lamp, hue, period)
    }

    /// Stops blinking lamp `lamp`; does nothing if it is not blinking
    pub fn stop_blink(&self, lamp: LampId) -> bool {
        self.blinker.stop_blink(lamp)
    }

    /// Whether lamp `lamp` is blinking
    pub fn is_blinking(&self, lamp: LampId) -> bool {
        self.blinker.is_blinking(lamp)
    }

    /// Lamps currently blinking, in ascending order
    pub fn blinking_lamps(&self) -> Vec<LampId> {
        self.blinker.blinking_lamps()
    }

    /// Aborts a pending pairing, stops every blink loop and waits for them to
    /// exit. Later operations fail with [`Error::Shutdown`].
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        info!("Shutting down controller for bridge {}", self.address);
        self.shutdown.send_replace(true);
        self.blinker.shutdown().await;
    }
}
