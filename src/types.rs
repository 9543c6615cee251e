/*!
 # Bridge and lamp value types

 Validated identifiers and the lamp state model sent to the bridge.
*/

use serde::Serialize;
use std::fmt;

use crate::{Error, Result};

/// Saturation sent with every "on" state
pub const FIXED_SATURATION: u8 = 254;
/// Brightness sent with every "on" state
pub const FIXED_BRIGHTNESS: u8 = 254;

/// Bridge-assigned lamp number
pub type LampId = u32;

/// Network address of the bridge (host name or IP, optionally with port)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeAddress(String);

impl BridgeAddress {
    /// Creates an address, rejecting empty input
    pub fn new(address: impl Into<String>) -> Result<Self> {
        let address = address.into();
        let trimmed = address.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidAddress(address));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the address as given
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BridgeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Username issued by the bridge after the link button was pressed
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Creates a credential, rejecting empty input and anything that is not
    /// a plain URL path segment (`A-Z a-z 0-9 - . _ ~`)
    pub fn new(username: impl Into<String>) -> Result<Self> {
        let username = username.into();
        let trimmed = username.trim();
        if trimmed.is_empty() || !trimmed.chars().all(is_unreserved) {
            return Err(Error::InvalidCredential(username));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the raw username
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_unreserved(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~')
}

// Keep usernames out of logs
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(..)")
    }
}

/// Hue value accepted by the bridge, 0..=65535
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Hue(u16);

impl Hue {
    /// Largest hue value
    pub const MAX: u32 = u16::MAX as u32;

    /// Validates a raw hue. Out-of-range values are rejected, never clamped.
    pub fn new(value: u32) -> Result<Self> {
        u16::try_from(value)
            .map(Self)
            .map_err(|_| Error::ColorOutOfRange(value))
    }

    /// Returns the raw hue
    pub fn value(self) -> u16 {
        self.0
    }
}

impl From<u16> for Hue {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl TryFrom<u32> for Hue {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        Self::new(value)
    }
}

/// Desired state of a single lamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightState {
    /// Whether the lamp is on
    pub on: bool,
    /// Hue to show; only transmitted while the lamp is on
    pub hue: Option<Hue>,
}

impl LightState {
    /// Lamp switched off
    pub fn off() -> Self {
        Self { on: false, hue: None }
    }

    /// Lamp switched on at the given hue
    pub fn on(hue: Hue) -> Self {
        Self {
            on: true,
            hue: Some(hue),
        }
    }

    /// Builds a state from an on flag and a hue that is only kept when on
    pub fn new(on: bool, hue: Hue) -> Self {
        if on {
            Self::on(hue)
        } else {
            Self::off()
        }
    }

    /// Encodes the request body for `PUT /api/<username>/lights/<id>/state`
    pub(crate) fn body(&self) -> StateBody {
        match (self.on, self.hue) {
            (true, hue) => StateBody {
                on: true,
                sat: Some(FIXED_SATURATION),
                bri: Some(FIXED_BRIGHTNESS),
                hue,
            },
            // Color cannot change while the lamp is off
            (false, _) => StateBody {
                on: false,
                sat: None,
                bri: None,
                hue: None,
            },
        }
    }
}

/// Wire body of a state update
#[derive(Debug, Serialize)]
pub(crate) struct StateBody {
    on: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    sat: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bri: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hue: Option<Hue>,
}
