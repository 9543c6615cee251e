//! In-memory bridge used by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use hue_blink::{BridgeTransport, Error, Method, Result};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::Instant;

/// One request seen by the fake bridge
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub body: Value,
    pub at: Instant,
}

/// Scripted bridge: pairing answers are consumed in order (the last one
/// repeats), state updates succeed unless `fail_states` is set
pub struct FakeBridge {
    requests: Mutex<Vec<Recorded>>,
    pairing: Mutex<VecDeque<Result<Value>>>,
    fail_states: AtomicBool,
}

impl FakeBridge {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            pairing: Mutex::new(VecDeque::new()),
            fail_states: AtomicBool::new(false),
        })
    }

    /// Bridge that grants `username` on the first pairing attempt
    pub fn granting(username: &str) -> Arc<Self> {
        let bridge = Self::new();
        bridge.push_pairing(Ok(granted(username)));
        bridge
    }

    pub fn push_pairing(&self, reply: Result<Value>) {
        self.pairing.lock().push_back(reply);
    }

    pub fn set_fail_states(&self, fail: bool) {
        self.fail_states.store(fail, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().clone()
    }

    pub fn pairing_requests(&self) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == Method::Post)
            .collect()
    }

    /// State updates sent to `lamp`, in order
    pub fn state_requests(&self, lamp: u32) -> Vec<Recorded> {
        let suffix = format!("/lights/{lamp}/state");
        self.requests()
            .into_iter()
            .filter(|r| r.method == Method::Put && r.path.ends_with(&suffix))
            .collect()
    }

    fn next_pairing_reply(&self) -> Result<Value> {
        let mut pairing = self.pairing.lock();
        match pairing.len() {
            0 => Ok(link_button_not_pressed()),
            1 => match pairing.front() {
                Some(Ok(value)) => Ok(value.clone()),
                Some(Err(e)) => Err(Error::General(e.to_string())),
                None => Ok(link_button_not_pressed()),
            },
            _ => pairing
                .pop_front()
                .unwrap_or_else(|| Ok(link_button_not_pressed())),
        }
    }
}

#[async_trait]
impl BridgeTransport for FakeBridge {
    async fn send(&self, method: Method, path: &str, body: Value) -> Result<Value> {
        self.requests.lock().push(Recorded {
            method,
            path: path.to_string(),
            body: body.clone(),
            at: Instant::now(),
        });

        match method {
            Method::Post => self.next_pairing_reply(),
            Method::Put => {
                if self.fail_states.load(Ordering::SeqCst) {
                    return Err(Error::General("connection refused".into()));
                }
                Ok(json!([{ "success": { "on": body["on"] } }]))
            }
        }
    }
}

pub fn granted(username: &str) -> Value {
    json!([{ "success": { "username": username } }])
}

pub fn link_button_not_pressed() -> Value {
    json!([{ "error": { "type": 101, "address": "", "description": "link button not pressed" } }])
}

pub fn off_body() -> Value {
    json!({ "on": false })
}

pub fn on_body(hue: u32) -> Value {
    json!({ "on": true, "sat": 254, "bri": 254, "hue": hue })
}
