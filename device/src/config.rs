// Copyright 2025 The Drasi Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Compiled-in device configuration.
//!
//! Broker endpoint and credentials are fixed when the binary is built, taken
//! from `COLORCHANGE_*` environment variables at compile time. Nothing here
//! is read at runtime.

use std::time::Duration;

use colorchange_indicator::SettlePolicy;
use colorchange_session::SessionConfig;

pub const SUBSCRIBE_TOPIC: &str = "colorChange";
pub const PUBLISH_TOPIC: &str = "testTopic";
pub const PUBLISH_PAYLOAD: &str = "hello world";
pub const SETTLE_DELAY: Duration = Duration::from_secs(1);
pub const LOOP_INTERVAL: Duration = Duration::from_secs(5);

pub const BROKER_HOST: &str = or_default(option_env!("COLORCHANGE_BROKER_HOST"), "localhost");
pub const BROKER_PORT: u16 = match option_env!("COLORCHANGE_BROKER_PORT") {
    Some(port) => parse_port(port),
    None => 1883,
};
pub const CLIENT_ID: &str = or_default(option_env!("COLORCHANGE_CLIENT_ID"), "sparkclient");
pub const USERNAME: Option<&str> = option_env!("COLORCHANGE_USERNAME");
pub const PASSWORD: Option<&str> = option_env!("COLORCHANGE_PASSWORD");

/// BCM pins of the RGB LED.
#[cfg(feature = "rpi")]
pub const RGB_PINS: colorchange_indicator::RgbPins = colorchange_indicator::RgbPins {
    red: 17,
    green: 27,
    blue: 22,
};

const fn or_default(value: Option<&'static str>, default: &'static str) -> &'static str {
    match value {
        Some(value) => value,
        None => default,
    }
}

const fn parse_port(text: &str) -> u16 {
    let bytes = text.as_bytes();
    assert!(!bytes.is_empty(), "COLORCHANGE_BROKER_PORT is empty");
    let mut port: u32 = 0;
    let mut i = 0;
    while i < bytes.len() {
        assert!(
            bytes[i].is_ascii_digit(),
            "COLORCHANGE_BROKER_PORT must be a decimal number"
        );
        port = port * 10 + (bytes[i] - b'0') as u32;
        assert!(port <= u16::MAX as u32, "COLORCHANGE_BROKER_PORT out of range");
        i += 1;
    }
    port as u16
}

/// Everything the control loop needs to run.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub session: SessionConfig,
    pub subscribe_topic: String,
    pub publish_topic: String,
    pub publish_payload: Vec<u8>,
    /// How long a new color is held.
    pub settle_delay: Duration,
    /// Pause at the end of every iteration.
    pub loop_interval: Duration,
    pub settle_policy: SettlePolicy,
    /// Re-run connect + subscribe when an iteration finds the session down.
    pub retry_connect: bool,
}

impl DeviceConfig {
    /// The configuration baked into this build.
    pub fn compiled() -> Self {
        Self::builder(compiled_session()).build()
    }

    /// Start from the compiled-in behavior with a custom session.
    pub fn builder(session: SessionConfig) -> DeviceConfigBuilder {
        DeviceConfigBuilder {
            session,
            subscribe_topic: SUBSCRIBE_TOPIC.to_string(),
            publish_topic: PUBLISH_TOPIC.to_string(),
            publish_payload: PUBLISH_PAYLOAD.as_bytes().to_vec(),
            settle_delay: SETTLE_DELAY,
            loop_interval: LOOP_INTERVAL,
            settle_policy: SettlePolicy::default(),
            retry_connect: false,
        }
    }
}

/// The broker session baked into this build.
pub fn compiled_session() -> SessionConfig {
    let mut builder = SessionConfig::builder(BROKER_HOST, CLIENT_ID).port(BROKER_PORT);
    if let Some(username) = USERNAME {
        builder = builder.username(username);
    }
    if let Some(password) = PASSWORD {
        builder = builder.password(password);
    }
    builder.build()
}

/// Builder for [`DeviceConfig`].
pub struct DeviceConfigBuilder {
    session: SessionConfig,
    subscribe_topic: String,
    publish_topic: String,
    publish_payload: Vec<u8>,
    settle_delay: Duration,
    loop_interval: Duration,
    settle_policy: SettlePolicy,
    retry_connect: bool,
}

impl DeviceConfigBuilder {
    pub fn subscribe_topic(mut self, topic: impl Into<String>) -> Self {
        self.subscribe_topic = topic.into();
        self
    }

    pub fn publish_topic(mut self, topic: impl Into<String>) -> Self {
        self.publish_topic = topic.into();
        self
    }

    pub fn publish_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.publish_payload = payload.into();
        self
    }

    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn loop_interval(mut self, interval: Duration) -> Self {
        self.loop_interval = interval;
        self
    }

    pub fn settle_policy(mut self, policy: SettlePolicy) -> Self {
        self.settle_policy = policy;
        self
    }

    pub fn retry_connect(mut self, retry: bool) -> Self {
        self.retry_connect = retry;
        self
    }

    /// Build the config.
    pub fn build(self) -> DeviceConfig {
        DeviceConfig {
            session: self.session,
            subscribe_topic: self.subscribe_topic,
            publish_topic: self.publish_topic,
            publish_payload: self.publish_payload,
            settle_delay: self.settle_delay,
            loop_interval: self.loop_interval,
            settle_policy: self.settle_policy,
            retry_connect: self.retry_connect,
        }
    }
}
