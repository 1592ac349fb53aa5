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

//! Connection settings for the MQTT session.

use std::time::Duration;

use serde::Deserialize;

/// Settings for a single broker connection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// MQTT broker hostname or IP.
    pub host: String,
    /// MQTT broker port (default: 1883).
    pub port: u16,
    /// MQTT client ID. Also used as the log prefix.
    pub client_id: String,
    /// Optional MQTT username. Only applied together with `password`.
    pub username: Option<String>,
    /// Optional MQTT password. Only applied together with `username`.
    pub password: Option<String>,
    /// Keep-alive interval negotiated with the broker (default: 30s).
    #[serde(with = "secs")]
    pub keep_alive: Duration,
    /// Upper bound on a single connect handshake (default: 10s).
    #[serde(with = "secs")]
    pub connect_timeout: Duration,
    /// How long subscribe/publish wait for the packet to go out (default: 2s).
    #[serde(with = "millis")]
    pub ack_timeout: Duration,
    /// How long one `pump_events` call waits for inbound traffic (default: 100ms).
    #[serde(with = "millis")]
    pub pump_window: Duration,
    /// Inbound messages buffered between pumps; the oldest is dropped when full.
    pub inbox_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::builder("localhost", "colorchange").build()
    }
}

impl SessionConfig {
    /// Start building a new config with the required fields.
    pub fn builder(host: impl Into<String>, client_id: impl Into<String>) -> SessionConfigBuilder {
        SessionConfigBuilder {
            host: host.into(),
            client_id: client_id.into(),
            port: 1883,
            username: None,
            password: None,
            keep_alive: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            ack_timeout: Duration::from_secs(2),
            pump_window: Duration::from_millis(100),
            inbox_capacity: 16,
        }
    }

    /// The credential pair, present only when both halves are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user, pass)),
            _ => None,
        }
    }
}

/// Builder for [`SessionConfig`].
pub struct SessionConfigBuilder {
    host: String,
    client_id: String,
    port: u16,
    username: Option<String>,
    password: Option<String>,
    keep_alive: Duration,
    connect_timeout: Duration,
    ack_timeout: Duration,
    pump_window: Duration,
    inbox_capacity: usize,
}

impl SessionConfigBuilder {
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout;
        self
    }

    pub fn pump_window(mut self, window: Duration) -> Self {
        self.pump_window = window;
        self
    }

    /// Clamped to at least one message.
    pub fn inbox_capacity(mut self, capacity: usize) -> Self {
        self.inbox_capacity = capacity.max(1);
        self
    }

    /// Build the config.
    pub fn build(self) -> SessionConfig {
        SessionConfig {
            host: self.host,
            port: self.port,
            client_id: self.client_id,
            username: self.username,
            password: self.password,
            keep_alive: self.keep_alive,
            connect_timeout: self.connect_timeout,
            ack_timeout: self.ack_timeout,
            pump_window: self.pump_window,
            inbox_capacity: self.inbox_capacity,
        }
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
