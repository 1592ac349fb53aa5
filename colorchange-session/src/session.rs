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

//! Session controller: owns the transport and tracks the session lifecycle.

use log::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::transport::{Message, Transport};

/// Lifecycle of the broker session as seen by the controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connected,
}

/// Owns a [`Transport`], establishes the connection and guards every
/// dependent operation on liveness.
///
/// Loss of the connection is only noticed through [`is_connected`], which
/// also forgets the subscriptions made on the lost session.
///
/// [`is_connected`]: SessionController::is_connected
pub struct SessionController<T> {
    transport: T,
    label: String,
    state: SessionState,
    subscriptions: Vec<String>,
}

impl<T: Transport> SessionController<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            label: String::new(),
            state: SessionState::Disconnected,
            subscriptions: Vec::new(),
        }
    }

    /// Attempt one connect handshake. No retry is performed.
    pub async fn connect(&mut self, config: &SessionConfig) -> Result<(), SessionError> {
        self.label = config.client_id.clone();
        self.subscriptions.clear();
        info!(
            "[{}] Connecting to MQTT broker at {}:{}",
            self.label, config.host, config.port
        );

        match self.transport.connect(config).await {
            Ok(()) if self.transport.is_connected() => {
                self.state = SessionState::Connected;
                Ok(())
            }
            Ok(()) => {
                self.state = SessionState::Disconnected;
                Err(SessionError::Connection {
                    host: config.host.clone(),
                    port: config.port,
                    reason: "transport did not report an established session".into(),
                })
            }
            Err(e) => {
                self.state = SessionState::Disconnected;
                Err(SessionError::Connection {
                    host: config.host.clone(),
                    port: config.port,
                    reason: format!("{e:#}"),
                })
            }
        }
    }

    /// Non-blocking liveness check.
    pub fn is_connected(&mut self) -> bool {
        if self.state == SessionState::Connected && !self.transport.is_connected() {
            warn!("[{}] Session lost", self.label);
            self.state = SessionState::Disconnected;
            self.subscriptions.clear();
        }
        self.state == SessionState::Connected
    }

    pub async fn subscribe(&mut self, topic: &str) -> Result<(), SessionError> {
        if !self.is_connected() {
            return Err(SessionError::NotConnected);
        }
        self.transport
            .subscribe(topic)
            .await
            .map_err(|e| SessionError::Subscribe {
                topic: topic.to_string(),
                reason: format!("{e:#}"),
            })?;
        info!("[{}] Subscribed to topic: {topic}", self.label);
        self.subscriptions.push(topic.to_string());
        Ok(())
    }

    /// Best effort: success only means the message left for the broker.
    pub async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), SessionError> {
        if !self.is_connected() {
            return Err(SessionError::NotConnected);
        }
        self.transport
            .publish(topic, payload)
            .await
            .map_err(|e| SessionError::Publish {
                topic: topic.to_string(),
                reason: format!("{e:#}"),
            })?;
        debug!("[{}] Published {} bytes to '{topic}'", self.label, payload.len());
        Ok(())
    }

    /// Service the session and hand at most one inbound message to `handler`.
    ///
    /// Returns whether `handler` was invoked.
    pub async fn pump_events<F>(&mut self, handler: F) -> Result<bool, SessionError>
    where
        F: FnOnce(&Message),
    {
        if !self.is_connected() {
            return Err(SessionError::NotConnected);
        }
        match self.transport.pump_events().await {
            Ok(Some(message)) => {
                handler(&message);
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(e) => {
                debug!("[{}] Event pump failed: {e:#}", self.label);
                // A failed pump usually means the session dropped.
                self.is_connected();
                Ok(false)
            }
        }
    }

    /// Close the session if one is open.
    pub async fn disconnect(&mut self) {
        if self.state == SessionState::Disconnected {
            return;
        }
        if let Err(e) = self.transport.disconnect().await {
            warn!("[{}] Disconnect failed: {e:#}", self.label);
        }
        self.state = SessionState::Disconnected;
        self.subscriptions.clear();
        info!("[{}] Disconnected", self.label);
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Topics subscribed on the current session.
    pub fn subscriptions(&self) -> &[String] {
        &self.subscriptions
    }
}
