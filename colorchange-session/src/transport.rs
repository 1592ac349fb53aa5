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

//! The transport seam consumed by the session controller.

use anyhow::Result;
use async_trait::async_trait;

use crate::config::SessionConfig;

/// A message received on a subscribed topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    topic: String,
    payload: Vec<u8>,
}

impl Message {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Publish/subscribe access to a broker over a reliable ordered byte stream.
///
/// Implementations own the network connection. All delivery is at most once.
#[async_trait]
pub trait Transport: Send {
    /// Perform one connect handshake. `Ok` means the broker accepted the session.
    async fn connect(&mut self, config: &SessionConfig) -> Result<()>;

    /// Non-blocking liveness check.
    fn is_connected(&self) -> bool;

    async fn subscribe(&mut self, topic: &str) -> Result<()>;

    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<()>;

    /// Service the connection and yield at most one inbound message.
    async fn pump_events(&mut self) -> Result<Option<Message>>;

    /// Close the session. Safe to call when already disconnected.
    async fn disconnect(&mut self) -> Result<()>;
}
