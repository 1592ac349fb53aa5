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

//! In-memory [`Transport`] for tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::config::SessionConfig;
use crate::transport::{Message, Transport};

/// A call observed by [`ScriptedTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Connect {
        host: String,
        port: u16,
        client_id: String,
    },
    Subscribe(String),
    Publish { topic: String, payload: Vec<u8> },
    Pump,
    Disconnect,
}

#[derive(Default)]
struct Script {
    accept_connect: bool,
    reject_subscribe: bool,
    connected: bool,
    inbound: VecDeque<Message>,
    calls: Vec<TransportCall>,
}

/// Transport whose behavior is scripted up front and whose calls are recorded.
///
/// Clones share state, so a test can keep a handle after moving one into a
/// session controller.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    /// A broker that accepts every connect.
    pub fn accepting() -> Self {
        let transport = Self::default();
        transport.lock().accept_connect = true;
        transport
    }

    /// A broker that refuses every connect.
    pub fn refusing() -> Self {
        Self::default()
    }

    pub fn reject_subscriptions(&self) {
        self.lock().reject_subscribe = true;
    }

    /// Queue a message for a later `pump_events`.
    pub fn push_inbound(&self, topic: &str, payload: impl Into<Vec<u8>>) {
        self.lock().inbound.push_back(Message::new(topic, payload));
    }

    /// Simulate the broker going away.
    pub fn drop_connection(&self) {
        self.lock().connected = false;
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.lock().calls.clone()
    }

    pub fn count(&self, pred: impl Fn(&TransportCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| pred(c)).count()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().expect("script lock poisoned")
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn connect(&mut self, config: &SessionConfig) -> Result<()> {
        let mut script = self.lock();
        script.calls.push(TransportCall::Connect {
            host: config.host.clone(),
            port: config.port,
            client_id: config.client_id.clone(),
        });
        script.connected = script.accept_connect;
        if !script.connected {
            bail!("connection refused");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.lock().connected
    }

    async fn subscribe(&mut self, topic: &str) -> Result<()> {
        let mut script = self.lock();
        script.calls.push(TransportCall::Subscribe(topic.to_string()));
        if script.reject_subscribe {
            bail!("subscription rejected");
        }
        Ok(())
    }

    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<()> {
        self.lock().calls.push(TransportCall::Publish {
            topic: topic.to_string(),
            payload: payload.to_vec(),
        });
        Ok(())
    }

    async fn pump_events(&mut self) -> Result<Option<Message>> {
        let mut script = self.lock();
        script.calls.push(TransportCall::Pump);
        Ok(script.inbound.pop_front())
    }

    async fn disconnect(&mut self) -> Result<()> {
        let mut script = self.lock();
        script.calls.push(TransportCall::Disconnect);
        script.connected = false;
        Ok(())
    }
}
