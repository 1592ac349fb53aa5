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

//! [`Transport`] implementation on top of rumqttc.

use std::collections::VecDeque;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use log::{debug, info, warn};
use rumqttc::{
    AsyncClient, ConnectionError, Event, EventLoop, Incoming, MqttOptions, Outgoing, QoS,
    SubscribeReasonCode,
};
use tokio::time::{timeout, timeout_at, Instant};

use crate::config::SessionConfig;
use crate::transport::{Message, Transport};

/// Capacity of the request channel between the client handle and the event loop.
const REQUEST_CAPACITY: usize = 10;

/// MQTT transport driven from the caller's task.
///
/// No background task is spawned: the rumqttc event loop only advances while
/// one of the trait methods polls it. Publishes that arrive while waiting for
/// an ack are parked in a bounded inbox and handed out by `pump_events`.
pub struct MqttTransport {
    client_id: String,
    ack_timeout: Duration,
    pump_window: Duration,
    inbox_capacity: usize,
    client: Option<AsyncClient>,
    eventloop: Option<EventLoop>,
    connected: bool,
    inbox: VecDeque<Message>,
}

impl Default for MqttTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MqttTransport {
    pub fn new() -> Self {
        let defaults = SessionConfig::default();
        Self {
            client_id: defaults.client_id,
            ack_timeout: defaults.ack_timeout,
            pump_window: defaults.pump_window,
            inbox_capacity: defaults.inbox_capacity,
            client: None,
            eventloop: None,
            connected: false,
            inbox: VecDeque::new(),
        }
    }

    fn teardown(&mut self) {
        self.client = None;
        self.eventloop = None;
        self.connected = false;
        self.inbox.clear();
    }

    /// Poll the event loop until `done` matches an event or `window` elapses.
    ///
    /// Returns `Ok(false)` on timeout. A poll error marks the transport disconnected.
    async fn drive_until(
        &mut self,
        window: Duration,
        mut done: impl FnMut(&Event) -> bool + Send,
    ) -> Result<bool> {
        let deadline = Instant::now() + window;
        loop {
            let Some(eventloop) = self.eventloop.as_mut() else {
                bail!("no active session");
            };
            let polled = timeout_at(deadline, eventloop.poll()).await;
            match polled {
                Err(_) => return Ok(false),
                Ok(Ok(event)) => {
                    let hit = done(&event);
                    self.absorb(event);
                    if hit {
                        return Ok(true);
                    }
                }
                Ok(Err(e)) => {
                    self.connected = false;
                    warn!("[{}] MQTT connection lost: {e}", self.client_id);
                    return Err(anyhow!("connection lost: {e}"));
                }
            }
        }
    }

    fn absorb(&mut self, event: Event) {
        match event {
            Event::Incoming(Incoming::Publish(publish)) => {
                if self.inbox.len() >= self.inbox_capacity {
                    if let Some(dropped) = self.inbox.pop_front() {
                        warn!(
                            "[{}] Inbox full, dropping message on topic '{}'",
                            self.client_id,
                            dropped.topic()
                        );
                    }
                }
                debug!(
                    "[{}] Received {} bytes on topic '{}'",
                    self.client_id,
                    publish.payload.len(),
                    publish.topic
                );
                self.inbox
                    .push_back(Message::new(publish.topic, publish.payload.to_vec()));
            }
            Event::Incoming(Incoming::Disconnect) => {
                warn!("[{}] Broker closed the session", self.client_id);
                self.connected = false;
            }
            _ => {} // Ignore other events (PingResp, outgoing acks, etc.)
        }
    }

    fn live_client(&self) -> Result<&AsyncClient> {
        match &self.client {
            Some(client) if self.connected => Ok(client),
            _ => bail!("not connected"),
        }
    }
}

#[async_trait]
impl Transport for MqttTransport {
    async fn connect(&mut self, config: &SessionConfig) -> Result<()> {
        self.teardown();
        if config.client_id.is_empty() {
            bail!("client id must not be empty");
        }
        self.client_id = config.client_id.clone();
        self.ack_timeout = config.ack_timeout;
        self.pump_window = config.pump_window;
        self.inbox_capacity = config.inbox_capacity.max(1);

        let mut mqtt_opts = MqttOptions::new(&config.client_id, &config.host, config.port);
        // rumqttc rejects sub-second keep-alives other than zero.
        let keep_alive = if config.keep_alive.is_zero() {
            Duration::ZERO
        } else {
            config.keep_alive.max(Duration::from_secs(1))
        };
        mqtt_opts.set_keep_alive(keep_alive);
        if let Some((user, pass)) = config.credentials() {
            mqtt_opts.set_credentials(user, pass);
        }

        let (client, mut eventloop) = AsyncClient::new(mqtt_opts, REQUEST_CAPACITY);

        let handshake = async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Incoming::ConnAck(_))) => return Ok(()),
                    Ok(_) => {}
                    Err(ConnectionError::ConnectionRefused(code)) => {
                        return Err(anyhow!("broker refused the session: {code:?}"))
                    }
                    Err(e) => return Err(anyhow!(e)),
                }
            }
        };
        timeout(config.connect_timeout, handshake)
            .await
            .map_err(|_| anyhow!("no CONNACK within {:?}", config.connect_timeout))??;

        self.client = Some(client);
        self.eventloop = Some(eventloop);
        self.connected = true;
        info!(
            "[{}] Connected to {}:{}",
            self.client_id, config.host, config.port
        );
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn subscribe(&mut self, topic: &str) -> Result<()> {
        self.live_client()?
            .subscribe(topic, QoS::AtMostOnce)
            .await?;

        let wait = self.ack_timeout;
        let mut rejected = false;
        let acked = self
            .drive_until(wait, |event| match event {
                Event::Incoming(Incoming::SubAck(ack)) => {
                    rejected = ack
                        .return_codes
                        .iter()
                        .any(|code| matches!(code, SubscribeReasonCode::Failure));
                    true
                }
                _ => false,
            })
            .await?;

        if !acked {
            bail!("no SUBACK within {wait:?}");
        }
        if rejected {
            bail!("broker rejected the subscription");
        }
        Ok(())
    }

    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<()> {
        self.live_client()?
            .publish(topic, QoS::AtMostOnce, false, payload.to_vec())
            .await?;

        let wait = self.ack_timeout;
        let sent = self
            .drive_until(wait, |event| {
                matches!(event, Event::Outgoing(Outgoing::Publish(_)))
            })
            .await?;
        if !sent {
            bail!("publish not flushed within {wait:?}");
        }
        Ok(())
    }

    async fn pump_events(&mut self) -> Result<Option<Message>> {
        if let Some(message) = self.inbox.pop_front() {
            return Ok(Some(message));
        }
        if !self.connected {
            bail!("not connected");
        }
        let window = self.pump_window;
        self.drive_until(window, |event| {
            matches!(event, Event::Incoming(Incoming::Publish(_)))
        })
        .await?;
        Ok(self.inbox.pop_front())
    }

    async fn disconnect(&mut self) -> Result<()> {
        let result = match self.client.take() {
            Some(client) if self.connected => match client.disconnect().await {
                Ok(()) => {
                    let wait = self.ack_timeout;
                    self.drive_until(wait, |event| {
                        matches!(event, Event::Outgoing(Outgoing::Disconnect))
                    })
                    .await
                    .map(|_| ())
                }
                Err(e) => Err(anyhow!(e)),
            },
            _ => Ok(()),
        };
        self.teardown();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    const CONNACK_OK: [u8; 4] = [0x20, 0x02, 0x00, 0x00];
    const CONNACK_NOT_AUTHORIZED: [u8; 4] = [0x20, 0x02, 0x00, 0x05];

    async fn broker() -> (TcpListener, SessionConfig) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let config = SessionConfig::builder("127.0.0.1", "sparkclient")
            .port(port)
            .connect_timeout(Duration::from_secs(5))
            .ack_timeout(Duration::from_secs(5))
            .pump_window(Duration::from_secs(5))
            .build();
        (listener, config)
    }

    /// Accept one client, consume its CONNECT and answer with `connack`.
    async fn accept(listener: &TcpListener, connack: &[u8]) -> TcpStream {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 256];
        let n = socket.read(&mut buf).await.unwrap();
        assert!(n > 0);
        assert_eq!(buf[0], 0x10, "expected CONNECT");
        socket.write_all(connack).await.unwrap();
        socket
    }

    fn publish_frame(topic: &str, payload: &[u8]) -> Vec<u8> {
        let remaining = 2 + topic.len() + payload.len();
        let mut frame = vec![0x30, remaining as u8];
        frame.extend_from_slice(&(topic.len() as u16).to_be_bytes());
        frame.extend_from_slice(topic.as_bytes());
        frame.extend_from_slice(payload);
        frame
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[tokio::test]
    async fn test_connect_and_pump_inbound_message() {
        let (listener, config) = broker().await;
        let server = tokio::spawn(async move {
            let mut socket = accept(&listener, &CONNACK_OK).await;
            socket
                .write_all(&publish_frame("colorChange", b"RED"))
                .await
                .unwrap();
            // Hold the socket open until the client goes away.
            let mut sink = [0u8; 64];
            while matches!(socket.read(&mut sink).await, Ok(n) if n > 0) {}
        });

        let mut transport = MqttTransport::new();
        transport.connect(&config).await.unwrap();
        assert!(transport.is_connected());

        let message = transport.pump_events().await.unwrap().expect("message");
        assert_eq!(message.topic(), "colorChange");
        assert_eq!(message.payload(), b"RED");
        assert_eq!(message.len(), 3);

        server.abort();
    }

    #[tokio::test]
    async fn test_rejected_connack_is_an_error() {
        let (listener, config) = broker().await;
        let server = tokio::spawn(async move {
            let _socket = accept(&listener, &CONNACK_NOT_AUTHORIZED).await;
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let mut transport = MqttTransport::new();
        let err = transport.connect(&config).await.unwrap_err();
        assert!(err.to_string().contains("refused"), "{err}");
        assert!(!transport.is_connected());

        server.abort();
    }

    #[tokio::test]
    async fn test_silent_broker_hits_connect_timeout() {
        let (listener, config) = broker().await;
        let config = SessionConfig {
            connect_timeout: Duration::from_millis(200),
            ..config
        };
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut sink = [0u8; 256];
            while matches!(socket.read(&mut sink).await, Ok(n) if n > 0) {}
        });

        let mut transport = MqttTransport::new();
        let err = transport.connect(&config).await.unwrap_err();
        assert!(err.to_string().contains("no CONNACK"), "{err}");
        assert!(!transport.is_connected());

        server.abort();
    }

    #[tokio::test]
    async fn test_quiet_pump_window_yields_nothing() {
        let (listener, config) = broker().await;
        let config = SessionConfig {
            pump_window: Duration::from_millis(100),
            ..config
        };
        let server = tokio::spawn(async move {
            let mut socket = accept(&listener, &CONNACK_OK).await;
            let mut sink = [0u8; 64];
            while matches!(socket.read(&mut sink).await, Ok(n) if n > 0) {}
        });

        let mut transport = MqttTransport::new();
        transport.connect(&config).await.unwrap();

        assert_eq!(transport.pump_events().await.unwrap(), None);
        assert!(transport.is_connected());

        server.abort();
    }

    #[tokio::test]
    async fn test_full_inbox_drops_oldest_message() {
        let (listener, config) = broker().await;
        let config = SessionConfig {
            inbox_capacity: 2,
            ..config
        };
        let (close_tx, close_rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            let mut socket = accept(&listener, &CONNACK_OK).await;
            let mut buf = [0u8; 256];
            socket.read(&mut buf).await.unwrap();
            assert_eq!(buf[0], 0x82, "expected SUBSCRIBE");

            // Three publishes land before the SUBACK the client is waiting for.
            let mut burst = Vec::new();
            for color in [&b"RED"[..], b"GREEN", b"BLUE"] {
                burst.extend(publish_frame("colorChange", color));
            }
            burst.extend_from_slice(&[0x90, 0x03, buf[2], buf[3], 0x00]);
            socket.write_all(&burst).await.unwrap();

            let _ = close_rx.await;
        });

        let mut transport = MqttTransport::new();
        transport.connect(&config).await.unwrap();
        transport.subscribe("colorChange").await.unwrap();

        let first = transport.pump_events().await.unwrap().expect("message");
        let second = transport.pump_events().await.unwrap().expect("message");
        assert_eq!(first.payload(), b"GREEN");
        assert_eq!(second.payload(), b"BLUE");

        close_tx.send(()).unwrap();
        server.await.unwrap();

        assert!(transport.pump_events().await.is_err());
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_unreachable_broker_is_an_error() {
        let (listener, config) = broker().await;
        drop(listener);

        let mut transport = MqttTransport::new();
        assert!(transport.connect(&config).await.is_err());
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_subscribe_waits_for_suback() {
        let (listener, config) = broker().await;
        let server = tokio::spawn(async move {
            let mut socket = accept(&listener, &CONNACK_OK).await;
            let mut buf = [0u8; 256];
            let n = socket.read(&mut buf).await.unwrap();
            assert_eq!(buf[0], 0x82, "expected SUBSCRIBE");
            assert!(contains(&buf[..n], b"colorChange"));
            let suback = [0x90, 0x03, buf[2], buf[3], 0x00];
            socket.write_all(&suback).await.unwrap();
            let mut sink = [0u8; 64];
            while matches!(socket.read(&mut sink).await, Ok(n) if n > 0) {}
        });

        let mut transport = MqttTransport::new();
        transport.connect(&config).await.unwrap();
        transport.subscribe("colorChange").await.unwrap();

        server.abort();
    }

    #[tokio::test]
    async fn test_publish_reaches_the_wire() {
        let (listener, config) = broker().await;
        let server = tokio::spawn(async move {
            let mut socket = accept(&listener, &CONNACK_OK).await;
            let mut received = Vec::new();
            let mut buf = [0u8; 256];
            while !contains(&received, b"hello world") {
                let n = socket.read(&mut buf).await.unwrap();
                assert!(n > 0, "client closed before publishing");
                received.extend_from_slice(&buf[..n]);
            }
            received
        });

        let mut transport = MqttTransport::new();
        transport.connect(&config).await.unwrap();
        transport.publish("testTopic", b"hello world").await.unwrap();

        let received = server.await.unwrap();
        assert_eq!(received[0], 0x30, "expected QoS 0 PUBLISH");
        assert!(contains(&received, b"testTopic"));
    }

    #[tokio::test]
    async fn test_operations_need_a_session() {
        let mut transport = MqttTransport::new();

        assert!(transport.subscribe("colorChange").await.is_err());
        assert!(transport.publish("testTopic", b"hello world").await.is_err());
        assert!(transport.pump_events().await.is_err());
        assert!(transport.disconnect().await.is_ok());
    }
}
