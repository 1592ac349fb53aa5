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

//! The device's single control loop.

use log::{debug, info, warn};
use tokio::time::{sleep, Instant};

use colorchange_indicator::{
    dispatch, Indicator, IndicatorColor, IndicatorDriver, SettlePolicy, Shown,
};
use colorchange_session::{SessionController, Transport};

use crate::config::DeviceConfig;

/// Drives the session, the dispatcher and the periodic publish.
///
/// Every failure is absorbed: the affected step is skipped for the current
/// iteration and the loop carries on.
pub struct ControlLoop<T, D> {
    session: SessionController<T>,
    indicator: Indicator<D>,
    config: DeviceConfig,
}

impl<T: Transport, D: IndicatorDriver> ControlLoop<T, D> {
    pub fn new(transport: T, driver: D, config: DeviceConfig) -> Self {
        Self {
            session: SessionController::new(transport),
            indicator: Indicator::new(driver, config.settle_delay),
            config,
        }
    }

    /// One-time initialization: take the indicator, connect once and
    /// subscribe if that worked.
    pub async fn start(&mut self) {
        if let Err(e) = self.indicator.enable() {
            warn!("[{}] Failed to take indicator control: {e:#}", self.id());
        }
        self.establish().await;
    }

    /// Run iterations forever.
    pub async fn run(&mut self) {
        info!("[{}] Control loop started", self.id());
        loop {
            self.step().await;
        }
    }

    /// One iteration: pump, publish, sleep.
    pub async fn step(&mut self) {
        self.indicator.tick(Instant::now());

        if self.config.retry_connect && !self.session.is_connected() {
            self.establish().await;
        }

        if self.session.is_connected() {
            let mut requested = None;
            let pumped = self
                .session
                .pump_events(|message| {
                    let color = dispatch(message.payload());
                    debug!(
                        "Message on '{}' ({} bytes) -> {color}",
                        message.topic(),
                        message.len()
                    );
                    requested = Some(color);
                })
                .await;
            if let Err(e) = pumped {
                debug!("[{}] Skipping event pump: {e}", self.id());
            }
            if let Some(color) = requested {
                self.show(color).await;
            }
        }

        // Re-checked: the pump may have observed the session drop.
        if self.session.is_connected() {
            if let Err(e) = self
                .session
                .publish(&self.config.publish_topic, &self.config.publish_payload)
                .await
            {
                warn!("[{}] {e}", self.id());
            }
        }

        sleep(self.config.loop_interval).await;
    }

    /// Close the broker session.
    pub async fn shutdown(&mut self) {
        self.session.disconnect().await;
    }

    pub fn session(&self) -> &SessionController<T> {
        &self.session
    }

    pub fn indicator(&self) -> &Indicator<D> {
        &self.indicator
    }

    async fn establish(&mut self) {
        if let Err(e) = self.session.connect(&self.config.session).await {
            warn!("[{}] {e}; running without a session", self.id());
            return;
        }
        if !self.session.is_connected() {
            return;
        }
        if let Err(e) = self.session.subscribe(&self.config.subscribe_topic).await {
            warn!("[{}] {e}", self.id());
        }
    }

    async fn show(&mut self, color: IndicatorColor) {
        let shown = self.indicator.show(color, Instant::now());
        if shown == Shown::Applied && self.config.settle_policy == SettlePolicy::Block {
            sleep(self.indicator.settle()).await;
        }
    }

    fn id(&self) -> &str {
        &self.config.session.client_id
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use colorchange_indicator::{IndicatorEvent, RecordingIndicator};
    use colorchange_session::testing::{ScriptedTransport, TransportCall};
    use colorchange_session::SessionConfig;

    fn config() -> DeviceConfig {
        DeviceConfig::builder(SessionConfig::builder("broker.local", "sparkclient").build()).build()
    }

    fn is_publish(call: &TransportCall) -> bool {
        matches!(call, TransportCall::Publish { .. })
    }

    fn is_subscribe(call: &TransportCall) -> bool {
        matches!(call, TransportCall::Subscribe(_))
    }

    fn is_connect(call: &TransportCall) -> bool {
        matches!(call, TransportCall::Connect { .. })
    }

    async fn started(
        transport: &ScriptedTransport,
        config: DeviceConfig,
    ) -> (ControlLoop<ScriptedTransport, RecordingIndicator>, RecordingIndicator) {
        let recorder = RecordingIndicator::new();
        let mut control = ControlLoop::new(transport.clone(), recorder.clone(), config);
        control.start().await;
        (control, recorder)
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_connects_and_subscribes_once() {
        let transport = ScriptedTransport::accepting();
        let (mut control, recorder) = started(&transport, config()).await;

        assert_eq!(recorder.events(), vec![IndicatorEvent::Control(true)]);
        assert_eq!(
            transport.calls(),
            vec![
                TransportCall::Connect {
                    host: "broker.local".into(),
                    port: 1883,
                    client_id: "sparkclient".into(),
                },
                TransportCall::Subscribe("colorChange".into()),
            ]
        );
        assert_eq!(control.session().subscriptions(), ["colorChange".to_string()]);

        for _ in 0..3 {
            control.step().await;
        }
        assert_eq!(transport.count(is_subscribe), 1);
        assert_eq!(transport.count(is_connect), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_connect_runs_degraded_forever() {
        let transport = ScriptedTransport::refusing();
        let (mut control, recorder) = started(&transport, config()).await;

        for _ in 0..10 {
            control.step().await;
            assert!(!control.session.is_connected());
        }

        assert_eq!(transport.calls().len(), 1);
        assert_eq!(transport.count(is_subscribe), 0);
        assert_eq!(transport.count(is_publish), 0);
        assert!(recorder.colors().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_connected_iteration_publishes_once_then_sleeps() {
        let transport = ScriptedTransport::accepting();
        let (mut control, _) = started(&transport, config()).await;
        let start = Instant::now();

        for _ in 0..3 {
            control.step().await;
        }

        let publishes: Vec<_> = transport.calls().into_iter().filter(is_publish).collect();
        assert_eq!(publishes.len(), 3);
        assert!(publishes.iter().all(|call| *call
            == TransportCall::Publish {
                topic: "testTopic".into(),
                payload: b"hello world".to_vec(),
            }));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(15) && elapsed < Duration::from_secs(16));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pump_happens_before_publish() {
        let transport = ScriptedTransport::accepting();
        let (mut control, _) = started(&transport, config()).await;

        control.step().await;

        let calls = transport.calls();
        assert_eq!(calls[2], TransportCall::Pump);
        assert!(is_publish(&calls[3]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_red_payload_blocks_for_settle_delay() {
        let transport = ScriptedTransport::accepting();
        transport.push_inbound("colorChange", "RED");
        let config = DeviceConfig::builder(config().session)
            .settle_policy(SettlePolicy::Block)
            .build();
        let (mut control, recorder) = started(&transport, config).await;
        let start = Instant::now();

        control.step().await;

        assert_eq!(recorder.colors(), vec![(255, 0, 0)]);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(6) && elapsed < Duration::from_millis(6500));
        assert_eq!(transport.count(is_publish), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_policy_stalls_for_settle_delay() {
        let transport = ScriptedTransport::accepting();
        transport.push_inbound("colorChange", "RED");
        let config = DeviceConfig::builder(crate::config::compiled_session()).build();
        let (mut control, recorder) = started(&transport, config).await;
        let start = Instant::now();

        control.step().await;

        assert_eq!(recorder.colors(), vec![(255, 0, 0)]);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(6) && elapsed < Duration::from_millis(6500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_red_payload_with_timer_does_not_stall() {
        let transport = ScriptedTransport::accepting();
        transport.push_inbound("colorChange", "RED");
        let config = DeviceConfig::builder(config().session)
            .settle_policy(SettlePolicy::Timer)
            .build();
        let (mut control, recorder) = started(&transport, config).await;
        let start = Instant::now();

        control.step().await;

        assert_eq!(recorder.colors(), vec![(255, 0, 0)]);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(5) && elapsed < Duration::from_millis(5500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_payload_shows_white() {
        let transport = ScriptedTransport::accepting();
        transport.push_inbound("colorChange", "");
        let (mut control, recorder) = started(&transport, config()).await;

        control.step().await;

        assert_eq!(recorder.colors(), vec![(255, 255, 255)]);
        assert_eq!(control.indicator().current(), Some(IndicatorColor::White));
    }

    #[tokio::test(start_paused = true)]
    async fn test_color_received_during_hold_is_applied_after_it() {
        let transport = ScriptedTransport::accepting();
        transport.push_inbound("colorChange", "RED");
        transport.push_inbound("colorChange", "GREEN");
        let config = DeviceConfig::builder(config().session)
            .settle_delay(Duration::from_secs(10))
            .settle_policy(SettlePolicy::Timer)
            .build();
        let (mut control, recorder) = started(&transport, config).await;

        control.step().await;
        control.step().await;
        assert_eq!(recorder.colors(), vec![(255, 0, 0)]);
        assert_eq!(control.indicator().pending(), Some(IndicatorColor::Green));

        control.step().await;
        assert_eq!(recorder.colors(), vec![(255, 0, 0), (0, 255, 0)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lost_session_stops_publishing_without_retry() {
        let transport = ScriptedTransport::accepting();
        let (mut control, _) = started(&transport, config()).await;
        control.step().await;

        transport.drop_connection();
        for _ in 0..3 {
            control.step().await;
        }

        assert_eq!(transport.count(is_publish), 1);
        assert_eq!(transport.count(is_connect), 1);
        assert!(control.session().subscriptions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_connect_resubscribes_after_loss() {
        let transport = ScriptedTransport::accepting();
        let config = DeviceConfig::builder(config().session)
            .retry_connect(true)
            .build();
        let (mut control, _) = started(&transport, config).await;
        control.step().await;

        transport.drop_connection();
        control.step().await;

        assert_eq!(transport.count(is_connect), 2);
        assert_eq!(transport.count(is_subscribe), 2);
        assert_eq!(transport.count(is_publish), 2);
        assert_eq!(control.session().subscriptions(), ["colorChange".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_disconnects() {
        let transport = ScriptedTransport::accepting();
        let (mut control, _) = started(&transport, config()).await;

        control.shutdown().await;

        assert_eq!(transport.calls().last(), Some(&TransportCall::Disconnect));
    }
}
