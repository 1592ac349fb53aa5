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

use anyhow::Result;
use colorchange_device::{ControlLoop, DeviceConfig};
use colorchange_session::MqttTransport;
use log::info;

#[cfg(feature = "rpi")]
fn indicator_driver() -> Result<colorchange_indicator::PwmRgbIndicator> {
    colorchange_indicator::PwmRgbIndicator::new(colorchange_device::config::RGB_PINS)
}

#[cfg(not(feature = "rpi"))]
fn indicator_driver() -> Result<colorchange_indicator::LogIndicator> {
    Ok(colorchange_indicator::LogIndicator::new())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = DeviceConfig::compiled();
    info!(
        "Starting colorchange device (broker={}:{}, client={})",
        config.session.host, config.session.port, config.session.client_id
    );

    let mut control = ControlLoop::new(MqttTransport::new(), indicator_driver()?, config);
    control.start().await;

    tokio::select! {
        _ = control.run() => {}
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Shutdown signal received");
        }
    }

    control.shutdown().await;
    Ok(())
}
