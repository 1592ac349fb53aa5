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

//! MQTT session handling for the colorchange device.
//!
//! A [`SessionController`] owns one [`Transport`], connects it once, performs
//! the subscription and guards publish/pump on session liveness. The
//! rumqttc-backed [`MqttTransport`] is the production transport.
//!
//! # Example
//!
//! ```ignore
//! use colorchange_session::{MqttTransport, SessionConfig, SessionController};
//!
//! let config = SessionConfig::builder("broker.local", "sparkclient")
//!     .port(1883)
//!     .build();
//!
//! let mut session = SessionController::new(MqttTransport::new());
//! session.connect(&config).await?;
//! if session.is_connected() {
//!     session.subscribe("colorChange").await?;
//! }
//! ```

pub mod config;
pub mod error;
pub mod mqtt;
pub mod session;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transport;

pub use config::{SessionConfig, SessionConfigBuilder};
pub use error::SessionError;
pub use mqtt::MqttTransport;
pub use session::{SessionController, SessionState};
pub use transport::{Message, Transport};
