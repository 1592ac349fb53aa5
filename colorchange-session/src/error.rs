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

//! Error taxonomy of the session controller.

use thiserror::Error;

/// Failures surfaced by [`SessionController`](crate::SessionController).
///
/// Malformed payloads are not represented here; the dispatcher absorbs them.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Handshake, authentication or network failure while connecting.
    #[error("connection to {host}:{port} failed: {reason}")]
    Connection {
        host: String,
        port: u16,
        reason: String,
    },

    /// An operation that needs a live session was attempted without one.
    #[error("not connected")]
    NotConnected,

    /// The broker rejected the subscription or the request never went out.
    #[error("subscribe to '{topic}' failed: {reason}")]
    Subscribe { topic: String, reason: String },

    /// The publish could not be handed to the network.
    #[error("publish to '{topic}' failed: {reason}")]
    Publish { topic: String, reason: String },
}
