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

//! Indicator side of the colorchange device.
//!
//! [`dispatch`] turns a received payload into an [`IndicatorColor`]; an
//! [`Indicator`] writes colors to an [`IndicatorDriver`] and holds each one
//! for the settle delay.
//!
//! # Example
//!
//! ```ignore
//! use colorchange_indicator::{dispatch, Indicator, LogIndicator};
//!
//! let mut indicator = Indicator::new(LogIndicator::new(), Duration::from_secs(1));
//! indicator.enable()?;
//! indicator.show(dispatch(b"RED"), Instant::now());
//! ```

pub mod color;
pub mod dispatcher;
pub mod driver;
pub mod hold;
#[cfg(feature = "rpi")]
pub mod rpi;

pub use color::IndicatorColor;
pub use dispatcher::dispatch;
pub use driver::{IndicatorDriver, LogIndicator};
#[cfg(any(test, feature = "testing"))]
pub use driver::{IndicatorEvent, RecordingIndicator};
pub use hold::{Indicator, SettlePolicy, Shown};
#[cfg(feature = "rpi")]
pub use rpi::{PwmRgbIndicator, RgbPins};
