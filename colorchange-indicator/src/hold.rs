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

//! Holding a freshly applied color for the settle delay.

use std::time::Duration;

use anyhow::Result;
use log::{debug, warn};
use tokio::time::Instant;

use crate::color::IndicatorColor;
use crate::driver::IndicatorDriver;

/// How the settle delay after a color change is honored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SettlePolicy {
    /// Stall the caller for the whole settle delay after each change.
    #[default]
    Block,
    /// Hold the color until a deadline; later colors wait for it to pass.
    Timer,
}

/// Outcome of [`Indicator::show`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shown {
    Applied,
    /// A hold was active; the color becomes pending.
    Deferred,
}

/// An indicator driver plus the hold that follows every color change.
///
/// While a hold is active, newly requested colors replace each other as the
/// pending color, which [`tick`](Indicator::tick) applies once the hold expires.
pub struct Indicator<D> {
    driver: D,
    settle: Duration,
    held_until: Option<Instant>,
    pending: Option<IndicatorColor>,
    current: Option<IndicatorColor>,
}

impl<D: IndicatorDriver> Indicator<D> {
    pub fn new(driver: D, settle: Duration) -> Self {
        Self {
            driver,
            settle,
            held_until: None,
            pending: None,
            current: None,
        }
    }

    pub fn enable(&mut self) -> Result<()> {
        self.driver.enable_control(true)
    }

    pub fn show(&mut self, color: IndicatorColor, now: Instant) -> Shown {
        if self.is_held(now) {
            debug!("Indicator held, deferring {color}");
            self.pending = Some(color);
            return Shown::Deferred;
        }
        self.apply(color, now);
        Shown::Applied
    }

    /// Release an expired hold and apply the pending color, if any.
    pub fn tick(&mut self, now: Instant) -> Option<IndicatorColor> {
        if self.is_held(now) {
            return None;
        }
        self.held_until = None;
        let color = self.pending.take()?;
        self.apply(color, now);
        Some(color)
    }

    pub fn is_held(&self, now: Instant) -> bool {
        matches!(self.held_until, Some(until) if now < until)
    }

    /// The color most recently written to the driver.
    pub fn current(&self) -> Option<IndicatorColor> {
        self.current
    }

    pub fn pending(&self) -> Option<IndicatorColor> {
        self.pending
    }

    pub fn settle(&self) -> Duration {
        self.settle
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    fn apply(&mut self, color: IndicatorColor, now: Instant) {
        if let Err(e) = self.driver.show(color) {
            warn!("Failed to set indicator to {color}: {e:#}");
        }
        self.current = Some(color);
        self.held_until = Some(now + self.settle);
    }
}
