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

//! The indicator hardware seam and the drivers shipped with the crate.

use anyhow::Result;
use log::info;

use crate::color::IndicatorColor;

/// An RGB indicator the program can take control of.
pub trait IndicatorDriver {
    /// Take (or hand back) control of the indicator.
    fn enable_control(&mut self, enabled: bool) -> Result<()>;

    /// Set each channel to an 8-bit intensity.
    fn set_color(&mut self, r: u8, g: u8, b: u8) -> Result<()>;

    fn show(&mut self, color: IndicatorColor) -> Result<()> {
        let (r, g, b) = color.rgb();
        self.set_color(r, g, b)
    }
}

impl<D: IndicatorDriver + ?Sized> IndicatorDriver for Box<D> {
    fn enable_control(&mut self, enabled: bool) -> Result<()> {
        (**self).enable_control(enabled)
    }

    fn set_color(&mut self, r: u8, g: u8, b: u8) -> Result<()> {
        (**self).set_color(r, g, b)
    }
}

/// Driver for hosts without indicator hardware: logs every change.
#[derive(Debug, Default)]
pub struct LogIndicator {
    enabled: bool,
    rgb: Option<(u8, u8, u8)>,
}

impl LogIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last color written while control was enabled.
    pub fn rgb(&self) -> Option<(u8, u8, u8)> {
        self.rgb
    }
}

impl IndicatorDriver for LogIndicator {
    fn enable_control(&mut self, enabled: bool) -> Result<()> {
        self.enabled = enabled;
        info!("Indicator control {}", if enabled { "enabled" } else { "released" });
        Ok(())
    }

    fn set_color(&mut self, r: u8, g: u8, b: u8) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        self.rgb = Some((r, g, b));
        info!("Indicator set to ({r}, {g}, {b})");
        Ok(())
    }
}

#[cfg(any(test, feature = "testing"))]
pub use recording::{IndicatorEvent, RecordingIndicator};

#[cfg(any(test, feature = "testing"))]
mod recording {
    use std::sync::{Arc, Mutex};

    use anyhow::Result;

    use super::IndicatorDriver;

    /// Something a [`RecordingIndicator`] was asked to do.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum IndicatorEvent {
        Control(bool),
        Color(u8, u8, u8),
    }

    /// Records every driver call. Clones share the record.
    #[derive(Debug, Clone, Default)]
    pub struct RecordingIndicator {
        events: Arc<Mutex<Vec<IndicatorEvent>>>,
    }

    impl RecordingIndicator {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn events(&self) -> Vec<IndicatorEvent> {
            self.events.lock().expect("recorder lock poisoned").clone()
        }

        /// Every color written, oldest first.
        pub fn colors(&self) -> Vec<(u8, u8, u8)> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    IndicatorEvent::Color(r, g, b) => Some((r, g, b)),
                    IndicatorEvent::Control(_) => None,
                })
                .collect()
        }

        fn record(&self, event: IndicatorEvent) {
            self.events
                .lock()
                .expect("recorder lock poisoned")
                .push(event);
        }
    }

    impl IndicatorDriver for RecordingIndicator {
        fn enable_control(&mut self, enabled: bool) -> Result<()> {
            self.record(IndicatorEvent::Control(enabled));
            Ok(())
        }

        fn set_color(&mut self, r: u8, g: u8, b: u8) -> Result<()> {
            self.record(IndicatorEvent::Color(r, g, b));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_indicator_ignores_colors_until_enabled() {
        let mut driver = LogIndicator::new();
        driver.show(IndicatorColor::Red).unwrap();
        assert_eq!(driver.rgb(), None);

        driver.enable_control(true).unwrap();
        driver.show(IndicatorColor::Blue).unwrap();
        assert_eq!(driver.rgb(), Some((0, 0, 255)));
    }

    #[test]
    fn test_boxed_driver_forwards_calls() {
        let recorder = RecordingIndicator::new();
        let mut boxed: Box<dyn IndicatorDriver> = Box::new(recorder.clone());

        boxed.enable_control(true).unwrap();
        boxed.show(IndicatorColor::Green).unwrap();

        assert_eq!(
            recorder.events(),
            vec![IndicatorEvent::Control(true), IndicatorEvent::Color(0, 255, 0)]
        );
    }
}
