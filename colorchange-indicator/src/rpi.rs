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

//! Raspberry Pi RGB LED driven by software PWM on three GPIO pins.

use anyhow::{Context, Result};
use log::info;
use rppal::gpio::{Gpio, OutputPin};

use crate::driver::IndicatorDriver;

/// PWM frequency per channel; high enough to avoid visible flicker.
const PWM_HZ: f64 = 200.0;

/// BCM pin numbers of the LED's red, green and blue legs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbPins {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

/// Common-cathode RGB LED wired to three GPIO outputs.
pub struct PwmRgbIndicator {
    channels: [OutputPin; 3],
    enabled: bool,
}

impl PwmRgbIndicator {
    pub fn new(pins: RgbPins) -> Result<Self> {
        let gpio = Gpio::new().context("GPIO unavailable")?;
        let open = |pin: u8| -> Result<OutputPin> {
            Ok(gpio
                .get(pin)
                .with_context(|| format!("GPIO {pin} unavailable"))?
                .into_output_low())
        };
        let channels = [open(pins.red)?, open(pins.green)?, open(pins.blue)?];
        info!(
            "RGB indicator on GPIO {}/{}/{}",
            pins.red, pins.green, pins.blue
        );
        Ok(Self {
            channels,
            enabled: false,
        })
    }

    fn dark(&mut self) -> Result<()> {
        for pin in &mut self.channels {
            pin.clear_pwm()?;
            pin.set_low();
        }
        Ok(())
    }
}

impl IndicatorDriver for PwmRgbIndicator {
    fn enable_control(&mut self, enabled: bool) -> Result<()> {
        self.enabled = enabled;
        if !enabled {
            self.dark()?;
        }
        Ok(())
    }

    fn set_color(&mut self, r: u8, g: u8, b: u8) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        for (pin, level) in self.channels.iter_mut().zip([r, g, b]) {
            pin.set_pwm_frequency(PWM_HZ, f64::from(level) / 255.0)?;
        }
        Ok(())
    }
}

impl Drop for PwmRgbIndicator {
    fn drop(&mut self) {
        let _ = self.dark();
    }
}
