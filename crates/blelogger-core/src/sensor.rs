//! Sensor and battery inputs
//!
//! The logger samples a single scalar input (a Sharp IR distance sensor on
//! the reference board); the info handler reports the supply voltage.

use std::collections::VecDeque;

/// A polled analog/digital input
pub trait Sensor {
    /// Take one sample
    fn sample(&mut self) -> i32;
}

/// Supply voltage monitor
pub trait BatteryMonitor {
    /// Current battery voltage in volts
    fn voltage(&mut self) -> f32;
}

/// Convert a raw ADC count into volts through a resistor divider
///
/// `full_scale` is the ADC's maximum count, `reference` the reference
/// voltage and `divider` the ratio the battery is scaled down by.
pub fn adc_to_volts(raw: u16, full_scale: u16, reference: f32, divider: f32) -> f32 {
    if full_scale == 0 {
        return 0.0;
    }
    raw as f32 * reference / full_scale as f32 * divider
}

/// Sensor that plays back a fixed sequence of samples
///
/// Once the script is exhausted the last sample repeats.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSensor {
    samples: VecDeque<i32>,
    last: i32,
}

impl ScriptedSensor {
    /// Play `samples` in order
    pub fn new(samples: impl IntoIterator<Item = i32>) -> Self {
        Self {
            samples: samples.into_iter().collect(),
            last: 0,
        }
    }

    /// Sensor that always reads `value`
    pub fn constant(value: i32) -> Self {
        Self {
            samples: VecDeque::new(),
            last: value,
        }
    }
}

impl Sensor for ScriptedSensor {
    fn sample(&mut self) -> i32 {
        if let Some(next) = self.samples.pop_front() {
            self.last = next;
        }
        self.last
    }
}

/// Battery that always reports the same voltage
#[derive(Debug, Clone, Copy)]
pub struct FixedBattery(pub f32);

impl BatteryMonitor for FixedBattery {
    fn voltage(&mut self) -> f32 {
        self.0
    }
}
