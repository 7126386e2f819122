//! Simulated board inputs
//!
//! A wandering distance reading and a slowly discharging battery, so the
//! phone app has something plausible to display.

use blelogger_core::sensor::{adc_to_volts, BatteryMonitor, Sensor};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// 10-bit ADC
const ADC_FULL_SCALE: u16 = 1023;

fn rng_from(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// IR distance sensor: a bounded random walk over the ADC range
#[derive(Debug)]
pub struct SimulatedSensor {
    rng: StdRng,
    value: i32,
}

impl SimulatedSensor {
    pub fn new(seed: Option<u64>) -> Self {
        let mut rng = rng_from(seed);
        let value = rng.gen_range(100..900);
        Self { rng, value }
    }
}

impl Sensor for SimulatedSensor {
    fn sample(&mut self) -> i32 {
        let step = self.rng.gen_range(-25..=25);
        self.value = (self.value + step).clamp(0, ADC_FULL_SCALE as i32);
        self.value
    }
}

/// Li-ion cell read through a 2:1 divider on a 3.3 V ADC
#[derive(Debug)]
pub struct SimulatedBattery {
    rng: StdRng,
    raw: f32,
}

impl SimulatedBattery {
    /// Count that reads back as a full 4.2 V cell
    const FULL: f32 = 651.0;
    /// Count for a flat 3.3 V cell
    const EMPTY: f32 = 511.0;

    pub fn new(seed: Option<u64>) -> Self {
        Self {
            rng: rng_from(seed.map(|s| s.wrapping_add(1))),
            raw: Self::FULL,
        }
    }
}

impl BatteryMonitor for SimulatedBattery {
    fn voltage(&mut self) -> f32 {
        self.raw = (self.raw - 0.05).max(Self::EMPTY);
        let noise: f32 = self.rng.gen_range(-2.0..2.0);
        let reading = (self.raw + noise).clamp(0.0, ADC_FULL_SCALE as f32) as u16;
        adc_to_volts(reading, ADC_FULL_SCALE, 3.3, 2.0)
    }
}
