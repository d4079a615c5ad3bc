//! Clock and random implementations.

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::infrastructure::ports::{ClockPort, RandomPort};

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl ClockPort for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRandom;

impl SystemRandom {
    pub fn new() -> Self {
        Self
    }
}

impl RandomPort for SystemRandom {
    fn gen_probability(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

#[cfg(test)]
pub use self::test_doubles::{FixedClock, FixedRandom, ManualClock};


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_random_stays_in_unit_interval() {
        let random = SystemRandom::new();
        for _ in 0..1_000 {
            let roll = random.gen_probability();
            assert!((0.0..1.0).contains(&roll));
        }
    }
}
