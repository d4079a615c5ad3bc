//! Ports for injecting time and randomness, so tension decay and competitor
//! rolls are deterministic under test.

use chrono::{DateTime, Utc};

#[cfg_attr(test, mockall::automock)]
pub trait ClockPort: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub trait RandomPort: Send + Sync {
    /// Uniform value in `[0, 1)`, compared against spawn probabilities.
    fn gen_probability(&self) -> f64;
}
