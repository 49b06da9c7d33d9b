//! Training time values and run progress counters
//!
//! `Time` is a unit-tagged duration ("2ep", "100ba", "5000sp") used for
//! run lengths and checkpoint intervals. `Timestamp` tracks how far a run
//! has progressed; the trainer stops once the timestamp reaches
//! `max_duration`.

use std::fmt;
use std::ops::Mul;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Unit a [`Time`] value is denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeUnit {
    Epoch,
    Batch,
    Sample,
}

impl TimeUnit {
    /// Suffix used in the textual form ("2ep", "100ba", "5000sp")
    pub fn suffix(self) -> &'static str {
        match self {
            TimeUnit::Epoch => "ep",
            TimeUnit::Batch => "ba",
            TimeUnit::Sample => "sp",
        }
    }
}

/// A duration measured in epochs, batches, or samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Time {
    value: u64,
    unit: TimeUnit,
}

impl Time {
    pub fn new(value: u64, unit: TimeUnit) -> Self {
        Self { value, unit }
    }

    pub fn epochs(value: u64) -> Self {
        Self::new(value, TimeUnit::Epoch)
    }

    pub fn batches(value: u64) -> Self {
        Self::new(value, TimeUnit::Batch)
    }

    pub fn samples(value: u64) -> Self {
        Self::new(value, TimeUnit::Sample)
    }

    pub fn value(self) -> u64 {
        self.value
    }

    pub fn unit(self) -> TimeUnit {
        self.unit
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.suffix())
    }
}

/// Doubling a run length (`duration * 2`) is the supported way to extend
/// training between `fit` calls.
impl Mul<u64> for Time {
    type Output = Time;

    fn mul(self, rhs: u64) -> Time {
        Time::new(self.value * rhs, self.unit)
    }
}

/// Error parsing a time string
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid time value: {0:?} (expected e.g. \"2ep\", \"100ba\", \"5000sp\")")]
pub struct ParseTimeError(String);

impl FromStr for Time {
    type Err = ParseTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| ParseTimeError(s.to_string()))?;
        let (digits, suffix) = s.split_at(split);
        let value: u64 = digits.parse().map_err(|_| ParseTimeError(s.to_string()))?;
        let unit = match suffix {
            "ep" => TimeUnit::Epoch,
            "ba" => TimeUnit::Batch,
            "sp" => TimeUnit::Sample,
            _ => return Err(ParseTimeError(s.to_string())),
        };
        Ok(Time::new(value, unit))
    }
}

/// Monotone progress counters for a run.
///
/// `batch` and `sample` count from the start of the run; `batch_in_epoch`
/// resets at each epoch boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    pub epoch: u64,
    pub batch: u64,
    pub batch_in_epoch: u64,
    pub sample: u64,
}

impl Timestamp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance past one training batch of `samples` samples.
    pub fn advance_batch(&mut self, samples: u64) {
        self.batch += 1;
        self.batch_in_epoch += 1;
        self.sample += samples;
    }

    /// Advance past an epoch boundary.
    pub fn advance_epoch(&mut self) {
        self.epoch += 1;
        self.batch_in_epoch = 0;
    }

    /// Whether this timestamp has reached the given duration.
    pub fn reached(&self, duration: Time) -> bool {
        match duration.unit() {
            TimeUnit::Epoch => self.epoch >= duration.value(),
            TimeUnit::Batch => self.batch >= duration.value(),
            TimeUnit::Sample => self.sample >= duration.value(),
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Textual form round-trips for every unit
        #[test]
        fn time_round_trips(value in 0u64..1_000_000, unit_idx in 0usize..3) {
            let unit = [TimeUnit::Epoch, TimeUnit::Batch, TimeUnit::Sample][unit_idx];
            let t = Time::new(value, unit);
            let back: Time = t.to_string().parse().unwrap();
            prop_assert_eq!(back, t);
        }

        /// Counters never decrease while advancing
        #[test]
        fn timestamp_is_monotone(batches in 1usize..50, samples in 1u64..64) {
            let mut ts = Timestamp::new();
            let mut prev = ts;
            for _ in 0..batches {
                ts.advance_batch(samples);
                prop_assert!(ts.batch > prev.batch);
                prop_assert!(ts.sample > prev.sample);
                prev = ts;
            }
        }
    }
}
