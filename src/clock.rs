//! Clock and random implementations.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use uuid::Uuid;

use crate::ports::{ClockPort, RandomPort};

/// System clock - uses real time.
#[derive(Debug, Default)]
pub struct SystemClock;

impl ClockPort for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// System random - uses the thread-local generator.
#[derive(Debug, Default)]
pub struct SystemRandom;

impl RandomPort for SystemRandom {
    fn gen_range(&self, min: u8, max: u8) -> u8 {
        rand::thread_rng().gen_range(min..=max)
    }

    fn gen_uuid(&self) -> Uuid {
        Uuid::new_v4()
    }
}

/// Reproducible randomness for demos and tests.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut guard = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}

impl RandomPort for SeededRandom {
    fn gen_range(&self, min: u8, max: u8) -> u8 {
        self.with_rng(|rng| rng.gen_range(min..=max))
    }

    fn gen_uuid(&self) -> Uuid {
        let bytes: [u8; 16] = self.with_rng(|rng| rng.r#gen());
        uuid::Builder::from_random_bytes(bytes).into_uuid()
    }
}

/// Manually driven clock.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        match self.now.lock() {
            Ok(mut guard) => *guard = now,
            Err(poisoned) => *poisoned.into_inner() = now,
        }
    }

    pub fn advance(&self, by: Duration) {
        let next = self.now() + by;
        self.set(next);
    }
}

impl ClockPort for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_random_is_reproducible() {
        let a = SeededRandom::new(42);
        let b = SeededRandom::new(42);
        let xs: Vec<u8> = (0..20).map(|_| a.gen_range(1, 40)).collect();
        let ys: Vec<u8> = (0..20).map(|_| b.gen_range(1, 40)).collect();
        assert_eq!(xs, ys);
        assert!(xs.iter().all(|n| (1..=40).contains(n)));
        assert_eq!(a.gen_uuid(), b.gen_uuid());
    }

    #[test]
    fn fixed_clock_advances() {
        let start = Utc::now();
        let clock = FixedClock::new(start);
        clock.advance(Duration::minutes(90));
        assert_eq!(clock.now(), start + Duration::minutes(90));
    }
}
