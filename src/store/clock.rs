use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch. Every stored timestamp uses this unit.
pub type Millis = u64;

pub trait Clock: Send + Sync {
    fn now_millis(&self) -> Millis;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> Millis {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as Millis)
            .unwrap_or(0)
    }
}

#[cfg(test)]
pub use manual::ManualClock;
