//! Stock work behaviors: fixed delay, failure-prone machines, error-prone
//! workers.
//!
//! All randomness is drawn from the RNG the engine passes in, so a fixed
//! seed reproduces the exact same delays and fault points.

use crate::{BehaviorStatus, WorkBehavior};
use rand::{Rng, RngCore};
use std::time::Duration;

/// Identity behavior: the body takes exactly its base duration.
#[derive(Debug, Default)]
pub struct FixedDelay {
    operations: u64,
}

impl FixedDelay {
    /// Create the behavior.
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkBehavior for FixedDelay {
    fn operate(&mut self, base: Duration, _rng: &mut dyn RngCore) -> Result<Duration, String> {
        self.operations += 1;
        Ok(base)
    }

    fn status(&self) -> BehaviorStatus {
        BehaviorStatus {
            operations: self.operations,
            failures: 0,
        }
    }
}

/// Machine-style behavior: each operation may break down, adding a repair
/// delay to the body.
#[derive(Debug)]
pub struct FailureProne {
    /// Per-operation breakdown probability.
    failure_probability: f64,
    /// Repair time added on breakdown.
    repair_time: Duration,
    /// Multiplier on the breakdown probability (process-level wear weight).
    weight: f64,
    operations: u64,
    failures: u64,
}

impl FailureProne {
    /// Create the behavior with a breakdown probability and repair time.
    pub fn new(failure_probability: f64, repair_time: Duration) -> Self {
        Self {
            failure_probability: failure_probability.clamp(0.0, 1.0),
            repair_time,
            weight: 1.0,
            operations: 0,
            failures: 0,
        }
    }

    /// Scale the breakdown probability (1.5 = 50% more breakdowns).
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight.max(0.0);
        self
    }

    fn effective_probability(&self) -> f64 {
        (self.failure_probability * self.weight).clamp(0.0, 1.0)
    }
}

impl WorkBehavior for FailureProne {
    fn operate(&mut self, base: Duration, rng: &mut dyn RngCore) -> Result<Duration, String> {
        self.operations += 1;
        if rng.gen_bool(self.effective_probability()) {
            self.failures += 1;
            Ok(base + self.repair_time)
        } else {
            Ok(base)
        }
    }

    fn status(&self) -> BehaviorStatus {
        BehaviorStatus {
            operations: self.operations,
            failures: self.failures,
        }
    }
}

/// Worker-style behavior: each operation may contain a mistake, adding a
/// rework delay to the body.
#[derive(Debug)]
pub struct ErrorProne {
    /// Per-operation mistake probability.
    error_probability: f64,
    /// Rework time added on a mistake.
    rework_time: Duration,
    /// Multiplier on the mistake probability.
    weight: f64,
    operations: u64,
    errors: u64,
}

impl ErrorProne {
    /// Create the behavior with a mistake probability and rework time.
    pub fn new(error_probability: f64, rework_time: Duration) -> Self {
        Self {
            error_probability: error_probability.clamp(0.0, 1.0),
            rework_time,
            weight: 1.0,
            operations: 0,
            errors: 0,
        }
    }

    /// Scale the mistake probability.
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight.max(0.0);
        self
    }
}

impl WorkBehavior for ErrorProne {
    fn operate(&mut self, base: Duration, rng: &mut dyn RngCore) -> Result<Duration, String> {
        self.operations += 1;
        let p = (self.error_probability * self.weight).clamp(0.0, 1.0);
        if rng.gen_bool(p) {
            self.errors += 1;
            Ok(base + self.rework_time)
        } else {
            Ok(base)
        }
    }

    fn status(&self) -> BehaviorStatus {
        BehaviorStatus {
            operations: self.operations,
            failures: self.errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_fixed_delay_is_identity() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut b = FixedDelay::new();
        let d = b.operate(Duration::from_secs(4), &mut rng).unwrap();
        assert_eq!(d, Duration::from_secs(4));
        assert_eq!(b.status().operations, 1);
    }

    #[test]
    fn test_failure_prone_never_fails_at_zero_probability() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut b = FailureProne::new(0.0, Duration::from_secs(10));
        for _ in 0..100 {
            let d = b.operate(Duration::from_secs(1), &mut rng).unwrap();
            assert_eq!(d, Duration::from_secs(1));
        }
        assert_eq!(b.status().failures, 0);
    }

    #[test]
    fn test_failure_prone_always_fails_at_full_probability() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut b = FailureProne::new(1.0, Duration::from_secs(10));
        let d = b.operate(Duration::from_secs(1), &mut rng).unwrap();
        assert_eq!(d, Duration::from_secs(11));
        assert_eq!(b.status().failures, 1);
    }

    #[test]
    fn test_same_seed_reproduces_delays() {
        let run = |seed: u64| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut b = FailureProne::new(0.5, Duration::from_secs(2));
            (0..20)
                .map(|_| b.operate(Duration::from_secs(1), &mut rng).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn test_error_prone_adds_rework_time() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut b = ErrorProne::new(1.0, Duration::from_secs(4));
        let d = b.operate(Duration::from_secs(2), &mut rng).unwrap();
        assert_eq!(d, Duration::from_secs(6));
        assert_eq!(b.status(), BehaviorStatus { operations: 1, failures: 1 });
    }

    #[test]
    fn test_weight_scales_probability() {
        // Weight large enough to saturate the clamp: always fails.
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut b = FailureProne::new(0.01, Duration::from_secs(5)).with_weight(1000.0);
        let d = b.operate(Duration::from_secs(1), &mut rng).unwrap();
        assert_eq!(d, Duration::from_secs(6));
    }
}
