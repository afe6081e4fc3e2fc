//! Failure injection sources for the origin handler.

use std::collections::VecDeque;
use std::sync::Mutex;

use rand::Rng;

/// Decides, per request, whether the origin simulates a transient failure.
pub trait FailureSource: Send + Sync + std::fmt::Debug {
    fn should_fail(&self) -> bool;
}

/// Independent random draw per call.
#[derive(Debug, Clone, Copy)]
pub struct RandomFailure {
    probability: f64,
}

impl RandomFailure {
    /// `probability` is clamped to [0, 1].
    pub fn new(probability: f64) -> Self {
        Self {
            probability: if probability.is_nan() {
                0.0
            } else {
                probability.clamp(0.0, 1.0)
            },
        }
    }
}

impl FailureSource for RandomFailure {
    fn should_fail(&self) -> bool {
        rand::thread_rng().gen::<f64>() < self.probability
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysFail;

impl FailureSource for AlwaysFail {
    fn should_fail(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NeverFail;

impl FailureSource for NeverFail {
    fn should_fail(&self) -> bool {
        false
    }
}

/// Replays a fixed sequence of outcomes, then never fails.
#[derive(Debug, Default)]
pub struct ScriptedFailures {
    script: Mutex<VecDeque<bool>>,
}

impl ScriptedFailures {
    pub fn new(script: impl IntoIterator<Item = bool>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl FailureSource for ScriptedFailures {
    fn should_fail(&self) -> bool {
        self.script
            .lock()
            .ok()
            .and_then(|mut s| s.pop_front())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_extremes() {
        let never = RandomFailure::new(0.0);
        let always = RandomFailure::new(1.0);
        for _ in 0..1000 {
            assert!(!never.should_fail());
            assert!(always.should_fail());
        }
    }

    #[test]
    fn test_random_clamps() {
        assert_eq!(RandomFailure::new(-1.0).probability, 0.0);
        assert_eq!(RandomFailure::new(7.0).probability, 1.0);
        assert_eq!(RandomFailure::new(f64::NAN).probability, 0.0);
    }

    #[test]
    fn test_random_draws_are_independent() {
        let source = RandomFailure::new(0.5);
        let fails = (0..2000).filter(|_| source.should_fail()).count();
        assert!(fails > 0 && fails < 2000);
    }

    #[test]
    fn test_scripted() {
        let source = ScriptedFailures::new([true, false, true]);
        assert!(source.should_fail());
        assert!(!source.should_fail());
        assert_eq!(source.remaining(), 1);
        assert!(source.should_fail());
        assert!(!source.should_fail());
        assert!(!source.should_fail());
    }
}
