//! Consecutive-frame debounce over per-frame EAR observations
//!
//! A single low-EAR frame is usually a blink. Only a run of
//! `consecutive_frames` low frames with a face present is reported as
//! drowsy. Any other observation ends the run.

use tracing::{debug, info};

use crate::analysis::{DetectionMessage, DetectionResult};
use crate::state::{EyePhase, EyeState, Observation};
use crate::DmsConfig;

/// Per-session drowsiness state machine
#[derive(Debug, Clone, Default)]
pub struct EyeStateTracker {
    state: EyeState,
}

impl EyeStateTracker {
    pub fn new(config: &DmsConfig) -> Self {
        Self {
            state: EyeState::new(config),
        }
    }

    /// Apply one observation and report the resulting classification
    pub fn update(&mut self, observation: Observation) -> DetectionResult {
        let before = self.state.phase();

        let result = match observation {
            Observation::NoFace => {
                self.state.consecutive_low_ear_count = 0;
                DetectionResult {
                    ear: None,
                    frames_below: 0,
                    drowsy: false,
                    message: DetectionMessage::NoFace,
                    error: None,
                }
            }
            Observation::Face { ear } => {
                if ear < self.state.ear_threshold {
                    self.state.consecutive_low_ear_count =
                        self.state.consecutive_low_ear_count.saturating_add(1);
                } else {
                    self.state.consecutive_low_ear_count = 0;
                }
                DetectionResult {
                    ear: Some(round_ear(ear)),
                    frames_below: self.state.consecutive_low_ear_count,
                    drowsy: self.state.is_drowsy(),
                    message: DetectionMessage::Ok,
                    error: None,
                }
            }
        };

        let after = self.state.phase();
        if before != after {
            match after {
                EyePhase::Drowsy => info!(
                    "Drowsiness detected after {} low-EAR frames",
                    self.state.consecutive_low_ear_count
                ),
                _ => debug!("Eye phase {:?} -> {:?}", before, after),
            }
        }

        result
    }

    pub fn phase(&self) -> EyePhase {
        self.state.phase()
    }

    pub fn state(&self) -> &EyeState {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state.reset();
    }
}

fn round_ear(ear: f32) -> f32 {
    (ear * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const LOW: Observation = Observation::Face { ear: 0.20 };
    const OPEN: Observation = Observation::Face { ear: 0.30 };

    fn tracker() -> EyeStateTracker {
        EyeStateTracker::new(&DmsConfig {
            ear_threshold: 0.25,
            consecutive_frames: 15,
            ..Default::default()
        })
    }

    #[test]
    fn test_blink_run_shorter_than_required_resets() {
        let mut tracker = tracker();
        for i in 1..=14 {
            let result = tracker.update(LOW);
            assert_eq!(result.frames_below, i);
            assert!(!result.drowsy);
        }
        assert_eq!(tracker.phase(), EyePhase::Accumulating);

        let result = tracker.update(OPEN);
        assert!(!result.drowsy);
        assert_eq!(result.frames_below, 0);
        assert_eq!(tracker.phase(), EyePhase::Alert);
    }

    #[test]
    fn test_drowsy_from_required_frame_onward() {
        let mut tracker = tracker();
        for _ in 1..15 {
            assert!(!tracker.update(LOW).drowsy);
        }
        for i in 15..40 {
            let result = tracker.update(LOW);
            assert!(result.drowsy, "frame {} should be drowsy", i);
            assert_eq!(result.frames_below, i);
        }
        assert_eq!(tracker.phase(), EyePhase::Drowsy);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let mut tracker = tracker();
        tracker.update(LOW);
        let result = tracker.update(Observation::Face { ear: 0.25 });
        assert_eq!(result.frames_below, 0);
    }

    #[test]
    fn test_no_face_resets_at_any_count() {
        let mut tracker = tracker();
        for _ in 0..20 {
            tracker.update(LOW);
        }
        assert_eq!(tracker.phase(), EyePhase::Drowsy);

        let result = tracker.update(Observation::NoFace);
        assert_eq!(result.message, DetectionMessage::NoFace);
        assert_eq!(result.frames_below, 0);
        assert!(!result.drowsy);
        assert_eq!(result.ear, None);
        assert_eq!(tracker.state().consecutive_low_ear_count, 0);
    }

    #[test]
    fn test_ear_is_rounded_for_reporting_only() {
        let mut tracker = tracker();
        // rounds up to 0.25 but is still below the threshold
        let result = tracker.update(Observation::Face { ear: 0.249_99 });
        assert_eq!(result.ear, Some(0.25));
        assert_eq!(result.frames_below, 1);
    }

    fn observation() -> impl Strategy<Value = Observation> {
        prop_oneof![
            (0.0f32..0.5).prop_map(|ear| Observation::Face { ear }),
            Just(Observation::NoFace),
        ]
    }

    proptest! {
        #[test]
        fn counter_equals_current_low_run(
            observations in proptest::collection::vec(observation(), 0..200),
            required in 1u32..30,
        ) {
            let config = DmsConfig { consecutive_frames: required, ..Default::default() };
            let mut tracker = EyeStateTracker::new(&config);
            let mut run = 0u32;

            for obs in observations {
                run = match obs {
                    Observation::Face { ear } if ear < config.ear_threshold => run + 1,
                    _ => 0,
                };
                let result = tracker.update(obs);
                prop_assert_eq!(result.frames_below, run);
                prop_assert_eq!(result.drowsy, run >= required);
                prop_assert_eq!(tracker.state().consecutive_low_ear_count, run);
            }
        }
    }
}
