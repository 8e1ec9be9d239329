//! Monitor loop — the repeating capture/compare/notify cycle and the
//! retained previous frame it compares against.

use crate::capture::{Frame, FrameSource};
use crate::config::MonitorConfig;
use crate::detect::{self, DiffError, DifferenceScore};
use crate::notify::{NotificationRequest, Notifier};
use std::time::Duration;
use tracing::{debug, info, warn};

/// What a single cycle did. Logged, and the main observation point for tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// First successful capture; baseline retained, nothing compared.
    Bootstrapped,
    /// Change below the threshold.
    Quiet(DifferenceScore),
    /// Change at or above the threshold, notification delivered.
    Notified(DifferenceScore),
    /// Change at or above the threshold but delivery failed.
    NotifyFailed(DifferenceScore),
    /// Capture failed; previous frame retained for the next attempt.
    CaptureSkipped,
    /// Capture resolution changed mid-run; stale baseline discarded and the
    /// current frame retained as the new one, without notifying.
    Rebaselined,
}

/// Owns the cycle state: the previous frame, the cadence, and the threshold.
/// One instance drives the whole process; no other flow of control touches
/// its state.
pub struct MonitorLoop<S, N> {
    source: S,
    notifier: N,
    check_interval: Duration,
    pixel_diff_threshold: u64,
    previous: Option<Frame>,
}

impl<S: FrameSource, N: Notifier> MonitorLoop<S, N> {
    pub fn new(source: S, notifier: N, config: &MonitorConfig) -> Self {
        Self {
            source,
            notifier,
            check_interval: Duration::from_secs(config.check_interval_secs),
            pixel_diff_threshold: config.pixel_diff_threshold,
            previous: None,
        }
    }

    /// Run one cycle: capture, compare against the retained frame, notify on
    /// significant change, retain the current frame. Capture and delivery
    /// failures are absorbed here so the cadence never breaks.
    pub async fn tick(&mut self) -> CycleOutcome {
        let current = match self.source.capture() {
            Ok(frame) => frame,
            Err(e) => {
                warn!("capture failed, skipping cycle: {e}");
                return CycleOutcome::CaptureSkipped;
            }
        };

        let previous = match self.previous.take() {
            Some(frame) => frame,
            None => {
                info!(
                    width = current.width(),
                    height = current.height(),
                    "first screenshot captured, monitoring started"
                );
                self.previous = Some(current);
                return CycleOutcome::Bootstrapped;
            }
        };

        let outcome = match detect::diff(&previous, &current) {
            Ok(score) if score >= self.pixel_diff_threshold => {
                info!(score, "significant change detected");
                let request = NotificationRequest::screen_change(score, current.clone());
                match self.notifier.notify(request).await {
                    Ok(()) => CycleOutcome::Notified(score),
                    Err(e) => {
                        warn!("notification delivery failed: {e}");
                        CycleOutcome::NotifyFailed(score)
                    }
                }
            }
            Ok(score) => {
                debug!(score, "no significant change");
                CycleOutcome::Quiet(score)
            }
            Err(e @ DiffError::DimensionMismatch { .. }) => {
                warn!("{e}; discarding stale baseline");
                CycleOutcome::Rebaselined
            }
        };

        // Detection is always against the immediately preceding frame,
        // whatever this cycle decided.
        self.previous = Some(current);
        outcome
    }

    /// Drive the loop indefinitely. Process termination is the only exit.
    pub async fn run(&mut self) {
        loop {
            self.tick().await;
            tokio::time::sleep(self.check_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureError;
    use crate::notify::DeliveryError;
    use async_trait::async_trait;
    use image::{Rgba, RgbaImage};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    const THRESHOLD: u64 = 1000;

    fn test_config() -> MonitorConfig {
        MonitorConfig {
            check_interval_secs: 0,
            pixel_diff_threshold: THRESHOLD,
        }
    }

    fn black(width: u32, height: u32) -> Frame {
        Frame::new(RgbaImage::from_pixel(
            width,
            height,
            Rgba([0, 0, 0, 255]),
        ))
    }

    /// A copy of `base` with the first `n` pixels (row-major) turned white.
    fn with_white_pixels(base: &Frame, n: u32) -> Frame {
        let mut img = base.pixels().clone();
        let width = img.width();
        for i in 0..n {
            img.put_pixel(i % width, i / width, Rgba([255, 255, 255, 255]));
        }
        Frame::new(img)
    }

    struct ScriptedSource {
        frames: VecDeque<Result<Frame, CaptureError>>,
    }

    impl ScriptedSource {
        fn new(frames: Vec<Result<Frame, CaptureError>>) -> Self {
            Self {
                frames: frames.into(),
            }
        }
    }

    impl FrameSource for ScriptedSource {
        fn capture(&mut self) -> Result<Frame, CaptureError> {
            self.frames.pop_front().expect("scripted frames exhausted")
        }
    }

    #[derive(Clone, Default)]
    struct RecordingNotifier {
        sent: Arc<Mutex<Vec<NotificationRequest>>>,
        fail: bool,
    }

    impl RecordingNotifier {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn sent(&self) -> Vec<NotificationRequest> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, request: NotificationRequest) -> Result<(), DeliveryError> {
            self.sent.lock().unwrap().push(request);
            if self.fail {
                Err(DeliveryError::Encode(image::ImageError::IoError(
                    std::io::Error::other("injected delivery failure"),
                )))
            } else {
                Ok(())
            }
        }
    }

    fn monitor(
        frames: Vec<Result<Frame, CaptureError>>,
        notifier: RecordingNotifier,
    ) -> MonitorLoop<ScriptedSource, RecordingNotifier> {
        MonitorLoop::new(ScriptedSource::new(frames), notifier, &test_config())
    }

    #[tokio::test]
    async fn first_cycle_never_notifies() {
        let notifier = RecordingNotifier::default();
        // A frame way past the threshold: still no notification on bootstrap.
        let noisy = with_white_pixels(&black(64, 64), 4000);
        let mut m = monitor(vec![Ok(noisy)], notifier.clone());

        assert_eq!(m.tick().await, CycleOutcome::Bootstrapped);
        assert!(notifier.sent().is_empty());
        assert!(m.previous.is_some());
    }

    #[tokio::test]
    async fn score_below_threshold_stays_quiet() {
        let base = black(64, 64);
        let below = with_white_pixels(&base, (THRESHOLD - 1) as u32);
        let notifier = RecordingNotifier::default();
        let mut m = monitor(vec![Ok(base), Ok(below)], notifier.clone());

        m.tick().await;
        assert_eq!(m.tick().await, CycleOutcome::Quiet(THRESHOLD - 1));
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn score_at_threshold_notifies() {
        let base = black(64, 64);
        let at = with_white_pixels(&base, THRESHOLD as u32);
        let notifier = RecordingNotifier::default();
        let mut m = monitor(vec![Ok(base), Ok(at)], notifier.clone());

        m.tick().await;
        assert_eq!(m.tick().await, CycleOutcome::Notified(THRESHOLD));
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn capture_error_retains_previous_frame() {
        let base = black(64, 64);
        let changed = with_white_pixels(&base, 2000);
        let notifier = RecordingNotifier::default();
        let mut m = monitor(
            vec![
                Ok(base),
                Err(CaptureError::Backend("display unavailable".to_string())),
                Ok(changed),
            ],
            notifier.clone(),
        );

        assert_eq!(m.tick().await, CycleOutcome::Bootstrapped);
        assert_eq!(m.tick().await, CycleOutcome::CaptureSkipped);
        // The baseline survived the failed cycle, so the next capture is
        // still compared against the first black frame.
        assert_eq!(m.tick().await, CycleOutcome::Notified(2000));
    }

    #[tokio::test]
    async fn delivery_failure_still_advances_baseline() {
        let base = black(64, 64);
        let changed = with_white_pixels(&base, 2000);
        let same_again = with_white_pixels(&base, 2000);
        let notifier = RecordingNotifier::failing();
        let mut m = monitor(
            vec![Ok(base), Ok(changed), Ok(same_again)],
            notifier.clone(),
        );

        m.tick().await;
        assert_eq!(m.tick().await, CycleOutcome::NotifyFailed(2000));
        // Baseline advanced to the changed frame despite the failed send:
        // an identical follow-up frame scores zero.
        assert_eq!(m.tick().await, CycleOutcome::Quiet(0));
    }

    #[tokio::test]
    async fn resolution_change_rebaselines_without_notifying() {
        let notifier = RecordingNotifier::default();
        let small = black(32, 32);
        let small_again = black(32, 32);
        let mut m = monitor(
            vec![Ok(black(64, 64)), Ok(small), Ok(small_again)],
            notifier.clone(),
        );

        m.tick().await;
        assert_eq!(m.tick().await, CycleOutcome::Rebaselined);
        assert!(notifier.sent().is_empty());
        // The mismatched frame became the new baseline.
        assert_eq!(m.tick().await, CycleOutcome::Quiet(0));
    }

    #[tokio::test]
    async fn identical_frames_end_to_end() {
        let notifier = RecordingNotifier::default();
        let mut m = monitor(vec![Ok(black(64, 64)), Ok(black(64, 64))], notifier.clone());

        m.tick().await;
        assert_eq!(m.tick().await, CycleOutcome::Quiet(0));
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn white_patch_end_to_end() {
        let base = black(64, 64);
        let patched = with_white_pixels(&base, 2000);
        let expected_pixels = patched.pixels().clone();
        let notifier = RecordingNotifier::default();
        let mut m = monitor(vec![Ok(base), Ok(patched)], notifier.clone());

        m.tick().await;
        let outcome = m.tick().await;
        assert!(matches!(outcome, CycleOutcome::Notified(score) if score >= 1000));

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].message.contains("2000"), "{}", sent[0].message);
        assert_eq!(*sent[0].frame.pixels(), expected_pixels);
    }
}
