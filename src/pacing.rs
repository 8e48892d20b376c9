//! Fixed-interval frame pacing.

use std::thread;
use std::time::{Duration, Instant};

use log::warn;

use crate::cancel::CancelToken;
use crate::error::ConfigError;

/// Frame rate used when the source does not declare a usable one.
pub const FALLBACK_FPS: f64 = 30.0;

/// Slowest configurable pacing rate: one frame every ten seconds.
pub const MIN_FPS: f64 = 0.1;
/// Fastest configurable pacing rate.
pub const MAX_FPS: f64 = 1000.0;

/// Longest single sleep, so a cancel is noticed promptly.
const SLICE: Duration = Duration::from_millis(50);

/// `1 / fps` as a duration, or `None` when the rate cannot be turned into one.
fn period(fps: f64) -> Option<Duration> {
    if fps.is_finite() && fps > 0.0 {
        Duration::try_from_secs_f64(1.0 / fps).ok()
    } else {
        None
    }
}

/// Delay for a user-supplied pacing rate, rejecting rates outside `MIN_FPS..=MAX_FPS`.
pub fn delay_for_fps(fps: f64) -> Result<Duration, ConfigError> {
    if !(MIN_FPS..=MAX_FPS).contains(&fps) {
        return Err(ConfigError::InvalidFps(fps.to_string()));
    }
    period(fps).ok_or_else(|| ConfigError::InvalidFps(fps.to_string()))
}

/// Delay between frames.
///
/// An explicit override wins; otherwise `1 / frame_rate`, falling back to
/// `1 / fallback_fps` when the declared rate is zero, negative, not finite or
/// too small to express as a delay.
pub fn frame_delay(
    frame_rate: f64,
    override_delay: Option<Duration>,
    fallback_fps: f64,
) -> Duration {
    if let Some(delay) = override_delay {
        return delay;
    }
    if let Some(delay) = period(frame_rate) {
        return delay;
    }
    warn!(
        "source declares no usable frame rate ({}), pacing at {} fps",
        frame_rate, fallback_fps
    );
    delay_for_fps(fallback_fps)
        .unwrap_or_else(|_| Duration::from_secs_f64(1.0 / FALLBACK_FPS))
}

/// Best-effort sleeper. Drift is not corrected.
#[derive(Debug, Clone)]
pub struct Pacer {
    delay: Duration,
    cancel: CancelToken,
}

impl Pacer {
    /// Sleep `delay` per frame unless `cancel` fires.
    pub fn new(delay: Duration, cancel: CancelToken) -> Self {
        Self { delay, cancel }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Sleep for one frame delay, returning early if cancelled.
    pub fn wait(&self) {
        let deadline = Instant::now() + self.delay;
        loop {
            if self.cancel.is_cancelled() {
                return;
            }
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            thread::sleep((deadline - now).min(SLICE));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_follows_declared_rate() {
        assert_eq!(
            frame_delay(25.0, None, FALLBACK_FPS),
            Duration::from_millis(40)
        );
        let ntsc = frame_delay(30000.0 / 1001.0, None, FALLBACK_FPS);
        assert!((ntsc.as_secs_f64() - 1001.0 / 30000.0).abs() < 1e-9);
    }

    #[test]
    fn override_wins() {
        let d = Duration::from_millis(10);
        assert_eq!(frame_delay(25.0, Some(d), FALLBACK_FPS), d);
        assert_eq!(frame_delay(0.0, Some(d), FALLBACK_FPS), d);
    }

    #[test]
    fn unusable_rate_falls_back() {
        assert_eq!(frame_delay(0.0, None, 20.0), Duration::from_millis(50));
        assert_eq!(frame_delay(f64::NAN, None, 20.0), Duration::from_millis(50));
        assert_eq!(
            frame_delay(-5.0, None, 0.0),
            Duration::from_secs_f64(1.0 / FALLBACK_FPS)
        );
    }

    #[test]
    fn tiny_rates_never_panic() {
        // 1 / 1e-30 seconds does not fit in a Duration
        assert_eq!(
            frame_delay(0.0, None, 1e-30),
            Duration::from_secs_f64(1.0 / FALLBACK_FPS)
        );
        assert_eq!(frame_delay(1e-30, None, 20.0), Duration::from_millis(50));
        assert_eq!(frame_delay(f64::MIN_POSITIVE, None, 20.0), Duration::from_millis(50));
    }

    #[test]
    fn fps_outside_bounds_is_rejected() {
        assert_eq!(delay_for_fps(25.0), Ok(Duration::from_millis(40)));
        assert_eq!(delay_for_fps(MIN_FPS).unwrap().as_secs(), 10);
        assert!(delay_for_fps(MAX_FPS).is_ok());
        for fps in [1e-20, 0.0, -1.0, 1e6, f64::NAN, f64::INFINITY] {
            assert!(matches!(delay_for_fps(fps), Err(ConfigError::InvalidFps(_))), "{fps}");
        }
    }

    #[test]
    fn wait_returns_early_when_cancelled() {
        let token = CancelToken::new();
        token.cancel();
        let pacer = Pacer::new(Duration::from_secs(10), token);
        let start = Instant::now();
        pacer.wait();
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn wait_sleeps_for_the_delay() {
        let pacer = Pacer::new(Duration::from_millis(20), CancelToken::new());
        let start = Instant::now();
        pacer.wait();
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
