//! Playback driver: decode, convert, draw, wait, repeat.

use std::fmt;
use std::io::Write;

use image::RgbImage;
use log::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::config::PlayerConfig;
use crate::error::PlaybackError;
use crate::mapping::{map_frame, AsciiFrame};
use crate::pacing::{frame_delay, Pacer};
use crate::render::Renderer;
use crate::resize::{resize_luma, to_luma};
use crate::source::FrameSource;

pub const FINISHED_MESSAGE: &str = "Video playback finished.";
pub const STOPPED_MESSAGE: &str = "Playback stopped by user.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Opening,
    Playing,
    Finished,
    Stopped,
    Failed,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Opening => "opening",
            PlaybackState::Playing => "playing",
            PlaybackState::Finished => "finished",
            PlaybackState::Stopped => "stopped",
            PlaybackState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// How a run ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The source ran out of frames.
    Finished { frames: u64 },
    /// The cancel token was set during playback.
    Stopped { frames: u64 },
}

impl Outcome {
    pub fn frames(&self) -> u64 {
        match self {
            Outcome::Finished { frames } | Outcome::Stopped { frames } => *frames,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Outcome::Finished { .. } => FINISHED_MESSAGE,
            Outcome::Stopped { .. } => STOPPED_MESSAGE,
        }
    }
}

/// Closes the wrapped source exactly once, when dropped.
struct SourceGuard<S: FrameSource> {
    source: S,
}

impl<S: FrameSource> Drop for SourceGuard<S> {
    fn drop(&mut self) {
        if let Err(e) = self.source.close() {
            warn!("releasing video source: {}", e);
        }
    }
}

/// Grayscale, resize and map one decoded frame.
pub fn frame_to_ascii(
    frame: &RgbImage,
    config: &PlayerConfig,
) -> Result<AsciiFrame, PlaybackError> {
    let luma = resize_luma(to_luma(frame), config.columns)?;
    Ok(map_frame(&luma, &config.ramp))
}

pub struct Player<W: Write> {
    config: PlayerConfig,
    renderer: Renderer<W>,
    cancel: CancelToken,
    state: PlaybackState,
}

impl<W: Write> Player<W> {
    /// An idle player that draws into `out`.
    pub fn new(config: PlayerConfig, out: W, cancel: CancelToken) -> Self {
        Self {
            config,
            renderer: Renderer::new(out),
            cancel,
            state: PlaybackState::Idle,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn renderer(&self) -> &Renderer<W> {
        &self.renderer
    }

    /// Consume the player and return its sink.
    pub fn into_output(self) -> W {
        self.renderer.into_inner()
    }

    fn transition(&mut self, next: PlaybackState) {
        info!("playback {} -> {}", self.state, next);
        self.state = next;
    }

    /// Open a source with `open`, then play it to the end.
    pub fn run<S, F>(&mut self, open: F) -> Result<Outcome, PlaybackError>
    where
        S: FrameSource,
        F: FnOnce() -> Result<S, PlaybackError>,
    {
        self.transition(PlaybackState::Opening);
        let source = match open() {
            Ok(source) => source,
            Err(e) => {
                self.transition(PlaybackState::Failed);
                return Err(e);
            }
        };
        self.play(source)
    }

    /// Play an already opened source. The source is closed on every exit path.
    pub fn play<S: FrameSource>(&mut self, source: S) -> Result<Outcome, PlaybackError> {
        let mut guard = SourceGuard { source };
        self.transition(PlaybackState::Playing);

        let result = self.play_loop(&mut guard.source);
        self.transition(match &result {
            Ok(Outcome::Finished { .. }) => PlaybackState::Finished,
            Ok(Outcome::Stopped { .. }) => PlaybackState::Stopped,
            Err(_) => PlaybackState::Failed,
        });
        if let Ok(outcome) = &result {
            info!("{} frames drawn", outcome.frames());
        }
        result
    }

    fn play_loop<S: FrameSource>(&mut self, source: &mut S) -> Result<Outcome, PlaybackError> {
        let info = source.info().clone();
        let delay = frame_delay(
            info.frame_rate,
            self.config.frame_delay,
            self.config.fallback_fps,
        );
        debug!(
            "source {}x{} @ {:.3} fps, {} columns, {:?} per frame",
            info.width, info.height, info.frame_rate, self.config.columns, delay
        );
        let pacer = Pacer::new(delay, self.cancel.clone());
        let mut frames = 0u64;

        loop {
            if self.cancel.is_cancelled() {
                return Ok(Outcome::Stopped { frames });
            }

            let next = source.next_frame();
            // Ctrl+C also reaches the decoder, which may then fail; that is still a stop.
            if self.cancel.is_cancelled() {
                return Ok(Outcome::Stopped { frames });
            }
            let Some(rgb) = next? else {
                return Ok(Outcome::Finished { frames });
            };

            let ascii = frame_to_ascii(&rgb, &self.config)?;
            self.renderer.draw(&ascii)?;
            frames += 1;
            pacer.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn converts_frame_to_configured_width() {
        let config = PlayerConfig::default().with_columns(40).unwrap();
        let frame = RgbImage::from_pixel(320, 240, Rgb([255, 255, 255]));
        let ascii = frame_to_ascii(&frame, &config).unwrap();
        assert_eq!(ascii.width, 40);
        assert_eq!(ascii.height, 15);
        assert_eq!(ascii.text.len(), 40 * 15);
        assert!(ascii.text.chars().all(|c| c == '@'));
    }

    #[test]
    fn black_frame_is_blank() {
        let config = PlayerConfig::default().with_columns(10).unwrap();
        let frame = RgbImage::new(20, 20);
        let ascii = frame_to_ascii(&frame, &config).unwrap();
        assert_eq!(ascii.text, " ".repeat(10 * 5));
    }

    #[test]
    fn outcome_messages_differ() {
        assert_ne!(
            Outcome::Finished { frames: 1 }.message(),
            Outcome::Stopped { frames: 1 }.message()
        );
        assert_eq!(Outcome::Stopped { frames: 7 }.frames(), 7);
    }
}
