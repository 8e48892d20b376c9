//! # vidascii - terminal ASCII video player
//!
//! Decodes a video with ffmpeg, turns every frame into grayscale ASCII art
//! and repaints the console at the video's declared frame rate.
//!
//! ## Pipeline
//!
//! - decode the next RGB frame ([`FfmpegSource`])
//! - grayscale and resize to the output width, halving the height for glyph aspect
//! - map each luminance sample onto a character [`Ramp`]
//! - clear the console and draw the frame ([`Renderer`])
//! - sleep for one frame delay
//!
//! ## Example
//!
//! ```no_run
//! use std::io;
//! use std::path::Path;
//! use vidascii::{CancelToken, FfmpegConfig, FfmpegSource, Player, PlayerConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PlayerConfig::default().with_columns(100)?;
//! let mut player = Player::new(config, io::stdout(), CancelToken::new());
//! let ffmpeg = FfmpegConfig::default();
//! let outcome = player.run(|| FfmpegSource::open(Path::new("video.mp4"), &ffmpeg))?;
//! println!("{}", outcome.message());
//! # Ok(())
//! # }
//! ```
//!
//! Frames can also be converted without playing anything:
//!
//! ```
//! use image::GrayImage;
//! use vidascii::{map_frame, render::layout, Ramp};
//!
//! let frame = GrayImage::from_raw(2, 2, vec![0, 255, 128, 64]).unwrap();
//! let ascii = map_frame(&frame, &Ramp::new(" .#").unwrap());
//! assert_eq!(layout(&ascii), " #\n. ");
//! ```

pub mod cancel;
pub mod config;
pub mod error;
pub mod mapping;
pub mod pacing;
pub mod player;
pub mod render;
pub mod resize;
pub mod source;

pub use cancel::{install_interrupt_handler, CancelToken};
pub use config::{AppConfig, PlayerConfig, Preset};
pub use error::{ConfigError, PlaybackError};
pub use mapping::{map_frame, AsciiFrame, Ramp, DEFAULT_RAMP};
pub use pacing::{delay_for_fps, frame_delay, Pacer, FALLBACK_FPS, MAX_FPS, MIN_FPS};
pub use player::{
    frame_to_ascii, Outcome, PlaybackState, Player, FINISHED_MESSAGE, STOPPED_MESSAGE,
};
pub use render::Renderer;
pub use resize::{output_height, resize_luma, to_luma};
pub use source::{FfmpegConfig, FfmpegSource, FrameSource, StreamInfo};
