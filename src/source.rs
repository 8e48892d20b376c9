//! Video frame sources.
//!
//! [`FfmpegSource`] drives an `ffmpeg` child process that decodes the file to
//! raw `rgb24` frames on its stdout; `ffprobe` supplies the frame size and the
//! declared frame rate up front.

use std::collections::VecDeque;
use std::io::{self, BufRead, BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, ChildStdout, Command as ProcCommand, Stdio};
use std::thread::{self, JoinHandle};

use image::RgbImage;
use log::{debug, warn};
use serde::Deserialize;

use crate::error::PlaybackError;

/// Geometry and timing of a video stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    /// Declared frames per second; zero when the container declares none.
    pub frame_rate: f64,
}

/// Something that yields decoded frames until end-of-stream.
pub trait FrameSource {
    /// Size and declared frame rate of the stream.
    fn info(&self) -> &StreamInfo;

    /// Next decoded frame, or `None` at end-of-stream.
    fn next_frame(&mut self) -> Result<Option<RgbImage>, PlaybackError>;

    /// Release the underlying decoder.
    fn close(&mut self) -> Result<(), PlaybackError>;
}

/// Locations of the ffmpeg binaries. `None` means look them up on `PATH`.
#[derive(Debug, Clone, Default)]
pub struct FfmpegConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
}

impl FfmpegConfig {
    /// The ffmpeg binary to run.
    pub fn ffmpeg_cmd(&self) -> &Path {
        self.ffmpeg_path.as_deref().unwrap_or(Path::new("ffmpeg"))
    }

    /// The ffprobe binary to run.
    pub fn ffprobe_cmd(&self) -> &Path {
        self.ffprobe_path.as_deref().unwrap_or(Path::new("ffprobe"))
    }
}

#[derive(Debug, Deserialize)]
struct ProbeReport {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
}

/// Parse an ffprobe rate such as `30000/1001` or `25`. `0/0` yields zero.
pub fn parse_rate(s: &str) -> Option<f64> {
    let s = s.trim();
    match s.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                Some(0.0)
            } else {
                Some(num / den)
            }
        }
        None => s.parse().ok(),
    }
}

/// Extract stream info from `ffprobe -of json` output.
pub fn parse_probe(json: &str) -> Result<StreamInfo, PlaybackError> {
    let report: ProbeReport = serde_json::from_str(json)
        .map_err(|e| PlaybackError::Probe(format!("parsing ffprobe json: {}", e)))?;
    let stream = report
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| PlaybackError::Probe("no video stream found".to_string()))?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        (w, h) => {
            return Err(PlaybackError::Probe(format!(
                "video stream has no usable size ({:?}x{:?})",
                w, h
            )))
        }
    };

    let declared = stream
        .r_frame_rate
        .as_deref()
        .and_then(parse_rate)
        .filter(|r| *r > 0.0);
    let frame_rate = declared
        .or_else(|| stream.avg_frame_rate.as_deref().and_then(parse_rate))
        .unwrap_or(0.0);

    Ok(StreamInfo {
        width,
        height,
        frame_rate,
    })
}

fn probe(path: &Path, ffmpeg: &FfmpegConfig) -> Result<StreamInfo, String> {
    let mut cmd = ProcCommand::new(ffmpeg.ffprobe_cmd());
    cmd.arg("-v")
        .arg("error")
        .arg("-select_streams")
        .arg("v:0")
        .arg("-show_entries")
        .arg("stream=width,height,r_frame_rate,avg_frame_rate")
        .arg("-of")
        .arg("json")
        .arg(path);
    debug!("running {:?}", cmd);

    let output = cmd
        .output()
        .map_err(|e| format!("running {}: {}", ffmpeg.ffprobe_cmd().display(), e))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("ffprobe failed ({}): {}", output.status, stderr.trim()));
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_probe(&stdout).map_err(|e| e.to_string())
}

/// How many trailing ffmpeg stderr lines are kept for error reports.
const STDERR_TAIL_LINES: usize = 20;
/// Longest stderr line kept, in bytes.
const STDERR_LINE_MAX: usize = 512;

/// Drain ffmpeg's stderr so it can never block on a full pipe, keeping the last few lines.
fn spawn_stderr_drain(stderr: ChildStderr) -> JoinHandle<Vec<String>> {
    thread::spawn(move || {
        let reader = BufReader::new(stderr);
        let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
        for line in reader.split(b'\n') {
            let Ok(line) = line else { break };
            let keep = &line[..line.len().min(STDERR_LINE_MAX)];
            let text = String::from_utf8_lossy(keep).trim_end().to_string();
            if text.is_empty() {
                continue;
            }
            debug!("[ffmpeg] {}", text);
            if tail.len() == STDERR_TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(text);
        }
        tail.into_iter().collect()
    })
}

/// Decodes a video file by streaming raw frames out of an ffmpeg child.
pub struct FfmpegSource {
    path: PathBuf,
    info: StreamInfo,
    child: Child,
    stdout: BufReader<ChildStdout>,
    stderr_drain: Option<JoinHandle<Vec<String>>>,
    frame_len: usize,
    reaped: bool,
}

impl FfmpegSource {
    /// Probe `path` and start decoding it.
    ///
    /// Every failure here is reported as [`PlaybackError::SourceOpen`].
    pub fn open(path: &Path, ffmpeg: &FfmpegConfig) -> Result<Self, PlaybackError> {
        let open_err = |reason: String| PlaybackError::SourceOpen {
            path: path.to_path_buf(),
            reason,
        };

        if !path.is_file() {
            return Err(open_err("no such file".to_string()));
        }

        let info = probe(path, ffmpeg).map_err(open_err)?;
        debug!(
            "{}: {}x{} @ {:.3} fps",
            path.display(),
            info.width,
            info.height,
            info.frame_rate
        );

        let mut cmd = ProcCommand::new(ffmpeg.ffmpeg_cmd());
        cmd.arg("-loglevel")
            .arg("error")
            .arg("-nostdin")
            .arg("-i")
            .arg(path)
            .arg("-an")
            .arg("-f")
            .arg("rawvideo")
            .arg("-pix_fmt")
            .arg("rgb24")
            .arg("-")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        debug!("running {:?}", cmd);

        let mut child = cmd.spawn().map_err(|e| {
            open_err(format!("running {}: {}", ffmpeg.ffmpeg_cmd().display(), e))
        })?;
        let stderr_drain = child.stderr.take().map(spawn_stderr_drain);
        let stdout = match child.stdout.take() {
            Some(out) => out,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(open_err("ffmpeg stdout was not captured".to_string()));
            }
        };

        let frame_len = info.width as usize * info.height as usize * 3;
        Ok(Self {
            path: path.to_path_buf(),
            info,
            child,
            stdout: BufReader::new(stdout),
            stderr_drain,
            frame_len,
            reaped: false,
        })
    }

    /// Path of the video being decoded.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait for the stderr reader to hit EOF and hand back what it kept.
    fn join_stderr(&mut self) -> Vec<String> {
        match self.stderr_drain.take() {
            Some(handle) => handle.join().unwrap_or_default(),
            None => Vec::new(),
        }
    }

    /// Reap ffmpeg after its stdout hit EOF and surface a failed exit.
    fn finish(&mut self) -> Result<(), PlaybackError> {
        let status = self.child.wait()?;
        self.reaped = true;
        let stderr = self.join_stderr();
        if status.success() {
            return Ok(());
        }
        Err(PlaybackError::Decoder(format!(
            "ffmpeg exited with {}: {}",
            status,
            stderr.join("\n")
        )))
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("releasing ffmpeg for {}: {}", self.path.display(), e);
        }
    }
}

/// Fill `buf` completely, returning how many bytes were read before EOF.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

impl FrameSource for FfmpegSource {
    fn info(&self) -> &StreamInfo {
        &self.info
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>, PlaybackError> {
        if self.reaped {
            return Ok(None);
        }
        let mut buf = vec![0u8; self.frame_len];
        let got = read_full(&mut self.stdout, &mut buf)?;
        if got == 0 {
            self.finish()?;
            return Ok(None);
        }
        if got < self.frame_len {
            return Err(PlaybackError::TruncatedFrame {
                expected: self.frame_len,
                got,
            });
        }
        RgbImage::from_raw(self.info.width, self.info.height, buf)
            .map(Some)
            .ok_or_else(|| {
                PlaybackError::Decoder("frame buffer does not match stream size".to_string())
            })
    }

    /// Kill and reap ffmpeg. Safe to call more than once.
    fn close(&mut self) -> Result<(), PlaybackError> {
        if self.reaped {
            return Ok(());
        }
        if let Err(e) = self.child.kill() {
            // Already exited on its own.
            if e.kind() != ErrorKind::InvalidInput {
                warn!("killing ffmpeg for {}: {}", self.path.display(), e);
            }
        }
        self.child.wait()?;
        self.reaped = true;
        self.join_stderr();
        Ok(())
    }
}
