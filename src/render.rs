//! Full-repaint console renderer.

use std::io::Write;

use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};

use crate::mapping::AsciiFrame;

/// Reflow a flat frame into `height` lines of `width` glyphs, newline separated.
pub fn layout(frame: &AsciiFrame) -> String {
    let mut out = String::with_capacity(frame.text.len() + frame.height as usize);
    for (i, row) in frame.rows().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(row);
    }
    out
}

/// Writes frames to a sink, clearing the whole surface before each one.
pub struct Renderer<W: Write> {
    out: W,
    frames_drawn: u64,
}

impl<W: Write> Renderer<W> {
    /// Render into `out`.
    pub fn new(out: W) -> Self {
        Self {
            out,
            frames_drawn: 0,
        }
    }

    /// Clear the surface, home the cursor and write `frame`, then flush.
    pub fn draw(&mut self, frame: &AsciiFrame) -> std::io::Result<()> {
        queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;
        self.out.write_all(layout(frame).as_bytes())?;
        self.out.flush()?;
        self.frames_drawn += 1;
        Ok(())
    }

    /// Frames successfully written so far.
    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    /// Give back the underlying sink.
    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(text: &str, width: u32, height: u32) -> AsciiFrame {
        AsciiFrame {
            text: text.to_string(),
            width,
            height,
        }
    }

    #[test]
    fn layout_splits_into_exact_rows() {
        let f = frame("abcdefghijkl", 4, 3);
        let text = layout(&f);
        let lines: Vec<&str> = text.split('\n').collect();
        assert_eq!(lines, vec!["abcd", "efgh", "ijkl"]);
        assert!(lines.iter().all(|l| l.len() == 4));
    }

    #[test]
    fn layout_has_no_trailing_newline() {
        let f = frame(" #. ", 2, 2);
        assert_eq!(layout(&f), " #\n. ");
    }

    #[test]
    fn draw_clears_then_writes_frame() {
        let mut renderer = Renderer::new(Vec::new());
        renderer.draw(&frame("ab", 2, 1)).unwrap();
        renderer.draw(&frame("cd", 2, 1)).unwrap();
        assert_eq!(renderer.frames_drawn(), 2);

        let out = String::from_utf8(renderer.into_inner()).unwrap();
        // Clear(All) is ESC[2J, MoveTo(0,0) is ESC[1;1H
        assert_eq!(out, "\x1b[2J\x1b[1;1Hab\x1b[2J\x1b[1;1Hcd");
    }
}
