use std::{
    collections::VecDeque,
    io::{self, Stdout, Write},
};

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event, execute, queue,
    style::PrintStyledContent,
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use unicode_width::UnicodeWidthChar;

use crate::{
    error::TuiError,
    input::Input,
    renderer::{RenderFrame, RenderLine},
};

/// Size reported by buffered terminals.
const BUFFER_SIZE: (u16, u16) = (80, 24);

/// Represents the concrete output target the terminal backend writes to.
#[derive(Debug)]
enum TerminalTarget {
    Stdout {
        handle: Stdout,
        raw_mode: bool,
        alternate_screen: bool,
        cursor_hidden: bool,
    },
    Buffer {
        output: Vec<u8>,
        script: VecDeque<Input>,
    },
}

impl TerminalTarget {
    fn stdout() -> Result<Self, TuiError> {
        let mut handle = io::stdout();
        terminal::enable_raw_mode()?;
        execute!(handle, EnterAlternateScreen, Hide)?;
        Ok(Self::Stdout {
            handle,
            raw_mode: true,
            alternate_screen: true,
            cursor_hidden: true,
        })
    }

    const fn buffered(script: VecDeque<Input>) -> Self {
        Self::Buffer {
            output: Vec::new(),
            script,
        }
    }

    fn write_frame(&mut self, frame: &RenderFrame) -> Result<(), TuiError> {
        match self {
            Self::Stdout { handle, .. } => {
                let (columns, rows) = terminal::size()?;
                queue!(handle, MoveTo(0, 0), Clear(ClearType::All))?;
                for (row, line) in frame.lines().iter().take(usize::from(rows)).enumerate() {
                    let row = u16::try_from(row).unwrap_or(u16::MAX);
                    queue!(handle, MoveTo(0, row))?;
                    write_line_stdout(handle, line, usize::from(columns))?;
                }
                handle.flush()?;
                Ok(())
            }
            Self::Buffer { output, .. } => {
                output.clear();
                for (row, line) in frame.lines().iter().enumerate() {
                    if row > 0 {
                        output.extend_from_slice(b"\n");
                    }
                    write_line_buffer(output, line);
                }
                Ok(())
            }
        }
    }

    fn read_input(&mut self) -> Result<Option<Input>, TuiError> {
        match self {
            Self::Stdout { .. } => loop {
                if let Some(input) = Input::from_event(&event::read()?) {
                    return Ok(Some(input));
                }
            },
            Self::Buffer { script, .. } => Ok(script.pop_front()),
        }
    }
}

impl Drop for TerminalTarget {
    fn drop(&mut self) {
        if let Self::Stdout {
            handle,
            raw_mode,
            alternate_screen,
            cursor_hidden,
        } = self
        {
            if *cursor_hidden {
                let _ = execute!(handle, Show);
            }
            if *alternate_screen {
                let _ = execute!(handle, LeaveAlternateScreen);
            }
            if *raw_mode {
                let _ = terminal::disable_raw_mode();
            }
        }
    }
}

fn write_line_stdout(handle: &mut Stdout, line: &RenderLine, columns: usize) -> Result<(), TuiError> {
    let mut remaining = columns;
    for segment in line.segments() {
        if remaining == 0 {
            break;
        }
        let (content, width) = fit_to_width(segment.content(), remaining);
        remaining -= width;
        queue!(handle, PrintStyledContent(segment.style().apply(content)))?;
    }
    Ok(())
}

fn write_line_buffer(buffer: &mut Vec<u8>, line: &RenderLine) {
    for segment in line.segments() {
        buffer.extend_from_slice(segment.content().as_bytes());
    }
}

/// Cuts `content` to at most `columns` display cells.
fn fit_to_width(content: &str, columns: usize) -> (&str, usize) {
    let mut width = 0;
    for (offset, c) in content.char_indices() {
        let cell = c.width().unwrap_or(0);
        if width + cell > columns {
            return (&content[..offset], width);
        }
        width += cell;
    }
    (content, width)
}

/// Thin wrapper around the concrete terminal output target.
#[derive(Debug)]
pub struct Terminal {
    target: TerminalTarget,
}

impl Terminal {
    /// Creates a terminal bound to the process `stdout` handle, enabling raw mode
    /// and entering the alternate screen buffer. Both are restored on drop.
    ///
    /// # Errors
    ///
    /// Returns an error when the terminal cannot be switched to raw mode.
    pub fn stdout() -> Result<Self, TuiError> {
        Ok(Self {
            target: TerminalTarget::stdout()?,
        })
    }

    /// Creates an in-memory terminal with no scripted input.
    #[must_use]
    pub const fn buffered() -> Self {
        Self {
            target: TerminalTarget::buffered(VecDeque::new()),
        }
    }

    /// Creates an in-memory terminal that replays `inputs` in order.
    #[must_use]
    pub fn scripted(inputs: impl IntoIterator<Item = Input>) -> Self {
        Self {
            target: TerminalTarget::buffered(inputs.into_iter().collect()),
        }
    }

    /// Returns the terminal size as `(columns, rows)`.
    ///
    /// # Errors
    ///
    /// Returns an error when the size of a real terminal cannot be queried.
    pub fn size(&self) -> Result<(u16, u16), TuiError> {
        match self.target {
            TerminalTarget::Stdout { .. } => Ok(terminal::size()?),
            TerminalTarget::Buffer { .. } => Ok(BUFFER_SIZE),
        }
    }

    /// Renders a frame to the terminal.
    ///
    /// # Errors
    ///
    /// Returns an error when writing to the terminal fails.
    pub fn render(&mut self, frame: &RenderFrame) -> Result<(), TuiError> {
        self.target.write_frame(frame)
    }

    /// Waits for the next input.
    ///
    /// Buffered terminals return `None` once their script is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error when reading terminal events fails.
    pub fn read_input(&mut self) -> Result<Option<Input>, TuiError> {
        self.target.read_input()
    }

    /// Returns the last frame written to a buffered terminal.
    #[must_use]
    pub fn snapshot(&self) -> Option<&str> {
        match &self.target {
            TerminalTarget::Buffer { output, .. } => core::str::from_utf8(output).ok(),
            TerminalTarget::Stdout { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::RenderSegment;

    #[test]
    fn wide_characters_are_not_split() {
        assert_eq!(fit_to_width("héllo", 3), ("hél", 3));
        assert_eq!(fit_to_width("日本語", 5), ("日本", 4));
        assert_eq!(fit_to_width("ok", 10), ("ok", 2));
    }

    #[test]
    fn buffered_terminal_keeps_last_frame() {
        let mut terminal = Terminal::scripted([Input::Tab]);
        let mut frame = RenderFrame::default();
        frame.push_line(0).push(RenderSegment::plain("first"));
        frame.push_line(1).push(RenderSegment::plain("second"));
        terminal.render(&frame).expect("render should succeed");

        assert_eq!(terminal.snapshot(), Some("first\n  second"));
        assert_eq!(terminal.read_input().expect("read should succeed"), Some(Input::Tab));
        assert_eq!(terminal.read_input().expect("read should succeed"), None);
    }
}
