//! Console target implementation

use crate::core::{ConfigNode, Layout, LogEvent, LogLevel, Result, Target};
use colored::Color;
use std::io::{self, Write};

const RESET: &[u8] = b"\x1b[0m";

/// Writes one line per event to stdout, colored by level.
pub struct ConsoleTarget {
    minimum_level: LogLevel,
    layout: Layout,
    use_colors: bool,
}

impl ConsoleTarget {
    pub fn new(minimum_level: LogLevel, layout: Layout) -> Self {
        Self {
            minimum_level,
            layout,
            use_colors: true,
        }
    }

    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    /// Factory for `type="console"` lines.
    pub fn from_config(minimum_level: LogLevel, layout: Layout, _node: &ConfigNode) -> Self {
        Self::new(minimum_level, layout)
    }

    fn color_for(&self, level: LogLevel) -> Option<Color> {
        let colorize = self.use_colors && colored::control::SHOULD_COLORIZE.should_colorize();
        colorize.then(|| level.color_code())
    }
}

impl Target for ConsoleTarget {
    fn name(&self) -> &str {
        "console"
    }

    fn minimum_level(&self) -> LogLevel {
        self.minimum_level
    }

    fn layout(&self) -> &Layout {
        &self.layout
    }

    fn write(&self, event: &LogEvent, flush_after_write: bool) -> Result<()> {
        let line = self.layout.render(Some(event));
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        write_line(&mut lock, self.color_for(event.level), &line, flush_after_write)?;
        Ok(())
    }
}

/// Write `line` under `color`, restoring the default color afterwards even when the write
/// fails part way. The reset goes out before the newline, so a line-buffered stream never
/// holds it back.
pub(crate) fn write_line<W: Write>(
    out: &mut W,
    color: Option<Color>,
    line: &str,
    flush_after_write: bool,
) -> io::Result<()> {
    {
        let mut guard = ColorGuard::set(out, color)?;
        guard.write_all(line.as_bytes())?;
    }
    out.write_all(b"\n")?;
    if flush_after_write {
        out.flush()?;
    }
    Ok(())
}

/// Holds a color on the stream for its lifetime.
struct ColorGuard<'a, W: Write> {
    inner: &'a mut W,
    active: bool,
}

impl<'a, W: Write> ColorGuard<'a, W> {
    fn set(inner: &'a mut W, color: Option<Color>) -> io::Result<Self> {
        if let Some(color) = color {
            write!(inner, "\x1b[{}m", color.to_fg_str())?;
        }
        Ok(Self {
            inner,
            active: color.is_some(),
        })
    }
}

impl<W: Write> Write for ColorGuard<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: Write> Drop for ColorGuard<'_, W> {
    fn drop(&mut self) {
        if self.active {
            let _ = self.inner.write_all(RESET);
        }
    }
}
