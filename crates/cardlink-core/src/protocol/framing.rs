//! Newline framing for byte-stream channels.
//!
//! Serial ports are *stream* devices: a single read may return half a line,
//! or the tail of one line and the start of the next.  [`LineAssembler`]
//! accumulates bytes across reads and hands out complete lines one at a time.
//!
//! A line without its `\n` terminator stays buffered until a later read
//! completes it.  There is no timeout on partial lines.

use tracing::warn;

/// Default upper bound on a single buffered line (64 KiB).
pub const DEFAULT_MAX_LINE: usize = 64 * 1024;

/// Accumulates bytes and yields newline-terminated lines.
///
/// # Example
///
/// ```rust
/// use cardlink_core::LineAssembler;
///
/// let mut lines = LineAssembler::new();
/// lines.push(b"{\"id\":1}\n{\"id\"");
/// assert_eq!(lines.next_line().as_deref(), Some(&b"{\"id\":1}"[..]));
/// assert_eq!(lines.next_line(), None); // second line is still partial
/// lines.push(b":2}\n");
/// assert_eq!(lines.next_line().as_deref(), Some(&b"{\"id\":2}"[..]));
/// ```
#[derive(Debug)]
pub struct LineAssembler {
    /// Bytes received but not yet returned as a line.
    buf: Vec<u8>,
    /// Lines longer than this are dropped instead of growing the buffer.
    max_line: usize,
    /// Set after an overlong line was dropped: incoming bytes are skipped up
    /// to and including the next `\n`.
    discarding: bool,
}

impl LineAssembler {
    /// Creates an assembler with the [`DEFAULT_MAX_LINE`] limit.
    pub fn new() -> Self {
        Self::with_max_line(DEFAULT_MAX_LINE)
    }

    /// Creates an assembler that drops lines longer than `max_line` bytes.
    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buf: Vec::with_capacity(256),
            max_line: max_line.max(1),
            discarding: false,
        }
    }

    /// Appends freshly read bytes.
    pub fn push(&mut self, bytes: &[u8]) {
        let mut bytes = bytes;
        if self.discarding {
            match bytes.iter().position(|&b| b == b'\n') {
                Some(end) => {
                    bytes = &bytes[end + 1..];
                    self.discarding = false;
                }
                None => return,
            }
        }
        self.buf.extend_from_slice(bytes);
        self.enforce_limit();
    }

    /// Removes and returns the next complete line, without its `\n`.
    ///
    /// A trailing `\r` is left in place; callers trim as appropriate for the
    /// channel.  Returns `None` when no complete line is buffered.
    pub fn next_line(&mut self) -> Option<Vec<u8>> {
        let end = self.buf.iter().position(|&b| b == b'\n')?;
        // `drain(..=end)` shifts the remaining bytes to the front, which is
        // O(n) but fine for console-sized lines.
        let mut line: Vec<u8> = self.buf.drain(..=end).collect();
        line.pop();
        Some(line)
    }

    /// Number of buffered bytes that are not yet part of a returned line.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Drops everything buffered.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.discarding = false;
    }

    fn enforce_limit(&mut self) {
        // Only the unterminated tail can exceed the limit; complete lines
        // before it are still handed out normally.
        let tail_start = self
            .buf
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |i| i + 1);
        let tail_len = self.buf.len() - tail_start;
        if tail_len > self.max_line {
            warn!(
                "dropping overlong line ({tail_len} bytes buffered, limit {})",
                self.max_line
            );
            self.buf.truncate(tail_start);
            self.discarding = true;
        }
    }
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
