use std::io::Read;

use bytes::Bytes;

use crate::error::{Result, SourceError};

/// A producer byte stream feeding one multiplexer port. Implements `Read`.
///
/// This is the type every source constructor returns, so a scheduler can
/// drive file, stdin and synthetic producers the same way.
pub struct SourceStream {
    inner: SourceStreamInner,
}

enum SourceStreamInner {
    File(std::fs::File),
    Stdin(std::io::Stdin),
    Pattern(PatternReader),
    Zero { remaining: Option<u64> },
}

struct PatternReader {
    pattern: Bytes,
    pos: usize,
    remaining: Option<u64>,
}

impl Read for SourceStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            SourceStreamInner::File(file) => file.read(buf),
            SourceStreamInner::Stdin(stdin) => stdin.read(buf),
            SourceStreamInner::Pattern(pattern) => Ok(pattern.fill(buf)),
            SourceStreamInner::Zero { remaining } => {
                let n = limit(buf.len(), remaining);
                buf[..n].fill(0);
                Ok(n)
            }
        }
    }
}

impl SourceStream {
    pub(crate) fn from_file(file: std::fs::File) -> Self {
        Self {
            inner: SourceStreamInner::File(file),
        }
    }

    /// Read from the process's standard input.
    pub fn stdin() -> Self {
        Self {
            inner: SourceStreamInner::Stdin(std::io::stdin()),
        }
    }

    /// Repeat `pattern` forever, or for `limit` bytes in total.
    pub fn pattern(pattern: impl Into<Bytes>, limit: Option<u64>) -> Result<Self> {
        let pattern = pattern.into();
        if pattern.is_empty() {
            return Err(SourceError::EmptyPattern);
        }
        Ok(Self {
            inner: SourceStreamInner::Pattern(PatternReader {
                pattern,
                pos: 0,
                remaining: limit,
            }),
        })
    }

    /// Zero bytes forever, or for `limit` bytes in total.
    pub fn zeros(limit: Option<u64>) -> Self {
        Self {
            inner: SourceStreamInner::Zero { remaining: limit },
        }
    }

    /// Short description for diagnostics.
    pub fn kind(&self) -> &'static str {
        match &self.inner {
            SourceStreamInner::File(_) => "file",
            SourceStreamInner::Stdin(_) => "stdin",
            SourceStreamInner::Pattern(_) => "pattern",
            SourceStreamInner::Zero { .. } => "zero",
        }
    }

    /// True for sources that never reach end-of-stream on their own.
    pub fn is_unbounded(&self) -> bool {
        match &self.inner {
            SourceStreamInner::Pattern(pattern) => pattern.remaining.is_none(),
            SourceStreamInner::Zero { remaining } => remaining.is_none(),
            SourceStreamInner::File(_) | SourceStreamInner::Stdin(_) => false,
        }
    }
}

impl PatternReader {
    fn fill(&mut self, buf: &mut [u8]) -> usize {
        let n = limit(buf.len(), &mut self.remaining);
        for byte in &mut buf[..n] {
            *byte = self.pattern[self.pos];
            self.pos = (self.pos + 1) % self.pattern.len();
        }
        n
    }
}

/// Clamp a read of `want` bytes to the remaining budget and charge it.
fn limit(want: usize, remaining: &mut Option<u64>) -> usize {
    match remaining {
        Some(left) => {
            let n = want.min(usize::try_from(*left).unwrap_or(usize::MAX));
            *left -= n as u64;
            n
        }
        None => want,
    }
}

impl std::fmt::Debug for SourceStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceStream")
            .field("type", &self.kind())
            .finish()
    }
}
