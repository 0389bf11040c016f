//! Multiplexed log stream decoding and the per-view log buffer.
//!
//! The engine interleaves stdout and stderr as frames: an 8-byte header
//! (stream tag, three reserved bytes, big-endian payload length) followed by
//! the payload. Each frame with a non-blank payload becomes one [`LogLine`].

use chrono::{DateTime, Utc};

pub const HEADER_LEN: usize = 8;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum StreamKind {
    Stdin,
    Stdout,
    Stderr,
    Other(u8),
}

impl StreamKind {
    pub fn from_tag(tag: u8) -> Self {
        match tag {
            0 => Self::Stdin,
            1 => Self::Stdout,
            2 => Self::Stderr,
            other => Self::Other(other),
        }
    }

    pub fn tag(self) -> u8 {
        match self {
            Self::Stdin => 0,
            Self::Stdout => 1,
            Self::Stderr => 2,
            Self::Other(tag) => tag,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LogLine {
    pub index: usize,
    pub stream: StreamKind,
    pub timestamp: Option<DateTime<Utc>>,
    pub raw: String,
}

impl LogLine {
    fn parse(stream: StreamKind, raw: &str) -> Self {
        let timestamp = raw
            .split_once(' ')
            .map(|(head, _)| head)
            .unwrap_or(raw)
            .parse::<DateTime<Utc>>()
            .ok();
        Self {
            index: 0,
            stream,
            timestamp,
            raw: raw.to_string(),
        }
    }
}

pub fn encode_frame(stream: StreamKind, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.push(stream.tag());
    out.extend_from_slice(&[0, 0, 0]);
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// Decodes every whole frame in `bytes` and returns the undecoded suffix.
/// The payload is trimmed; embedded newlines stay inside the one line.
pub fn decode(bytes: &[u8]) -> (Vec<LogLine>, &[u8]) {
    let mut lines = Vec::new();
    let mut offset = 0;
    while bytes.len() - offset >= HEADER_LEN {
        let header = &bytes[offset..offset + HEADER_LEN];
        let length = u32::from_be_bytes([header[4], header[5], header[6], header[7]]) as usize;
        let Some(end) = (offset + HEADER_LEN).checked_add(length) else {
            break;
        };
        if end > bytes.len() {
            break;
        }
        let stream = StreamKind::from_tag(header[0]);
        let payload = String::from_utf8_lossy(&bytes[offset + HEADER_LEN..end]);
        let payload = payload.trim();
        if !payload.is_empty() {
            lines.push(LogLine::parse(stream, payload));
        }
        offset = end;
    }
    for (index, line) in lines.iter_mut().enumerate() {
        line.index = index;
    }
    (lines, &bytes[offset..])
}

/// Resumable wrapper over [`decode`] for input that arrives in chunks.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    pending: Vec<u8>,
    decoded: usize,
}

impl FrameDecoder {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<LogLine> {
        self.pending.extend_from_slice(chunk);
        let (mut lines, residual) = decode(&self.pending);
        let consumed = self.pending.len() - residual.len();
        self.pending.drain(..consumed);
        for line in &mut lines {
            line.index += self.decoded;
        }
        self.decoded += lines.len();
        lines
    }

    pub fn residual(&self) -> &[u8] {
        &self.pending
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Decoded {
    pub lines: Vec<LogLine>,
    pub truncated: bool,
}

impl Decoded {
    /// Framing damage only matters to the user when nothing survived it.
    pub fn is_malformed(&self) -> bool {
        self.truncated && self.lines.is_empty()
    }
}

/// Decodes a complete response body. A trailing partial frame is dropped.
pub fn decode_all(bytes: &[u8]) -> Decoded {
    let mut decoder = FrameDecoder::default();
    let lines = decoder.push(bytes);
    Decoded {
        truncated: !decoder.residual().is_empty(),
        lines,
    }
}

/// Newest record timestamp seen so far. Never moves backwards.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct LogCursor(Option<DateTime<Utc>>);

impl LogCursor {
    pub fn get(self) -> Option<DateTime<Utc>> {
        self.0
    }

    pub fn observe(&mut self, timestamp: DateTime<Utc>) {
        if self.0.is_none_or(|current| timestamp > current) {
            self.0 = Some(timestamp);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogBuffer {
    lines: Vec<LogLine>,
    cursor: LogCursor,
}

impl LogBuffer {
    pub fn from_batch(lines: Vec<LogLine>) -> Self {
        let mut buffer = Self::default();
        buffer.extend(lines);
        buffer
    }

    /// Appends a follow response. Records older than the cursor are ignored,
    /// and the boundary record repeated by the engine is dropped once.
    pub fn append_follow(&mut self, lines: Vec<LogLine>) -> usize {
        let since = self.cursor.get();
        let mut incoming = lines
            .into_iter()
            .filter(|line| match (since, line.timestamp) {
                (Some(since), Some(timestamp)) => timestamp >= since,
                _ => true,
            })
            .peekable();
        if let (Some(first), Some(last)) = (incoming.peek(), self.lines.last())
            && first.raw == last.raw
        {
            incoming.next();
        }
        let before = self.lines.len();
        self.extend(incoming);
        self.lines.len() - before
    }

    fn extend(&mut self, lines: impl IntoIterator<Item = LogLine>) {
        for mut line in lines {
            line.index = self.lines.len();
            if let Some(timestamp) = line.timestamp {
                self.cursor.observe(timestamp);
            }
            self.lines.push(line);
        }
    }

    pub fn lines(&self) -> &[LogLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.lines.len().saturating_sub(1)
    }

    pub fn cursor(&self) -> LogCursor {
        self.cursor
    }
}

#[cfg(test)]
pub(crate) fn framed(lines: &[&str]) -> Vec<u8> {
    lines
        .iter()
        .flat_map(|line| encode_frame(StreamKind::Stdout, format!("{line}\n").as_bytes()))
        .collect()
}
