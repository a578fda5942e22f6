//! Byte-level decoding: UTF-8 text and `text/event-stream` record framing.
//!
//! Both decoders are push-based and keep their own carry-over state, so a chunk
//! boundary may fall anywhere: inside a multi-byte character, inside a line, or
//! between the two terminators of a blank-line separator.

/// Incremental UTF-8 decoder.
///
/// An incomplete multi-byte sequence at the end of a chunk is carried into the
/// next call instead of being replaced. Genuinely invalid bytes become U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `bytes`, appending the text to `out`.
    pub fn decode_into(&mut self, bytes: &[u8], out: &mut String) {
        if self.pending.is_empty() {
            let rest = Self::decode_complete(bytes, out);
            self.pending.extend_from_slice(rest);
        } else {
            let mut joined = std::mem::take(&mut self.pending);
            joined.extend_from_slice(bytes);
            let rest = Self::decode_complete(&joined, out);
            self.pending = rest.to_vec();
        }
    }

    pub fn decode(&mut self, bytes: &[u8]) -> String {
        let mut out = String::with_capacity(bytes.len());
        self.decode_into(bytes, &mut out);
        out
    }

    /// Flush at end of input: a dangling partial sequence becomes U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        let out = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        out
    }

    /// Bytes held back waiting for the rest of a character.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    // Decodes as much as possible and returns the incomplete tail.
    fn decode_complete<'a>(mut input: &'a [u8], out: &mut String) -> &'a [u8] {
        loop {
            match std::str::from_utf8(input) {
                Ok(s) => {
                    out.push_str(s);
                    return &[];
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    // `valid_up_to` guarantees this prefix is valid UTF-8.
                    out.push_str(std::str::from_utf8(&input[..valid]).unwrap_or_default());
                    match e.error_len() {
                        None => return &input[valid..],
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            input = &input[valid + len..];
                        }
                    }
                }
            }
        }
    }
}

/// One framed record, split into its fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseRecord {
    /// `event:` name, if any.
    pub event: Option<String>,
    /// `data:` lines joined with `\n`; `None` when the record had no data line.
    pub data: Option<String>,
    /// Number of `:` comment lines.
    pub comments: usize,
}

impl SseRecord {
    /// Parse a record's text (separator already removed, line endings normalised).
    pub fn parse(raw: &str) -> Self {
        let mut record = SseRecord::default();
        let mut data_lines: Vec<&str> = Vec::new();

        for line in raw.split('\n') {
            if line.is_empty() {
                continue;
            }
            if line.starts_with(':') {
                record.comments += 1;
                continue;
            }

            let (field, value) = match line.find(':') {
                Some(idx) => {
                    let value = &line[idx + 1..];
                    (&line[..idx], value.strip_prefix(' ').unwrap_or(value))
                }
                None => (line, ""),
            };

            match field {
                "data" => data_lines.push(value),
                "event" => record.event = Some(value.to_string()),
                // id/retry and unknown fields carry nothing we act on
                _ => {}
            }
        }

        if !data_lines.is_empty() {
            record.data = Some(data_lines.join("\n"));
        }
        record
    }

    pub fn is_heartbeat_only(&self) -> bool {
        self.comments > 0 && self.data.is_none() && self.event.is_none()
    }
}

/// Splits decoded text into blank-line separated records.
///
/// `\r\n` and lone `\r` are normalised to `\n` on the way in, so the separator
/// is always `\n\n` inside the buffer.
#[derive(Debug, Default)]
pub struct SseFramer {
    buffer: String,
    // Offset up to which the buffer is known not to contain a separator.
    scanned: usize,
    pending_cr: bool,
}

impl SseFramer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, text: &str) {
        self.buffer.reserve(text.len());
        for c in text.chars() {
            if self.pending_cr {
                self.pending_cr = false;
                self.buffer.push('\n');
                if c == '\n' {
                    continue;
                }
            }
            if c == '\r' {
                self.pending_cr = true;
            } else {
                self.buffer.push(c);
            }
        }
    }

    /// Take the next complete record off the front of the buffer.
    pub fn next_record(&mut self) -> Option<String> {
        // A separator may straddle the previous scan boundary; only step back
        // over an ASCII '\n' so `from` stays on a char boundary.
        let mut from = self.scanned.min(self.buffer.len());
        if from > 0 && self.buffer.as_bytes()[from - 1] == b'\n' {
            from -= 1;
        }
        match self.buffer[from..].find("\n\n") {
            Some(rel) => {
                let idx = from + rel;
                let record = self.buffer[..idx].to_string();
                self.buffer.drain(..idx + 2);
                self.scanned = 0;
                Some(record)
            }
            None => {
                self.scanned = self.buffer.len();
                None
            }
        }
    }

    /// At end of input, hand out whatever unterminated record remains.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending_cr {
            self.pending_cr = false;
            self.buffer.push('\n');
        }
        self.scanned = 0;
        let rest = std::mem::take(&mut self.buffer);
        if rest.trim().is_empty() {
            None
        } else {
            Some(rest)
        }
    }

    /// Text buffered but not yet framed.
    pub fn buffered(&self) -> &str {
        &self.buffer
    }
}
