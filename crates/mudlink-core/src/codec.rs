//! Text codec for the line-oriented wire protocol.
//!
//! Outgoing commands are newline-terminated UTF-8. Incoming bytes are decoded
//! best-effort: invalid sequences become U+FFFD, and a multi-byte character
//! split across two reads is carried over instead of being mangled.

/// Line terminator used in both directions.
pub const LINE_TERMINATOR: char = '\n';

/// Byte sent by the keep-alive timer.
pub const KEEPALIVE_BYTE: u8 = b' ';

/// Encode an outgoing command as a single newline-terminated line.
pub fn encode_line(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len() + 1);
    bytes.extend_from_slice(text.as_bytes());
    if !text.ends_with(LINE_TERMINATOR) {
        bytes.push(LINE_TERMINATOR as u8);
    }
    bytes
}

/// Streaming UTF-8 decoder: feed raw chunks, get text back.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    /// Trailing bytes of an incomplete sequence from the previous chunk (at most 3).
    carry: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self { carry: Vec::new() }
    }

    /// Decode a chunk, replacing invalid sequences and holding back an
    /// incomplete trailing sequence for the next call.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut data = std::mem::take(&mut self.carry);
        data.extend_from_slice(chunk);

        let mut out = String::with_capacity(data.len());
        let mut rest: &[u8] = &data;

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(e) => {
                    let valid_up_to = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&rest[..valid_up_to]));
                    match e.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &rest[valid_up_to + bad..];
                        }
                        None => {
                            self.carry = rest[valid_up_to..].to_vec();
                            break;
                        }
                    }
                }
            }
        }

        out
    }

    /// Flush any held-back bytes. An unfinished sequence decodes as U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.carry.is_empty() {
            String::new()
        } else {
            self.carry.clear();
            char::REPLACEMENT_CHARACTER.to_string()
        }
    }

    /// Number of bytes currently held back.
    pub fn pending(&self) -> usize {
        self.carry.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_appends_newline() {
        assert_eq!(encode_line("look"), b"look\n");
    }

    #[test]
    fn encode_keeps_existing_newline() {
        assert_eq!(encode_line("say hi\n"), b"say hi\n");
    }

    #[test]
    fn encode_empty_is_bare_newline() {
        assert_eq!(encode_line(""), b"\n");
    }

    #[test]
    fn ascii_passes_through() {
        let mut dec = Utf8Decoder::new();
        assert_eq!(dec.decode(b"hello\n"), "hello\n");
        assert_eq!(dec.pending(), 0);
    }

    #[test]
    fn split_multibyte_is_carried() {
        // "é" = C3 A9
        let mut dec = Utf8Decoder::new();
        assert_eq!(dec.decode(b"caf\xC3"), "caf");
        assert_eq!(dec.pending(), 1);
        assert_eq!(dec.decode(b"\xA9!"), "é!");
        assert_eq!(dec.pending(), 0);
    }

    #[test]
    fn invalid_bytes_are_replaced_not_dropped() {
        let mut dec = Utf8Decoder::new();
        assert_eq!(dec.decode(b"a\xFFb"), "a\u{FFFD}b");
    }

    #[test]
    fn finish_flushes_dangling_sequence() {
        let mut dec = Utf8Decoder::new();
        assert_eq!(dec.decode(b"x\xE2\x82"), "x");
        assert_eq!(dec.finish(), "\u{FFFD}");
        assert_eq!(dec.finish(), "");
    }
}
