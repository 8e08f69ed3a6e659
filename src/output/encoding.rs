// src/output/encoding.rs

//! Decoding of raw process output into canonical text.

use std::fmt;

use encoding_rs::{CoderResult, Decoder, Encoding, UTF_8};

use crate::errors::{KeepaliveError, Result};

/// Decodes bytes from one fixed source encoding.
///
/// The encoding is configured, never sniffed: a mismatch produces garbled
/// text (malformed sequences become U+FFFD) but is not an error.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    encoding: &'static Encoding,
}

impl Normalizer {
    pub fn new(encoding: &'static Encoding) -> Self {
        Self { encoding }
    }

    /// Look up a WHATWG encoding label such as `"utf-8"` or `"gbk"`.
    ///
    /// An empty label selects UTF-8.
    pub fn from_label(label: &str) -> Result<Self> {
        if label.trim().is_empty() {
            return Ok(Self::default());
        }
        Encoding::for_label(label.trim().as_bytes())
            .map(Self::new)
            .ok_or_else(|| KeepaliveError::ConfigError(format!("unknown encoding '{label}'")))
    }

    pub fn encoding_name(&self) -> &'static str {
        self.encoding.name()
    }

    /// Decode `raw` and strip trailing CR/LF characters.
    pub fn normalize(&self, raw: &[u8]) -> String {
        let (text, _had_errors) = self.encoding.decode_without_bom_handling(raw);
        text.trim_end_matches(['\r', '\n']).to_string()
    }

    /// Incremental decoder for one stream of this encoding.
    pub fn stream_decoder(&self) -> StreamDecoder {
        StreamDecoder {
            decoder: self.encoding.new_decoder_without_bom_handling(),
        }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(UTF_8)
    }
}

/// Decodes a byte stream that arrives in arbitrary pieces.
///
/// A multibyte sequence cut at the end of one piece is held back and
/// completed by the next one. Only the last piece reports a dangling
/// sequence as U+FFFD.
pub struct StreamDecoder {
    decoder: Decoder,
}

impl StreamDecoder {
    /// Decode `raw`; `last` marks the end of the stream.
    ///
    /// Line terminators are kept; trimming happens per emission.
    pub fn decode(&mut self, raw: &[u8], last: bool) -> String {
        let mut text = String::new();
        let mut src = raw;
        loop {
            let needed = self
                .decoder
                .max_utf8_buffer_length(src.len())
                .unwrap_or(src.len() * 4 + 16);
            text.reserve(needed);

            let (result, read, _had_errors) = self.decoder.decode_to_string(src, &mut text, last);
            src = &src[read..];
            match result {
                CoderResult::InputEmpty => break,
                CoderResult::OutputFull => continue,
            }
        }
        text
    }
}

impl fmt::Debug for StreamDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamDecoder")
            .field("encoding", &self.decoder.encoding().name())
            .finish()
    }
}
