//! ICY wire format: metaint framing and `key='value';` frame parsing
//!
//! Everything here is pure and incremental so it can be driven by network
//! chunks of arbitrary size and unit-tested without sockets.

use std::collections::BTreeMap;

/// One parsed metadata frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcyFrame {
    /// Raw `key=value` pairs from the frame, quotes stripped
    pub fields: BTreeMap<String, String>,
}

impl IcyFrame {
    /// The track label carried by this frame, if any
    pub fn title(&self) -> Option<&str> {
        stream_title(&self.fields)
    }
}

/// Pick the conventional title field out of a parsed frame.
///
/// `StreamTitle` is the convention; `title` and `icy-name` show up on some
/// older servers.
pub fn stream_title(fields: &BTreeMap<String, String>) -> Option<&str> {
    for key in ["StreamTitle", "title", "icy-name"] {
        if let Some(v) = fields.get(key) {
            let v = v.trim();
            if !v.is_empty() {
                return Some(v);
            }
        }
    }
    None
}

/// Parse the `key='value';` pairs of a metadata block.
///
/// Values are conventionally single-quoted and may contain `;`; unquoted
/// values run to the next `;`. Trailing NUL padding is ignored. Anything
/// that does not look like a pair is skipped rather than rejected.
pub fn parse_icy_frame(block: &[u8]) -> BTreeMap<String, String> {
    let text = String::from_utf8_lossy(block);
    let text = text.trim_end_matches('\0');

    let mut fields = BTreeMap::new();
    let bytes = text.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        // Key runs to '='
        let key_start = i;
        while i < bytes.len() && bytes[i] != b'=' {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        let key = text[key_start..i].trim().to_string();
        i += 1; // skip '='

        let value = if i < bytes.len() && bytes[i] == b'\'' {
            // Quoted: value ends at "';" or at the closing quote at end of block
            i += 1;
            let val_start = i;
            loop {
                if i >= bytes.len() {
                    break text[val_start..].to_string();
                }
                if bytes[i] == b'\'' && (i + 1 >= bytes.len() || bytes[i + 1] == b';') {
                    let v = text[val_start..i].to_string();
                    i += 2; // past quote and ';'
                    break v;
                }
                i += 1;
            }
        } else {
            let val_start = i;
            while i < bytes.len() && bytes[i] != b';' {
                i += 1;
            }
            let v = text[val_start..i].to_string();
            i += 1; // past ';'
            v
        };

        if !key.is_empty() {
            fields.insert(key, value);
        }
    }

    fields
}

enum ExtractState {
    /// Skipping audio bytes until the next length byte
    Audio { remaining: usize },
    /// Accumulating a metadata block
    Meta { need: usize, buf: Vec<u8> },
}

/// Incremental extractor for metadata blocks out of an ICY byte stream.
///
/// Feed it raw network chunks; it discards audio, honours the metaint
/// cadence, and returns every complete non-empty metadata block. Survives
/// length bytes, blocks and audio runs split across chunk boundaries.
pub struct MetaExtractor {
    metaint: usize,
    state: ExtractState,
}

impl MetaExtractor {
    /// `metaint` is the server-declared audio byte count between frames
    pub fn new(metaint: usize) -> Self {
        Self {
            metaint,
            state: ExtractState::Audio { remaining: metaint },
        }
    }

    /// Consume one chunk, returning any metadata blocks completed by it
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        let mut blocks = Vec::new();
        let mut rest = chunk;

        while !rest.is_empty() {
            match &mut self.state {
                ExtractState::Audio { remaining } => {
                    if *remaining > 0 {
                        let skip = (*remaining).min(rest.len());
                        *remaining -= skip;
                        rest = &rest[skip..];
                        if rest.is_empty() {
                            break;
                        }
                    }
                    // At the cadence point: one length byte, ×16
                    let len = rest[0] as usize * 16;
                    rest = &rest[1..];
                    if len == 0 {
                        // "no change" marker
                        self.state = ExtractState::Audio {
                            remaining: self.metaint,
                        };
                    } else {
                        self.state = ExtractState::Meta {
                            need: len,
                            buf: Vec::with_capacity(len),
                        };
                    }
                }
                ExtractState::Meta { need, buf } => {
                    let take = (*need - buf.len()).min(rest.len());
                    buf.extend_from_slice(&rest[..take]);
                    rest = &rest[take..];
                    if buf.len() == *need {
                        blocks.push(std::mem::take(buf));
                        self.state = ExtractState::Audio {
                            remaining: self.metaint,
                        };
                    }
                }
            }
        }

        blocks
    }
}
