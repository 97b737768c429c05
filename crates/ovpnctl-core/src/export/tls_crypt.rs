// ── tls-crypt static key block ──
//
// OpenVPN embeds the 2048-bit control channel key inline as 16 lines
// of 32 lowercase hex characters between fixed markers.

use std::fmt::Write;

use crate::error::{CoreError, Result};

pub const KEY_LEN: usize = 256;
const BYTES_PER_LINE: usize = 16;

const BEGIN: &str = "-----BEGIN OpenVPN Static key V1-----";
const END: &str = "-----END OpenVPN Static key V1-----";

const PREAMBLE: &str = "\
# DoS protection for TLS control channel
# encrypts & HMACs control channel with this symmetric key.
# Shared between server & clients.
<tls-crypt>
";

/// Render key bytes as an inline `<tls-crypt>` block.
pub fn format(key: &[u8]) -> Result<String> {
    if key.len() != KEY_LEN {
        return Err(CoreError::Format {
            reason: format!("expected {KEY_LEN} key bytes, got {}", key.len()),
        });
    }

    let mut out = String::with_capacity(PREAMBLE.len() + KEY_LEN * 2 + 128);
    out.push_str(PREAMBLE);
    out.push_str(BEGIN);
    out.push('\n');
    for line in key.chunks(BYTES_PER_LINE) {
        for byte in line {
            let _ = write!(out, "{byte:02x}");
        }
        out.push('\n');
    }
    out.push_str(END);
    out.push_str("\n</tls-crypt>\n");
    Ok(out)
}

/// Read the key bytes back out of a static key file or inline block.
pub fn parse(text: &str) -> Result<Vec<u8>> {
    let mut hex = String::new();
    let mut inside = false;

    for line in text.lines().map(str::trim) {
        if line == BEGIN {
            inside = true;
        } else if line == END && inside {
            return decode_hex(&hex);
        } else if inside {
            hex.push_str(line);
        }
    }

    Err(CoreError::Format {
        reason: "no complete static key block found".into(),
    })
}

fn decode_hex(hex: &str) -> Result<Vec<u8>> {
    let bad = |reason: String| CoreError::Format { reason };

    if hex.len() != KEY_LEN * 2 {
        return Err(bad(format!(
            "expected {} hex characters, got {}",
            KEY_LEN * 2,
            hex.len()
        )));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            hex.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| bad(format!("invalid hex at offset {i}")))
        })
        .collect()
}
