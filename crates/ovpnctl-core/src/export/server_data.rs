// ── Server auxiliary data ──
//
// Server certificates carry a small binary record alongside them:
//
//   version  u8      (currently 1)
//   port     u16 BE
//   key_len  u32 BE
//   key      [u8; key_len]
//
// An empty blob means the certificate has no server data at all.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{CoreError, Result};

pub const SERVER_DATA_VERSION: u8 = 1;

const HEADER_LEN: usize = 1 + 2 + 4;

/// Network parameters a server certificate carries for its clients.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerData {
    pub port: u16,
    /// Raw tls-crypt key bytes; empty when the server does not use one.
    pub tls_crypt: Vec<u8>,
}

impl ServerData {
    pub fn decode(blob: &[u8]) -> Result<Option<Self>> {
        if blob.is_empty() {
            return Ok(None);
        }
        if blob.len() < HEADER_LEN {
            return Err(decode_err(format!(
                "truncated header: {} of {HEADER_LEN} bytes",
                blob.len()
            )));
        }

        let mut buf = blob;
        let version = buf.get_u8();
        if version != SERVER_DATA_VERSION {
            return Err(decode_err(format!("unsupported version {version}")));
        }
        let port = buf.get_u16();
        let key_len = usize::try_from(buf.get_u32())
            .map_err(|_| decode_err("key length overflows".into()))?;

        match buf.remaining().cmp(&key_len) {
            std::cmp::Ordering::Less => Err(decode_err(format!(
                "key truncated: {} of {key_len} bytes",
                buf.remaining()
            ))),
            std::cmp::Ordering::Greater => Err(decode_err(format!(
                "{} trailing bytes",
                buf.remaining() - key_len
            ))),
            std::cmp::Ordering::Equal => Ok(Some(Self {
                port,
                tls_crypt: buf.to_vec(),
            })),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let key_len = u32::try_from(self.tls_crypt.len()).map_err(|_| CoreError::Format {
            reason: "tls-crypt key too large to encode".into(),
        })?;
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.tls_crypt.len());
        buf.put_u8(SERVER_DATA_VERSION);
        buf.put_u16(self.port);
        buf.put_u32(key_len);
        buf.put_slice(&self.tls_crypt);
        Ok(buf.to_vec())
    }
}

fn decode_err(reason: String) -> CoreError {
    CoreError::Decode { reason }
}
