//! Framing of initial context tokens (RFC 2743, section 3.1).
//!
//! Callers that hand tokens over as streams are inconsistent about the outer header: when the inner
//! token length is known, the header was already consumed and has to be put back before the engine
//! sees the token. When it isn't known, the only readable shape is a complete token held in memory.
use std::io::Read;

use crate::{
    der::{self, TAG_OID},
    oid::Oid,
};

/// `[APPLICATION 0]`, the tag of every initial context token
pub const GSS_TOKEN_TAG: u8 = 0x60;

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("premature end of stream: expected {expected} token bytes, got {actual}")]
    EndOfStream { expected: usize, actual: usize },
    #[error("streaming token reads of unknown length are not supported")]
    Unavailable,
    #[error("malformed token header: {0}")]
    Malformed(&'static str),
    #[error("failed to read token")]
    Io(#[from] std::io::Error),
}

/// Where a token is read from
pub enum TokenInput<'a, R> {
    /// A complete input already held in memory
    Buffered(&'a [u8]),
    /// A stream of unknown total length
    Stream(R),
}
impl<'a> TokenInput<'a, std::io::Empty> {
    pub fn buffered(bytes: &'a [u8]) -> Self {
        Self::Buffered(bytes)
    }
}

/// Read one token for `mechanism`.
///
/// With `token_len` set, the header is rebuilt and exactly `token_len` inner bytes are read. Without
/// it, the whole buffered input is the token.
pub fn read_token<R: Read>(
    mechanism: &Oid,
    input: TokenInput<'_, R>,
    token_len: Option<usize>,
) -> Result<Vec<u8>, FrameError> {
    match (token_len, input) {
        (Some(len), input) => {
            // the declared length is untrusted until that many bytes were read
            let payload = read_exactly(input, len)?;
            let mut token = FramedToken::header(mechanism, payload.len());
            token.extend_from_slice(&payload);
            Ok(token)
        }
        (None, TokenInput::Buffered(bytes)) => Ok(bytes.to_vec()),
        (None, TokenInput::Stream(_)) => Err(FrameError::Unavailable),
    }
}

fn read_exactly<R: Read>(input: TokenInput<'_, R>, len: usize) -> Result<Vec<u8>, FrameError> {
    if len == 0 {
        return Ok(Vec::new());
    }
    match input {
        TokenInput::Buffered(bytes) => bytes.get(..len).map(<[u8]>::to_vec).ok_or(FrameError::EndOfStream {
            expected: len,
            actual: bytes.len(),
        }),
        TokenInput::Stream(stream) => {
            let mut buffer = Vec::new();
            stream.take(len as u64).read_to_end(&mut buffer)?;
            if buffer.len() < len {
                return Err(FrameError::EndOfStream {
                    expected: len,
                    actual: buffer.len(),
                });
            }
            Ok(buffer)
        }
    }
}

/// A mechanism token wrapped in the generic GSS header
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FramedToken {
    mechanism: Oid,
    payload: Vec<u8>,
}
impl FramedToken {
    pub fn new(mechanism: Oid, payload: Vec<u8>) -> Self {
        Self { mechanism, payload }
    }
    pub fn mechanism(&self) -> &Oid {
        &self.mechanism
    }
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
    /// The header for a payload of `payload_len` bytes
    pub fn header(mechanism: &Oid, payload_len: usize) -> Vec<u8> {
        let oid = mechanism.to_der();
        let mut oid_tlv = vec![TAG_OID];
        der::write_length(&mut oid_tlv, oid.len());
        oid_tlv.extend_from_slice(&oid);

        let mut header = vec![GSS_TOKEN_TAG];
        der::write_length(&mut header, oid_tlv.len() + payload_len);
        header.extend_from_slice(&oid_tlv);
        header
    }
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Self::header(&self.mechanism, self.payload.len());
        out.extend_from_slice(&self.payload);
        out
    }
    pub fn decode(token: &[u8]) -> Result<Self, FrameError> {
        let Some((&GSS_TOKEN_TAG, rest)) = token.split_first() else {
            return Err(FrameError::Malformed("missing [APPLICATION 0] tag"));
        };
        let (declared, length_octets) = der::read_length(rest).ok_or(FrameError::Malformed("bad token length"))?;
        let inner = &rest[length_octets..];
        if inner.len() != declared {
            return Err(FrameError::Malformed("declared length does not match token size"));
        }
        let Some((&TAG_OID, rest)) = inner.split_first() else {
            return Err(FrameError::Malformed("missing mechanism identifier"));
        };
        let (oid_len, length_octets) = der::read_length(rest).ok_or(FrameError::Malformed("bad mechanism length"))?;
        let rest = &rest[length_octets..];
        let oid = rest
            .get(..oid_len)
            .ok_or(FrameError::Malformed("truncated mechanism identifier"))?;
        let mechanism = Oid::from_der(oid).map_err(|_| FrameError::Malformed("invalid mechanism identifier"))?;
        Ok(Self {
            mechanism,
            payload: rest[oid_len..].to_vec(),
        })
    }
}
