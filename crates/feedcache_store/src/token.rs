//! Opaque change-feed resume tokens.

use bytes::Bytes;
use std::fmt;

/// Progress marker issued by a change stream.
///
/// Subscribing with a token resumes the feed immediately after the event
/// that produced it. Only the issuing store interprets the bytes.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ResumeToken(Bytes);

impl ResumeToken {
    /// Wraps raw token bytes.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Returns the raw token bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for ResumeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResumeToken(")?;
        for byte in self.0.iter() {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_is_hex() {
        let token = ResumeToken::from_bytes(vec![0x00, 0xab, 0x10]);
        assert_eq!(format!("{token:?}"), "ResumeToken(00ab10)");
    }
}
