use std::fmt;

use sha2::{Digest, Sha256};

use crate::{AppError, AppResult};

/// Longest room name that still gets hashed into an identifier.
pub const MAX_NAME_LEN: usize = 32;

/// Canonical room address: 64 lowercase hex chars.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomId(String);

impl RoomId {
    /// Mint a fresh identifier for an anonymous room.
    pub fn generate() -> Self {
        let bytes: [u8; 32] = rand::random();
        Self(hex::encode(bytes))
    }

    /// Map a caller-supplied name onto a room.
    ///
    /// Canonical 64-hex strings address their room directly; anything up to
    /// [`MAX_NAME_LEN`] chars is hashed, so the same name always lands in the
    /// same room.
    pub fn resolve(name: &str) -> AppResult<Self> {
        if name.len() == 64 && name.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Ok(Self(name.to_owned()));
        }
        if name.len() <= MAX_NAME_LEN {
            return Ok(Self(hex::encode(Sha256::digest(name.as_bytes()))));
        }
        Err(AppError::NameTooLong)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_canonical(s: &str) -> bool {
        s.len() == 64 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    #[test]
    fn short_names_resolve_deterministically() {
        let a = RoomId::resolve("lobby").unwrap();
        let b = RoomId::resolve("lobby").unwrap();
        assert_eq!(a, b);
        assert!(is_canonical(a.as_str()));

        let c = RoomId::resolve("other").unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn canonical_ids_pass_through_unchanged() {
        let id = RoomId::generate();
        let resolved = RoomId::resolve(id.as_str()).unwrap();
        assert_eq!(id, resolved);
        assert_eq!(id.as_str(), resolved.as_str());
    }

    #[test]
    fn generated_ids_are_canonical_and_distinct() {
        let a = RoomId::generate();
        let b = RoomId::generate();
        assert!(is_canonical(a.as_str()));
        assert!(is_canonical(b.as_str()));
        assert_ne!(a, b);
    }

    #[test]
    fn long_names_are_rejected() {
        let name = "x".repeat(33);
        assert!(matches!(RoomId::resolve(&name), Err(AppError::NameTooLong)));

        // 64 chars but not hex: too long for hashing, not canonical either
        let name = "g".repeat(64);
        assert!(matches!(RoomId::resolve(&name), Err(AppError::NameTooLong)));
    }

    #[test]
    fn max_len_name_still_hashes() {
        let name = "y".repeat(32);
        let id = RoomId::resolve(&name).unwrap();
        assert!(is_canonical(id.as_str()));
    }

    #[test]
    fn uppercase_hex_is_not_canonical() {
        let upper = "A".repeat(64);
        assert!(matches!(RoomId::resolve(&upper), Err(AppError::NameTooLong)));
    }
}
