//! Identity types for the ANIMA engine
//!
//! All identifiers are 64-bit for wire efficiency while maintaining
//! sufficient uniqueness for practical deployments.

use std::fmt;

/// Character identity - one animated avatar instance
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CharacterId(pub u64);

impl CharacterId {
    pub const ZERO: CharacterId = CharacterId(0);

    #[inline]
    pub fn new(id: u64) -> Self {
        CharacterId(id)
    }

    #[inline]
    pub fn to_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    #[inline]
    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        CharacterId(u64::from_le_bytes(bytes))
    }
}

impl fmt::Debug for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Character({:016x})", self.0)
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Request identity - assigned by the generation service per session
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RequestId(pub u64);

impl RequestId {
    #[inline]
    pub fn new(id: u64) -> Self {
        RequestId(id)
    }

    #[inline]
    pub fn to_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    #[inline]
    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        RequestId(u64::from_le_bytes(bytes))
    }
}

impl fmt::Debug for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Request({:016x})", self.0)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Turn identity - one conversational turn, allocated locally
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TurnId(pub u64);

impl TurnId {
    #[inline]
    pub fn new(id: u64) -> Self {
        TurnId(id)
    }

    #[inline]
    pub fn next(self) -> Self {
        TurnId(self.0.wrapping_add(1))
    }
}

impl fmt::Debug for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Turn({})", self.0)
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_byte_roundtrip() {
        let id = CharacterId::new(0xDEAD_BEEF_CAFE_0001);
        assert_eq!(CharacterId::from_bytes(id.to_bytes()), id);

        let rid = RequestId::new(42);
        assert_eq!(RequestId::from_bytes(rid.to_bytes()), rid);
    }

    #[test]
    fn test_turn_id_next() {
        let t = TurnId::new(7);
        assert_eq!(t.next(), TurnId::new(8));
        assert_eq!(TurnId::new(u64::MAX).next(), TurnId::new(0));
    }
}
