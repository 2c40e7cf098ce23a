#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

/// Player identifier, index-based. Seat order is turn order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct PlayerId(pub u8);

/// Game object identifier.
///
/// Objects are the sources of triggered abilities and replacement effects.
/// Fresh ids come from `GameState::allocate_object_id`, so a restored
/// checkpoint hands out the same ids again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct ObjectId(pub u64);

impl PlayerId {
    /// Create a player ID from a seat index.
    pub fn from_index(index: u8) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl ObjectId {
    /// Create an object ID from a specific value (for when you need explicit control).
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "P{}", self.0)
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_from_index() {
        let p1 = PlayerId::from_index(5);
        let p2 = PlayerId::from_index(10);
        assert_eq!(p1.index(), 5);
        assert_eq!(p2.index(), 10);
        assert!(p1 < p2);
        assert_eq!(p1.to_string(), "P5");
    }

    #[test]
    fn test_object_id_from_raw() {
        let o1 = ObjectId::from_raw(100);
        assert_eq!(o1.0, 100);
        assert_eq!(o1.to_string(), "#100");
    }
}
