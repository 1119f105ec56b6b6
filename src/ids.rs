//! Identifier types for the chessmate server.
//!
//! The system uses three distinct 128-bit, lexicographically ordered,
//! 26-character Crockford-base32 identifier kinds: [`UserId`] (durable
//! user), [`PlayerId`] (ephemeral, one per participation in one game), and
//! [`GameId`]. Each wraps a [`ulid::Ulid`] but the three are not
//! interconvertible — using a `PlayerId` where a `GameId` is expected is a
//! compile error, not a runtime bug.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Declares a newtype wrapping [`Ulid`] with the standard parse/display/
/// serde impls. Keeps the three id kinds textually identical (26-char
/// Crockford base32) while remaining distinct at the type level.
macro_rules! ulid_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Ulid);

        impl $name {
            /// Mints a fresh, time-ordered identifier.
            pub fn new() -> Self {
                Self(Ulid::new())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ulid::DecodeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Ulid::from_str(s)?))
            }
        }
    };
}

ulid_id!(UserId);
ulid_id!(PlayerId);
ulid_id!(GameId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_display_and_parse() {
        let id = UserId::new();
        let text = id.to_string();
        assert_eq!(text.len(), 26);
        assert_eq!(UserId::from_str(&text).unwrap(), id);
    }

    #[test]
    fn distinct_kinds_are_distinct_types() {
        // This is a compile-time property: UserId and GameId have no
        // From/Into between them, so the following would not compile if
        // uncommented:
        // let _: GameId = UserId::new();
        let user = UserId::new();
        let game = GameId::new();
        assert_ne!(user.to_string(), game.to_string());
    }

    #[test]
    fn ids_generated_later_sort_later() {
        let a = UserId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = UserId::new();
        assert!(a <= b);
    }
}
