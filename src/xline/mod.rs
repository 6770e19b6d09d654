//! Network ban lines (X-lines).
//!
//! # Line Types
//!
//! | Tag | Kind   | Matches on    | Effect                         |
//! |-----|--------|---------------|--------------------------------|
//! | `G` | G-Line | ident@host    | Network-wide disconnect        |
//! | `K` | K-Line | ident@host    | Local disconnect               |
//! | `E` | E-Line | ident@host    | Exempts from G/K/Z/Q-lines     |
//! | `Z` | Z-Line | IP / CIDR     | Disconnect, checked before DNS |
//! | `Q` | Q-Line | nickname glob | Nick reservation               |
//!
//! Lines are built by a [`FactoryRegistry`], owned by the [`XLineManager`],
//! and enforced in bulk against the [`UserTable`](crate::state::UserTable).

mod factory;
mod kinds;
mod manager;
mod observer;
mod policy;

pub use factory::{
    ElineFactory, FactoryRegistry, GlineFactory, KlineFactory, QlineFactory, XLineFactory,
    ZlineFactory,
};
pub use kinds::{LineKind, UserHostMask, XLine};
pub use manager::{LineMap, Origin, XLineManager};
pub use observer::{LinkMessage, LinkObserver, XLineObserver};
pub use policy::ApplyPolicy;

use crate::error::XLineError;

/// The one-character type tag of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LineType {
    Gline,
    Kline,
    Eline,
    Zline,
    Qline,
}

impl LineType {
    /// Every built-in type, in check order for STATS listings.
    pub const ALL: [LineType; 5] = [
        LineType::Gline,
        LineType::Kline,
        LineType::Eline,
        LineType::Zline,
        LineType::Qline,
    ];

    pub const fn as_char(self) -> char {
        match self {
            LineType::Gline => 'G',
            LineType::Kline => 'K',
            LineType::Eline => 'E',
            LineType::Zline => 'Z',
            LineType::Qline => 'Q',
        }
    }

    /// Parse a tag. Lowercase is accepted.
    pub const fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'G' => Some(LineType::Gline),
            'K' => Some(LineType::Kline),
            'E' => Some(LineType::Eline),
            'Z' => Some(LineType::Zline),
            'Q' => Some(LineType::Qline),
            _ => None,
        }
    }

    /// Display name, e.g. `G-Line`.
    pub const fn label(self) -> &'static str {
        match self {
            LineType::Gline => "G-Line",
            LineType::Kline => "K-Line",
            LineType::Eline => "E-Line",
            LineType::Zline => "Z-Line",
            LineType::Qline => "Q-Line",
        }
    }

    /// Quit-reason prefix, e.g. `G-Lined`.
    pub const fn lined(self) -> &'static str {
        match self {
            LineType::Gline => "G-Lined",
            LineType::Kline => "K-Lined",
            LineType::Eline => "E-Lined",
            LineType::Zline => "Z-Lined",
            LineType::Qline => "Q-Lined",
        }
    }

    /// The STATS reply numeric conventionally used for this type.
    pub const fn stats_numeric(self) -> u16 {
        match self {
            LineType::Kline => 216,
            LineType::Qline => 217,
            LineType::Gline | LineType::Eline | LineType::Zline => 223,
        }
    }
}

impl std::fmt::Display for LineType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl TryFrom<char> for LineType {
    type Error = XLineError;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        LineType::from_char(c).ok_or(XLineError::UnknownType(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip() {
        for t in LineType::ALL {
            assert_eq!(LineType::from_char(t.as_char()), Some(t));
        }
        assert_eq!(LineType::try_from('z'), Ok(LineType::Zline));
        assert_eq!(LineType::try_from('R'), Err(XLineError::UnknownType('R')));
    }

    #[test]
    fn labels() {
        assert_eq!(LineType::Gline.to_string(), "G-Line");
        assert_eq!(LineType::Zline.lined(), "Z-Lined");
        assert_eq!(LineType::Kline.stats_numeric(), 216);
    }
}
