//! Which line kinds the enforcement sweep may act on.

use super::{LineType, XLine};
use bitflags::bitflags;

bitflags! {
    /// Apply policy, read once from `[xlines] apply`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ApplyPolicy: u8 {
        const GLINES = 0x01;
        const KLINES = 0x02;
        const QLINES = 0x04;
        const ZLINES = 0x08;
        /// Only permanent lines are swept; temporary ones wait for new connections.
        const PERM_ONLY = 0x10;

        const ALL_KINDS = Self::GLINES.bits() | Self::KLINES.bits() | Self::QLINES.bits() | Self::ZLINES.bits();
    }
}

impl Default for ApplyPolicy {
    fn default() -> Self {
        ApplyPolicy::ALL_KINDS
    }
}

impl ApplyPolicy {
    /// Parse one `apply` list entry.
    pub fn from_apply_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "glines" => Some(Self::GLINES),
            "klines" => Some(Self::KLINES),
            "qlines" => Some(Self::QLINES),
            "zlines" => Some(Self::ZLINES),
            "perm_only" => Some(Self::PERM_ONLY),
            _ => None,
        }
    }

    fn bit_for(line_type: LineType) -> Option<Self> {
        match line_type {
            LineType::Gline => Some(Self::GLINES),
            LineType::Kline => Some(Self::KLINES),
            LineType::Qline => Some(Self::QLINES),
            LineType::Zline => Some(Self::ZLINES),
            LineType::Eline => None,
        }
    }

    /// May the sweep apply `line` to connected users?
    pub fn allows(self, line: &XLine) -> bool {
        let Some(bit) = Self::bit_for(line.line_type()) else {
            return false;
        };
        self.contains(bit) && (!self.contains(Self::PERM_ONLY) || line.is_permanent())
    }
}
