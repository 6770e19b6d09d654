//! Channel list limits.

use serde::Deserialize;

/// One `[[banlist]]` block.
///
/// Channels whose name matches `chan` may hold at most `limit` entries in
/// each list mode. Blocks are tried in file order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BanListLimit {
    /// Channel name glob, e.g. `#help*` or `*`.
    pub chan: String,
    /// Maximum number of entries.
    pub limit: usize,
}
