//! Channel list modes (ban, except, invite-exception lists).
//!
//! A [`ListModeBase`] stores one list per channel, bounded by a limit taken
//! from the first `[[banlist]]` entry whose channel glob matches. It knows
//! how to answer list queries with the mode's numerics; the channel mode
//! parser decides when to call it.

use crate::casemap::{Casemapping, irc_to_lower};
use crate::config::BanListLimit;
use crate::matching::nick_match;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// `367 RPL_BANLIST`
pub const RPL_BANLIST: u16 = 367;
/// `368 RPL_ENDOFBANLIST`
pub const RPL_ENDOFBANLIST: u16 = 368;
/// `478 ERR_BANLISTFULL`
pub const ERR_BANLISTFULL: u16 = 478;

/// Limit used when no `[[banlist]]` entry matches.
pub const DEFAULT_LIST_LIMIT: usize = 64;

/// One list entry with metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub mask: String,
    pub set_by: String,
    pub set_at: i64,
}

/// Why a list change was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListModeError {
    #[error("{mask} is already on the list")]
    AlreadyOnList { mask: String },
    #[error("{mask} is not on the list")]
    NotSet { mask: String },
    #[error("list for {channel} is full ({limit} entries)")]
    ListFull { channel: String, mask: String, limit: usize },
}

impl ListModeError {
    /// The numeric reply to send, if this refusal has one.
    pub fn numeric(&self, server: &str, nick: &str) -> Option<String> {
        match self {
            ListModeError::ListFull { channel, mask, .. } => Some(format!(
                ":{} {} {} {} {} :Channel ban list is full",
                server, ERR_BANLISTFULL, nick, channel, mask
            )),
            _ => None,
        }
    }
}

/// A per-channel list behind one mode character.
#[derive(Debug, Clone)]
pub struct ListModeBase {
    mode_char: char,
    list_numeric: u16,
    end_numeric: u16,
    end_text: String,
    /// Normalise masks to `nick!ident@host` before storing.
    tidy: bool,
    limits: Vec<BanListLimit>,
    lists: HashMap<String, Vec<ListEntry>>,
}

impl ListModeBase {
    pub fn new(
        mode_char: char,
        end_text: impl Into<String>,
        list_numeric: u16,
        end_numeric: u16,
        tidy: bool,
    ) -> Self {
        Self {
            mode_char,
            list_numeric,
            end_numeric,
            end_text: end_text.into(),
            tidy,
            limits: Vec::new(),
            lists: HashMap::new(),
        }
    }

    /// Channel mode `+b`.
    pub fn ban_list() -> Self {
        Self::new('b', "End of channel ban list", RPL_BANLIST, RPL_ENDOFBANLIST, true)
    }

    pub fn mode_char(&self) -> char {
        self.mode_char
    }

    /// Replace the configured limits.
    pub fn rehash(&mut self, limits: &[BanListLimit]) {
        self.limits = limits.to_vec();
        debug!(mode = %self.mode_char, entries = self.limits.len(), "list limits reloaded");
    }

    /// Capacity for `channel`: first matching glob wins.
    pub fn limit_for(&self, channel: &str) -> usize {
        self.limits
            .iter()
            .find(|l| nick_match(&l.chan, channel))
            .map_or(DEFAULT_LIST_LIMIT, |l| l.limit)
    }

    pub fn get_list(&self, channel: &str) -> &[ListEntry] {
        self.lists
            .get(&irc_to_lower(channel))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Add or remove `mask` on `channel`.
    ///
    /// Returns the mask as stored, after tidying, for the mode change echo.
    pub fn on_mode_change(
        &mut self,
        channel: &str,
        setter: &str,
        mask: &str,
        adding: bool,
        now: i64,
    ) -> Result<String, ListModeError> {
        let mask = if self.tidy {
            clean_mask(mask)
        } else {
            mask.to_string()
        };
        let limit = self.limit_for(channel);
        let key = irc_to_lower(channel);

        if adding {
            let list = self.lists.entry(key).or_default();
            if list.iter().any(|e| Casemapping::Rfc1459.eq(&e.mask, &mask)) {
                return Err(ListModeError::AlreadyOnList { mask });
            }
            if list.len() >= limit {
                return Err(ListModeError::ListFull {
                    channel: channel.to_string(),
                    mask,
                    limit,
                });
            }
            list.push(ListEntry {
                mask: mask.clone(),
                set_by: setter.to_string(),
                set_at: now,
            });
            return Ok(mask);
        }

        let Some(list) = self.lists.get_mut(&key) else {
            return Err(ListModeError::NotSet { mask });
        };
        let Some(pos) = list.iter().position(|e| Casemapping::Rfc1459.eq(&e.mask, &mask)) else {
            return Err(ListModeError::NotSet { mask });
        };
        let removed = list.remove(pos);
        if list.is_empty() {
            self.lists.remove(&key);
        }
        Ok(removed.mask)
    }

    /// Clear a channel's list, returning the `-x mask` changes to announce.
    pub fn remove_all(&mut self, channel: &str) -> Vec<String> {
        self.lists
            .remove(&irc_to_lower(channel))
            .unwrap_or_default()
            .into_iter()
            .map(|e| format!("-{} {}", self.mode_char, e.mask))
            .collect()
    }

    /// List entries followed by the end-of-list line.
    pub fn display_list(&self, server: &str, nick: &str, channel: &str) -> Vec<String> {
        let mut out: Vec<String> = self
            .get_list(channel)
            .iter()
            .map(|e| {
                format!(
                    ":{} {} {} {} {} {} {}",
                    server, self.list_numeric, nick, channel, e.mask, e.set_by, e.set_at
                )
            })
            .collect();
        out.push(self.display_empty_list(server, nick, channel));
        out
    }

    /// Just the end-of-list line.
    pub fn display_empty_list(&self, server: &str, nick: &str, channel: &str) -> String {
        format!(
            ":{} {} {} {} :{}",
            server, self.end_numeric, nick, channel, self.end_text
        )
    }
}

/// Normalise a ban mask to `nick!ident@host`.
///
/// `nick` → `nick!*@*`, `ident@host` → `*!ident@host`, a bare host with a
/// dot → `*!*@host`. Empty parts become `*`.
pub fn clean_mask(mask: &str) -> String {
    fn part(s: &str) -> &str {
        if s.is_empty() { "*" } else { s }
    }

    match (mask.split_once('!'), mask.split_once('@')) {
        (Some((nick, rest)), _) => match rest.split_once('@') {
            Some((ident, host)) => format!("{}!{}@{}", part(nick), part(ident), part(host)),
            None => format!("{}!{}@*", part(nick), part(rest)),
        },
        (None, Some((ident, host))) => format!("*!{}@{}", part(ident), part(host)),
        (None, None) if mask.contains('.') || mask.contains(':') => format!("*!*@{}", mask),
        (None, None) => format!("{}!*@*", part(mask)),
    }
}
