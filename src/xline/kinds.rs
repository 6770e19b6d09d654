//! The line record and its five kinds.

use super::LineType;
use super::manager::LineMap;
use crate::casemap::Casemapping;
use crate::matching::{host_match, ident_split, match_cidr, match_user_mask, nick_match};
use crate::state::{User, UserTable};
use tracing::debug;

/// The ident and host halves of a G/K/E-line, plus their joined form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserHostMask {
    pub identmask: String,
    pub hostmask: String,
    /// `identmask@hostmask`, the store key.
    pub matchtext: String,
}

impl UserHostMask {
    pub fn new(identmask: impl Into<String>, hostmask: impl Into<String>) -> Self {
        let identmask = identmask.into();
        let hostmask = hostmask.into();
        let matchtext = format!("{identmask}@{hostmask}");
        Self {
            identmask,
            hostmask,
            matchtext,
        }
    }

    /// Build from `ident@host` text; a missing ident becomes `*`.
    pub fn parse(mask: &str) -> Self {
        let (ident, host) = ident_split(mask);
        Self::new(ident, host)
    }

    /// The host half is tried against both the hostname and the IP.
    fn matches_user(&self, user: &User) -> bool {
        host_match(&self.identmask, &user.ident)
            && (match_cidr(&user.host, &self.hostmask)
                || match_cidr(&user.ip_string(), &self.hostmask))
    }
}

/// Kind-specific matching data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Gline(UserHostMask),
    Kline(UserHostMask),
    Eline(UserHostMask),
    Zline { ipaddr: String },
    Qline { nick: String },
}

/// One ban line.
///
/// The kind and pattern are fixed at construction. Only the set time (and
/// with it the expiry) may be rewritten afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XLine {
    set_time: i64,
    duration: i64,
    expiry: i64,
    source: String,
    reason: String,
    kind: LineKind,
}

impl XLine {
    fn build(
        set_time: i64,
        duration: i64,
        source: impl Into<String>,
        reason: impl Into<String>,
        kind: LineKind,
    ) -> Self {
        Self {
            set_time,
            duration,
            expiry: set_time.saturating_add(duration),
            source: source.into(),
            reason: reason.into(),
            kind,
        }
    }

    pub fn gline(
        set_time: i64,
        duration: i64,
        source: impl Into<String>,
        reason: impl Into<String>,
        ident: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self::build(set_time, duration, source, reason, LineKind::Gline(UserHostMask::new(ident, host)))
    }

    pub fn kline(
        set_time: i64,
        duration: i64,
        source: impl Into<String>,
        reason: impl Into<String>,
        ident: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self::build(set_time, duration, source, reason, LineKind::Kline(UserHostMask::new(ident, host)))
    }

    pub fn eline(
        set_time: i64,
        duration: i64,
        source: impl Into<String>,
        reason: impl Into<String>,
        ident: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self::build(set_time, duration, source, reason, LineKind::Eline(UserHostMask::new(ident, host)))
    }

    /// Any `ident@` prefix on `ipaddr` is dropped.
    pub fn zline(
        set_time: i64,
        duration: i64,
        source: impl Into<String>,
        reason: impl Into<String>,
        ipaddr: impl AsRef<str>,
    ) -> Self {
        let ipaddr = strip_ident(ipaddr.as_ref()).to_string();
        Self::build(set_time, duration, source, reason, LineKind::Zline { ipaddr })
    }

    pub fn qline(
        set_time: i64,
        duration: i64,
        source: impl Into<String>,
        reason: impl Into<String>,
        nick: impl Into<String>,
    ) -> Self {
        let nick = nick.into();
        Self::build(set_time, duration, source, reason, LineKind::Qline { nick })
    }

    pub fn line_type(&self) -> LineType {
        match self.kind {
            LineKind::Gline(_) => LineType::Gline,
            LineKind::Kline(_) => LineType::Kline,
            LineKind::Eline(_) => LineType::Eline,
            LineKind::Zline { .. } => LineType::Zline,
            LineKind::Qline { .. } => LineType::Qline,
        }
    }

    pub fn kind(&self) -> &LineKind {
        &self.kind
    }

    pub fn set_time(&self) -> i64 {
        self.set_time
    }

    pub fn duration(&self) -> i64 {
        self.duration
    }

    /// `set_time + duration`. Meaningless for permanent lines.
    pub fn expiry(&self) -> i64 {
        self.expiry
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn is_permanent(&self) -> bool {
        self.duration == 0
    }

    /// The exact pattern string this line is stored under.
    pub fn pattern(&self) -> &str {
        match &self.kind {
            LineKind::Gline(m) | LineKind::Kline(m) | LineKind::Eline(m) => &m.matchtext,
            LineKind::Zline { ipaddr } => ipaddr,
            LineKind::Qline { nick } => nick,
        }
    }

    /// Operator-facing pattern text.
    pub fn displayable(&self) -> &str {
        self.pattern()
    }

    /// Rewrite the set time, e.g. when a peer's burst carries an older one.
    pub fn set_create_time(&mut self, set_time: i64) {
        self.set_time = set_time;
        self.expiry = set_time.saturating_add(self.duration);
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        !self.is_permanent() && self.expiry <= now
    }

    /// Does this line match a live user?
    pub fn matches(&self, user: &User) -> bool {
        match &self.kind {
            LineKind::Gline(m) | LineKind::Kline(m) => !user.exempt && m.matches_user(user),
            LineKind::Eline(m) => m.matches_user(user),
            LineKind::Zline { ipaddr } => !user.exempt && match_cidr(&user.ip_string(), ipaddr),
            LineKind::Qline { nick } => !user.exempt && nick_match(nick, &user.nick),
        }
    }

    /// Wildcard-aware match of raw text (`ident@host`, an IP, a nick).
    pub fn matches_mask(&self, text: &str) -> bool {
        match &self.kind {
            LineKind::Gline(m) | LineKind::Kline(m) | LineKind::Eline(m) => {
                match_user_mask(text, &m.matchtext)
            }
            LineKind::Zline { ipaddr } => match_cidr(strip_ident(text), ipaddr),
            LineKind::Qline { nick } => nick_match(nick, text),
        }
    }

    /// Exact pattern equality, no wildcard expansion.
    pub fn matches_literal(&self, text: &str) -> bool {
        match &self.kind {
            LineKind::Gline(m) | LineKind::Kline(m) | LineKind::Eline(m) => {
                m.matchtext.eq_ignore_ascii_case(text)
            }
            LineKind::Zline { ipaddr } => ipaddr.eq_ignore_ascii_case(strip_ident(text)),
            LineKind::Qline { nick } => Casemapping::Rfc1459.eq(nick, text),
        }
    }

    /// Enforce against one connected user. E-lines do nothing.
    ///
    /// Returns whether a disconnect was queued.
    pub fn apply(&self, uid: &str, users: &mut UserTable) -> bool {
        match self.kind {
            LineKind::Eline(_) => false,
            _ => users.disconnect(uid, self),
        }
    }

    /// Hook run once the line is stored.
    pub fn on_add(&self, users: &mut UserTable) {
        if let LineKind::Eline(_) = self.kind {
            let mut marked = 0usize;
            for user in users.iter_mut().filter(|u| self.matches(u)) {
                user.exempt = true;
                marked += 1;
            }
            debug!(mask = %self.pattern(), marked, "E-line exempted connected users");
        }
    }

    /// Hook run once the line has left the store.
    ///
    /// `remaining` holds the E-lines still set, used to rebuild exemptions.
    pub fn unset(&self, users: &mut UserTable, remaining: Option<&LineMap>) {
        if let LineKind::Eline(_) = self.kind {
            recheck_exemptions(users, remaining);
        }
    }

    /// Server notice text for an expiring line.
    pub fn display_expiry(&self, now: i64) -> String {
        format!(
            "Removing expired {} {} (set by {} {} seconds ago)",
            self.line_type(),
            self.displayable(),
            self.source,
            now.saturating_sub(self.set_time)
        )
    }

    /// One STATS reply line.
    pub fn stats_line(&self, server: &str, numeric: u16, nick: &str) -> String {
        format!(
            ":{} {:03} {} :{} {} {} {} :{}",
            server,
            numeric,
            nick,
            self.pattern(),
            self.set_time,
            self.duration,
            self.source,
            self.reason
        )
    }
}

/// Clear every exemption flag, then set it again for users `elines` match.
pub(crate) fn recheck_exemptions(users: &mut UserTable, elines: Option<&LineMap>) {
    for user in users.iter_mut() {
        user.exempt = elines.is_some_and(|lines| lines.values().any(|line| line.matches(user)));
    }
}

/// Z-line patterns may arrive as `ident@ip`; only the address counts.
pub(crate) fn strip_ident(text: &str) -> &str {
    text.split_once('@').map_or(text, |(_, host)| host)
}
