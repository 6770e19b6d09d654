//! Connected users, as seen by the ban subsystem.
//!
//! The transport layer owns the real connections; this table mirrors the
//! identity fields ban lines match on, carries the per-user exemption flag,
//! and queues the disconnects that enforcement produces so the caller can
//! deliver them after the sweep.

use crate::xline::XLine;
use std::collections::HashMap;
use std::net::IpAddr;

/// Unique identifier for a user (UID string).
pub type Uid = String;

/// `465 ERR_YOUREBANNEDCREEP`
pub const ERR_YOUREBANNEDCREEP: u16 = 465;

/// A connected user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub uid: Uid,
    pub nick: String,
    /// Ident (username) reported by the client or identd.
    pub ident: String,
    /// Resolved hostname, or the IP string when resolution failed.
    pub host: String,
    /// Real IP address of the connection.
    pub ip: IpAddr,
    /// Set while at least one E-line matches this user.
    pub exempt: bool,
}

impl User {
    pub fn new(
        uid: impl Into<Uid>,
        nick: impl Into<String>,
        ident: impl Into<String>,
        host: impl Into<String>,
        ip: IpAddr,
    ) -> Self {
        Self {
            uid: uid.into(),
            nick: nick.into(),
            ident: ident.into(),
            host: host.into(),
            ip,
            exempt: false,
        }
    }

    /// The IP address in the textual form Z-lines match against.
    pub fn ip_string(&self) -> String {
        self.ip.to_string()
    }

    /// `nick!ident@host`, for logs.
    pub fn hostmask(&self) -> String {
        format!("{}!{}@{}", self.nick, self.ident, self.host)
    }
}

/// How enforcement messages are worded.
#[derive(Debug, Clone)]
pub struct EnforcementSettings {
    /// Our server name, used as the numeric prefix.
    pub server_name: String,
    /// Hide the ban reason from the public quit message.
    pub hide_bans: bool,
    /// Optional notice sent to a banned user before they are dropped.
    pub banner: Option<String>,
}

impl Default for EnforcementSettings {
    fn default() -> Self {
        Self {
            server_name: "irc.local".to_string(),
            hide_bans: false,
            banner: None,
        }
    }
}

/// One enforcement action, ready for the transport layer to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disconnect {
    pub uid: Uid,
    pub nick: String,
    /// `NOTICE` text sent first, when a banner is configured.
    pub banner: Option<String>,
    /// The `465` numeric line naming the source and reason of the ban.
    pub numeric: String,
    /// Quit reason shown to other users.
    pub quit_reason: String,
}

/// The connected population plus the outbox of pending disconnects.
#[derive(Debug, Default)]
pub struct UserTable {
    users: HashMap<Uid, User>,
    settings: EnforcementSettings,
    outbox: Vec<Disconnect>,
}

impl UserTable {
    pub fn new(settings: EnforcementSettings) -> Self {
        Self {
            users: HashMap::new(),
            settings,
            outbox: Vec::new(),
        }
    }

    pub fn settings(&self) -> &EnforcementSettings {
        &self.settings
    }

    /// Add or replace a user. Returns the previous record for that UID.
    pub fn insert(&mut self, user: User) -> Option<User> {
        self.users.insert(user.uid.clone(), user)
    }

    pub fn remove(&mut self, uid: &str) -> Option<User> {
        self.users.remove(uid)
    }

    pub fn get(&self, uid: &str) -> Option<&User> {
        self.users.get(uid)
    }

    pub fn get_mut(&mut self, uid: &str) -> Option<&mut User> {
        self.users.get_mut(uid)
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.users.contains_key(uid)
    }

    pub fn iter(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut User> {
        self.users.values_mut()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// UIDs of every user `line` currently matches.
    pub fn matching(&self, line: &XLine) -> Vec<Uid> {
        self.users
            .values()
            .filter(|user| line.matches(user))
            .map(|user| user.uid.clone())
            .collect()
    }

    /// Drop `uid` because of `line` and queue the enforcement message.
    ///
    /// Returns `false` without queueing anything if the user is already gone.
    pub fn disconnect(&mut self, uid: &str, line: &XLine) -> bool {
        let Some(user) = self.users.remove(uid) else {
            return false;
        };

        let label = line.line_type().lined();
        let numeric = format!(
            ":{} {} {} :You are banned from this server: {} ({} by {})",
            self.settings.server_name,
            ERR_YOUREBANNEDCREEP,
            user.nick,
            line.reason(),
            label,
            line.source()
        );
        let quit_reason = if self.settings.hide_bans {
            label.to_string()
        } else {
            format!("{}: {}", label, line.reason())
        };

        self.outbox.push(Disconnect {
            uid: user.uid,
            nick: user.nick,
            banner: self.settings.banner.clone(),
            numeric,
            quit_reason,
        });
        true
    }

    /// Take every queued disconnect.
    pub fn drain_disconnects(&mut self) -> Vec<Disconnect> {
        std::mem::take(&mut self.outbox)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gline() -> XLine {
        XLine::gline(1000, 0, "oper", "spamming", "*", "*.bad.example")
    }

    fn alice() -> User {
        User::new("001AAAAAA", "alice", "al", "host.bad.example", "10.0.0.1".parse().unwrap())
    }

    #[test]
    fn disconnect_queues_one_message() {
        let mut users = UserTable::new(EnforcementSettings::default());
        users.insert(alice());

        assert!(users.disconnect("001AAAAAA", &gline()));
        assert!(!users.contains("001AAAAAA"));

        let out = users.drain_disconnects();
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].numeric,
            ":irc.local 465 alice :You are banned from this server: spamming (G-Lined by oper)"
        );
        assert_eq!(out[0].quit_reason, "G-Lined: spamming");
        assert!(users.drain_disconnects().is_empty());
    }

    #[test]
    fn disconnecting_a_gone_user_is_a_no_op() {
        let mut users = UserTable::default();
        assert!(!users.disconnect("nobody", &gline()));
        assert!(users.drain_disconnects().is_empty());
    }

    #[test]
    fn hidden_bans_keep_reason_out_of_quit() {
        let mut users = UserTable::new(EnforcementSettings {
            server_name: "irc.test".to_string(),
            hide_bans: true,
            banner: Some("Contact kline@test".to_string()),
        });
        users.insert(alice());
        users.disconnect("001AAAAAA", &gline());

        let out = users.drain_disconnects();
        assert_eq!(out[0].quit_reason, "G-Lined");
        assert_eq!(out[0].banner.as_deref(), Some("Contact kline@test"));
        assert!(out[0].numeric.contains("spamming"));
    }
}
