//! The line store.
//!
//! `XLineManager` owns every active line, indexed by type and exact pattern,
//! plus the queue of lines waiting for the next enforcement sweep. It holds
//! no locks; the [`XLineService`](crate::service::XLineService) actor is its
//! only owner.

use super::factory::FactoryRegistry;
use super::kinds::recheck_exemptions;
use super::observer::XLineObserver;
use super::{ApplyPolicy, LineType, XLine};
use crate::duration::format_duration;
use crate::error::XLineError;
use crate::state::{User, UserTable};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Lines of one type, keyed by exact pattern.
pub type LineMap = HashMap<String, XLine>;

/// Who asked for a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin<'a> {
    /// A local operator (or service) by name.
    Oper(&'a str),
    /// A linked server. Observers are not told, so nothing echoes back.
    Remote(&'a str),
    /// The configuration file.
    Config,
}

impl Origin<'_> {
    pub fn name(&self) -> &str {
        match self {
            Origin::Oper(name) | Origin::Remote(name) => name,
            Origin::Config => "<Config>",
        }
    }

    fn notifies(&self) -> bool {
        !matches!(self, Origin::Remote(_))
    }
}

/// Owns active lines, the pending queue, the factory registry and observers.
pub struct XLineManager {
    server_name: String,
    lines: HashMap<LineType, LineMap>,
    pending: Vec<(LineType, String)>,
    factories: FactoryRegistry,
    observers: Vec<Arc<dyn XLineObserver>>,
}

impl std::fmt::Debug for XLineManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XLineManager")
            .field("server_name", &self.server_name)
            .field("lines", &self.len())
            .field("pending", &self.pending.len())
            .field("factories", &self.factories)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl XLineManager {
    /// Create a manager with the built-in factories registered.
    pub fn new(server_name: impl Into<String>) -> Self {
        Self {
            server_name: server_name.into(),
            lines: HashMap::new(),
            pending: Vec::new(),
            factories: FactoryRegistry::with_builtin(),
            observers: Vec::new(),
        }
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn factories(&self) -> &FactoryRegistry {
        &self.factories
    }

    pub fn factories_mut(&mut self) -> &mut FactoryRegistry {
        &mut self.factories
    }

    pub fn add_observer(&mut self, observer: Arc<dyn XLineObserver>) {
        self.observers.push(observer);
    }

    /// Total number of active lines.
    pub fn len(&self) -> usize {
        self.lines.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lines waiting for the next sweep.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Every active line of one type, in no particular order.
    pub fn lines_of(&self, line_type: LineType) -> impl Iterator<Item = &XLine> {
        self.lines.get(&line_type).into_iter().flat_map(HashMap::values)
    }

    /// Exact lookup by pattern key.
    pub fn get(&self, line_type: LineType, pattern: &str) -> Option<&XLine> {
        self.lines.get(&line_type)?.get(pattern)
    }

    /// Store a line.
    ///
    /// Runs the kind's add hook, queues it for the sweep when its factory
    /// asks for that, and tells observers unless it came from a peer.
    pub fn add(
        &mut self,
        line: XLine,
        origin: Origin<'_>,
        users: &mut UserTable,
        now: i64,
    ) -> Result<(), XLineError> {
        let line_type = line.line_type();
        let key = line.pattern().to_string();

        if !self.factories.is_registered(line_type) {
            return Err(XLineError::UnregisteredKind(line_type.as_char()));
        }
        if line.is_expired_at(now) {
            return Err(XLineError::Expired { line_type, mask: key });
        }
        if let Some(existing) = self.find_key(line_type, &key) {
            return Err(XLineError::Duplicate { line_type, mask: existing });
        }

        line.on_add(users);
        if self.factories.auto_apply(&line) {
            self.pending.push((line_type, key.clone()));
        }
        if origin.notifies() {
            for observer in &self.observers {
                observer.on_add_line(&line, &origin);
            }
        }

        info!(
            line_type = %line_type,
            mask = %key,
            source = %line.source(),
            origin = %origin.name(),
            duration = %format_duration(line.duration()),
            reason = %line.reason(),
            "X-line added"
        );
        self.lines.entry(line_type).or_default().insert(key, line);
        Ok(())
    }

    /// Resolve `pattern` to a stored key: exact first, then literal equality.
    fn find_key(&self, line_type: LineType, pattern: &str) -> Option<String> {
        let map = self.lines.get(&line_type)?;
        if map.contains_key(pattern) {
            return Some(pattern.to_string());
        }
        map.iter()
            .find(|(_, line)| line.matches_literal(pattern))
            .map(|(key, _)| key.clone())
    }

    /// Remove a line by pattern.
    ///
    /// With `simulate` set only existence is checked and nothing changes.
    pub fn remove(
        &mut self,
        pattern: &str,
        line_type: LineType,
        origin: Origin<'_>,
        users: &mut UserTable,
        simulate: bool,
    ) -> Result<(), XLineError> {
        let not_found = || XLineError::NotFound {
            line_type,
            mask: pattern.to_string(),
        };

        let key = self.find_key(line_type, pattern).ok_or_else(not_found)?;
        if simulate {
            return Ok(());
        }

        let line = self
            .lines
            .get_mut(&line_type)
            .and_then(|map| map.remove(&key))
            .ok_or_else(not_found)?;

        line.unset(users, self.lines.get(&LineType::Eline));
        self.pending.retain(|(t, k)| !(*t == line_type && *k == key));
        if origin.notifies() {
            for observer in &self.observers {
                observer.on_del_line(&line, &origin);
            }
        }

        info!(
            line_type = %line_type,
            mask = %key,
            origin = %origin.name(),
            "X-line removed"
        );
        Ok(())
    }

    /// First line of `line_type` that matches `user`.
    pub fn lookup_by_user(&self, line_type: LineType, user: &User) -> Option<&XLine> {
        self.lines_of(line_type).find(|line| line.matches(user))
    }

    /// First line of `line_type` whose pattern covers `pattern`.
    pub fn lookup_by_pattern(&self, line_type: LineType, pattern: &str) -> Option<&XLine> {
        self.lines_of(line_type).find(|line| line.matches_mask(pattern))
    }

    /// Drain the pending queue against the connected users.
    ///
    /// Each queued line still in the store and allowed by `policy` is
    /// applied to every user it matches. Lines the policy refuses are
    /// dropped from the queue, not retried: they only act through
    /// [`check_connect`](Self::check_connect) and
    /// [`check_nick`](Self::check_nick). The queue is empty afterwards.
    /// Returns the number of disconnects queued.
    pub fn apply_pending(&mut self, users: &mut UserTable, policy: ApplyPolicy) -> usize {
        let pending = std::mem::take(&mut self.pending);
        let mut applied = 0;

        for (line_type, key) in pending {
            let Some(line) = self.lines.get(&line_type).and_then(|map| map.get(&key)) else {
                continue;
            };
            if !policy.allows(line) {
                debug!(line_type = %line_type, mask = %key, "apply policy skipped line");
                continue;
            }

            for uid in users.matching(line) {
                if line.apply(&uid, users) {
                    debug!(line_type = %line_type, mask = %key, uid = %uid, "applied X-line");
                    applied += 1;
                }
            }
        }

        if applied > 0 {
            info!(applied, "enforcement sweep disconnected users");
        }
        applied
    }

    /// Remove every temporary line whose expiry is at or before `now`.
    ///
    /// Returns the expiry notices, one per removed line.
    pub fn expire_due(&mut self, now: i64, users: &mut UserTable) -> Vec<String> {
        let due: Vec<(LineType, String)> = self
            .lines
            .iter()
            .flat_map(|(line_type, map)| {
                map.iter()
                    .filter(|(_, line)| line.is_expired_at(now))
                    .map(move |(key, _)| (*line_type, key.clone()))
            })
            .collect();

        let mut notices = Vec::with_capacity(due.len());
        for (line_type, key) in due {
            let Some(line) = self.lines.get_mut(&line_type).and_then(|map| map.remove(&key)) else {
                continue;
            };

            let notice = line.display_expiry(now);
            info!(line_type = %line_type, mask = %key, "{notice}");

            line.unset(users, self.lines.get(&LineType::Eline));
            self.pending.retain(|(t, k)| !(*t == line_type && *k == key));
            for observer in &self.observers {
                observer.on_expire_line(&line);
            }
            notices.push(notice);
        }
        notices
    }

    /// STATS reply lines for one type, sorted by pattern.
    pub fn report_stats(&self, line_type: LineType, numeric: u16, nick: &str) -> Vec<String> {
        let mut lines: Vec<&XLine> = self.lines_of(line_type).collect();
        lines.sort_by(|a, b| a.pattern().cmp(b.pattern()));
        lines
            .into_iter()
            .map(|line| line.stats_line(&self.server_name, numeric, nick))
            .collect()
    }

    /// Recompute every connected user's exemption flag.
    pub fn check_exemptions(&self, users: &mut UserTable) {
        recheck_exemptions(users, self.lines.get(&LineType::Eline));
    }

    /// Connection-time check: refresh `user`'s exemption, then look for a
    /// Z-line, K-line, G-line or a Q-line on the registering nick, in that
    /// order.
    pub fn check_connect(&self, user: &mut User) -> Option<&XLine> {
        user.exempt = self.lookup_by_user(LineType::Eline, user).is_some();
        [LineType::Zline, LineType::Kline, LineType::Gline]
            .into_iter()
            .find_map(|line_type| self.lookup_by_user(line_type, user))
            .or_else(|| self.check_nick(user, &user.nick))
    }

    /// Q-line check for a nickname `user` wants to take.
    pub fn check_nick(&self, user: &User, nick: &str) -> Option<&XLine> {
        if user.exempt {
            return None;
        }
        self.lookup_by_pattern(LineType::Qline, nick)
    }
}
