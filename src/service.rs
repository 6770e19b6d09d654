//! The ban line service actor.
//!
//! `XLineService` owns the [`XLineManager`], the connected-user table and
//! the channel ban lists, and processes [`XLineEvent`]s one at a time on
//! its own task. Nothing else touches that state, so there are no locks.
//!
//! # Architecture
//!
//! - **Mailbox**: a bounded mpsc channel; every request carries a oneshot
//!   reply channel.
//! - **Sweep**: a `tokio::time::interval` tick expires due lines and then
//!   drains the pending queue against connected users.
//! - **Output**: disconnects are forwarded to the transport layer over an
//!   unbounded channel after each step.

use crate::config::Config;
use crate::duration::parse_duration;
use crate::error::XLineError;
use crate::listmode::{ListModeBase, ListModeError};
use crate::state::{Disconnect, Uid, User, UserTable};
use crate::xline::{ApplyPolicy, LineType, Origin, XLineManager};
use chrono::Utc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Result of one expiry/enforcement sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Expiry notices, one per retired line.
    pub expired: Vec<String>,
    /// Disconnects queued by the pending drain.
    pub applied: usize,
}

/// Events that can be sent to the X-line service.
#[derive(Debug)]
pub enum XLineEvent {
    /// A local operator sets a line.
    AddLine {
        tag: char,
        mask: String,
        duration: i64,
        setter: String,
        reason: String,
        reply_tx: oneshot::Sender<Result<(), XLineError>>,
    },
    /// A linked server announces a line. Not propagated back.
    AddRemoteLine {
        server: String,
        tag: char,
        set_time: i64,
        duration: i64,
        setter: String,
        reason: String,
        mask: String,
        reply_tx: Option<oneshot::Sender<Result<(), XLineError>>>,
    },
    /// Remove a line, locally or on a peer's request.
    DelLine {
        tag: char,
        mask: String,
        remover: String,
        remote: bool,
        simulate: bool,
        reply_tx: oneshot::Sender<Result<(), XLineError>>,
    },
    /// STATS listing for one type.
    Stats {
        tag: char,
        nick: String,
        reply_tx: oneshot::Sender<Result<Vec<String>, XLineError>>,
    },
    /// A user finished registering. Replies `true` if admitted.
    Connect {
        user: User,
        reply_tx: oneshot::Sender<bool>,
    },
    /// A user wants a new nickname. Refused with the Q-line reason.
    NickChange {
        uid: Uid,
        new_nick: String,
        reply_tx: oneshot::Sender<Result<(), String>>,
    },
    /// A user left.
    Quit { uid: Uid },
    /// Channel list mode change (`+b mask` / `-b mask`).
    BanList {
        channel: String,
        setter: String,
        mask: String,
        adding: bool,
        reply_tx: oneshot::Sender<Result<String, ListModeError>>,
    },
    /// Channel ban list query.
    ShowBanList {
        channel: String,
        nick: String,
        reply_tx: oneshot::Sender<Vec<String>>,
    },
    /// Run a sweep now; `now` overrides the clock.
    Tick {
        now: Option<i64>,
        reply_tx: Option<oneshot::Sender<SweepReport>>,
    },
}

/// The X-line service.
#[derive(Debug)]
pub struct XLineService {
    manager: XLineManager,
    users: UserTable,
    bans: ListModeBase,
    policy: ApplyPolicy,
    interval: Duration,
    mailbox_capacity: usize,
    disconnect_tx: mpsc::UnboundedSender<Disconnect>,
}

impl XLineService {
    /// Build the service from configuration and load configured lines.
    pub fn from_config(config: &Config, disconnect_tx: mpsc::UnboundedSender<Disconnect>) -> Self {
        let xlines = &config.xlines;
        let mut bans = ListModeBase::ban_list();
        bans.rehash(&config.banlist);

        let mut service = Self {
            manager: XLineManager::new(&config.server.name),
            users: UserTable::new(xlines.enforcement(&config.server.name)),
            bans,
            policy: xlines.policy(),
            interval: xlines.interval(),
            mailbox_capacity: xlines.mailbox_capacity.max(1),
            disconnect_tx,
        };

        let now = Utc::now().timestamp();
        for line in &xlines.lines {
            let Some(duration) = line.duration_secs() else {
                warn!(mask = %line.mask, duration = ?line.duration, "skipping configured line with bad duration");
                continue;
            };
            let result = service
                .manager
                .factories()
                .generate(line.line_type, now, duration, "<Config>", &line.reason, &line.mask)
                .and_then(|xline| service.manager.add(xline, Origin::Config, &mut service.users, now));
            if let Err(e) = result {
                warn!(mask = %line.mask, error = %e, code = e.error_code(), "configured line rejected");
            }
        }
        info!(lines = service.manager.len(), policy = ?service.policy, "xline service configured");

        service
    }

    pub fn manager(&self) -> &XLineManager {
        &self.manager
    }

    /// For registering observers and factories before spawning.
    pub fn manager_mut(&mut self) -> &mut XLineManager {
        &mut self.manager
    }

    pub fn users(&self) -> &UserTable {
        &self.users
    }

    /// Spawn the actor and return a handle to it.
    pub fn spawn(self) -> XLineHandle {
        let (tx, rx) = mpsc::channel(self.mailbox_capacity);
        tokio::spawn(async move {
            self.run(rx).await;
        });
        XLineHandle { tx }
    }

    /// The main actor loop.
    pub async fn run(mut self, mut rx: mpsc::Receiver<XLineEvent>) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
                _ = interval.tick() => {
                    self.sweep(Utc::now().timestamp());
                }
            }
            self.flush_disconnects();
        }

        info!("xline service stopped");
    }

    fn handle_event(&mut self, event: XLineEvent) {
        match event {
            XLineEvent::AddLine {
                tag,
                mask,
                duration,
                setter,
                reason,
                reply_tx,
            } => {
                let now = Utc::now().timestamp();
                let result = self.add_line(tag, now, duration, &setter, &reason, &mask, Origin::Oper(&setter), now);
                let _ = reply_tx.send(result);
            }
            XLineEvent::AddRemoteLine {
                server,
                tag,
                set_time,
                duration,
                setter,
                reason,
                mask,
                reply_tx,
            } => {
                let now = Utc::now().timestamp();
                let result = self.add_line(tag, set_time, duration, &setter, &reason, &mask, Origin::Remote(&server), now);
                if let Err(e) = &result {
                    debug!(server = %server, error = %e, "remote xline not added");
                }
                if let Some(tx) = reply_tx {
                    let _ = tx.send(result);
                }
            }
            XLineEvent::DelLine {
                tag,
                mask,
                remover,
                remote,
                simulate,
                reply_tx,
            } => {
                let origin = if remote {
                    Origin::Remote(&remover)
                } else {
                    Origin::Oper(&remover)
                };
                let result = LineType::try_from(tag).and_then(|line_type| {
                    self.manager
                        .remove(&mask, line_type, origin, &mut self.users, simulate)
                });
                let _ = reply_tx.send(result);
            }
            XLineEvent::Stats { tag, nick, reply_tx } => {
                let result = LineType::try_from(tag).map(|line_type| {
                    self.manager
                        .report_stats(line_type, line_type.stats_numeric(), &nick)
                });
                let _ = reply_tx.send(result);
            }
            XLineEvent::Connect { mut user, reply_tx } => {
                let uid = user.uid.clone();
                let admitted = match self.manager.check_connect(&mut user) {
                    Some(line) => {
                        info!(uid = %uid, user = %user.hostmask(), line_type = %line.line_type(), mask = %line.pattern(), "connection refused");
                        self.users.insert(user);
                        self.users.disconnect(&uid, line);
                        false
                    }
                    None => {
                        self.users.insert(user);
                        true
                    }
                };
                let _ = reply_tx.send(admitted);
            }
            XLineEvent::NickChange {
                uid,
                new_nick,
                reply_tx,
            } => {
                let result = match self.users.get(&uid) {
                    None => Err(format!("no such user {uid}")),
                    Some(user) => match self.manager.check_nick(user, &new_nick) {
                        Some(line) => Err(format!("Invalid nickname: {}", line.reason())),
                        None => Ok(()),
                    },
                };
                if result.is_ok()
                    && let Some(user) = self.users.get_mut(&uid)
                {
                    user.nick = new_nick;
                }
                let _ = reply_tx.send(result);
            }
            XLineEvent::Quit { uid } => {
                self.users.remove(&uid);
            }
            XLineEvent::BanList {
                channel,
                setter,
                mask,
                adding,
                reply_tx,
            } => {
                let now = Utc::now().timestamp();
                let result = self
                    .bans
                    .on_mode_change(&channel, &setter, &mask, adding, now);
                let _ = reply_tx.send(result);
            }
            XLineEvent::ShowBanList {
                channel,
                nick,
                reply_tx,
            } => {
                let lines = self
                    .bans
                    .display_list(self.manager.server_name(), &nick, &channel);
                let _ = reply_tx.send(lines);
            }
            XLineEvent::Tick { now, reply_tx } => {
                let report = self.sweep(now.unwrap_or_else(|| Utc::now().timestamp()));
                if let Some(tx) = reply_tx {
                    let _ = tx.send(report);
                }
            }
        }
    }

    /// Build, store and immediately enforce one line.
    #[allow(clippy::too_many_arguments)]
    fn add_line(
        &mut self,
        tag: char,
        set_time: i64,
        duration: i64,
        setter: &str,
        reason: &str,
        mask: &str,
        origin: Origin<'_>,
        now: i64,
    ) -> Result<(), XLineError> {
        let line = self
            .manager
            .factories()
            .generate(tag, set_time, duration, setter, reason, mask)?;
        self.manager.add(line, origin, &mut self.users, now)?;
        self.manager.apply_pending(&mut self.users, self.policy);
        Ok(())
    }

    /// Expire due lines, then drain the pending queue.
    fn sweep(&mut self, now: i64) -> SweepReport {
        let expired = self.manager.expire_due(now, &mut self.users);
        let applied = self.manager.apply_pending(&mut self.users, self.policy);
        debug!(now, expired = expired.len(), applied, "xline sweep");
        SweepReport { expired, applied }
    }

    fn flush_disconnects(&mut self) {
        for disconnect in self.users.drain_disconnects() {
            if self.disconnect_tx.send(disconnect).is_err() {
                warn!("disconnect receiver dropped");
                break;
            }
        }
    }
}

/// Cloneable handle to a running [`XLineService`].
#[derive(Debug, Clone)]
pub struct XLineHandle {
    tx: mpsc::Sender<XLineEvent>,
}

impl XLineHandle {
    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> XLineEvent,
    ) -> Result<T, XLineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make(reply_tx))
            .await
            .map_err(|_| XLineError::ServiceGone)?;
        reply_rx.await.map_err(|_| XLineError::ServiceGone)
    }

    pub async fn add_line(
        &self,
        tag: char,
        mask: &str,
        duration: i64,
        setter: &str,
        reason: &str,
    ) -> Result<(), XLineError> {
        self.request(|reply_tx| XLineEvent::AddLine {
            tag,
            mask: mask.to_string(),
            duration,
            setter: setter.to_string(),
            reason: reason.to_string(),
            reply_tx,
        })
        .await?
    }

    /// Like [`add_line`](Self::add_line) with an operator duration string
    /// such as `1d12h` or `3600`.
    pub async fn add_line_for(
        &self,
        tag: char,
        mask: &str,
        duration: &str,
        setter: &str,
        reason: &str,
    ) -> Result<(), XLineError> {
        let secs = parse_duration(duration)
            .ok_or_else(|| XLineError::InvalidDuration(duration.to_string()))?;
        self.add_line(tag, mask, secs, setter, reason).await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn add_remote_line(
        &self,
        server: &str,
        tag: char,
        set_time: i64,
        duration: i64,
        setter: &str,
        reason: &str,
        mask: &str,
    ) -> Result<(), XLineError> {
        self.request(|reply_tx| XLineEvent::AddRemoteLine {
            server: server.to_string(),
            tag,
            set_time,
            duration,
            setter: setter.to_string(),
            reason: reason.to_string(),
            mask: mask.to_string(),
            reply_tx: Some(reply_tx),
        })
        .await?
    }

    pub async fn del_line(
        &self,
        tag: char,
        mask: &str,
        remover: &str,
        remote: bool,
        simulate: bool,
    ) -> Result<(), XLineError> {
        self.request(|reply_tx| XLineEvent::DelLine {
            tag,
            mask: mask.to_string(),
            remover: remover.to_string(),
            remote,
            simulate,
            reply_tx,
        })
        .await?
    }

    pub async fn stats(&self, tag: char, nick: &str) -> Result<Vec<String>, XLineError> {
        self.request(|reply_tx| XLineEvent::Stats {
            tag,
            nick: nick.to_string(),
            reply_tx,
        })
        .await?
    }

    /// Returns whether the user was admitted.
    pub async fn connect(&self, user: User) -> Result<bool, XLineError> {
        self.request(|reply_tx| XLineEvent::Connect { user, reply_tx })
            .await
    }

    pub async fn nick_change(
        &self,
        uid: &str,
        new_nick: &str,
    ) -> Result<Result<(), String>, XLineError> {
        self.request(|reply_tx| XLineEvent::NickChange {
            uid: uid.to_string(),
            new_nick: new_nick.to_string(),
            reply_tx,
        })
        .await
    }

    pub async fn quit(&self, uid: &str) -> Result<(), XLineError> {
        self.tx
            .send(XLineEvent::Quit {
                uid: uid.to_string(),
            })
            .await
            .map_err(|_| XLineError::ServiceGone)
    }

    pub async fn ban_list_change(
        &self,
        channel: &str,
        setter: &str,
        mask: &str,
        adding: bool,
    ) -> Result<Result<String, ListModeError>, XLineError> {
        self.request(|reply_tx| XLineEvent::BanList {
            channel: channel.to_string(),
            setter: setter.to_string(),
            mask: mask.to_string(),
            adding,
            reply_tx,
        })
        .await
    }

    pub async fn show_ban_list(&self, channel: &str, nick: &str) -> Result<Vec<String>, XLineError> {
        self.request(|reply_tx| XLineEvent::ShowBanList {
            channel: channel.to_string(),
            nick: nick.to_string(),
            reply_tx,
        })
        .await
    }

    /// Force a sweep, optionally at a chosen time.
    pub async fn tick(&self, now: Option<i64>) -> Result<SweepReport, XLineError> {
        self.request(|reply_tx| XLineEvent::Tick {
            now,
            reply_tx: Some(reply_tx),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> (XLineService, mpsc::UnboundedReceiver<Disconnect>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (XLineService::from_config(&Config::default(), tx), rx)
    }

    fn user(uid: &str, nick: &str, host: &str, ip: &str) -> User {
        User::new(uid, nick, "ident", host, ip.parse().unwrap())
    }

    #[test]
    fn configured_lines_are_loaded() {
        let config: Config = toml::from_str(
            r#"
[[xlines.line]]
type = "Q"
mask = "NickServ"
reason = "Reserved"

[[xlines.line]]
type = "X"
mask = "whatever"
reason = "unknown kind"
"#,
        )
        .unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let service = XLineService::from_config(&config, tx);

        let line = service.manager().get(LineType::Qline, "NickServ").unwrap();
        assert_eq!(line.source(), "<Config>");
        assert_eq!(service.manager().len(), 1);
    }

    #[test]
    fn add_enforces_in_the_same_step() {
        let (mut service, mut rx) = service();
        service.users.insert(user("1", "a", "bad.host", "10.0.0.1"));
        service.users.insert(user("2", "b", "good.host", "10.0.0.2"));

        let (reply_tx, _reply_rx) = oneshot::channel();
        service.handle_event(XLineEvent::AddLine {
            tag: 'G',
            mask: "*@bad.host".to_string(),
            duration: 0,
            setter: "oper".to_string(),
            reason: "spam".to_string(),
            reply_tx,
        });
        service.flush_disconnects();

        let out = rx.try_recv().unwrap();
        assert_eq!(out.uid, "1");
        assert_eq!(out.quit_reason, "G-Lined: spam");
        assert!(rx.try_recv().is_err());
        assert_eq!(service.users().len(), 1);
        assert_eq!(service.manager().pending_len(), 0);
    }

    #[test]
    fn connect_refused_by_zline() {
        let (mut service, mut rx) = service();
        let now = Utc::now().timestamp();
        service
            .add_line('Z', now, 0, "oper", "no", "10.0.0.0/8", Origin::Oper("oper"), now)
            .unwrap();

        let (reply_tx, mut reply_rx) = oneshot::channel();
        service.handle_event(XLineEvent::Connect {
            user: user("1", "a", "host", "10.5.5.5"),
            reply_tx,
        });
        service.flush_disconnects();

        assert_eq!(reply_rx.try_recv(), Ok(false));
        assert_eq!(rx.try_recv().unwrap().quit_reason, "Z-Lined: no");
        assert!(service.users().is_empty());
    }

    #[test]
    fn sweep_expires_then_applies() {
        let (mut service, _rx) = service();
        let now = Utc::now().timestamp();
        service
            .add_line('K', now, 30, "oper", "temp", "*@h", Origin::Oper("oper"), now)
            .unwrap();

        assert_eq!(service.sweep(now + 10), SweepReport::default());
        let report = service.sweep(now + 30);
        assert_eq!(report.expired.len(), 1);
        assert!(service.manager().is_empty());
    }
}
