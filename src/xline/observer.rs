//! Observer hooks for line changes.
//!
//! The manager calls registered observers after every local add, delete
//! and expiry. Lines that arrived from a peer are not reported back out, so
//! propagation never echoes.

use super::manager::Origin;
use super::{LineType, XLine};
use tokio::sync::mpsc;
use tracing::debug;

/// Hooks into line store changes.
pub trait XLineObserver: Send + Sync {
    /// A line was stored.
    fn on_add_line(&self, line: &XLine, origin: &Origin<'_>);

    /// A line was removed on request.
    fn on_del_line(&self, line: &XLine, origin: &Origin<'_>);

    /// A temporary line ran out.
    fn on_expire_line(&self, _line: &XLine) {}
}

/// Server-to-server line announcements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkMessage {
    AddLine {
        line_type: LineType,
        mask: String,
        setter: String,
        set_time: i64,
        duration: i64,
        reason: String,
    },
    DelLine {
        line_type: LineType,
        mask: String,
        setter: String,
    },
}

impl std::fmt::Display for LinkMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkMessage::AddLine {
                line_type,
                mask,
                setter,
                set_time,
                duration,
                reason,
            } => write!(
                f,
                "ADDLINE {} {} {} {} {} :{}",
                line_type.as_char(),
                mask,
                setter,
                set_time,
                duration,
                reason
            ),
            LinkMessage::DelLine {
                line_type, mask, ..
            } => write!(f, "DELLINE {} {}", line_type.as_char(), mask),
        }
    }
}

/// Forwards local network-wide lines to the link layer.
///
/// K-lines are server-local and configured lines exist on every server
/// already, so neither is announced.
#[derive(Debug, Clone)]
pub struct LinkObserver {
    tx: mpsc::UnboundedSender<LinkMessage>,
}

impl LinkObserver {
    pub fn new(tx: mpsc::UnboundedSender<LinkMessage>) -> Self {
        Self { tx }
    }

    fn propagates(line: &XLine, origin: &Origin<'_>) -> bool {
        line.line_type() != LineType::Kline && matches!(origin, Origin::Oper(_))
    }

    fn send(&self, msg: LinkMessage) {
        debug!(%msg, "propagating xline change");
        // Receiver dropped: the link layer is shutting down.
        let _ = self.tx.send(msg);
    }
}

impl XLineObserver for LinkObserver {
    fn on_add_line(&self, line: &XLine, origin: &Origin<'_>) {
        if !Self::propagates(line, origin) {
            return;
        }
        self.send(LinkMessage::AddLine {
            line_type: line.line_type(),
            mask: line.displayable().to_string(),
            setter: line.source().to_string(),
            set_time: line.set_time(),
            duration: line.duration(),
            reason: line.reason().to_string(),
        });
    }

    fn on_del_line(&self, line: &XLine, origin: &Origin<'_>) {
        if !Self::propagates(line, origin) {
            return;
        }
        self.send(LinkMessage::DelLine {
            line_type: line.line_type(),
            mask: line.displayable().to_string(),
            setter: origin.name().to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn announces_network_lines_only() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let observer = LinkObserver::new(tx);

        let gline = XLine::gline(100, 3600, "oper", "spam", "*", "bad.host");
        let kline = XLine::kline(100, 0, "oper", "local", "*", "bad.host");

        observer.on_add_line(&gline, &Origin::Oper("oper"));
        observer.on_add_line(&kline, &Origin::Oper("oper"));
        observer.on_add_line(&gline, &Origin::Remote("peer.example"));
        observer.on_add_line(&gline, &Origin::Config);

        let msg = rx.try_recv().unwrap();
        assert_eq!(msg.to_string(), "ADDLINE G *@bad.host oper 100 3600 :spam");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn deletions_name_the_remover() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let observer = LinkObserver::new(tx);
        let qline = XLine::qline(0, 0, "services", "reserved", "ChanServ");

        observer.on_del_line(&qline, &Origin::Oper("admin"));
        assert_eq!(
            rx.try_recv().unwrap(),
            LinkMessage::DelLine {
                line_type: LineType::Qline,
                mask: "ChanServ".to_string(),
                setter: "admin".to_string(),
            }
        );
    }
}
