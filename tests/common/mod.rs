//! Integration test common infrastructure.
//!
//! Builders for connected-user populations and a spawned service with its
//! output channels.

use slircd_xline::XLineHandle;
use slircd_xline::XLineService;
use slircd_xline::config::Config;
use slircd_xline::state::{Disconnect, EnforcementSettings, User, UserTable};
use slircd_xline::xline::{LinkMessage, LinkObserver};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// A user with a parsed IP and a fixed ident.
#[allow(dead_code)]
pub fn user(uid: &str, nick: &str, host: &str, ip: &str) -> User {
    User::new(uid, nick, "ident", host, ip.parse().expect("test IP"))
}

/// `count` users on `10.0.0.x` with hosts `hN.example`.
#[allow(dead_code)]
pub fn population(count: u8) -> UserTable {
    let mut users = UserTable::new(EnforcementSettings {
        server_name: "irc.test".to_string(),
        hide_bans: false,
        banner: None,
    });
    for i in 0..count {
        users.insert(user(
            &format!("00{i}AAAAAA"),
            &format!("user{i}"),
            &format!("h{i}.example"),
            &format!("10.0.0.{i}"),
        ));
    }
    users
}

/// A running service plus the receiving ends of its output.
#[allow(dead_code)]
pub struct TestService {
    pub handle: XLineHandle,
    pub disconnects: mpsc::UnboundedReceiver<Disconnect>,
    pub links: mpsc::UnboundedReceiver<LinkMessage>,
}

#[allow(dead_code)]
impl TestService {
    pub fn spawn(toml: &str) -> Self {
        let config: Config = toml::from_str(toml).expect("test config");
        let (disconnect_tx, disconnects) = mpsc::unbounded_channel();
        let (link_tx, links) = mpsc::unbounded_channel();

        let mut service = XLineService::from_config(&config, disconnect_tx);
        service
            .manager_mut()
            .add_observer(Arc::new(LinkObserver::new(link_tx)));

        Self {
            handle: service.spawn(),
            disconnects,
            links,
        }
    }

    /// Wait briefly for the next disconnect.
    pub async fn next_disconnect(&mut self) -> Option<Disconnect> {
        tokio::time::timeout(Duration::from_millis(500), self.disconnects.recv())
            .await
            .ok()
            .flatten()
    }

    /// Wait briefly for the next link announcement.
    pub async fn next_link(&mut self) -> Option<LinkMessage> {
        tokio::time::timeout(Duration::from_millis(500), self.links.recv())
            .await
            .ok()
            .flatten()
    }
}
