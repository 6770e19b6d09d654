//! slircd-xline - network ban line subsystem for the Straylight IRC daemon.
//!
//! Records, matches, expires and enforces G/K/E/Z/Q-lines against the
//! connected user population, plus the channel ban list base.

pub mod casemap;
pub mod config;
pub mod duration;
pub mod error;
pub mod listmode;
pub mod matching;
pub mod service;
pub mod state;
pub mod xline;

pub use error::XLineError;
pub use service::{SweepReport, XLineEvent, XLineHandle, XLineService};
pub use xline::{LineType, XLine, XLineManager};
