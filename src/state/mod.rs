//! State management module.
//!
//! Contains the connected-user table the ban subsystem enforces against.

mod user;

pub use user::{Disconnect, ERR_YOUREBANNEDCREEP, EnforcementSettings, Uid, User, UserTable};
