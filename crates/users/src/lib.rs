//! Users domain module.
//!
//! A user is a registered actor identified by a UUID and a unique handle
//! (a messaging-platform username). Users are created once and never updated.

pub mod user;

pub use user::User;
