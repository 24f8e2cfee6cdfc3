//! Classroom attendance from three random presence checks.
//!
//! An instructor builds a [`roster::Roster`], runs an
//! [`session::AttendanceSession`] through three ordered checks, and gets an
//! [`session::AttendanceReport`] where a student counts as present when
//! seen in at least two of the three checks.

pub mod assistant;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod export;
pub mod insight;
pub mod logging;
pub mod profiles;
pub mod roster;
pub mod runner;
pub mod session;
pub mod ui;

pub use error::{RollcallError, SessionError};
