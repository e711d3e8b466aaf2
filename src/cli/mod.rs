//! Command line front end: argument parsing helpers and terminal output

pub mod convert;
pub mod history;
pub mod setup;
pub mod ui;
