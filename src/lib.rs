pub mod app;
pub mod cli;
pub mod compose;
pub mod config;
pub mod dedup;
pub mod error;
pub mod focus;
pub mod hook;
pub mod idle;
pub mod logging;
pub mod notifier;
pub mod push;
pub mod session;
pub mod sweep;
pub mod util;
