//! Interactive packet view.
//!
//! A scrolling table over the session's records with keys for pause, filter,
//! export and clear.

mod action;
mod app;
mod event;
mod theme;
mod ui;

pub use app::{App, ViewConfig};
