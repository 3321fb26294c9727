//! Floating control panel for situation autofill, rendered in the terminal
//! next to a preview of the page being filled.

pub mod action;
pub mod app;
pub mod components;
pub mod event;
pub mod theme;

pub use app::App;
