//! Terminal UI: menus and progress

pub mod progress;
pub mod selector;
