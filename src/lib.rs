// Library exports for inkpost

pub mod blog;
pub mod config;
pub mod drafts;
pub mod editor;
pub mod error;
pub mod history;
pub mod identity;
pub mod keybinds;
pub mod logging;
pub mod richtext;
pub mod search;
pub mod search_panel;
pub mod session;

pub use error::{Error, Result};
