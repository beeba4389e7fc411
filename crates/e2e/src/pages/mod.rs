//! Page objects

pub mod base;
pub mod wikipedia;

pub use base::{PageSession, PageSnapshot};
pub use wikipedia::{extract_designer, DesignerLookup, WikipediaPage};
