//! View layer
//!
//! Views are built as plain trees (`node`), diffed and patched onto a
//! retained tree (`reconcile`), and painted with ratatui (`terminal`).

pub mod node;
pub mod reconcile;
pub mod terminal;
pub mod theme;
pub mod views;

pub use reconcile::{apply, diff, Patch, PatchError, PatchOp};
pub use theme::Theme;
