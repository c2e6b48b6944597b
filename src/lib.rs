//! Font ligature detection addon for terminal emulators.
//!
//! This crate provides:
//! - Font-family list parsing (comma-separated, optionally quoted names)
//! - System font resolution with monospace preference via fontdb
//! - HarfBuzz-based ligature detection via rustybuzz
//! - A per-terminal "character joiner" callback mapping each visible line
//!   to the glyph-group ranges the renderer should draw as one unit
//!
//! # Architecture
//!
//! The `LigatureService` owns two injected capabilities — a `FontIndex`
//! for installed-font lookup and a `LigatureLoader` for reading a font's
//! ligature behavior — and registers a synchronous joiner callback on each
//! enabled terminal. Font loading happens on background tokio tasks; until
//! a load completes the joiner returns empty ranges, and a successful load
//! triggers a viewport refresh so already-rendered lines pick up real
//! ranges. A missing or broken font never surfaces an error: the joiner
//! simply keeps returning empty ranges.

pub mod family_list;
pub mod font_index;
pub mod ligature_loader;
pub mod service;
pub mod terminal;

// Re-export main types for convenience
pub use font_index::{FaceInfo, FontIndex, SystemFontIndex};
pub use ligature_loader::{
    ClusterRun, HarfBuzzLoader, LigatureLoader, LigatureRules, ranges_from_clusters,
};
pub use service::LigatureService;
pub use terminal::{Joiner, JoinerId, JoinerRange, Terminal};
