//! Installed-font lookup.
//!
//! Resolution needs one question answered: for a candidate family name,
//! which installed faces exist and are they monospaced? `FontIndex` is the
//! injected capability that answers it; `SystemFontIndex` is the production
//! implementation over `fontdb`'s system font database.

use std::path::PathBuf;

use fontdb::{Database, Source, Style, Weight};

/// One installed face candidate for a requested family.
#[derive(Debug, Clone)]
pub struct FaceInfo {
    /// Path to the font file on disk (TTF/OTF/TTC)
    pub path: PathBuf,
    /// Face index within the file (nonzero for TrueType Collections)
    pub face_index: u32,
    /// Whether the face is fixed-pitch, required for grid rendering
    pub monospaced: bool,
    /// Slant style of the face
    pub style: Style,
    /// Weight of the face
    pub weight: Weight,
}

/// Capability interface over the system's installed-font index.
///
/// Injected into the service so hosts can supply their own enumeration and
/// tests can substitute fakes instead of patching global state.
pub trait FontIndex: Send + Sync {
    /// All installed faces whose family name matches `family`
    /// (case-insensitive). Empty when the family is not installed.
    fn faces(&self, family: &str) -> Vec<FaceInfo>;
}

/// Production index backed by `fontdb` with the system fonts loaded.
pub struct SystemFontIndex {
    db: Database,
}

impl SystemFontIndex {
    /// Build the index by enumerating the system's installed fonts.
    pub fn new() -> Self {
        let mut db = Database::new();
        db.load_system_fonts();
        log::info!("Loaded {} system fonts", db.len());
        Self { db }
    }
}

impl Default for SystemFontIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl FontIndex for SystemFontIndex {
    fn faces(&self, family: &str) -> Vec<FaceInfo> {
        self.db
            .faces()
            .filter(|face| {
                face.families
                    .iter()
                    .any(|(name, _)| name.eq_ignore_ascii_case(family))
            })
            .filter_map(|face| {
                // Only file-backed faces are usable: the ligature loader
                // reads the font from disk.
                let path = match &face.source {
                    Source::File(path) | Source::SharedFile(path, _) => path.clone(),
                    Source::Binary(_) => return None,
                };
                Some(FaceInfo {
                    path,
                    face_index: face.index,
                    monospaced: face.monospaced,
                    style: face.style,
                    weight: face.weight,
                })
            })
            .collect()
    }
}
