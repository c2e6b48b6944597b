//! Ligature rule loading and range computation via HarfBuzz shaping.
//!
//! A font's "ligature rules" are not read directly from its GSUB tables;
//! instead the loaded face is shaped (rustybuzz) with the ligature feature
//! set enabled, and every cluster that collapses two or more input
//! characters into a single glyph is reported as a joiner range.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use rustybuzz::{Face, Feature, UnicodeBuffer};

use crate::terminal::JoinerRange;

/// OpenType features that drive ligature substitution:
/// - `liga`: standard ligatures (fi, fl)
/// - `clig`: contextual ligatures (often `->`, `=>` in coding fonts)
/// - `dlig`: discretionary ligatures
/// - `calt`: contextual alternates (`www` in Fira Code)
/// - `ccmp`: glyph composition, required for correct cluster output
const LIGATURE_FEATURES: &[&str] = &["liga", "clig", "dlig", "calt", "ccmp"];

/// Immutable ligature behavior of one loaded font face.
///
/// Implementations must be infallible: any input text maps to a (possibly
/// empty) list of ascending, non-overlapping ranges, never a panic.
pub trait LigatureRules: Send + Sync {
    /// Joiner ranges for one line of text, in ascending order.
    fn ranges(&self, text: &str) -> Vec<JoinerRange>;
}

/// Capability interface for loading ligature rules from a font file.
///
/// The load is synchronous and fallible; the service runs it on a blocking
/// task so the render path never waits on it. Injected so tests substitute
/// fakes instead of needing font fixtures on disk.
pub trait LigatureLoader: Send + Sync {
    /// Load the ligature rules of the face at `path` / `face_index`.
    fn load_file(&self, path: &Path, face_index: u32) -> Result<Arc<dyn LigatureRules>>;
}

/// Production loader: HarfBuzz shaping via rustybuzz.
pub struct HarfBuzzLoader;

impl LigatureLoader for HarfBuzzLoader {
    fn load_file(&self, path: &Path, face_index: u32) -> Result<Arc<dyn LigatureRules>> {
        let data = std::fs::read(path)
            .with_context(|| format!("reading font file {}", path.display()))?;
        if Face::from_slice(&data, face_index).is_none() {
            return Err(anyhow!(
                "font face {} of {} is not parseable",
                face_index,
                path.display()
            ));
        }
        log::debug!(
            "Loaded ligature rules from {} ({} bytes, face {})",
            path.display(),
            data.len(),
            face_index
        );
        Ok(Arc::new(HarfBuzzRules { data, face_index }))
    }
}

/// Rule set backed by the raw font bytes; shapes on demand.
struct HarfBuzzRules {
    data: Vec<u8>,
    face_index: u32,
}

impl LigatureRules for HarfBuzzRules {
    fn ranges(&self, text: &str) -> Vec<JoinerRange> {
        if text.is_empty() {
            return Vec::new();
        }
        // Validated at load time; a parse failure here degrades to empty
        // ranges rather than panicking.
        let Some(face) = Face::from_slice(&self.data, self.face_index) else {
            return Vec::new();
        };

        let mut buffer = UnicodeBuffer::new();
        buffer.push_str(text);
        buffer.set_direction(rustybuzz::Direction::LeftToRight);

        let features: Vec<Feature> = LIGATURE_FEATURES
            .iter()
            .filter_map(|tag| Feature::from_str(tag).ok())
            .collect();

        let shaped = rustybuzz::shape(&face, &features, buffer);
        let runs = cluster_runs(shaped.glyph_infos().iter().map(|info| info.cluster));
        ranges_from_clusters(text, &runs)
    }
}

/// A run of consecutive glyphs sharing one cluster value.
///
/// Cluster values are byte offsets into the shaped text; for left-to-right
/// shaping they arrive in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterRun {
    /// Byte offset of the cluster start within the shaped text
    pub start_byte: usize,
    /// Number of glyphs the cluster produced
    pub glyph_count: usize,
}

impl ClusterRun {
    /// Create a run starting at `start_byte` with `glyph_count` glyphs.
    pub fn new(start_byte: usize, glyph_count: usize) -> Self {
        Self {
            start_byte,
            glyph_count,
        }
    }
}

fn cluster_runs(clusters: impl Iterator<Item = u32>) -> Vec<ClusterRun> {
    let mut runs: Vec<ClusterRun> = Vec::new();
    for cluster in clusters {
        let start_byte = cluster as usize;
        match runs.last_mut() {
            Some(run) if run.start_byte == start_byte => run.glyph_count += 1,
            _ => runs.push(ClusterRun::new(start_byte, 1)),
        }
    }
    runs
}

/// Translate shaped cluster runs into joiner ranges.
///
/// A cluster spanning two or more input characters that shaped to exactly
/// one glyph is a ligature (or a mark-merged cluster); either way the
/// renderer must draw the span as one unit. Ranges come out in character
/// indices, half-open, ascending, and non-overlapping because the runs
/// themselves partition the text.
pub fn ranges_from_clusters(text: &str, runs: &[ClusterRun]) -> Vec<JoinerRange> {
    let char_starts: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    let char_at = |byte: usize| char_starts.binary_search(&byte).unwrap_or_else(|i| i);

    let mut ranges = Vec::new();
    for (i, run) in runs.iter().enumerate() {
        let end_byte = runs.get(i + 1).map_or(text.len(), |next| next.start_byte);
        if end_byte <= run.start_byte {
            continue;
        }
        let start = char_at(run.start_byte);
        let end = char_at(end_byte);
        if run.glyph_count == 1 && end - start >= 2 {
            ranges.push(JoinerRange::new(start, end));
        }
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_to_one_clusters_produce_no_ranges() {
        let runs: Vec<ClusterRun> = (0..5).map(|i| ClusterRun::new(i, 1)).collect();
        assert!(ranges_from_clusters("hello", &runs).is_empty());
    }

    #[test]
    fn test_ligature_clusters_become_ranges() {
        // "a -> b www c" shaped the way Fira Code does: `->` and `www`
        // each collapse into one glyph.
        let text = "a -> b www c";
        let runs = vec![
            ClusterRun::new(0, 1),  // a
            ClusterRun::new(1, 1),  // space
            ClusterRun::new(2, 1),  // -> (bytes 2..4)
            ClusterRun::new(4, 1),  // space
            ClusterRun::new(5, 1),  // b
            ClusterRun::new(6, 1),  // space
            ClusterRun::new(7, 1),  // www (bytes 7..10)
            ClusterRun::new(10, 1), // space
            ClusterRun::new(11, 1), // c
        ];
        assert_eq!(ranges_from_clusters(text, &runs), vec![
            JoinerRange::new(2, 4),
            JoinerRange::new(7, 10)
        ]);
    }

    #[test]
    fn test_trailing_ligature_uses_text_end() {
        let text = "x ->";
        let runs = vec![
            ClusterRun::new(0, 1),
            ClusterRun::new(1, 1),
            ClusterRun::new(2, 1), // -> runs to end of text
        ];
        assert_eq!(ranges_from_clusters(text, &runs), vec![JoinerRange::new(
            2, 4
        )]);
    }

    #[test]
    fn test_multi_glyph_cluster_is_not_joined() {
        // A cluster that decomposed into several glyphs is not a ligature.
        let text = "ab";
        let runs = vec![ClusterRun::new(0, 2)];
        assert!(ranges_from_clusters(text, &runs).is_empty());
    }

    #[test]
    fn test_multibyte_text_maps_to_char_indices() {
        // "é→x" with the two-char span "é→" merged: bytes 0..5, chars 0..2.
        let text = "é→x";
        let runs = vec![ClusterRun::new(0, 1), ClusterRun::new(5, 1)];
        assert_eq!(ranges_from_clusters(text, &runs), vec![JoinerRange::new(
            0, 2
        )]);
    }

    #[test]
    fn test_cluster_run_grouping() {
        let runs = cluster_runs(vec![0u32, 1, 1, 1, 4].into_iter());
        assert_eq!(runs, vec![
            ClusterRun::new(0, 1),
            ClusterRun::new(1, 3),
            ClusterRun::new(4, 1)
        ]);
    }

    #[test]
    fn test_loader_rejects_unreadable_file() {
        let err = HarfBuzzLoader.load_file(Path::new("/nonexistent/font.ttf"), 0);
        assert!(err.is_err());
    }

    #[test]
    fn test_loader_rejects_malformed_font() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.ttf");
        std::fs::write(&path, b"this is not a font").unwrap();
        assert!(HarfBuzzLoader.load_file(&path, 0).is_err());
    }

    #[test]
    fn test_empty_text_shapes_to_no_ranges() {
        let rules = HarfBuzzRules {
            data: Vec::new(),
            face_index: 0,
        };
        assert!(rules.ranges("").is_empty());
        // Unparseable data degrades to empty ranges, never a panic.
        assert!(rules.ranges("a -> b").is_empty());
    }
}
