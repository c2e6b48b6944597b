//! Minimal contract the ligature addon consumes from a hosting terminal.
//!
//! The addon deliberately sees only a thin slice of the terminal: joiner
//! registration, the font-family option value, and a redraw trigger. The
//! buffer model, selection, and rendering all live on the host side.

/// Half-open `[start, end)` span of character indices within one line of
/// terminal text.
///
/// The renderer draws the covered characters as a single glyph cluster
/// (e.g. `->` rendered as one arrow glyph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JoinerRange {
    /// First character index covered (inclusive)
    pub start: usize,
    /// One past the last character index covered (exclusive)
    pub end: usize,
}

impl JoinerRange {
    /// Create a new range covering `[start, end)`.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of characters covered.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Whether the range covers no characters.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Identifier handed back by joiner registration, used for deregistration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JoinerId(pub u64);

/// Synchronous per-line callback: line text in, joiner ranges out.
///
/// Called once per visible line per render pass, so it must be cheap and
/// must never block or panic.
pub type Joiner = Box<dyn Fn(&str) -> Vec<JoinerRange> + Send + Sync>;

/// The slice of terminal functionality the ligature addon needs.
///
/// Hosts implement this on their terminal widget; tests substitute fakes.
pub trait Terminal: Send + Sync {
    /// Install a per-line character joiner callback.
    fn register_character_joiner(&self, joiner: Joiner) -> JoinerId;

    /// Remove a previously installed joiner callback.
    fn deregister_character_joiner(&self, id: JoinerId);

    /// Current font-family option value (comma-separated, optionally
    /// quoted names).
    ///
    /// `None` models an unset or non-string option value; resolution then
    /// finds no candidates and the joiner stays in the empty-range state.
    fn font_family(&self) -> Option<String>;

    /// Request a redraw of the inclusive line span `[start_line, end_line]`.
    fn refresh(&self, start_line: usize, end_line: usize);

    /// Number of visible rows, used to refresh the whole viewport after a
    /// font load completes.
    fn rows(&self) -> usize;
}
