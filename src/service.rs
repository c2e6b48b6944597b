//! Per-terminal ligature joiner lifecycle.
//!
//! For each enabled terminal the service resolves the configured
//! font-family list against the installed-font index, loads the winning
//! face's ligature rules on a background task, and serves cached joiner
//! ranges from a synchronous callback. The contract is fail-silent: a
//! missing or broken font leaves the joiner returning empty ranges and
//! never surfaces an error to the terminal.
//!
//! Per-terminal state machine: `Unresolved → Resolving → {Loaded,
//! Unloadable}`, returning to `Resolving` whenever the font-family value
//! changes. `Unresolved` and `Unloadable` look identical from outside
//! (empty ranges, no refresh); only a successful load is ever signalled.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Weak};

use lru::LruCache;
use parking_lot::Mutex;
use tokio::runtime::Handle;

use crate::family_list;
use crate::font_index::{FaceInfo, FontIndex, SystemFontIndex};
use crate::ligature_loader::{HarfBuzzLoader, LigatureLoader, LigatureRules};
use crate::terminal::{JoinerId, JoinerRange, Terminal};

/// Lines kept in the per-terminal shaped-range cache.
const LINE_CACHE_SIZE: NonZeroUsize = NonZeroUsize::new(256).unwrap();

/// Per-terminal resolution and cache state.
struct JoinerState {
    /// Last observed font-family value, compared by value on every joiner
    /// call. `None` until first resolution (and for non-string values).
    config: Option<String>,

    /// Bumped whenever resolution restarts. A completed load commits its
    /// rule set only if its generation still matches, so results of
    /// superseded loads are discarded on arrival.
    generation: u64,

    /// Loaded rule set; absent while unresolved, resolving, or unloadable.
    rules: Option<Arc<dyn LigatureRules>>,

    /// Recently shaped lines, invalidated whenever the rules change.
    cache: LruCache<String, Vec<JoinerRange>>,
}

impl JoinerState {
    fn new() -> Self {
        Self {
            config: None,
            generation: 0,
            rules: None,
            cache: LruCache::new(LINE_CACHE_SIZE),
        }
    }

    /// Record a new configuration value and drop everything derived from
    /// the old one. Returns the generation the next load must match.
    fn invalidate(&mut self, config: Option<String>) -> u64 {
        self.config = config;
        self.generation += 1;
        self.rules = None;
        self.cache.clear();
        self.generation
    }
}

struct EnabledTerminal {
    state: Arc<Mutex<JoinerState>>,
    joiner_id: JoinerId,
}

/// Terminals are keyed by identity of the host-owned `Arc`.
fn terminal_key(terminal: &Arc<dyn Terminal>) -> usize {
    Arc::as_ptr(terminal) as *const () as usize
}

/// Ligature joiner service.
///
/// One service instance can drive any number of terminals; each enabled
/// terminal owns an independent resolution/cache lifecycle, so switching
/// one terminal's font never affects another's ranges.
pub struct LigatureService {
    font_index: Arc<dyn FontIndex>,
    loader: Arc<dyn LigatureLoader>,
    terminals: Mutex<HashMap<usize, EnabledTerminal>>,
}

impl LigatureService {
    /// Production wiring: system font database + HarfBuzz shaping.
    pub fn new() -> Self {
        Self::with_capabilities(Arc::new(SystemFontIndex::new()), Arc::new(HarfBuzzLoader))
    }

    /// Construct with injected capabilities. Hosts with their own font
    /// enumeration, and tests, substitute implementations here.
    pub fn with_capabilities(
        font_index: Arc<dyn FontIndex>,
        loader: Arc<dyn LigatureLoader>,
    ) -> Self {
        Self {
            font_index,
            loader,
            terminals: Mutex::new(HashMap::new()),
        }
    }

    /// Enable ligature joining for `terminal`.
    ///
    /// Registers the per-line joiner callback and starts resolution for
    /// the terminal's current font-family value. Idempotent: re-invocation
    /// on an already-enabled terminal re-registers the callback (exactly
    /// one joiner stays active) without restarting resolution.
    ///
    /// Must be called from within a tokio runtime context; font loading
    /// runs on that runtime's blocking pool.
    pub fn enable(&self, terminal: &Arc<dyn Terminal>) {
        let key = terminal_key(terminal);

        let state = {
            let mut terminals = self.terminals.lock();
            if let Some(enabled) = terminals.get_mut(&key) {
                log::debug!("Terminal already enabled, re-registering joiner");
                terminal.deregister_character_joiner(enabled.joiner_id);
                enabled.joiner_id = self.register_joiner(terminal, Arc::clone(&enabled.state));
                return;
            }

            let state = Arc::new(Mutex::new(JoinerState::new()));
            let joiner_id = self.register_joiner(terminal, Arc::clone(&state));
            terminals.insert(key, EnabledTerminal {
                state: Arc::clone(&state),
                joiner_id,
            });
            state
        };
        let config = terminal.font_family();
        let generation = state.lock().invalidate(config.clone());
        spawn_resolution(
            &Handle::current(),
            Arc::clone(&self.font_index),
            Arc::clone(&self.loader),
            Arc::downgrade(terminal),
            state,
            config,
            generation,
        );
    }

    /// Disable ligature joining for `terminal`, removing its joiner and
    /// dropping its state. A load still in flight completes harmlessly:
    /// its target state is gone from the registry and the terminal is only
    /// held weakly.
    pub fn disable(&self, terminal: &Arc<dyn Terminal>) {
        let key = terminal_key(terminal);
        if let Some(enabled) = self.terminals.lock().remove(&key) {
            terminal.deregister_character_joiner(enabled.joiner_id);
        }
    }

    /// Build and register the synchronous joiner callback.
    ///
    /// The callback re-reads the font-family value on every call; a changed
    /// value invalidates the cached rules and schedules re-resolution. It
    /// holds the terminal only weakly so the terminal-owns-joiner cycle
    /// cannot leak.
    fn register_joiner(
        &self,
        terminal: &Arc<dyn Terminal>,
        state: Arc<Mutex<JoinerState>>,
    ) -> JoinerId {
        let weak = Arc::downgrade(terminal);
        let font_index = Arc::clone(&self.font_index);
        let loader = Arc::clone(&self.loader);
        let runtime = Handle::current();

        let joiner = Box::new(move |text: &str| -> Vec<JoinerRange> {
            let Some(term) = weak.upgrade() else {
                return Vec::new();
            };

            let current = term.font_family();
            let mut guard = state.lock();
            if current != guard.config {
                let generation = guard.invalidate(current.clone());
                drop(guard);
                spawn_resolution(
                    &runtime,
                    Arc::clone(&font_index),
                    Arc::clone(&loader),
                    Weak::clone(&weak),
                    Arc::clone(&state),
                    current,
                    generation,
                );
                return Vec::new();
            }

            let Some(rules) = guard.rules.clone() else {
                return Vec::new();
            };
            if let Some(ranges) = guard.cache.get(text) {
                return ranges.clone();
            }
            // Shape outside the lock; the rule set is immutable.
            drop(guard);
            let ranges = rules.ranges(text);
            state.lock().cache.put(text.to_string(), ranges.clone());
            ranges
        });

        terminal.register_character_joiner(joiner)
    }
}

impl Default for LigatureService {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve the family list and load ligature rules on a background task.
///
/// Every failure mode along the way (no resolvable candidate, unreadable
/// file, malformed font, loader panic) ends the task silently: no refresh
/// fires and the joiner keeps returning empty ranges.
#[allow(clippy::too_many_arguments)]
fn spawn_resolution(
    runtime: &Handle,
    font_index: Arc<dyn FontIndex>,
    loader: Arc<dyn LigatureLoader>,
    terminal: Weak<dyn Terminal>,
    state: Arc<Mutex<JoinerState>>,
    config: Option<String>,
    generation: u64,
) {
    runtime.spawn(async move {
        let families = family_list::parse(config.as_deref());
        let Some(face) = resolve(font_index.as_ref(), &families) else {
            log::info!(
                "No installed monospace font matches font-family list {:?}",
                families
            );
            return;
        };
        log::info!(
            "Resolved font-family list to {} (face {})",
            face.path.display(),
            face.face_index
        );

        let path = face.path.clone();
        let face_index = face.face_index;
        let loaded = tokio::task::spawn_blocking(move || loader.load_file(&path, face_index)).await;
        let rules = match loaded {
            Ok(Ok(rules)) => rules,
            Ok(Err(e)) => {
                log::warn!("Ligature load failed for {}: {:#}", face.path.display(), e);
                return;
            }
            Err(e) => {
                log::warn!(
                    "Ligature load task panicked for {}: {}",
                    face.path.display(),
                    e
                );
                return;
            }
        };

        {
            let mut guard = state.lock();
            if guard.generation != generation {
                log::debug!(
                    "Discarding stale ligature rules for {} (font changed mid-load)",
                    face.path.display()
                );
                return;
            }
            guard.rules = Some(rules);
            guard.cache.clear();
        }

        // Previously rendered lines were joined with empty ranges; redraw
        // the viewport so they pick up the real ones.
        if let Some(term) = terminal.upgrade() {
            let rows = term.rows();
            term.refresh(0, rows.saturating_sub(1));
        }
    });
}

/// Pick the first family in preference order with an installed monospaced
/// face. Among a family's faces, the regular one wins.
fn resolve(font_index: &dyn FontIndex, families: &[String]) -> Option<FaceInfo> {
    for family in families {
        let faces = font_index.faces(family);
        if faces.is_empty() {
            log::debug!("Font family '{}' is not installed", family);
            continue;
        }
        let mut monospace: Vec<FaceInfo> = faces.into_iter().filter(|f| f.monospaced).collect();
        if monospace.is_empty() {
            log::debug!("Font family '{}' is installed but not monospace", family);
            continue;
        }
        monospace.sort_by_key(|face| {
            (
                face.style != fontdb::Style::Normal,
                face.weight.0.abs_diff(fontdb::Weight::NORMAL.0),
            )
        });
        return monospace.into_iter().next();
    }
    None
}
