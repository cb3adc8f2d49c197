//! The per-module semantic-tree cache: build once, memoize weakly.
//!
//! The locking story is the whole point of this module. Each source unit gets
//! its own slot with its own mutex; a thread only ever blocks while another
//! thread is building the *same* unit's tree. Concurrent builds of the same
//! unit collapse into one — the losers wait for the winner and receive the
//! winner's instance. Builds of different units proceed fully in parallel.
//!
//! A failed build publishes nothing and poisons nothing: the slot mutex is a
//! `parking_lot` one and the slot is simply left empty, so the next caller
//! retries from scratch.

use crate::session::SessionBoundary;
use crate::tree::SemanticTree;
use base_db::{SourceUnit, UnitId};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crate::session::LifetimeToken;

/// Raised when a caller asserts that a tree must already have been built and
/// the cache disagrees. A programming-contract violation, not a recoverable
/// condition — carry it upward, do not retry.
#[derive(Debug, thiserror::Error)]
#[error(
    "no semantic tree cached for `{unit_path}` in module `{module}` (session generation {generation})"
)]
pub struct NotCachedError {
    pub unit_path: String,
    pub module: String,
    pub generation: u64,
}

struct Published {
    tree: Arc<SemanticTree>,
    token: LifetimeToken,
}

struct Slot {
    /// Weak on purpose: a cached tree must never keep an unloaded source
    /// unit alive.
    unit: Weak<SourceUnit>,
    unit_path: String,
    state: Arc<Mutex<Option<Published>>>,
}

impl Slot {
    fn new(unit: &Arc<SourceUnit>) -> Slot {
        Slot {
            unit: Arc::downgrade(unit),
            unit_path: unit.display_path().to_string(),
            state: Arc::new(Mutex::new(None)),
        }
    }
}

/// Maps a source unit to its built semantic tree within the current session.
pub struct SemanticTreeCache {
    module: String,
    boundary: Arc<SessionBoundary>,
    slots: DashMap<UnitId, Slot>,
    ops: AtomicU64,
}

// sweep dead slots once per this many cache operations
const SWEEP_INTERVAL: u64 = 64;

impl SemanticTreeCache {
    pub fn new(module: &str, boundary: Arc<SessionBoundary>) -> SemanticTreeCache {
        SemanticTreeCache {
            module: module.to_string(),
            boundary,
            slots: DashMap::new(),
            ops: AtomicU64::new(0),
        }
    }

    /// Returns the tree for `unit`, building it with `build` if the current
    /// session has none yet.
    ///
    /// `build` runs under this unit's slot lock and nothing else: callers for
    /// other units are unaffected, callers for this unit block until the
    /// result is published and then share it. `build` failing leaves the slot
    /// unpublished; the error goes to whoever ran the build, and later calls
    /// are free to retry.
    pub fn get_or_build<E>(
        &self,
        unit: &Arc<SourceUnit>,
        build: impl FnOnce() -> Result<SemanticTree, E>,
    ) -> Result<Arc<SemanticTree>, E> {
        self.maybe_sweep();

        // the slot is created outside its lock; the shard guard must not be
        // held while building
        let state = {
            let slot = self
                .slots
                .entry(unit.id())
                .or_insert_with(|| Slot::new(unit));
            slot.state.clone()
        };

        let token = self.boundary.current_token();
        let mut guard = state.lock();
        if let Some(published) = guard.as_ref() {
            if published.token.is_valid() && self.boundary.is_current(&published.token) {
                return Ok(published.tree.clone());
            }
            // previous session's tree; drop it and rebuild
            *guard = None;
        }

        let _p = tracing::info_span!(
            "build_semantic_tree",
            module = %self.module,
            unit = %unit.display_path(),
        )
        .entered();
        let tree = Arc::new(build()?);
        // a build overtaken by an invalidation still hands its tree to the
        // caller, but is not published; the next caller rebuilds from the
        // current sources
        if token.is_valid() && self.boundary.is_current(&token) {
            *guard = Some(Published {
                tree: tree.clone(),
                token,
            });
        }
        Ok(tree)
    }

    /// The already-published tree for `unit_id`, or a [`NotCachedError`] if
    /// the current session has none. For callers whose contract says a build
    /// must have happened before.
    pub fn get_cached(&self, unit_id: UnitId) -> Result<Arc<SemanticTree>, NotCachedError> {
        let generation = self.boundary.current_token().generation();
        let not_cached = |unit_path: String| {
            tracing::error!(
                module = %self.module,
                unit = %unit_path,
                generation,
                "semantic tree expected to be cached but is not"
            );
            NotCachedError {
                unit_path,
                module: self.module.clone(),
                generation,
            }
        };

        let Some(slot) = self.slots.get(&unit_id) else {
            return Err(not_cached(format!("unit #{}", unit_id.index())));
        };
        let state = slot.state.clone();
        let unit_path = slot.unit_path.clone();
        drop(slot);

        let guard = state.lock();
        match guard.as_ref() {
            Some(published)
                if published.token.is_valid() && self.boundary.is_current(&published.token) =>
            {
                Ok(published.tree.clone())
            }
            _ => Err(not_cached(unit_path)),
        }
    }

    /// Number of live slots, dead ones included until the next sweep.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Drops slots whose source unit is gone. Runs opportunistically every
    /// [`SWEEP_INTERVAL`] operations; exposed so that callers with sharp
    /// memory budgets (and tests) can force it.
    pub fn evict_dead(&self) {
        self.slots.retain(|_, slot| slot.unit.strong_count() > 0);
    }

    /// Drops everything. Used on session invalidation; entries would be
    /// ignored from now on anyway, this only frees them earlier. An in-flight
    /// build publishes into a detached slot and is dropped with it.
    pub fn clear(&self) {
        self.slots.clear();
    }

    fn maybe_sweep(&self) {
        let ops = self.ops.fetch_add(1, Ordering::Relaxed);
        if ops % SWEEP_INTERVAL == SWEEP_INTERVAL - 1 {
            self.evict_dead();
        }
    }
}
