//! Session lifetimes and the [`ModuleSession`] facade.
//!
//! A "session" is one generation of a module's analysis state. Everything a
//! session produces — trees, declarations, symbols — is stamped with the
//! session's [`LifetimeToken`]. Invalidating the session flips that token off
//! forever and swaps in a fresh one; cached data tagged with the old token is
//! then ignored wherever it is next encountered. Nothing walks the caches to
//! push invalidation eagerly.

use crate::index::{DeclarationIndex, SessionConfig, SourceDeclaration};
use crate::symbols::{Symbol, SymbolCache, SymbolLocator};
use crate::tree::{SemanticTree, TreeBuilder};
use crate::tree_cache::{NotCachedError, SemanticTreeCache};
use base_db::{CallablePath, QualifiedClassId, SourceIndex, SourceUnit, UnitId};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// A monotonic-once validity flag for one session generation.
///
/// Cheap to clone and compare; everything produced by a session carries one.
/// Once [`invalidated`](SessionBoundary::invalidate) a token never becomes
/// valid again.
#[derive(Clone)]
pub struct LifetimeToken {
    inner: Arc<TokenInner>,
}

struct TokenInner {
    valid: AtomicBool,
    generation: u64,
    boundary_id: u64,
}

impl LifetimeToken {
    fn new(boundary_id: u64, generation: u64) -> LifetimeToken {
        LifetimeToken {
            inner: Arc::new(TokenInner {
                valid: AtomicBool::new(true),
                generation,
                boundary_id,
            }),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.inner.valid.load(Ordering::Acquire)
    }

    /// The generation counter of the owning boundary at mint time. Only used
    /// for diagnostics; validity checks go through [`is_valid`] and pointer
    /// identity.
    ///
    /// [`is_valid`]: LifetimeToken::is_valid
    pub fn generation(&self) -> u64 {
        self.inner.generation
    }

    pub(crate) fn boundary_id(&self) -> u64 {
        self.inner.boundary_id
    }

    pub fn same_token(&self, other: &LifetimeToken) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Whether data tagged with this token may be served to `session`.
    ///
    /// Panics if the token was minted by an unrelated module's boundary:
    /// mixing sessions of different modules is a programming error, not a
    /// cache miss.
    pub fn is_accessible(&self, session: &ModuleSession) -> bool {
        let boundary = session.boundary();
        assert_eq!(
            self.inner.boundary_id,
            boundary.id(),
            "token of generation {} (boundary {}) used with unrelated module `{}` (boundary {})",
            self.inner.generation,
            self.inner.boundary_id,
            session.name(),
            boundary.id(),
        );
        boundary.is_current(self)
    }

    fn invalidate(&self) {
        self.inner.valid.store(false, Ordering::Release);
    }
}

impl fmt::Debug for LifetimeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LifetimeToken(gen {}, {})",
            self.inner.generation,
            if self.is_valid() { "valid" } else { "invalidated" }
        )
    }
}

/// Owns the current [`LifetimeToken`] of a module and rotates it on
/// invalidation. The single source of truth for "is this cached data still
/// good"; no component watches files or polls for changes itself.
pub struct SessionBoundary {
    id: u64,
    current: RwLock<LifetimeToken>,
}

impl SessionBoundary {
    pub fn new() -> SessionBoundary {
        static NEXT_BOUNDARY_ID: AtomicU64 = AtomicU64::new(0);
        let id = NEXT_BOUNDARY_ID.fetch_add(1, Ordering::Relaxed);
        SessionBoundary {
            id,
            current: RwLock::new(LifetimeToken::new(id, 0)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn current_token(&self) -> LifetimeToken {
        self.current.read().clone()
    }

    pub fn is_current(&self, token: &LifetimeToken) -> bool {
        self.current.read().same_token(token)
    }

    /// Permanently invalidates the current token and atomically swaps in a
    /// fresh one. Readers observe either the old (now invalid) token or the
    /// new one, never a half-rotated state.
    pub fn invalidate(&self) -> LifetimeToken {
        let mut current = self.current.write();
        current.invalidate();
        let next = LifetimeToken::new(self.id, current.generation() + 1);
        tracing::info!(
            boundary = self.id,
            old_generation = current.generation(),
            "session invalidated"
        );
        *current = next.clone();
        next
    }
}

impl Default for SessionBoundary {
    fn default() -> SessionBoundary {
        SessionBoundary::new()
    }
}

impl fmt::Debug for SessionBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionBoundary")
            .field("id", &self.id)
            .field("current", &self.current_token())
            .finish()
    }
}

/// One module's analysis state: the session boundary plus every cache keyed
/// off it. The primary API to resolve names into symbols.
///
/// Sessions are self-contained; two `ModuleSession`s never share caches, so
/// independent modules (or tests) can run side by side without cross-talk.
pub struct ModuleSession {
    name: String,
    boundary: Arc<SessionBoundary>,
    tree_cache: Arc<SemanticTreeCache>,
    index: DeclarationIndex,
    symbols: SymbolCache,
}

impl ModuleSession {
    pub fn new(
        name: impl Into<String>,
        source_index: Arc<dyn SourceIndex>,
        builder: Arc<dyn TreeBuilder>,
        config: SessionConfig,
    ) -> ModuleSession {
        let name = name.into();
        let boundary = Arc::new(SessionBoundary::new());
        let tree_cache = Arc::new(SemanticTreeCache::new(&name, boundary.clone()));
        let index = DeclarationIndex::new(
            boundary.clone(),
            tree_cache.clone(),
            source_index,
            builder,
            config,
        );
        ModuleSession {
            name,
            boundary,
            tree_cache,
            index,
            symbols: SymbolCache::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn boundary(&self) -> &Arc<SessionBoundary> {
        &self.boundary
    }

    pub fn current_token(&self) -> LifetimeToken {
        self.boundary.current_token()
    }

    pub fn tree_cache(&self) -> &Arc<SemanticTreeCache> {
        &self.tree_cache
    }

    pub fn declaration_index(&self) -> &DeclarationIndex {
        &self.index
    }

    /// Builds (or returns the cached) semantic tree for `unit` within the
    /// current session.
    pub fn semantic_tree(&self, unit: &Arc<SourceUnit>) -> anyhow::Result<Arc<SemanticTree>> {
        self.index.tree_for_unit(unit)
    }

    /// The already-built tree owning `unit_id`. Callers use this when a prior
    /// build is part of their contract; a miss is a bug on their side, not a
    /// recoverable condition.
    pub fn containing_tree(&self, unit_id: UnitId) -> Result<Arc<SemanticTree>, NotCachedError> {
        self.tree_cache.get_cached(unit_id)
    }

    /// Resolves a class id to its symbol. `hint`, when physical, pins the
    /// declaring unit and skips the source index entirely.
    pub fn class_symbol(
        &self,
        id: &QualifiedClassId,
        hint: Option<&SourceDeclaration>,
    ) -> anyhow::Result<Option<Symbol>> {
        // captured before resolving: a symbol is stamped with the generation
        // its resolution ran under, so an invalidation racing with the lookup
        // leaves the result stale, never stale-but-fresh-looking
        let token = self.boundary.current_token();
        let decl = self.index.classifier(id, hint)?;
        Ok(decl.map(|decl| {
            self.symbols.symbol_for(
                &self.boundary,
                &token,
                &decl,
                SymbolLocator::Class(id.clone()),
            )
        }))
    }

    /// All top-level callables (functions and properties, overloads included)
    /// with the given path, as symbols. Callers filter by kind.
    pub fn callable_symbols(
        &self,
        path: &CallablePath,
        units_hint: Option<&[Arc<SourceUnit>]>,
    ) -> anyhow::Result<Vec<Symbol>> {
        let token = self.boundary.current_token();
        let decls = self.index.top_level_callables(path, units_hint)?;
        let mut fun_ordinal = 0u32;
        let mut prop_ordinal = 0u32;
        let symbols = decls
            .iter()
            .filter_map(|decl| {
                let kind = decl.callable_kind()?;
                let ordinal = match kind {
                    crate::tree::CallableKind::Function => &mut fun_ordinal,
                    crate::tree::CallableKind::Property => &mut prop_ordinal,
                };
                let locator = SymbolLocator::TopLevelCallable {
                    path: path.clone(),
                    kind,
                    ordinal: *ordinal,
                };
                *ordinal += 1;
                Some(self.symbols.symbol_for(&self.boundary, &token, decl, locator))
            })
            .collect();
        Ok(symbols)
    }

    /// Re-resolves a locator against the current session. The slow path of
    /// pointer restoration.
    pub(crate) fn resolve_locator(
        &self,
        locator: &SymbolLocator,
    ) -> anyhow::Result<Option<Symbol>> {
        match locator {
            SymbolLocator::Class(id) => self.class_symbol(id, None),
            SymbolLocator::TopLevelCallable { path, .. } => {
                let candidates = self.callable_symbols(path, None)?;
                Ok(candidates.into_iter().find(|it| it.locator() == locator))
            }
            SymbolLocator::Member { owner, .. } => {
                let Some(class) = self.class_symbol(owner, None)? else {
                    return Ok(None);
                };
                Ok(class
                    .members(self)
                    .into_iter()
                    .find(|it| it.locator() == locator))
            }
            SymbolLocator::Accessor { owner, kind } => {
                let Some(owner) = self.resolve_locator(owner)? else {
                    return Ok(None);
                };
                Ok(owner.accessor(self, *kind))
            }
        }
    }

    pub(crate) fn symbols(&self) -> &SymbolCache {
        &self.symbols
    }

    /// Invalidates the current session: the active token is permanently
    /// flipped off and a fresh one takes its place. Data already handed out
    /// stays alive for whoever holds it, but no cache will serve it again.
    ///
    /// Triggered externally — a source edit, a module reload. This layer
    /// never decides on its own that sources changed.
    pub fn invalidate(&self) {
        let _p = tracing::info_span!("invalidate_session", module = %self.name).entered();
        self.boundary.invalidate();
        // stale entries would be dropped lazily anyway; clearing now just
        // returns the memory earlier
        self.tree_cache.clear();
        self.index.clear_memos();
        self.symbols.clear();
    }
}

impl fmt::Debug for ModuleSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleSession")
            .field("name", &self.name)
            .field("boundary", &self.boundary)
            .finish()
    }
}
