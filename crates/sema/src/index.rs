//! The declaration/callable index: symbol-by-name queries that lazily trigger
//! tree construction.
//!
//! Lookups route through the [`SemanticTreeCache`] without exception, which is
//! what makes results referentially stable: for a fixed session, every query
//! for the same key lands in the same tree instance and therefore hands back
//! the same `Arc<Declaration>`. Results are memoized per key on top of that,
//! so repeated queries don't even walk the tree.

use crate::session::{LifetimeToken, SessionBoundary};
use crate::tree::{Declaration, SemanticTree, TreeBuilder};
use crate::tree_cache::SemanticTreeCache;
use base_db::{CallablePath, PackagePath, QualifiedClassId, SourceIndex, SourceUnit, UnitId};
use dashmap::DashMap;
use itertools::Itertools;
use std::sync::Arc;
use syntax::TextRange;

/// The reserved namespace of the language's own declarations. Queries into it
/// are refused unless the session explicitly opts in, so that user-code
/// lookups can't accidentally resolve into compiler-internal declarations.
pub const BUILTIN_PACKAGE_ROOT: &str = "aster";

/// Per-session lookup policy. Fixed at session construction; evaluated on
/// every call (it is a cheap boolean gate, not a cache, and must never leak
/// into cache keys).
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub allow_builtin_package: bool,
}

impl SessionConfig {
    fn allows_package(&self, package: &PackagePath) -> bool {
        self.allow_builtin_package
            || package
                .first_segment()
                .is_none_or(|segment| segment.as_str() != BUILTIN_PACKAGE_ROOT)
    }
}

/// A physical declaration site, usable as a lookup hint to skip the source
/// index. Hints on synthetic units are ignored.
#[derive(Debug, Clone)]
pub struct SourceDeclaration {
    pub unit: Arc<SourceUnit>,
    pub range: TextRange,
}

impl SourceDeclaration {
    pub fn new(unit: Arc<SourceUnit>, range: TextRange) -> SourceDeclaration {
        SourceDeclaration { unit, range }
    }

    pub fn is_physical(&self) -> bool {
        self.unit.is_physical()
    }
}

struct Memo<T> {
    value: T,
    token: LifetimeToken,
}

/// Maps (package, name) and class ids to declarations, building trees on
/// demand.
pub struct DeclarationIndex {
    boundary: Arc<SessionBoundary>,
    tree_cache: Arc<SemanticTreeCache>,
    source_index: Arc<dyn SourceIndex>,
    builder: Arc<dyn TreeBuilder>,
    config: SessionConfig,
    class_memo: DashMap<(QualifiedClassId, Option<UnitId>), Memo<Option<Arc<Declaration>>>>,
    callable_memo: DashMap<CallablePath, Memo<Vec<Arc<Declaration>>>>,
}

impl DeclarationIndex {
    pub(crate) fn new(
        boundary: Arc<SessionBoundary>,
        tree_cache: Arc<SemanticTreeCache>,
        source_index: Arc<dyn SourceIndex>,
        builder: Arc<dyn TreeBuilder>,
        config: SessionConfig,
    ) -> DeclarationIndex {
        DeclarationIndex {
            boundary,
            tree_cache,
            source_index,
            builder,
            config,
            class_memo: DashMap::new(),
            callable_memo: DashMap::new(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Resolves a class id to its declaration.
    ///
    /// Local and synthetic entities are not indexable by name: for them this
    /// answers `None` immediately, without touching the index or building
    /// anything. A physical `hint` pins the declaring unit and skips the
    /// name-based index scan.
    pub fn classifier(
        &self,
        id: &QualifiedClassId,
        hint: Option<&SourceDeclaration>,
    ) -> anyhow::Result<Option<Arc<Declaration>>> {
        if id.is_local() {
            return Ok(None);
        }
        if !self.config.allows_package(id.package()) {
            tracing::debug!(class_id = %id, "lookup into reserved namespace refused");
            return Ok(None);
        }

        let hint = hint.filter(|it| it.is_physical());
        let key = (id.clone(), hint.map(|it| it.unit.id()));
        if let Some(memo) = self.class_memo.get(&key) {
            if memo.token.is_valid() && self.boundary.is_current(&memo.token) {
                return Ok(memo.value.clone());
            }
        }

        let _p = tracing::debug_span!("classifier", class_id = %id).entered();
        let token = self.boundary.current_token();
        let units = match hint {
            Some(hint) => vec![hint.unit.clone()],
            None => self.source_index.units_declaring_class(id),
        };

        let mut found = None;
        for unit in units.iter().unique_by(|it| it.id()) {
            let tree = self.tree_for_unit(unit)?;
            if let Some(decl) = tree.find_class(id) {
                found = Some(decl);
                break;
            }
        }

        self.class_memo.insert(
            key,
            Memo {
                value: found.clone(),
                token,
            },
        );
        Ok(found)
    }

    /// All top-level callables (functions and properties) with this path, in
    /// declaration order, overloads included. Callers filter by kind.
    ///
    /// `units_hint` bypasses the source index; hinted lookups are not
    /// memoized, on the theory that a caller who already knows the file set
    /// doesn't need the index to remember it.
    pub fn top_level_callables(
        &self,
        path: &CallablePath,
        units_hint: Option<&[Arc<SourceUnit>]>,
    ) -> anyhow::Result<Vec<Arc<Declaration>>> {
        if !self.config.allows_package(path.package()) {
            tracing::debug!(path = %path, "lookup into reserved namespace refused");
            return Ok(Vec::new());
        }

        if let Some(units) = units_hint {
            return self.search_callables(units, path);
        }

        if let Some(memo) = self.callable_memo.get(path) {
            if memo.token.is_valid() && self.boundary.is_current(&memo.token) {
                return Ok(memo.value.clone());
            }
        }

        let _p = tracing::debug_span!("top_level_callables", path = %path).entered();
        let token = self.boundary.current_token();
        let units = self.source_index.units_declaring_callable(path);
        let decls = self.search_callables(&units, path)?;

        self.callable_memo.insert(
            path.clone(),
            Memo {
                value: decls.clone(),
                token,
            },
        );
        Ok(decls)
    }

    fn search_callables(
        &self,
        units: &[Arc<SourceUnit>],
        path: &CallablePath,
    ) -> anyhow::Result<Vec<Arc<Declaration>>> {
        let mut decls = Vec::new();
        for unit in units.iter().unique_by(|it| it.id()) {
            let tree = self.tree_for_unit(unit)?;
            decls.extend(tree.top_level_callables(path));
        }
        Ok(decls)
    }

    /// Routes every tree access through the shared cache; never builds
    /// outside of it.
    pub(crate) fn tree_for_unit(&self, unit: &Arc<SourceUnit>) -> anyhow::Result<Arc<SemanticTree>> {
        self.tree_cache
            .get_or_build(unit, || self.builder.build_tree(unit))
    }

    pub(crate) fn clear_memos(&self) {
        self.class_memo.clear();
        self.callable_memo.clear();
    }
}
