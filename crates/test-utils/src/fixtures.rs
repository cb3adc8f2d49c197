//! A `TestModule` bundles a unit set, an instrumented builder and index, and a
//! [`ModuleSession`] over them, so tests can assert not only on results but on
//! how much work producing them took.

use anyhow::bail;
use base_db::{CallablePath, QualifiedClassId, SourceIndex, SourceUnit, UnitSetIndex};
use sema::{LowerTreeBuilder, ModuleSession, SemanticTree, SessionConfig, TreeBuilder};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Delegates to [`LowerTreeBuilder`], counting every build. Optionally sleeps
/// inside the build (to widen race windows) or fails the next n builds.
pub struct CountingBuilder {
    inner: LowerTreeBuilder,
    builds: AtomicUsize,
    delay_ms: AtomicU64,
    fail_next: AtomicUsize,
}

impl CountingBuilder {
    pub fn new() -> Arc<CountingBuilder> {
        Arc::new(CountingBuilder {
            inner: LowerTreeBuilder,
            builds: AtomicUsize::new(0),
            delay_ms: AtomicU64::new(0),
            fail_next: AtomicUsize::new(0),
        })
    }

    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    pub fn set_build_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Makes the next `n` builds fail with a synthetic error.
    pub fn fail_next_builds(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }
}

impl TreeBuilder for CountingBuilder {
    fn build_tree(&self, unit: &Arc<SourceUnit>) -> anyhow::Result<SemanticTree> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            std::thread::sleep(Duration::from_millis(delay));
        }
        if self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            bail!("injected build failure for `{}`", unit.display_path());
        }
        self.inner.build_tree(unit)
    }
}

/// Delegates to a [`UnitSetIndex`], counting every query.
pub struct CountingIndex {
    inner: Arc<UnitSetIndex>,
    queries: AtomicUsize,
}

impl CountingIndex {
    pub fn new(inner: Arc<UnitSetIndex>) -> Arc<CountingIndex> {
        Arc::new(CountingIndex {
            inner,
            queries: AtomicUsize::new(0),
        })
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl SourceIndex for CountingIndex {
    fn units_declaring_class(&self, id: &QualifiedClassId) -> Vec<Arc<SourceUnit>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.units_declaring_class(id)
    }

    fn units_declaring_callable(&self, path: &CallablePath) -> Vec<Arc<SourceUnit>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.units_declaring_callable(path)
    }
}

/// One module under test: source files, session, and the counters behind it.
pub struct TestModule {
    units: Arc<UnitSetIndex>,
    index: Arc<CountingIndex>,
    builder: Arc<CountingBuilder>,
    session: ModuleSession,
}

impl TestModule {
    /// `files` are `(path, text)` pairs.
    pub fn new(files: &[(&str, &str)]) -> TestModule {
        TestModule::with_config(files, SessionConfig::default())
    }

    pub fn with_config(files: &[(&str, &str)], config: SessionConfig) -> TestModule {
        crate::tracing::init_tracing_for_test();
        let units = Arc::new(UnitSetIndex::new());
        for (path, text) in files {
            units.add_unit(SourceUnit::from_file(*path, text));
        }
        let index = CountingIndex::new(units.clone());
        let builder = CountingBuilder::new();
        let session = ModuleSession::new("test-module", index.clone(), builder.clone(), config);
        TestModule {
            units,
            index,
            builder,
            session,
        }
    }

    pub fn session(&self) -> &ModuleSession {
        &self.session
    }

    pub fn builder(&self) -> &CountingBuilder {
        &self.builder
    }

    pub fn build_count(&self) -> usize {
        self.builder.build_count()
    }

    pub fn index_query_count(&self) -> usize {
        self.index.query_count()
    }

    /// The current unit at `path`.
    ///
    /// Panics when no such file exists; fixtures are static enough that a typo
    /// here is a test bug.
    pub fn unit(&self, path: &str) -> Arc<SourceUnit> {
        self.units
            .all_units()
            .into_iter()
            .find(|unit| unit.display_path() == path)
            .unwrap_or_else(|| panic!("no unit at `{path}` in fixture"))
    }

    pub fn add_file(&self, path: &str, text: &str) -> Arc<SourceUnit> {
        let unit = SourceUnit::from_file(path, text);
        self.units.add_unit(unit.clone());
        self.session.invalidate();
        unit
    }

    /// Simulates an edit: swaps in a fresh unit for `path` and invalidates the
    /// session, exactly as a file watcher would.
    pub fn change_file(&self, path: &str, text: &str) -> Arc<SourceUnit> {
        let unit = SourceUnit::from_file(path, text);
        self.units.replace_unit(unit.clone());
        self.session.invalidate();
        unit
    }

    pub fn remove_file(&self, path: &str) {
        let unit = self.unit(path);
        self.units.remove_unit(&unit);
        self.session.invalidate();
    }

    pub fn add_builtins(&self, text: &str) -> Arc<SourceUnit> {
        let unit = SourceUnit::synthetic("<builtins>", text);
        self.units.add_unit(unit.clone());
        self.session.invalidate();
        unit
    }
}
