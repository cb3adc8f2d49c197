//! Concurrency contracts: racing lookups collapse into one build, unrelated
//! units never serialize on each other, and invalidation can race with
//! pointer restoration without corrupting anything.

use base_db::{QualifiedClassId, SourceUnit, UnitSetIndex};
use sema::{LowerTreeBuilder, ModuleSession, SemanticTree, SessionConfig, TreeBuilder};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier, Mutex, mpsc};
use std::time::Duration;
use test_utils::TestModule;

#[test]
fn racing_tree_requests_share_one_build() {
    let module = TestModule::new(&[]);
    module.builder().set_build_delay(Duration::from_millis(20));
    let unit = SourceUnit::from_file("a.aster", "package app\nclass Foo {}");
    let threads = 8;
    let barrier = Barrier::new(threads);

    let trees: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    module.session().semantic_tree(&unit).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(module.build_count(), 1);
    for tree in &trees[1..] {
        assert!(Arc::ptr_eq(&trees[0], tree));
    }
}

#[test]
fn racing_lookups_share_one_symbol() {
    let module = TestModule::new(&[("a.aster", "package app\nclass Foo { fun m() }")]);
    module.builder().set_build_delay(Duration::from_millis(20));
    let id = QualifiedClassId::parse("app/Foo").unwrap();
    let threads = 8;
    let barrier = Barrier::new(threads);

    let symbols: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    module.session().class_symbol(&id, None).unwrap().unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(module.build_count(), 1);
    for symbol in &symbols[1..] {
        assert!(symbols[0].is_same_instance(symbol));
    }
}

/// Blocks inside the build of one specific unit until released, so a test can
/// prove that other units build while that one is in flight.
struct BlockingBuilder {
    inner: LowerTreeBuilder,
    block_path: &'static str,
    entered: AtomicBool,
    timed_out: AtomicBool,
    release: Mutex<Option<mpsc::Receiver<()>>>,
}

impl TreeBuilder for BlockingBuilder {
    fn build_tree(&self, unit: &Arc<SourceUnit>) -> anyhow::Result<SemanticTree> {
        if unit.display_path() == self.block_path {
            self.entered.store(true, Ordering::SeqCst);
            let rx = self.release.lock().unwrap().take();
            if let Some(rx) = rx {
                if rx.recv_timeout(Duration::from_secs(5)).is_err() {
                    self.timed_out.store(true, Ordering::SeqCst);
                }
            }
        }
        self.inner.build_tree(unit)
    }
}

#[test]
fn unrelated_units_build_in_parallel() {
    let (release, rx) = mpsc::channel();
    let builder = Arc::new(BlockingBuilder {
        inner: LowerTreeBuilder,
        block_path: "slow.aster",
        entered: AtomicBool::new(false),
        timed_out: AtomicBool::new(false),
        release: Mutex::new(Some(rx)),
    });
    let session = ModuleSession::new(
        "parallel",
        Arc::new(UnitSetIndex::new()),
        builder.clone(),
        SessionConfig::default(),
    );
    let slow = SourceUnit::from_file("slow.aster", "package app\nfun f()");
    let fast = SourceUnit::from_file("fast.aster", "package app\nfun g()");

    std::thread::scope(|s| {
        let handle = s.spawn(|| session.semantic_tree(&slow).unwrap());
        while !builder.entered.load(Ordering::SeqCst) {
            std::thread::yield_now();
        }

        // the slow build is parked inside the builder; an unrelated unit must
        // still go straight through
        let tree = session.semantic_tree(&fast).unwrap();
        assert_eq!(tree.unit_path(), "fast.aster");

        release.send(()).unwrap();
        let slow_tree = handle.join().unwrap();
        assert_eq!(slow_tree.unit_path(), "slow.aster");
    });

    assert!(!builder.timed_out.load(Ordering::SeqCst));
}

#[test]
fn symbol_resolved_during_invalidation_is_stamped_stale() {
    let (release, rx) = mpsc::channel();
    let builder = Arc::new(BlockingBuilder {
        inner: LowerTreeBuilder,
        block_path: "a.aster",
        entered: AtomicBool::new(false),
        timed_out: AtomicBool::new(false),
        release: Mutex::new(Some(rx)),
    });
    let units = Arc::new(UnitSetIndex::new());
    units.add_unit(SourceUnit::from_file(
        "a.aster",
        "package app\nclass Foo { fun m() }",
    ));
    let session = ModuleSession::new(
        "edit-race",
        units.clone(),
        builder.clone(),
        SessionConfig::default(),
    );
    let id = QualifiedClassId::parse("app/Foo").unwrap();

    std::thread::scope(|s| {
        let handle = s.spawn(|| session.class_symbol(&id, None).unwrap().unwrap());
        while !builder.entered.load(Ordering::SeqCst) {
            std::thread::yield_now();
        }

        // the file changes and the session rotates while the lookup is still
        // inside its tree build
        units.replace_unit(SourceUnit::from_file("a.aster", "package app\nclass Foo {}"));
        session.invalidate();
        release.send(()).unwrap();

        let symbol = handle.join().unwrap();
        // the symbol resolved against the pre-edit tree, so it must carry the
        // generation it resolved under, not the fresh one
        assert_eq!(symbol.declaration().members().len(), 1);
        assert!(!symbol.token().is_valid());
        assert!(!symbol.token().same_token(&session.current_token()));
    });

    // the next lookup sees the edited sources under the fresh token
    let fresh = session.class_symbol(&id, None).unwrap().unwrap();
    assert_eq!(fresh.declaration().members().len(), 0);
    assert!(fresh.token().same_token(&session.current_token()));
}

#[test]
fn invalidation_races_with_pointer_restores() {
    let module = TestModule::new(&[("a.aster", "package app\nclass Foo {}")]);
    let pointer = module
        .session()
        .class_symbol(&QualifiedClassId::parse("app/Foo").unwrap(), None)
        .unwrap()
        .unwrap()
        .create_pointer();
    let stop = AtomicBool::new(false);

    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                while !stop.load(Ordering::SeqCst) {
                    // the sources never change here, so restoration must
                    // succeed no matter how the invalidations interleave
                    let restored = pointer.restore(module.session()).unwrap();
                    assert!(restored.is_some());
                }
            });
        }
        for _ in 0..20 {
            module.session().invalidate();
            std::thread::sleep(Duration::from_millis(1));
        }
        stop.store(true, Ordering::SeqCst);
    });

    let settled = pointer.restore(module.session()).unwrap().unwrap();
    assert!(settled.token().same_token(&module.session().current_token()));
}
