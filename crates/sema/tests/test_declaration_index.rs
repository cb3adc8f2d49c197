//! Lookup behavior through [`ModuleSession`]: laziness, memoization, hints,
//! and the reserved-namespace gate. The counters in [`TestModule`] let these
//! tests assert not just what a lookup returned but what it cost.

use base_db::{CallablePath, Name, PackagePath, QualifiedClassId, SourceUnit};
use sema::{SessionConfig, SourceDeclaration};
use syntax::TextRange;
use test_utils::TestModule;

fn class_id(text: &str) -> QualifiedClassId {
    QualifiedClassId::parse(text).unwrap()
}

fn callable(text: &str) -> CallablePath {
    CallablePath::parse(text).unwrap()
}

#[test]
fn repeated_class_lookups_are_referentially_stable() {
    let module = TestModule::new(&[("a.aster", "package app\nclass Foo { fun m() }")]);
    let id = class_id("app/Foo");

    let first = module.session().class_symbol(&id, None).unwrap().unwrap();
    let second = module.session().class_symbol(&id, None).unwrap().unwrap();

    assert!(first.is_same_instance(&second));
    assert_eq!(module.build_count(), 1);
    assert_eq!(module.index_query_count(), 1);
}

#[test]
fn lookup_builds_only_candidate_units() {
    let module = TestModule::new(&[
        ("a.aster", "package app\nclass Bar {}"),
        ("b.aster", "package app\nclass Foo {}"),
        ("c.aster", "package other\nclass Foo {}"),
    ]);

    let symbol = module
        .session()
        .class_symbol(&class_id("app/Foo"), None)
        .unwrap()
        .unwrap();
    assert_eq!(symbol.name().as_str(), "Foo");

    // the over-broad index returns both `app` units, so both get built while
    // searching; the `other` unit is never touched
    assert_eq!(module.build_count(), 2);
}

#[test]
fn physical_hint_skips_the_source_index() {
    let module = TestModule::new(&[
        ("a.aster", "package app\nclass Foo {}"),
        ("b.aster", "package app\nclass Bar {}"),
    ]);
    let hint = SourceDeclaration::new(module.unit("a.aster"), TextRange::default());

    let symbol = module
        .session()
        .class_symbol(&class_id("app/Foo"), Some(&hint))
        .unwrap();

    assert!(symbol.is_some());
    assert_eq!(module.index_query_count(), 0);
    assert_eq!(module.build_count(), 1);
}

#[test]
fn hint_on_synthetic_unit_falls_back_to_the_index() {
    let module = TestModule::new(&[]);
    let builtins = module.add_builtins("package lib\nclass Foo {}");
    let hint = SourceDeclaration::new(builtins, TextRange::default());

    let symbol = module
        .session()
        .class_symbol(&class_id("lib/Foo"), Some(&hint))
        .unwrap();

    // the synthetic hint is ignored, but the unit itself is indexed
    assert!(symbol.is_some());
    assert_eq!(module.index_query_count(), 1);
}

#[test]
fn local_classes_resolve_to_nothing_without_any_work() {
    let module = TestModule::new(&[("a.aster", "package app\nclass Foo {}")]);
    let local = QualifiedClassId::local(PackagePath::parse("app"), Name::new("Helper"));

    let symbol = module.session().class_symbol(&local, None).unwrap();

    assert!(symbol.is_none());
    assert_eq!(module.build_count(), 0);
    assert_eq!(module.index_query_count(), 0);
}

#[test]
fn reserved_namespace_is_refused_by_default() {
    let files = [("builtins.aster", "package aster\nclass Int {}\nfun abs(x: Int): Int")];

    let module = TestModule::new(&files);
    assert!(
        module
            .session()
            .class_symbol(&class_id("aster/Int"), None)
            .unwrap()
            .is_none()
    );
    assert!(
        module
            .session()
            .callable_symbols(&callable("aster/abs"), None)
            .unwrap()
            .is_empty()
    );
    assert_eq!(module.build_count(), 0);
    assert_eq!(module.index_query_count(), 0);

    let permissive = TestModule::with_config(
        &files,
        SessionConfig {
            allow_builtin_package: true,
        },
    );
    assert!(
        permissive
            .session()
            .class_symbol(&class_id("aster/Int"), None)
            .unwrap()
            .is_some()
    );
    assert_eq!(
        permissive
            .session()
            .callable_symbols(&callable("aster/abs"), None)
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn repeated_callable_lookups_build_once() {
    let module = TestModule::new(&[("a.aster", "package app\nfun f(): Int")]);
    let path = callable("app/f");

    let first = module.session().callable_symbols(&path, None).unwrap();
    let second = module.session().callable_symbols(&path, None).unwrap();

    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
    assert!(first[0].is_same_instance(&second[0]));
    assert_eq!(module.build_count(), 1);
}

#[test]
fn overloads_across_units_resolve_together() {
    let module = TestModule::new(&[
        ("a.aster", "package app\nfun f(): Int\nfun f(x: Int): Int"),
        ("b.aster", "package app\nval f: Int"),
    ]);
    let path = callable("app/f");

    let symbols = module.session().callable_symbols(&path, None).unwrap();
    assert_eq!(symbols.len(), 3);

    let again = module.session().callable_symbols(&path, None).unwrap();
    for (a, b) in symbols.iter().zip(&again) {
        assert!(a.is_same_instance(b));
    }
    assert_eq!(module.build_count(), 2);
    assert_eq!(module.index_query_count(), 1);
}

#[test]
fn units_hint_bypasses_the_index_unmemoized() {
    let module = TestModule::new(&[
        ("a.aster", "package app\nfun f()"),
        ("b.aster", "package app\nfun f(x: Int)"),
    ]);
    let only_a = [module.unit("a.aster")];

    let symbols = module
        .session()
        .callable_symbols(&callable("app/f"), Some(&only_a))
        .unwrap();

    assert_eq!(symbols.len(), 1);
    assert_eq!(module.index_query_count(), 0);
    assert_eq!(module.build_count(), 1);
}

#[test]
fn containing_tree_of_a_resolved_symbol() {
    let module = TestModule::new(&[
        ("a.aster", "package app\nclass Foo {}"),
        ("b.aster", "package app\nfun f()"),
    ]);

    let symbol = module
        .session()
        .class_symbol(&class_id("app/Foo"), None)
        .unwrap()
        .unwrap();
    let tree = module
        .session()
        .containing_tree(symbol.declaration().unit_id())
        .unwrap();
    assert_eq!(tree.unit_path(), "a.aster");

    // `b.aster` was never built, so asking for its tree is a contract
    // violation, reported as such
    let err = module
        .session()
        .containing_tree(module.unit("b.aster").id())
        .unwrap_err();
    assert!(err.to_string().contains("no semantic tree cached"));
}

#[test]
fn build_failures_propagate_and_do_not_poison() {
    let module = TestModule::new(&[("a.aster", "package app\nclass Foo {}")]);
    let id = class_id("app/Foo");

    module.builder().fail_next_builds(1);
    let err = module.session().class_symbol(&id, None).unwrap_err();
    assert!(err.to_string().contains("injected build failure"));

    // the failure was not cached; the retry builds from scratch and succeeds
    let symbol = module.session().class_symbol(&id, None).unwrap();
    assert!(symbol.is_some());
    assert_eq!(module.build_count(), 2);
}

#[test]
fn misses_are_memoized_too() {
    let module = TestModule::new(&[("a.aster", "package app\nclass Foo {}")]);
    let id = class_id("app/Missing");

    assert!(module.session().class_symbol(&id, None).unwrap().is_none());
    assert!(module.session().class_symbol(&id, None).unwrap().is_none());

    assert_eq!(module.index_query_count(), 1);
    assert_eq!(module.build_count(), 1);
}

#[test]
fn invalidation_rebuilds_from_fresh_sources() {
    let module = TestModule::new(&[("a.aster", "package app\nclass Foo {}")]);
    let id = class_id("app/Foo");

    let before = module.session().class_symbol(&id, None).unwrap().unwrap();

    module.change_file("a.aster", "package app\nclass Foo { fun m() }");
    let after = module.session().class_symbol(&id, None).unwrap().unwrap();

    assert!(!before.is_same_instance(&after));
    assert!(!before.token().same_token(after.token()));
    assert!(after.token().is_valid());
    assert_eq!(after.members(module.session()).len(), 1);
    assert_eq!(module.build_count(), 2);

    // removing the class makes the same query answer `None`
    module.change_file("a.aster", "package app\nclass Bar {}");
    assert!(module.session().class_symbol(&id, None).unwrap().is_none());
}

#[test]
fn dropping_a_unit_releases_its_cache_slot() {
    let module = TestModule::new(&[]);
    let unit = SourceUnit::from_file("scratch.aster", "package app\nfun f()");

    module.session().semantic_tree(&unit).unwrap();
    assert_eq!(module.session().tree_cache().len(), 1);

    drop(unit);
    module.session().tree_cache().evict_dead();
    assert!(module.session().tree_cache().is_empty());
}
