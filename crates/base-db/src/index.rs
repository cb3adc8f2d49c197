use crate::name::{CallablePath, QualifiedClassId};
use crate::source::{SourceUnit, UnitOrigin};
use parking_lot::RwLock;
use std::sync::Arc;

/// Name -> file(s) index, the boundary to whatever maintains the set of files
/// of a module.
///
/// Implementations may be approximate: returning units that turn out not to
/// declare the symbol is fine (the semantic layer filters while searching the
/// built tree), but a unit that genuinely declares the symbol must never be
/// omitted. The semantic layer relies on that precondition instead of
/// re-checking it.
pub trait SourceIndex: Send + Sync {
    fn units_declaring_class(&self, id: &QualifiedClassId) -> Vec<Arc<SourceUnit>>;

    fn units_declaring_callable(&self, path: &CallablePath) -> Vec<Arc<SourceUnit>>;
}

/// The simplest honest [`SourceIndex`]: a mutable set of units, filtered by
/// package on lookup. Deliberately over-broad — it does not look at
/// declaration names at all, only at package headers.
#[derive(Default)]
pub struct UnitSetIndex {
    units: RwLock<Vec<Arc<SourceUnit>>>,
}

impl UnitSetIndex {
    pub fn new() -> UnitSetIndex {
        UnitSetIndex::default()
    }

    pub fn add_unit(&self, unit: Arc<SourceUnit>) {
        self.units.write().push(unit);
    }

    /// Replaces the unit with the same origin path, if any, and returns the
    /// replaced unit. This is what "the file was edited" looks like from the
    /// index's point of view.
    pub fn replace_unit(&self, unit: Arc<SourceUnit>) -> Option<Arc<SourceUnit>> {
        let mut units = self.units.write();
        let old = match &unit.origin() {
            UnitOrigin::File(path) => units
                .iter()
                .position(|existing| matches!(existing.origin(), UnitOrigin::File(p) if p == path))
                .map(|pos| units.remove(pos)),
            UnitOrigin::Synthetic(_) => None,
        };
        units.push(unit);
        old
    }

    pub fn remove_unit(&self, unit: &SourceUnit) {
        self.units.write().retain(|it| it.id() != unit.id());
    }

    pub fn all_units(&self) -> Vec<Arc<SourceUnit>> {
        self.units.read().clone()
    }
}

impl SourceIndex for UnitSetIndex {
    fn units_declaring_class(&self, id: &QualifiedClassId) -> Vec<Arc<SourceUnit>> {
        self.units
            .read()
            .iter()
            .filter(|unit| unit.package_path() == *id.package())
            .cloned()
            .collect()
    }

    fn units_declaring_callable(&self, path: &CallablePath) -> Vec<Arc<SourceUnit>> {
        self.units
            .read()
            .iter()
            .filter(|unit| unit.package_path() == *path.package())
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_filters_by_package() {
        let index = UnitSetIndex::new();
        index.add_unit(SourceUnit::from_file("a.aster", "package app\nclass Foo {}"));
        index.add_unit(SourceUnit::from_file("b.aster", "package other\nclass Foo {}"));

        let id = QualifiedClassId::parse("app/Foo").unwrap();
        let units = index.units_declaring_class(&id);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].display_path(), "a.aster");
    }

    #[test]
    fn index_is_over_broad_within_package() {
        let index = UnitSetIndex::new();
        index.add_unit(SourceUnit::from_file("a.aster", "package app\nclass Foo {}"));
        index.add_unit(SourceUnit::from_file("b.aster", "package app\nclass Bar {}"));

        // both units come back; the caller filters while searching trees
        let id = QualifiedClassId::parse("app/Foo").unwrap();
        assert_eq!(index.units_declaring_class(&id).len(), 2);
    }

    #[test]
    fn replace_swaps_same_path() {
        let index = UnitSetIndex::new();
        index.add_unit(SourceUnit::from_file("a.aster", "package app\nval p: Int"));
        let edited = SourceUnit::from_file("a.aster", "package app\nval p: String");
        let old = index.replace_unit(edited.clone()).unwrap();
        assert_ne!(old.id(), edited.id());
        assert_eq!(index.all_units().len(), 1);
    }
}
