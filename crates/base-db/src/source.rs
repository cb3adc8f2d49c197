use crate::name::PackagePath;
use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use syntax::Parse;
use syntax::ast::SourceFile;

/// Identity of a [`SourceUnit`]. Ids are unique for the lifetime of the
/// process and are never reused, so a dangling id can always be told apart
/// from a reloaded file.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(u32);

impl UnitId {
    fn next() -> UnitId {
        static NEXT: AtomicU32 = AtomicU32::new(0);
        UnitId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UnitId({})", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOrigin {
    /// A unit backed by a file on disk (or an editor buffer for one).
    File(Utf8PathBuf),
    /// A unit conjured out of thin air, e.g. the builtins preamble. Synthetic
    /// units have no physical location, so they never serve as declaration
    /// hints.
    Synthetic(String),
}

/// An immutable handle to one parsed source file.
///
/// Units are snapshots: editing a file produces a new `SourceUnit` with a new
/// [`UnitId`], and the old unit stays fully usable for whoever still holds it.
pub struct SourceUnit {
    id: UnitId,
    origin: UnitOrigin,
    text: Arc<str>,
    parse: Parse,
}

impl SourceUnit {
    pub fn from_file(path: impl AsRef<Utf8Path>, text: &str) -> Arc<SourceUnit> {
        SourceUnit::new(UnitOrigin::File(path.as_ref().to_owned()), text)
    }

    pub fn synthetic(name: &str, text: &str) -> Arc<SourceUnit> {
        SourceUnit::new(UnitOrigin::Synthetic(name.to_string()), text)
    }

    fn new(origin: UnitOrigin, text: &str) -> Arc<SourceUnit> {
        let parse = SourceFile::parse(text);
        Arc::new(SourceUnit {
            id: UnitId::next(),
            origin,
            text: text.into(),
            parse,
        })
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn origin(&self) -> &UnitOrigin {
        &self.origin
    }

    /// Whether this unit corresponds to an actual location on disk. Synthetic
    /// units are not physical.
    pub fn is_physical(&self) -> bool {
        matches!(self.origin, UnitOrigin::File(_))
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn parse(&self) -> &Parse {
        &self.parse
    }

    pub fn tree(&self) -> &SourceFile {
        self.parse.tree()
    }

    pub fn package_path(&self) -> PackagePath {
        match &self.tree().package {
            Some(package) => {
                PackagePath::from_segments(package.segments.iter().map(|it| it.as_str().into()))
            }
            None => PackagePath::root(),
        }
    }

    /// Human-readable unit location for diagnostics.
    pub fn display_path(&self) -> &str {
        match &self.origin {
            UnitOrigin::File(path) => path.as_str(),
            UnitOrigin::Synthetic(name) => name,
        }
    }
}

impl fmt::Debug for SourceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceUnit")
            .field("id", &self.id)
            .field("path", &self.display_path())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_ids_are_unique() {
        let a = SourceUnit::from_file("a.aster", "package a");
        let b = SourceUnit::from_file("a.aster", "package a");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn synthetic_units_are_not_physical() {
        let unit = SourceUnit::synthetic("<builtins>", "package aster");
        assert!(!unit.is_physical());
        assert_eq!(unit.display_path(), "<builtins>");
    }

    #[test]
    fn package_path_of_unit() {
        let unit = SourceUnit::from_file("m.aster", "package app.core\nfun f()");
        assert_eq!(unit.package_path().to_string(), "app.core");
        let no_package = SourceUnit::from_file("m.aster", "fun f()");
        assert!(no_package.package_path().is_root());
    }
}
