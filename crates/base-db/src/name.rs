use std::fmt;

/// `Name` is a wrapper around string, used for both references and
/// declarations.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name {
    symbol: String,
}

impl Name {
    pub fn new(text: &str) -> Name {
        Name {
            symbol: text.to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.symbol
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self.symbol)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.symbol.fmt(f)
    }
}

impl From<&str> for Name {
    fn from(text: &str) -> Name {
        Name::new(text)
    }
}

/// A dot-separated package name, e.g. `app.core`. The empty path is the root
/// package.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct PackagePath {
    segments: Vec<Name>,
}

impl PackagePath {
    pub fn root() -> PackagePath {
        PackagePath::default()
    }

    pub fn from_segments(segments: impl IntoIterator<Item = Name>) -> PackagePath {
        PackagePath {
            segments: segments.into_iter().collect(),
        }
    }

    /// Parses `"app.core"` into a path. `""` is the root package.
    pub fn parse(text: &str) -> PackagePath {
        if text.is_empty() {
            return PackagePath::root();
        }
        PackagePath::from_segments(text.split('.').map(Name::new))
    }

    pub fn segments(&self) -> &[Name] {
        &self.segments
    }

    pub fn first_segment(&self) -> Option<&Name> {
        self.segments.first()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for PackagePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.segments {
            if !first {
                write!(f, ".")?;
            }
            first = false;
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for PackagePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PackagePath({self})")
    }
}

/// Identity of a class-like declaration: the owning package plus the chain of
/// class names from the outermost class down, e.g. `app.core/Foo.Inner`.
///
/// Local (function-body scoped) and synthetic classes also get ids so that
/// they can be talked about, but they are not indexable by name; lookups for
/// them always answer "not found" without touching any index.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct QualifiedClassId {
    package: PackagePath,
    names: Vec<Name>,
    is_local: bool,
}

impl QualifiedClassId {
    pub fn top_level(package: PackagePath, name: Name) -> QualifiedClassId {
        QualifiedClassId {
            package,
            names: vec![name],
            is_local: false,
        }
    }

    pub fn nested(&self, name: Name) -> QualifiedClassId {
        let mut names = self.names.clone();
        names.push(name);
        QualifiedClassId {
            package: self.package.clone(),
            names,
            is_local: self.is_local,
        }
    }

    pub fn local(package: PackagePath, name: Name) -> QualifiedClassId {
        QualifiedClassId {
            package,
            names: vec![name],
            is_local: true,
        }
    }

    /// Parses `"app.core/Foo.Inner"` (package `/` class chain).
    pub fn parse(text: &str) -> Option<QualifiedClassId> {
        let (package, names) = text.split_once('/')?;
        let names = names.split('.').map(Name::new).collect::<Vec<_>>();
        if names.iter().any(|it| it.as_str().is_empty()) {
            return None;
        }
        Some(QualifiedClassId {
            package: PackagePath::parse(package),
            names,
            is_local: false,
        })
    }

    pub fn package(&self) -> &PackagePath {
        &self.package
    }

    pub fn names(&self) -> &[Name] {
        &self.names
    }

    pub fn outermost_name(&self) -> &Name {
        &self.names[0]
    }

    pub fn is_local(&self) -> bool {
        self.is_local
    }

    pub fn is_nested(&self) -> bool {
        self.names.len() > 1
    }
}

impl fmt::Display for QualifiedClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/", self.package)?;
        let mut first = true;
        for name in &self.names {
            if !first {
                write!(f, ".")?;
            }
            first = false;
            write!(f, "{name}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for QualifiedClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_local {
            write!(f, "ClassId({self}, local)")
        } else {
            write!(f, "ClassId({self})")
        }
    }
}

/// Identity of a top-level callable (function or property): package plus
/// simple name. Overloads share one path.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CallablePath {
    package: PackagePath,
    name: Name,
}

impl CallablePath {
    pub fn new(package: PackagePath, name: Name) -> CallablePath {
        CallablePath { package, name }
    }

    /// Parses `"app.core/f"`.
    pub fn parse(text: &str) -> Option<CallablePath> {
        let (package, name) = text.split_once('/')?;
        if name.is_empty() {
            return None;
        }
        Some(CallablePath {
            package: PackagePath::parse(package),
            name: Name::new(name),
        })
    }

    pub fn package(&self) -> &PackagePath {
        &self.package
    }

    pub fn name(&self) -> &Name {
        &self.name
    }
}

impl fmt::Display for CallablePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.package, self.name)
    }
}

impl fmt::Debug for CallablePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallablePath({self})")
    }
}
