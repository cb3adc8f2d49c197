//! Semantic trees and the declarations inside them.
//!
//! A [`SemanticTree`] is the built semantic representation of one source unit
//! within one session. Trees are assembled privately by a [`TreeBuilder`] and
//! are immutable from the moment they are published into the
//! [`SemanticTreeCache`](crate::SemanticTreeCache); every [`Declaration`] is a
//! child of exactly one tree and never migrates.

use base_db::{CallablePath, Name, PackagePath, QualifiedClassId, SourceUnit, UnitId};
use rustc_hash::FxHashMap;
use std::fmt;
use std::fmt::Write;
use std::sync::{Arc, Weak};
use syntax::TextRange;
use syntax::ast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallableKind {
    Function,
    Property,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessorKind {
    Getter,
    Setter,
}

/// A named semantic entity: class, function, property or property accessor.
pub struct Declaration {
    name: Name,
    kind: DeclKind,
    unit_id: UnitId,
    range: TextRange,
}

pub enum DeclKind {
    Class {
        id: QualifiedClassId,
        members: Vec<Arc<Declaration>>,
    },
    Function {
        param_types: Vec<String>,
        ret_type: Option<String>,
    },
    Property {
        mutable: bool,
        ty: Option<String>,
        getter: Arc<Declaration>,
        setter: Option<Arc<Declaration>>,
    },
    Accessor(AccessorKind),
}

impl Declaration {
    pub fn new(name: Name, kind: DeclKind, unit_id: UnitId, range: TextRange) -> Arc<Declaration> {
        Arc::new(Declaration {
            name,
            kind,
            unit_id,
            range,
        })
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn kind(&self) -> &DeclKind {
        &self.kind
    }

    /// The unit this declaration was built from. The owning tree is not
    /// reachable from here by design — declarations are leaves; going back up
    /// is [`ModuleSession::containing_tree`](crate::ModuleSession::containing_tree).
    pub fn unit_id(&self) -> UnitId {
        self.unit_id
    }

    pub fn range(&self) -> TextRange {
        self.range
    }

    pub fn class_id(&self) -> Option<&QualifiedClassId> {
        match &self.kind {
            DeclKind::Class { id, .. } => Some(id),
            _ => None,
        }
    }

    pub fn members(&self) -> &[Arc<Declaration>] {
        match &self.kind {
            DeclKind::Class { members, .. } => members,
            _ => &[],
        }
    }

    pub fn callable_kind(&self) -> Option<CallableKind> {
        match &self.kind {
            DeclKind::Function { .. } => Some(CallableKind::Function),
            DeclKind::Property { .. } => Some(CallableKind::Property),
            _ => None,
        }
    }

    pub fn accessor(&self, kind: AccessorKind) -> Option<&Arc<Declaration>> {
        match (&self.kind, kind) {
            (DeclKind::Property { getter, .. }, AccessorKind::Getter) => Some(getter),
            (DeclKind::Property { setter, .. }, AccessorKind::Setter) => setter.as_ref(),
            _ => None,
        }
    }

    fn kind_name(&self) -> &'static str {
        match &self.kind {
            DeclKind::Class { .. } => "class",
            DeclKind::Function { .. } => "fun",
            DeclKind::Property { mutable: true, .. } => "var",
            DeclKind::Property { mutable: false, .. } => "val",
            DeclKind::Accessor(AccessorKind::Getter) => "get",
            DeclKind::Accessor(AccessorKind::Setter) => "set",
        }
    }
}

impl fmt::Debug for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Declaration({} {} in {:?})",
            self.kind_name(),
            self.name,
            self.unit_id
        )
    }
}

/// The semantic representation of one source unit's declarations.
///
/// Holds its unit weakly: a tree never keeps an unloaded source file alive.
pub struct SemanticTree {
    unit: Weak<SourceUnit>,
    unit_id: UnitId,
    unit_path: String,
    package: PackagePath,
    top_level: Vec<Arc<Declaration>>,
    /// Every class in the tree, nested ones included, by id.
    classes: FxHashMap<QualifiedClassId, Arc<Declaration>>,
}

impl SemanticTree {
    pub fn new(unit: &Arc<SourceUnit>, top_level: Vec<Arc<Declaration>>) -> SemanticTree {
        let mut classes = FxHashMap::default();
        let mut stack = top_level.clone();
        while let Some(decl) = stack.pop() {
            if let DeclKind::Class { id, members } = &decl.kind {
                classes.insert(id.clone(), decl.clone());
                stack.extend(members.iter().cloned());
            }
        }
        SemanticTree {
            unit: Arc::downgrade(unit),
            unit_id: unit.id(),
            unit_path: unit.display_path().to_string(),
            package: unit.package_path(),
            top_level,
            classes,
        }
    }

    pub fn unit(&self) -> Option<Arc<SourceUnit>> {
        self.unit.upgrade()
    }

    pub fn unit_id(&self) -> UnitId {
        self.unit_id
    }

    pub fn unit_path(&self) -> &str {
        &self.unit_path
    }

    pub fn package(&self) -> &PackagePath {
        &self.package
    }

    pub fn top_level(&self) -> &[Arc<Declaration>] {
        &self.top_level
    }

    pub fn find_class(&self, id: &QualifiedClassId) -> Option<Arc<Declaration>> {
        self.classes.get(id).cloned()
    }

    /// All top-level functions and properties named `path.name()`, in
    /// declaration order.
    pub fn top_level_callables(&self, path: &CallablePath) -> Vec<Arc<Declaration>> {
        if self.package != *path.package() {
            return Vec::new();
        }
        self.top_level
            .iter()
            .filter(|decl| decl.callable_kind().is_some() && decl.name() == path.name())
            .cloned()
            .collect()
    }

    /// Indented dump of the declaration structure, for snapshot tests.
    pub fn render(&self) -> String {
        let mut buf = String::new();
        writeln!(buf, "tree of `{}` (package {})", self.unit_path, self.package).unwrap();
        for decl in &self.top_level {
            render_decl(&mut buf, decl, 1);
        }
        buf
    }
}

impl fmt::Debug for SemanticTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SemanticTree")
            .field("unit", &self.unit_path)
            .field("package", &self.package)
            .finish()
    }
}

fn render_decl(buf: &mut String, decl: &Arc<Declaration>, depth: usize) {
    let indent = "    ".repeat(depth);
    writeln!(buf, "{indent}{} {}", decl.kind_name(), decl.name()).unwrap();
    match &decl.kind {
        DeclKind::Class { members, .. } => {
            for member in members {
                render_decl(buf, member, depth + 1);
            }
        }
        DeclKind::Property { getter, setter, .. } => {
            render_decl(buf, getter, depth + 1);
            if let Some(setter) = setter {
                render_decl(buf, setter, depth + 1);
            }
        }
        _ => {}
    }
}

/// The actual (expensive) semantic-analysis routine. Invoked by the caches as
/// a build callback; whatever error it raises propagates to the original
/// caller unmodified.
pub trait TreeBuilder: Send + Sync {
    fn build_tree(&self, unit: &Arc<SourceUnit>) -> anyhow::Result<SemanticTree>;
}

/// The standard lowering from the syntax tree. Deterministic; declaration
/// order follows source order exactly.
#[derive(Default)]
pub struct LowerTreeBuilder;

impl TreeBuilder for LowerTreeBuilder {
    fn build_tree(&self, unit: &Arc<SourceUnit>) -> anyhow::Result<SemanticTree> {
        let package = unit.package_path();
        let top_level = unit
            .tree()
            .items
            .iter()
            .map(|item| lower_item(unit, item, &package, None))
            .collect();
        Ok(SemanticTree::new(unit, top_level))
    }
}

fn lower_item(
    unit: &Arc<SourceUnit>,
    item: &ast::Item,
    package: &PackagePath,
    enclosing_class: Option<&QualifiedClassId>,
) -> Arc<Declaration> {
    match item {
        ast::Item::Class(class) => {
            let name = Name::new(&class.name);
            let id = match enclosing_class {
                Some(outer) => outer.nested(name.clone()),
                None => QualifiedClassId::top_level(package.clone(), name.clone()),
            };
            let members = class
                .members
                .iter()
                .map(|member| lower_item(unit, member, package, Some(&id)))
                .collect();
            Arc::new(Declaration {
                name,
                kind: DeclKind::Class { id, members },
                unit_id: unit.id(),
                range: class.range,
            })
        }
        ast::Item::Function(fun) => Arc::new(Declaration {
            name: Name::new(&fun.name),
            kind: DeclKind::Function {
                param_types: fun.params.iter().map(|p| p.ty.render()).collect(),
                ret_type: fun.ret_type.as_ref().map(|it| it.render()),
            },
            unit_id: unit.id(),
            range: fun.range,
        }),
        ast::Item::Property(prop) => {
            let name = Name::new(&prop.name);
            let getter = accessor_decl(unit, &name, AccessorKind::Getter, prop.name_range);
            let setter = prop
                .mutable
                .then(|| accessor_decl(unit, &name, AccessorKind::Setter, prop.name_range));
            Arc::new(Declaration {
                name,
                kind: DeclKind::Property {
                    mutable: prop.mutable,
                    ty: prop.ty.as_ref().map(|it| it.render()),
                    getter,
                    setter,
                },
                unit_id: unit.id(),
                range: prop.range,
            })
        }
    }
}

// Aster has no explicit accessor syntax (yet); every property gets a default
// getter and mutable ones a default setter, anchored at the property name.
// Accessors share the property's name; the kind tells them apart.
fn accessor_decl(
    unit: &Arc<SourceUnit>,
    property_name: &Name,
    kind: AccessorKind,
    range: TextRange,
) -> Arc<Declaration> {
    Arc::new(Declaration {
        name: property_name.clone(),
        kind: DeclKind::Accessor(kind),
        unit_id: unit.id(),
        range,
    })
}
