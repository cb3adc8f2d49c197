//! The Aster AST.
//!
//! Aster source units are declaration files: a `package` header followed by
//! classes, functions and properties. Classes nest and carry members;
//! functions and properties never carry bodies. All nodes record the text
//! range they were parsed from, which is what every downstream "pointer back
//! into the source" is built on.

use std::fmt::Write;
use text_size::TextRange;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub package: Option<PackageDecl>,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDecl {
    pub segments: Vec<String>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Class(ClassDef),
    Function(FunDef),
    Property(PropertyDef),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDef {
    pub name: String,
    pub name_range: TextRange,
    pub members: Vec<Item>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunDef {
    pub name: String,
    pub name_range: TextRange,
    pub params: Vec<Param>,
    pub ret_type: Option<TypeRef>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: TypeRef,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDef {
    pub name: String,
    pub name_range: TextRange,
    /// `var` properties are mutable and get a setter on the semantic side.
    pub mutable: bool,
    pub ty: Option<TypeRef>,
    pub range: TextRange,
}

/// A dotted type reference, e.g. `Int` or `app.core.Foo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRef {
    pub segments: Vec<String>,
    pub range: TextRange,
}

impl Item {
    pub fn name(&self) -> &str {
        match self {
            Item::Class(it) => &it.name,
            Item::Function(it) => &it.name,
            Item::Property(it) => &it.name,
        }
    }

    pub fn range(&self) -> TextRange {
        match self {
            Item::Class(it) => it.range,
            Item::Function(it) => it.range,
            Item::Property(it) => it.range,
        }
    }
}

impl TypeRef {
    pub fn render(&self) -> String {
        self.segments.join(".")
    }
}

impl SourceFile {
    pub fn package_segments(&self) -> &[String] {
        self.package.as_ref().map(|it| it.segments.as_slice()).unwrap_or(&[])
    }

    /// Indented dump of the declaration structure, used by snapshot tests.
    pub fn debug_dump(&self) -> String {
        let mut buf = String::new();
        if let Some(package) = &self.package {
            writeln!(buf, "package {}", package.segments.join(".")).unwrap();
        }
        for item in &self.items {
            dump_item(&mut buf, item, 0);
        }
        buf
    }
}

fn dump_item(buf: &mut String, item: &Item, depth: usize) {
    let indent = "    ".repeat(depth);
    match item {
        Item::Class(class) => {
            writeln!(buf, "{indent}class {}", class.name).unwrap();
            for member in &class.members {
                dump_item(buf, member, depth + 1);
            }
        }
        Item::Function(fun) => {
            let params = fun
                .params
                .iter()
                .map(|p| format!("{}: {}", p.name, p.ty.render()))
                .collect::<Vec<_>>()
                .join(", ");
            match &fun.ret_type {
                Some(ret) => writeln!(buf, "{indent}fun {}({params}): {}", fun.name, ret.render()),
                None => writeln!(buf, "{indent}fun {}({params})", fun.name),
            }
            .unwrap();
        }
        Item::Property(prop) => {
            let kw = if prop.mutable { "var" } else { "val" };
            match &prop.ty {
                Some(ty) => writeln!(buf, "{indent}{kw} {}: {}", prop.name, ty.render()),
                None => writeln!(buf, "{indent}{kw} {}", prop.name),
            }
            .unwrap();
        }
    }
}
