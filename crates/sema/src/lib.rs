//! The lazy, cached semantic-resolution layer.
//!
//! This crate sits between parsed source units ([`base_db`]) and everything
//! that wants to ask questions about declarations: batch compilation passes
//! and long-lived analysis front-ends alike. Its job description is four
//! promises that pull in different directions:
//!
//! * a semantic tree is built at most once per source unit, even when many
//!   threads race for it ([`SemanticTreeCache`]);
//! * repeated queries hand back the *same* declaration and symbol instances,
//!   so downstream caches can key off identity ([`DeclarationIndex`] and the
//!   internal symbol cache);
//! * edited or reloaded sources are never observed through stale results
//!   ([`LifetimeToken`], [`SessionBoundary`]);
//! * unrelated lookups never serialize on each other (per-unit build locks,
//!   lock-free fast paths everywhere else).
//!
//! A [`ModuleSession`] wires one instance of each piece together. Sessions
//! are plain values: tests routinely run several fully independent ones side
//! by side, and nothing in this crate is process-global.
//!
//! Long-lived references across edits are expressed as [`SymbolPointer`]s:
//! session-independent values that re-resolve on demand and cache the last
//! successful resolution weakly.

mod index;
mod pointers;
mod session;
mod symbols;
mod tree;
mod tree_cache;

pub use crate::index::{DeclarationIndex, SessionConfig, SourceDeclaration, BUILTIN_PACKAGE_ROOT};
pub use crate::pointers::SymbolPointer;
pub use crate::session::{LifetimeToken, ModuleSession, SessionBoundary};
pub use crate::symbols::{Symbol, SymbolLocator};
pub use crate::tree::{
    AccessorKind, CallableKind, Declaration, DeclKind, LowerTreeBuilder, SemanticTree, TreeBuilder,
};
pub use crate::tree_cache::{NotCachedError, SemanticTreeCache};
