//! Symbols: resolved, session-scoped views of declarations.
//!
//! Many `Symbol` values may transiently exist for one declaration, but within
//! a session the cache below keeps a canonical instance alive for as long as
//! anybody holds it. That identity is what lets downstream consumers key
//! derived data off symbols, and what makes pointer round-trips return the
//! very same instance instead of a mere equal one.

use crate::pointers::SymbolPointer;
use crate::session::{LifetimeToken, ModuleSession, SessionBoundary};
use crate::tree::{AccessorKind, CallableKind, Declaration, DeclKind};
use base_db::{CallablePath, Name, QualifiedClassId};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::{Arc, Weak};

/// Where a symbol's declaration can be found again later, independent of any
/// session. The structural half of a [`SymbolPointer`].
///
/// Ordinals disambiguate overloads: the n-th callable of this name and kind
/// in declaration order. They survive edits exactly as well as any other
/// position-derived information does — a reordered overload set resolves to
/// the new occupant of the ordinal, a removed one to `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SymbolLocator {
    Class(QualifiedClassId),
    TopLevelCallable {
        path: CallablePath,
        kind: CallableKind,
        ordinal: u32,
    },
    Member {
        owner: QualifiedClassId,
        name: Name,
        kind: CallableKind,
        ordinal: u32,
    },
    Accessor {
        owner: Box<SymbolLocator>,
        kind: AccessorKind,
    },
}

pub(crate) struct SymbolData {
    decl: Arc<Declaration>,
    token: LifetimeToken,
    locator: SymbolLocator,
}

/// A resolved, queryable view of a [`Declaration`], tagged with the token of
/// the session that produced it. Usable only while that token holds.
#[derive(Clone)]
pub struct Symbol {
    data: Arc<SymbolData>,
}

impl Symbol {
    pub(crate) fn from_data(data: Arc<SymbolData>) -> Symbol {
        Symbol { data }
    }

    pub fn name(&self) -> &Name {
        self.data.decl.name()
    }

    pub fn declaration(&self) -> &Arc<Declaration> {
        &self.data.decl
    }

    pub fn token(&self) -> &LifetimeToken {
        &self.data.token
    }

    pub fn locator(&self) -> &SymbolLocator {
        &self.data.locator
    }

    /// Identity, not equality: the canonical-instance guarantee makes this
    /// the right comparison for "is this the same symbol".
    pub fn is_same_instance(&self, other: &Symbol) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    pub(crate) fn downgrade(&self) -> Weak<SymbolData> {
        Arc::downgrade(&self.data)
    }

    /// Captures a session-independent pointer to this symbol. Always allowed,
    /// even on a symbol whose session has already been invalidated — the
    /// pointer only records structure.
    pub fn create_pointer(&self) -> SymbolPointer {
        SymbolPointer::from_locator(self.data.locator.clone(), self.data.token.boundary_id())
    }

    /// Member symbols of a class symbol, in declaration order. Empty for
    /// non-classes.
    pub fn members(&self, session: &ModuleSession) -> Vec<Symbol> {
        self.assert_usable(session);
        let DeclKind::Class { id, members } = self.data.decl.kind() else {
            return Vec::new();
        };
        let mut ordinals: FxHashMap<(Name, CallableKind), u32> = FxHashMap::default();
        members
            .iter()
            .filter_map(|member| {
                let locator = match member.kind() {
                    DeclKind::Class { id: member_id, .. } => {
                        SymbolLocator::Class(member_id.clone())
                    }
                    DeclKind::Function { .. } => {
                        member_locator(id, member, CallableKind::Function, &mut ordinals)
                    }
                    DeclKind::Property { .. } => {
                        member_locator(id, member, CallableKind::Property, &mut ordinals)
                    }
                    DeclKind::Accessor(_) => return None,
                };
                // members come from the same tree as the class symbol, so
                // they share its token
                Some(session.symbols().symbol_for(
                    session.boundary(),
                    &self.data.token,
                    member,
                    locator,
                ))
            })
            .collect()
    }

    /// Projects a property symbol onto one of its accessors. `None` for
    /// non-properties and for the setter of an immutable property.
    pub fn accessor(&self, session: &ModuleSession, kind: AccessorKind) -> Option<Symbol> {
        self.assert_usable(session);
        let accessor_decl = self.data.decl.accessor(kind)?;
        let locator = SymbolLocator::Accessor {
            owner: Box::new(self.data.locator.clone()),
            kind,
        };
        Some(session.symbols().symbol_for(
            session.boundary(),
            &self.data.token,
            accessor_decl,
            locator,
        ))
    }

    pub fn getter(&self, session: &ModuleSession) -> Option<Symbol> {
        self.accessor(session, AccessorKind::Getter)
    }

    pub fn setter(&self, session: &ModuleSession) -> Option<Symbol> {
        self.accessor(session, AccessorKind::Setter)
    }

    /// Symbols from an invalidated session must not be traversed further;
    /// that the caller still holds one is a bug, not a race to tolerate.
    fn assert_usable(&self, session: &ModuleSession) {
        assert!(
            self.data.token.is_valid() && self.data.token.is_accessible(session),
            "symbol `{}` used after its session was invalidated \
             (token {:?}, module `{}`); capture a pointer instead of holding symbols across edits",
            self.name(),
            self.data.token,
            session.name(),
        );
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Symbol")
            .field("decl", &self.data.decl)
            .field("token", &self.data.token)
            .finish()
    }
}

fn member_locator(
    owner: &QualifiedClassId,
    member: &Arc<Declaration>,
    kind: CallableKind,
    ordinals: &mut FxHashMap<(Name, CallableKind), u32>,
) -> SymbolLocator {
    let ordinal = ordinals
        .entry((member.name().clone(), kind))
        .and_modify(|it| *it += 1)
        .or_insert(0);
    SymbolLocator::Member {
        owner: owner.clone(),
        name: member.name().clone(),
        kind,
        ordinal: *ordinal,
    }
}

struct SymbolSlot {
    weak: Weak<SymbolData>,
    token: LifetimeToken,
}

/// Weak-value cache keeping one canonical `Symbol` per declaration per
/// session. Keys are declaration addresses; an entry can only be upgraded
/// while its symbol (and therefore its declaration) is alive, so address
/// reuse can never alias two declarations.
pub(crate) struct SymbolCache {
    slots: DashMap<usize, SymbolSlot>,
}

impl SymbolCache {
    pub(crate) fn new() -> SymbolCache {
        SymbolCache {
            slots: DashMap::new(),
        }
    }

    /// `token` is the token the resolution producing `decl` ran under, not
    /// necessarily the current one: a lookup that raced with an invalidation
    /// gets a symbol stamped with the generation it actually resolved
    /// against, so the result is stale on arrival instead of passing as
    /// fresh. Such a symbol is never published as canonical.
    pub(crate) fn symbol_for(
        &self,
        boundary: &Arc<SessionBoundary>,
        token: &LifetimeToken,
        decl: &Arc<Declaration>,
        locator: SymbolLocator,
    ) -> Symbol {
        if !token.is_valid() || !boundary.is_current(token) {
            return Symbol {
                data: new_symbol_data(token, decl, locator),
            };
        }

        let key = Arc::as_ptr(decl) as usize;
        match self.slots.entry(key) {
            Entry::Occupied(mut entry) => {
                let slot = entry.get();
                if slot.token.is_valid() && slot.token.same_token(token) {
                    if let Some(data) = slot.weak.upgrade() {
                        return Symbol { data };
                    }
                }
                let data = new_symbol_data(token, decl, locator);
                entry.insert(SymbolSlot {
                    weak: Arc::downgrade(&data),
                    token: data.token.clone(),
                });
                Symbol { data }
            }
            Entry::Vacant(entry) => {
                let data = new_symbol_data(token, decl, locator);
                entry.insert(SymbolSlot {
                    weak: Arc::downgrade(&data),
                    token: data.token.clone(),
                });
                Symbol { data }
            }
        }
    }

    pub(crate) fn clear(&self) {
        self.slots.clear();
    }
}

fn new_symbol_data(
    token: &LifetimeToken,
    decl: &Arc<Declaration>,
    locator: SymbolLocator,
) -> Arc<SymbolData> {
    Arc::new(SymbolData {
        decl: decl.clone(),
        token: token.clone(),
        locator,
    })
}
