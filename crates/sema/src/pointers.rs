//! Session-independent pointers to symbols.
//!
//! A [`SymbolPointer`] is the escape hatch for references that must outlive a
//! session: it records where a declaration lives structurally (its locator)
//! and caches the last successfully restored symbol weakly, together with the
//! token it was valid under. Restoration is a fast validity check in the hot
//! case and a full re-resolution through the declaration index after an
//! invalidation.
//!
//! Accessor pointers compose instead of duplicating: they restore their owner
//! pointer first and project the accessor off the owner's symbol, while still
//! caching their own result independently. Owner invalidation thus propagates
//! transitively without any bookkeeping here.

use crate::session::{LifetimeToken, ModuleSession};
use crate::symbols::{Symbol, SymbolData, SymbolLocator};
use crate::tree::AccessorKind;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Weak;

struct CachedSymbol {
    symbol: Weak<SymbolData>,
    token: LifetimeToken,
}

enum PointerKind {
    /// Restores by re-resolving the locator against the current session.
    Direct(SymbolLocator),
    /// Restores via the owning property's pointer, then projects.
    Accessor {
        owner: Box<SymbolPointer>,
        kind: AccessorKind,
    },
}

/// A long-lived handle that can reconstruct a [`Symbol`] on demand. Owns no
/// resources; dropping it is all the cleanup there is.
pub struct SymbolPointer {
    kind: PointerKind,
    /// The boundary of the module this pointer was captured in. Pointers
    /// survive any number of invalidations of that module, but restoring one
    /// against a different module is a contract violation.
    boundary_id: u64,
    cache: Mutex<Option<CachedSymbol>>,
}

impl SymbolPointer {
    pub(crate) fn from_locator(locator: SymbolLocator, boundary_id: u64) -> SymbolPointer {
        let kind = match locator {
            SymbolLocator::Accessor { owner, kind } => PointerKind::Accessor {
                owner: Box::new(SymbolPointer::from_locator(*owner, boundary_id)),
                kind,
            },
            locator => PointerKind::Direct(locator),
        };
        SymbolPointer {
            kind,
            boundary_id,
            cache: Mutex::new(None),
        }
    }

    /// Returns the live symbol for this pointer within `session`, or `None`
    /// if the declaration no longer exists there. Failing to re-locate is a
    /// normal outcome, not an error; only the underlying tree build can fail.
    ///
    /// The dominant path, restoring repeatedly within one session, is a
    /// token check plus a weak upgrade, with no tree or index work at all.
    ///
    /// Panics if `session` belongs to a different module than the one this
    /// pointer was captured in.
    pub fn restore(&self, session: &ModuleSession) -> anyhow::Result<Option<Symbol>> {
        assert_eq!(
            self.boundary_id,
            session.boundary().id(),
            "pointer for boundary {} restored against unrelated module `{}` (boundary {})",
            self.boundary_id,
            session.name(),
            session.boundary().id(),
        );
        {
            let cache = self.cache.lock();
            if let Some(cached) = cache.as_ref() {
                if cached.token.is_valid() && cached.token.is_accessible(session) {
                    if let Some(data) = cached.symbol.upgrade() {
                        return Ok(Some(Symbol::from_data(data)));
                    }
                }
            }
        }
        // stale or collected; drop the entry and re-resolve against the
        // current session
        *self.cache.lock() = None;

        let restored = match &self.kind {
            PointerKind::Direct(locator) => session.resolve_locator(locator)?,
            PointerKind::Accessor { owner, kind } => match owner.restore(session)? {
                Some(owner_symbol) => owner_symbol.accessor(session, *kind),
                None => None,
            },
        };

        if let Some(symbol) = &restored {
            *self.cache.lock() = Some(CachedSymbol {
                symbol: symbol.downgrade(),
                token: symbol.token().clone(),
            });
        }
        Ok(restored)
    }

    /// Structural identity: do the two pointers designate the same
    /// declaration? Never restores, never builds — this stays cheap even
    /// when neither side is currently resolvable.
    pub fn points_to_same_symbol_as(&self, other: &SymbolPointer) -> bool {
        self.as_locator() == other.as_locator()
    }

    fn as_locator(&self) -> SymbolLocator {
        match &self.kind {
            PointerKind::Direct(locator) => locator.clone(),
            PointerKind::Accessor { owner, kind } => SymbolLocator::Accessor {
                owner: Box::new(owner.as_locator()),
                kind: *kind,
            },
        }
    }
}

/// Clones the restoration strategy only; the clone starts with an empty
/// cache slot.
impl Clone for SymbolPointer {
    fn clone(&self) -> SymbolPointer {
        SymbolPointer::from_locator(self.as_locator(), self.boundary_id)
    }
}

impl fmt::Debug for SymbolPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymbolPointer({:?})", self.as_locator())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base_db::{CallablePath, Name, QualifiedClassId};
    use crate::tree::CallableKind;

    fn pointer(locator: SymbolLocator) -> SymbolPointer {
        SymbolPointer::from_locator(locator, 0)
    }

    fn class_pointer(id: &str) -> SymbolPointer {
        pointer(SymbolLocator::Class(QualifiedClassId::parse(id).unwrap()))
    }

    #[test]
    fn locator_equality_is_structural() {
        assert!(class_pointer("app/Foo").points_to_same_symbol_as(&class_pointer("app/Foo")));
        assert!(!class_pointer("app/Foo").points_to_same_symbol_as(&class_pointer("app/Bar")));

        let callable = pointer(SymbolLocator::TopLevelCallable {
            path: CallablePath::parse("app/f").unwrap(),
            kind: CallableKind::Function,
            ordinal: 0,
        });
        assert!(!callable.points_to_same_symbol_as(&class_pointer("app/Foo")));
    }

    #[test]
    fn accessor_pointers_compare_via_owner() {
        let property = SymbolLocator::Member {
            owner: QualifiedClassId::parse("app/Foo").unwrap(),
            name: Name::new("p"),
            kind: CallableKind::Property,
            ordinal: 0,
        };
        let getter_a = pointer(SymbolLocator::Accessor {
            owner: Box::new(property.clone()),
            kind: AccessorKind::Getter,
        });
        let getter_b = pointer(SymbolLocator::Accessor {
            owner: Box::new(property.clone()),
            kind: AccessorKind::Getter,
        });
        let setter = pointer(SymbolLocator::Accessor {
            owner: Box::new(property),
            kind: AccessorKind::Setter,
        });
        assert!(getter_a.points_to_same_symbol_as(&getter_b));
        assert!(!getter_a.points_to_same_symbol_as(&setter));
    }

    #[test]
    fn clone_starts_empty_but_compares_equal() {
        let pointer = class_pointer("app/Foo");
        let clone = pointer.clone();
        assert!(pointer.points_to_same_symbol_as(&clone));
    }
}
