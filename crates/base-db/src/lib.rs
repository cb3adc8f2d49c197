//! The source model underneath semantic analysis: immutable source units and
//! the names used to query them.
//!
//! Nothing here is session-aware. A [`SourceUnit`] is a parsed file that lives
//! for as long as somebody holds a strong reference to it; reloading a file
//! means minting a brand-new unit. The semantic layer above keys its caches by
//! [`UnitId`] and holds units weakly, so dropping the last strong reference is
//! all it takes to make the related caches reclaimable.

mod index;
mod name;
mod source;

pub use crate::index::{SourceIndex, UnitSetIndex};
pub use crate::name::{CallablePath, Name, PackagePath, QualifiedClassId};
pub use crate::source::{SourceUnit, UnitId, UnitOrigin};
