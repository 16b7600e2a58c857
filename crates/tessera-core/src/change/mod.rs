//! Change recorder: field-level diffs and MAJOR/MINOR classification.
//!
//! Entity types register a [`FieldPolicy`] saying which fields are
//! breaking and which need order-insensitive comparison. The
//! [`ChangeRecorder`] turns two snapshots into a [`ChangeDescription`]
//! and the version bump it implies:
//!
//! - no changed field: version unchanged
//! - only MINOR fields changed: `x.y` becomes `x.(y+1)`
//! - any MAJOR field changed: `x.y` becomes `(x+1).0`
//!
//! [`ChangeDescription`]: crate::types::ChangeDescription

mod policy;
mod recorder;

pub use policy::{Comparison, FieldImpact, FieldPolicy};
pub use recorder::{classify, diff, ChangeRecorder};
