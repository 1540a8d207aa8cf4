//! Descriptor model and registry for the atombind binding surface.
//!
//! The native library exports its record types and routines as a serialized
//! specification blob. This crate deserializes that blob into immutable
//! descriptors, validates them, and holds them in a populate-once registry
//! that the adapter consults when generating proxy types and callables.
//!
//! # Specification format
//!
//! ```json
//! {
//!   "types": [
//!     { "name": "dictionary", "fields": [
//!       { "name": "n", "kind": "scalar", "prim": "int" },
//!       { "name": "cutoff", "kind": "scalar", "prim": "real" },
//!       { "name": "pos", "kind": "array", "prim": "real", "shape": [3, 8] }
//!     ]}
//!   ],
//!   "routines": [
//!     { "name": "calc_connect", "params": [
//!       { "name": "this", "kind": "record", "type_name": "dictionary" },
//!       { "name": "cutoff", "kind": "real", "optional": true }
//!     ]}
//!   ]
//! }
//! ```

mod descriptors;
mod loader;
mod registry;

pub use descriptors::{
    BindingSpec, Direction, FieldDescriptor, FieldKind, ParamDescriptor, ParamKind, PrimKind,
    RoutineDescriptor, TypeDescriptor,
};
pub use loader::{default_candidates, load_from_candidates, load_specification, SPEC_FILE_NAME};
pub use registry::{global_registry, install_registry, Registry};

use thiserror::Error;

/// Errors raised while locating, parsing or validating a specification.
#[derive(Debug, Error)]
pub enum SpecError {
    /// The specification blob was not found at any candidate location.
    #[error("specification missing: not found at any of {candidates:?}")]
    Missing { candidates: Vec<std::path::PathBuf> },

    /// The specification was found but could not be used.
    #[error("specification invalid: {reason}")]
    Invalid { reason: String },

    /// The process-wide registry is already populated.
    #[error("specification already loaded; the registry is populated exactly once")]
    AlreadyLoaded,
}
