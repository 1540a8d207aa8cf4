//! Binding adapter for a native atomistic-simulation runtime.
//!
//! Given the descriptor registry built by `atombind-spec`, this crate
//! generates managed proxy types and callable routine wrappers, and manages
//! the native runtime's process lifecycle (initialize once, finalize on
//! drop, verbosity push/pop, boolean sentinel queries).
//!
//! # Threading
//!
//! The native runtime is process-global and non-reentrant. This adapter is
//! single-threaded by construction (`Rc`-based sharing, no `Send`/`Sync`
//! bounds); create exactly one [`RuntimeHost`] and keep all generated
//! objects on the thread that initialized it. Concurrent use is unsupported
//! and deliberately not papered over with locks.

mod bindings;
mod dynlib;
mod host;
mod marshal;
mod proxy;
mod runtime;

pub use bindings::{generate_bindings, BindingSet, CallValue};
pub use dynlib::{NativeLibrary, SharedObjectRuntime};
pub use host::{RuntimeGuard, RuntimeHost, Sentinels};
pub use proxy::{
    ExtensionTable, ProxyExt, ProxyField, ProxyInstance, ProxyObject, ProxyType, WrapFn,
};
pub use runtime::{Handle, NativeArg, NativeRuntime};

use thiserror::Error;

/// Errors raised at the binding boundary.
///
/// Argument-binding failures are raised before any native call is made;
/// native failures pass through opaquely without interpretation.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("native runtime already initialized")]
    AlreadyInitialized,

    #[error("native runtime not initialized")]
    NotInitialized,

    #[error("argument binding failed for '{routine}': {reason}")]
    ArgumentBinding { routine: String, reason: String },

    /// Opaque passthrough of whatever the native layer signalled.
    #[error("native call '{routine}' failed: {message}")]
    NativeCall { routine: String, message: String },

    #[error("unknown type '{0}'")]
    UnknownType(String),

    #[error("unknown routine '{0}'")]
    UnknownRoutine(String),

    #[error("unknown field '{field}' on type '{type_name}'")]
    UnknownField { type_name: String, field: String },
}
