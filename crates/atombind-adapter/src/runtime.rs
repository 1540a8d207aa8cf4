//! The native-runtime boundary.
//!
//! The adapter consumes these entry points; it never defines their
//! implementation. Booleans cross the boundary as a numeric sentinel pair
//! reported by the runtime itself, never as assumed literals.

/// Opaque token identifying an instance in the native library's memory.
pub type Handle = u64;

/// Wire representation of one value crossing the native boundary.
///
/// Logical values travel as `Int` carrying a runtime-reported sentinel;
/// strings carry an explicit byte length; arrays carry their shape.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeArg {
    Int(i32),
    Real(f64),
    Str { bytes: Vec<u8>, len: usize },
    RealArray { data: Vec<f64>, shape: Vec<usize> },
    IntArray { data: Vec<i32>, shape: Vec<usize> },
    Handle(Handle),
    /// The native convention for an optional argument that was not supplied.
    Absent,
}

impl NativeArg {
    pub fn str(s: &str) -> Self {
        let bytes = s.as_bytes().to_vec();
        let len = bytes.len();
        NativeArg::Str { bytes, len }
    }
}

/// Foreign entry points supplied by the wrapped native runtime.
///
/// All calls are blocking and synchronous; the runtime is non-reentrant and
/// process-global. Errors are whatever the native layer signals, passed
/// through as strings without interpretation.
pub trait NativeRuntime {
    /// Establish global native state. Called exactly once, before anything else.
    fn initialize(&self, verbosity: i32) -> Result<(), String>;

    /// Release global native state. Called exactly once, last.
    fn finalize(&self);

    fn push_verbosity(&self, level: i32);
    fn pop_verbosity(&self);

    /// Numeric value the native build uses for logical true.
    fn true_sentinel(&self) -> i32;

    /// Numeric value the native build uses for logical false.
    fn false_sentinel(&self) -> i32;

    /// Allocate a native instance of the named record type.
    fn allocate(&self, type_name: &str) -> Result<Handle, String>;

    /// Release a native instance.
    fn release(&self, handle: Handle);

    fn get_field(&self, handle: Handle, field: &str) -> Result<NativeArg, String>;

    fn set_field(&self, handle: Handle, field: &str, value: NativeArg) -> Result<(), String>;

    /// Invoke a routine from the generated surface. Outputs are returned
    /// with the return value (if any) first, then out/inout parameters in
    /// declaration order.
    fn invoke(&self, routine: &str, args: &[NativeArg]) -> Result<Vec<NativeArg>, String>;
}
