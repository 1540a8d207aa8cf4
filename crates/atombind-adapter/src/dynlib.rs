//! Shared-object backend for the native runtime boundary.
//!
//! Some native builds ship as a plain shared library exporting the fixed
//! lifecycle entry points (`runtime_initialize`, `runtime_finalize`,
//! `push_verbosity`, `pop_verbosity`, `query_true_sentinel`,
//! `query_false_sentinel`) plus a flat scalar routine surface.
//! [`SharedObjectRuntime`] adapts such a library to the [`NativeRuntime`]
//! trait. Builds with a richer surface (record field access, array
//! routines) link in-process and implement the trait directly.

use libloading::{Library, Symbol};
use std::ffi::CString;
use std::path::Path;

use crate::runtime::{Handle, NativeArg, NativeRuntime};

/// A loaded native shared library.
#[derive(Debug)]
pub struct NativeLibrary {
    library: Library,
    /// Path the library was loaded from, kept for error messages.
    path: String,
}

impl NativeLibrary {
    /// Load a library from an explicit path.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let library = unsafe { Library::new(path) }
            .map_err(|e| format!("failed to load library '{}': {}", path.display(), e))?;
        Ok(Self { library, path: path.display().to_string() })
    }

    /// Load a library by base name, trying the platform-specific filename
    /// first and the name as given second (for callers passing a full
    /// filename or path).
    pub fn load_by_name(name: &str) -> Result<Self, String> {
        let lib_name = Self::platform_lib_name(name);
        if let Ok(lib) = Self::load(&lib_name) {
            return Ok(lib);
        }
        let library = unsafe { Library::new(name) }
            .map_err(|e| format!("failed to load library '{}' (tried '{}'): {}", name, lib_name, e))?;
        Ok(Self { library, path: name.to_string() })
    }

    /// Platform-specific library filename for a base name.
    fn platform_lib_name(name: &str) -> String {
        #[cfg(target_os = "windows")]
        {
            format!("{}.dll", name)
        }
        #[cfg(target_os = "macos")]
        {
            format!("lib{}.dylib", name)
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            format!("lib{}.so", name)
        }
    }

    /// Resolve a function pointer from the library.
    ///
    /// # Safety
    ///
    /// The caller must ensure the symbol exists and that `F` matches the
    /// exported function's actual signature.
    pub unsafe fn get_function<F>(&self, name: &str) -> Result<Symbol<'_, F>, String> {
        let c_name = CString::new(name).map_err(|_| format!("invalid symbol name: {name}"))?;
        self.library
            .get(c_name.as_bytes_with_nul())
            .map_err(|e| format!("symbol '{}' not found in '{}': {}", name, self.path, e))
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// [`NativeRuntime`] over a shared library exporting the fixed lifecycle
/// entry points and a scalar routine surface.
pub struct SharedObjectRuntime {
    library: NativeLibrary,
}

impl SharedObjectRuntime {
    pub fn open(name: &str) -> Result<Self, String> {
        Ok(Self { library: NativeLibrary::load_by_name(name)? })
    }

    pub fn from_library(library: NativeLibrary) -> Self {
        Self { library }
    }

    fn scalar_args(args: &[NativeArg]) -> Result<Vec<f64>, String> {
        args.iter()
            .map(|a| match a {
                NativeArg::Real(n) => Ok(*n),
                NativeArg::Int(i) => Ok(*i as f64),
                other => Err(format!(
                    "shared-object runtimes only dispatch scalar arguments, got {other:?}"
                )),
            })
            .collect()
    }
}

impl NativeRuntime for SharedObjectRuntime {
    fn initialize(&self, verbosity: i32) -> Result<(), String> {
        type InitFn = unsafe extern "C" fn(i32) -> i32;
        let func: Symbol<InitFn> = unsafe { self.library.get_function("runtime_initialize")? };
        let status = unsafe { func(verbosity) };
        if status != 0 {
            return Err(format!("runtime_initialize returned error code {status}"));
        }
        Ok(())
    }

    fn finalize(&self) {
        type FinalizeFn = unsafe extern "C" fn();
        if let Ok(func) = unsafe { self.library.get_function::<FinalizeFn>("runtime_finalize") } {
            unsafe { func() };
        }
    }

    fn push_verbosity(&self, level: i32) {
        type PushFn = unsafe extern "C" fn(i32);
        if let Ok(func) = unsafe { self.library.get_function::<PushFn>("push_verbosity") } {
            unsafe { func(level) };
        }
    }

    fn pop_verbosity(&self) {
        type PopFn = unsafe extern "C" fn();
        if let Ok(func) = unsafe { self.library.get_function::<PopFn>("pop_verbosity") } {
            unsafe { func() };
        }
    }

    fn true_sentinel(&self) -> i32 {
        type QueryFn = unsafe extern "C" fn() -> i32;
        match unsafe { self.library.get_function::<QueryFn>("query_true_sentinel") } {
            Ok(func) => unsafe { func() },
            Err(_) => 1,
        }
    }

    fn false_sentinel(&self) -> i32 {
        type QueryFn = unsafe extern "C" fn() -> i32;
        match unsafe { self.library.get_function::<QueryFn>("query_false_sentinel") } {
            Ok(func) => unsafe { func() },
            Err(_) => 0,
        }
    }

    fn allocate(&self, type_name: &str) -> Result<Handle, String> {
        type AllocFn = unsafe extern "C" fn(*const std::os::raw::c_char) -> u64;
        let func: Symbol<AllocFn> = unsafe { self.library.get_function("allocate_instance")? };
        let c_name =
            CString::new(type_name).map_err(|_| format!("invalid type name: {type_name}"))?;
        let handle = unsafe { func(c_name.as_ptr()) };
        if handle == 0 {
            return Err(format!("allocate_instance failed for type '{type_name}'"));
        }
        Ok(handle)
    }

    fn release(&self, handle: Handle) {
        type ReleaseFn = unsafe extern "C" fn(u64);
        if let Ok(func) = unsafe { self.library.get_function::<ReleaseFn>("release_instance") } {
            unsafe { func(handle) };
        }
    }

    fn get_field(&self, _handle: Handle, field: &str) -> Result<NativeArg, String> {
        Err(format!(
            "field access ('{field}') is not part of the shared-object surface; use an in-process runtime"
        ))
    }

    fn set_field(&self, _handle: Handle, field: &str, _value: NativeArg) -> Result<(), String> {
        Err(format!(
            "field access ('{field}') is not part of the shared-object surface; use an in-process runtime"
        ))
    }

    /// Scalar dispatch: routines are exported under their own name with a
    /// `(f64, ...) -> f64` signature, up to three arguments.
    fn invoke(&self, routine: &str, args: &[NativeArg]) -> Result<Vec<NativeArg>, String> {
        let scalars = Self::scalar_args(args)?;
        let result = match scalars.len() {
            0 => {
                type Fn0 = unsafe extern "C" fn() -> f64;
                let func: Symbol<Fn0> = unsafe { self.library.get_function(routine)? };
                unsafe { func() }
            }
            1 => {
                type Fn1 = unsafe extern "C" fn(f64) -> f64;
                let func: Symbol<Fn1> = unsafe { self.library.get_function(routine)? };
                unsafe { func(scalars[0]) }
            }
            2 => {
                type Fn2 = unsafe extern "C" fn(f64, f64) -> f64;
                let func: Symbol<Fn2> = unsafe { self.library.get_function(routine)? };
                unsafe { func(scalars[0], scalars[1]) }
            }
            3 => {
                type Fn3 = unsafe extern "C" fn(f64, f64, f64) -> f64;
                let func: Symbol<Fn3> = unsafe { self.library.get_function(routine)? };
                unsafe { func(scalars[0], scalars[1], scalars[2]) }
            }
            n => return Err(format!("unsupported scalar argument count: {n}")),
        };
        Ok(vec![NativeArg::Real(result)])
    }
}
