//! Acquire-once/release-once lifecycle for the native runtime.
//!
//! Acquisition order: initialize the runtime, push a verbosity frame, query
//! the boolean sentinels. Release runs in strict reverse order and skips
//! whatever was never acquired, so a guard is safe to drop even after a
//! partial initialization failure.

use std::cell::Cell;
use std::rc::Rc;

use log::debug;

use crate::runtime::NativeRuntime;
use crate::BindError;

/// Runtime-reported numeric values for logical true/false.
///
/// Queried once at startup; the values are determined by the native build
/// and must not be assumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sentinels {
    pub true_value: i32,
    pub false_value: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HostState {
    Idle,
    Active,
    Closed,
}

/// Owns the native runtime's process-wide lifecycle.
///
/// One host per process; the native runtime is global and non-reentrant.
pub struct RuntimeHost {
    runtime: Rc<dyn NativeRuntime>,
    state: Cell<HostState>,
    sentinels: Cell<Option<Sentinels>>,
    verbosity_pushed: Cell<bool>,
}

impl RuntimeHost {
    pub fn new(runtime: Rc<dyn NativeRuntime>) -> Rc<Self> {
        Rc::new(RuntimeHost {
            runtime,
            state: Cell::new(HostState::Idle),
            sentinels: Cell::new(None),
            verbosity_pushed: Cell::new(false),
        })
    }

    /// Initialize the native runtime. Fails on a second call for the same
    /// host. Pair with a [`RuntimeGuard`] (or call [`RuntimeHost::finalize`]
    /// explicitly) so release runs on every exit path.
    pub fn initialize(&self, verbosity: i32) -> Result<(), BindError> {
        if self.state.get() != HostState::Idle {
            return Err(BindError::AlreadyInitialized);
        }
        self.runtime
            .initialize(verbosity)
            .map_err(|message| BindError::NativeCall {
                routine: "runtime_initialize".to_string(),
                message,
            })?;
        self.state.set(HostState::Active);

        self.runtime.push_verbosity(0);
        self.verbosity_pushed.set(true);

        let sentinels = Sentinels {
            true_value: self.runtime.true_sentinel(),
            false_value: self.runtime.false_sentinel(),
        };
        self.sentinels.set(Some(sentinels));
        debug!(
            "native runtime initialized (true={}, false={})",
            sentinels.true_value, sentinels.false_value
        );

        Ok(())
    }

    /// Release native state in reverse order of acquisition. Safe (a no-op)
    /// on an uninitialized or already-finalized host.
    pub fn finalize(&self) {
        if self.state.get() != HostState::Active {
            return;
        }
        if self.verbosity_pushed.get() {
            self.runtime.pop_verbosity();
            self.verbosity_pushed.set(false);
        }
        self.runtime.finalize();
        self.state.set(HostState::Closed);
        debug!("native runtime finalized");
    }

    pub fn is_active(&self) -> bool {
        self.state.get() == HostState::Active
    }

    pub fn runtime(&self) -> &Rc<dyn NativeRuntime> {
        &self.runtime
    }

    pub fn sentinels(&self) -> Result<Sentinels, BindError> {
        self.sentinels.get().ok_or(BindError::NotInitialized)
    }

    /// Managed bool to native sentinel.
    pub fn marshal_bool(&self, value: bool) -> Result<i32, BindError> {
        let s = self.sentinels()?;
        Ok(if value { s.true_value } else { s.false_value })
    }

    /// Native sentinel to managed bool. A value matching neither sentinel is
    /// a native-side fault, reported opaquely.
    pub fn unmarshal_bool(&self, raw: i32) -> Result<bool, BindError> {
        let s = self.sentinels()?;
        if raw == s.true_value {
            Ok(true)
        } else if raw == s.false_value {
            Ok(false)
        } else {
            Err(BindError::NativeCall {
                routine: "logical demarshal".to_string(),
                message: format!(
                    "value {} matches neither sentinel ({} / {})",
                    raw, s.true_value, s.false_value
                ),
            })
        }
    }
}

/// Scoped cleanup for the runtime lifecycle: finalizes the host on drop,
/// on every exit path, normal or not.
pub struct RuntimeGuard {
    host: Rc<RuntimeHost>,
}

impl RuntimeGuard {
    /// Initialize the host and arm finalization on drop.
    pub fn acquire(host: Rc<RuntimeHost>, verbosity: i32) -> Result<Self, BindError> {
        host.initialize(verbosity)?;
        Ok(RuntimeGuard { host })
    }

    pub fn host(&self) -> &Rc<RuntimeHost> {
        &self.host
    }
}

impl Drop for RuntimeGuard {
    fn drop(&mut self) {
        self.host.finalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use crate::runtime::{Handle, NativeArg};

    /// Records lifecycle calls in order.
    #[derive(Default)]
    struct TraceRuntime {
        calls: RefCell<Vec<String>>,
        fail_init: bool,
    }

    impl TraceRuntime {
        fn log(&self, call: &str) {
            self.calls.borrow_mut().push(call.to_string());
        }
    }

    impl NativeRuntime for TraceRuntime {
        fn initialize(&self, verbosity: i32) -> Result<(), String> {
            self.log(&format!("initialize({verbosity})"));
            if self.fail_init {
                return Err("native init failed".to_string());
            }
            Ok(())
        }
        fn finalize(&self) {
            self.log("finalize");
        }
        fn push_verbosity(&self, level: i32) {
            self.log(&format!("push_verbosity({level})"));
        }
        fn pop_verbosity(&self) {
            self.log("pop_verbosity");
        }
        fn true_sentinel(&self) -> i32 {
            1
        }
        fn false_sentinel(&self) -> i32 {
            0
        }
        fn allocate(&self, _type_name: &str) -> Result<Handle, String> {
            Err("unused".to_string())
        }
        fn release(&self, _handle: Handle) {}
        fn get_field(&self, _h: Handle, _f: &str) -> Result<NativeArg, String> {
            Err("unused".to_string())
        }
        fn set_field(&self, _h: Handle, _f: &str, _v: NativeArg) -> Result<(), String> {
            Err("unused".to_string())
        }
        fn invoke(&self, _r: &str, _a: &[NativeArg]) -> Result<Vec<NativeArg>, String> {
            Err("unused".to_string())
        }
    }

    #[test]
    fn test_double_initialize_fails() {
        let rt = Rc::new(TraceRuntime::default());
        let host = RuntimeHost::new(rt);
        host.initialize(-1).unwrap();
        assert!(matches!(
            host.initialize(-1),
            Err(BindError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_finalize_on_idle_host_is_noop() {
        let rt = Rc::new(TraceRuntime::default());
        let host = RuntimeHost::new(Rc::clone(&rt) as Rc<dyn NativeRuntime>);
        host.finalize();
        assert!(rt.calls.borrow().is_empty());
    }

    #[test]
    fn test_guard_releases_in_reverse_order() {
        let rt = Rc::new(TraceRuntime::default());
        let host = RuntimeHost::new(Rc::clone(&rt) as Rc<dyn NativeRuntime>);
        {
            let _guard = RuntimeGuard::acquire(Rc::clone(&host), -1).unwrap();
        }
        assert_eq!(
            *rt.calls.borrow(),
            vec!["initialize(-1)", "push_verbosity(0)", "pop_verbosity", "finalize"]
        );
        // Release runs once even if finalize is called again.
        host.finalize();
        assert_eq!(rt.calls.borrow().len(), 4);
    }

    #[test]
    fn test_failed_initialize_leaves_host_idle() {
        let rt = Rc::new(TraceRuntime { fail_init: true, ..Default::default() });
        let host = RuntimeHost::new(Rc::clone(&rt) as Rc<dyn NativeRuntime>);
        assert!(matches!(
            host.initialize(0),
            Err(BindError::NativeCall { .. })
        ));
        assert!(!host.is_active());
        // Finalize after a failed init must not touch the runtime.
        host.finalize();
        assert_eq!(*rt.calls.borrow(), vec!["initialize(0)"]);
    }

    #[test]
    fn test_sentinels_cached_after_initialize() {
        let rt = Rc::new(TraceRuntime::default());
        let host = RuntimeHost::new(rt);
        assert!(host.sentinels().is_err());
        host.initialize(0).unwrap();
        let s = host.sentinels().unwrap();
        assert_eq!(s.true_value, 1);
        assert_eq!(s.false_value, 0);
        assert_eq!(host.marshal_bool(true).unwrap(), 1);
        assert_eq!(host.unmarshal_bool(0).unwrap(), false);
        assert!(host.unmarshal_bool(7).is_err());
    }
}
