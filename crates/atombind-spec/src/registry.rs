//! Populate-once registry of type and routine descriptors.

use std::collections::HashMap;
use std::sync::OnceLock;

use log::debug;

use crate::descriptors::{BindingSpec, FieldKind, ParamKind, RoutineDescriptor, TypeDescriptor};
use crate::SpecError;

/// Process-wide mapping from type/routine name to descriptor.
///
/// Built once from a [`BindingSpec`] and read-only thereafter.
#[derive(Debug, Default)]
pub struct Registry {
    types: HashMap<String, TypeDescriptor>,
    routines: HashMap<String, RoutineDescriptor>,
}

impl Registry {
    /// Validate a specification and build the registry from it.
    ///
    /// Rejected: duplicate type or routine names, record references to
    /// undeclared types, array fields with an empty or zero-sized shape.
    pub fn from_spec(spec: BindingSpec) -> Result<Self, SpecError> {
        let mut types = HashMap::new();
        for ty in spec.types {
            if types.insert(ty.name.clone(), ty.clone()).is_some() {
                return Err(SpecError::Invalid {
                    reason: format!("duplicate type name '{}'", ty.name),
                });
            }
        }

        let mut routines = HashMap::new();
        for routine in spec.routines {
            if routines.insert(routine.name.clone(), routine.clone()).is_some() {
                return Err(SpecError::Invalid {
                    reason: format!("duplicate routine name '{}'", routine.name),
                });
            }
        }

        let registry = Registry { types, routines };
        registry.check_references()?;
        debug!(
            "registry populated: {} types, {} routines",
            registry.types.len(),
            registry.routines.len()
        );
        Ok(registry)
    }

    fn check_references(&self) -> Result<(), SpecError> {
        for ty in self.types.values() {
            for field in &ty.fields {
                match &field.kind {
                    FieldKind::Record { type_name } => {
                        if !self.types.contains_key(type_name) {
                            return Err(SpecError::Invalid {
                                reason: format!(
                                    "type '{}' field '{}' references unknown type '{}'",
                                    ty.name, field.name, type_name
                                ),
                            });
                        }
                    }
                    FieldKind::Array { shape, .. } => {
                        if shape.is_empty() || shape.iter().any(|&d| d == 0) {
                            return Err(SpecError::Invalid {
                                reason: format!(
                                    "type '{}' field '{}' has invalid array shape {:?}",
                                    ty.name, field.name, shape
                                ),
                            });
                        }
                    }
                    FieldKind::Scalar { .. } => {}
                }
            }
        }
        for routine in self.routines.values() {
            for param in &routine.params {
                if let ParamKind::Record { type_name } = &param.kind {
                    if !self.types.contains_key(type_name) {
                        return Err(SpecError::Invalid {
                            reason: format!(
                                "routine '{}' parameter '{}' references unknown type '{}'",
                                routine.name, param.name, type_name
                            ),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    pub fn get_type(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    pub fn get_routine(&self, name: &str) -> Option<&RoutineDescriptor> {
        self.routines.get(name)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(|k| k.as_str())
    }

    pub fn routine_names(&self) -> impl Iterator<Item = &str> {
        self.routines.keys().map(|k| k.as_str())
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn routine_count(&self) -> usize {
        self.routines.len()
    }
}

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// Install the process-wide registry. Succeeds exactly once.
pub fn install_registry(registry: Registry) -> Result<&'static Registry, SpecError> {
    let mut installed = false;
    let slot = GLOBAL.get_or_init(|| {
        installed = true;
        registry
    });
    if installed {
        Ok(slot)
    } else {
        Err(SpecError::AlreadyLoaded)
    }
}

/// The process-wide registry, if one has been installed.
pub fn global_registry() -> Option<&'static Registry> {
    GLOBAL.get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::{FieldDescriptor, ParamDescriptor, PrimKind};

    fn atoms_type() -> TypeDescriptor {
        TypeDescriptor {
            name: "atoms".to_string(),
            fields: vec![
                FieldDescriptor {
                    name: "n".to_string(),
                    kind: FieldKind::Scalar { prim: PrimKind::Int },
                },
                FieldDescriptor {
                    name: "lattice".to_string(),
                    kind: FieldKind::Array { prim: PrimKind::Real, shape: vec![3, 3] },
                },
            ],
        }
    }

    #[test]
    fn test_duplicate_type_rejected() {
        let spec = BindingSpec {
            types: vec![atoms_type(), atoms_type()],
            routines: vec![],
        };
        assert!(matches!(
            Registry::from_spec(spec),
            Err(SpecError::Invalid { .. })
        ));
    }

    #[test]
    fn test_unresolved_record_reference_rejected() {
        let spec = BindingSpec {
            types: vec![TypeDescriptor {
                name: "atoms".to_string(),
                fields: vec![FieldDescriptor {
                    name: "params".to_string(),
                    kind: FieldKind::Record { type_name: "dictionary".to_string() },
                }],
            }],
            routines: vec![],
        };
        let err = Registry::from_spec(spec).unwrap_err();
        assert!(err.to_string().contains("unknown type 'dictionary'"));
    }

    #[test]
    fn test_zero_sized_array_shape_rejected() {
        let spec = BindingSpec {
            types: vec![TypeDescriptor {
                name: "bad".to_string(),
                fields: vec![FieldDescriptor {
                    name: "v".to_string(),
                    kind: FieldKind::Array { prim: PrimKind::Real, shape: vec![3, 0] },
                }],
            }],
            routines: vec![],
        };
        assert!(Registry::from_spec(spec).is_err());
    }

    #[test]
    fn test_routine_record_param_must_resolve() {
        let spec = BindingSpec {
            types: vec![],
            routines: vec![RoutineDescriptor {
                name: "calc".to_string(),
                params: vec![ParamDescriptor {
                    name: "this".to_string(),
                    kind: ParamKind::Record { type_name: "atoms".to_string() },
                    direction: Default::default(),
                    optional: false,
                }],
                ret: None,
            }],
        };
        assert!(Registry::from_spec(spec).is_err());
    }

    #[test]
    fn test_install_succeeds_exactly_once() {
        let first = Registry::from_spec(BindingSpec::default()).unwrap();
        assert!(install_registry(first).is_ok());
        assert!(global_registry().is_some());

        let second = Registry::from_spec(BindingSpec::default()).unwrap();
        assert!(matches!(
            install_registry(second),
            Err(SpecError::AlreadyLoaded)
        ));
    }

    #[test]
    fn test_lookup() {
        let spec = BindingSpec { types: vec![atoms_type()], routines: vec![] };
        let reg = Registry::from_spec(spec).unwrap();
        assert!(reg.get_type("atoms").is_some());
        assert!(reg.get_type("missing").is_none());
        assert_eq!(reg.type_count(), 1);
    }
}
