//! Generated proxy types and handle-owning proxy instances.
//!
//! A [`ProxyType`] mirrors one native record descriptor; a [`ProxyInstance`]
//! wraps one native handle and owns its lifetime. Handles are never shared
//! between owning instances; nested record fields attach without ownership
//! because the parent instance owns their storage.

use std::any::Any;
use std::collections::HashMap;
use std::rc::Rc;

use atombind_spec::{FieldKind, TypeDescriptor};
use atombind_values::Value;

use crate::host::RuntimeHost;
use crate::marshal;
use crate::runtime::{Handle, NativeArg};
use crate::BindError;

/// Managed mirror of one native record type: the declared field set with
/// kinds, array shapes and the origin-1 offset every array field carries.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyType {
    name: String,
    fields: Vec<ProxyField>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProxyField {
    pub name: String,
    pub kind: FieldKind,
}

impl ProxyType {
    pub fn from_descriptor(desc: &TypeDescriptor) -> Self {
        ProxyType {
            name: desc.name.clone(),
            fields: desc
                .fields
                .iter()
                .map(|f| ProxyField { name: f.name.clone(), kind: f.kind.clone() })
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared field names, in declaration order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn field(&self, name: &str) -> Option<&ProxyField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Declared shape and index origin of an array field.
    pub fn array_shape(&self, name: &str) -> Option<(&[usize], i64)> {
        match &self.field(name)?.kind {
            FieldKind::Array { shape, .. } => Some((shape.as_slice(), 1)),
            _ => None,
        }
    }
}

/// Shared name-to-type table built once at generation time.
pub(crate) type TypeTable = Rc<HashMap<String, Rc<ProxyType>>>;

/// A managed object wrapping one native handle.
///
/// Construction allocates (or attaches to) a native instance; drop releases
/// it when the instance owns the handle.
pub struct ProxyInstance {
    ty: Rc<ProxyType>,
    types: TypeTable,
    host: Rc<RuntimeHost>,
    handle: Handle,
    owned: bool,
}

impl ProxyInstance {
    pub(crate) fn allocate(
        ty: Rc<ProxyType>,
        types: TypeTable,
        host: Rc<RuntimeHost>,
    ) -> Result<Self, BindError> {
        if !host.is_active() {
            return Err(BindError::NotInitialized);
        }
        let handle = host
            .runtime()
            .allocate(ty.name())
            .map_err(|message| BindError::NativeCall {
                routine: format!("allocate {}", ty.name()),
                message,
            })?;
        Ok(ProxyInstance { ty, types, host, handle, owned: true })
    }

    pub(crate) fn attach(
        ty: Rc<ProxyType>,
        types: TypeTable,
        host: Rc<RuntimeHost>,
        handle: Handle,
        owned: bool,
    ) -> Self {
        ProxyInstance { ty, types, host, handle, owned }
    }

    pub fn proxy_type(&self) -> &ProxyType {
        &self.ty
    }

    pub fn type_name(&self) -> &str {
        self.ty.name()
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Whether this instance releases the handle on drop.
    pub fn owns_handle(&self) -> bool {
        self.owned
    }

    fn field_kind(&self, field: &str) -> Result<FieldKind, BindError> {
        self.ty
            .field(field)
            .map(|f| f.kind.clone())
            .ok_or_else(|| BindError::UnknownField {
                type_name: self.ty.name().to_string(),
                field: field.to_string(),
            })
    }

    fn fetch(&self, field: &str) -> Result<NativeArg, BindError> {
        self.host
            .runtime()
            .get_field(self.handle, field)
            .map_err(|message| BindError::NativeCall {
                routine: format!("{}%{}", self.ty.name(), field),
                message,
            })
    }

    /// Read a scalar or array field. Record fields go through
    /// [`ProxyInstance::get_record`].
    pub fn get(&self, field: &str) -> Result<Value, BindError> {
        let ctx = format!("{}%{}", self.ty.name(), field);
        match self.field_kind(field)? {
            FieldKind::Scalar { prim } => {
                let raw = self.fetch(field)?;
                marshal::native_to_scalar(&self.host, prim, raw, &ctx)
            }
            FieldKind::Array { prim, shape } => {
                let raw = self.fetch(field)?;
                let value = marshal::native_to_array(&self.host, prim, raw, &ctx)?;
                if let Value::Array(a) = &value {
                    if a.shape() != shape.as_slice() {
                        return Err(BindError::NativeCall {
                            routine: ctx,
                            message: format!(
                                "native shape {:?} disagrees with declared {:?}",
                                a.shape(),
                                shape
                            ),
                        });
                    }
                }
                Ok(value)
            }
            FieldKind::Record { type_name } => Err(BindError::ArgumentBinding {
                routine: ctx,
                reason: format!("field is a record of type '{type_name}'; use get_record"),
            }),
        }
    }

    /// Read a nested record field as a non-owning proxy. The parent instance
    /// owns the nested storage, so the child never releases the handle.
    pub fn get_record(&self, field: &str) -> Result<ProxyInstance, BindError> {
        let ctx = format!("{}%{}", self.ty.name(), field);
        let type_name = match self.field_kind(field)? {
            FieldKind::Record { type_name } => type_name,
            other => {
                return Err(BindError::ArgumentBinding {
                    routine: ctx,
                    reason: format!("field is {other:?}, not a record"),
                })
            }
        };
        let nested_ty = self
            .types
            .get(&type_name)
            .cloned()
            .ok_or_else(|| BindError::UnknownType(type_name.clone()))?;
        let raw = self.fetch(field)?;
        match raw {
            NativeArg::Handle(h) => Ok(ProxyInstance::attach(
                nested_ty,
                Rc::clone(&self.types),
                Rc::clone(&self.host),
                h,
                false,
            )),
            other => Err(BindError::NativeCall {
                routine: ctx,
                message: format!("expected handle for record field, got {other:?}"),
            }),
        }
    }

    /// Write a scalar or array field. Kind mismatches are rejected before
    /// the native call; array shape must match the declaration exactly.
    pub fn set(&self, field: &str, value: &Value) -> Result<(), BindError> {
        let ctx = format!("{}%{}", self.ty.name(), field);
        let native = match self.field_kind(field)? {
            FieldKind::Scalar { prim } => marshal::scalar_to_native(&self.host, prim, value, &ctx)?,
            FieldKind::Array { prim, shape } => match value {
                Value::Array(a) => {
                    if a.shape() != shape.as_slice() {
                        return Err(BindError::ArgumentBinding {
                            routine: ctx,
                            reason: format!(
                                "array shape {:?} doesn't match declared {:?}",
                                a.shape(),
                                shape
                            ),
                        });
                    }
                    marshal::array_to_native(&self.host, prim, a, &ctx)?
                }
                other => {
                    return Err(BindError::ArgumentBinding {
                        routine: ctx,
                        reason: format!("expected array, got {}", other.kind_name()),
                    })
                }
            },
            FieldKind::Record { .. } => {
                return Err(BindError::ArgumentBinding {
                    routine: ctx,
                    reason: "record fields cannot be assigned directly".to_string(),
                })
            }
        };
        self.host
            .runtime()
            .set_field(self.handle, field, native)
            .map_err(|message| BindError::NativeCall { routine: ctx, message })
    }

    /// Snapshot every scalar and array field into a record mapping.
    pub fn snapshot(&self) -> Result<atombind_values::Dict, BindError> {
        let mut dict = atombind_values::Dict::new();
        for field in self.ty.field_names() {
            if matches!(self.field_kind(field)?, FieldKind::Record { .. }) {
                continue;
            }
            dict.insert(field, self.get(field)?);
        }
        Ok(dict)
    }
}

impl Drop for ProxyInstance {
    fn drop(&mut self) {
        if self.owned {
            self.host.runtime().release(self.handle);
        }
    }
}

impl std::fmt::Debug for ProxyInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ProxyInstance({}, handle={}, owned={})",
            self.ty.name(),
            self.handle,
            self.owned
        )
    }
}

/// A hand-written extension wrapping a generated proxy.
///
/// The wrapper composes over the generated instance rather than replacing
/// it, so every generated field stays reachable through [`ProxyExt::base`].
pub trait ProxyExt {
    fn base(&self) -> &ProxyInstance;
    fn as_any(&self) -> &dyn Any;
}

/// Constructor override for one proxy type name.
pub type WrapFn = fn(ProxyInstance) -> Box<dyn ProxyExt>;

/// Pluggable factory override table: type name to wrap function, resolved
/// once at generation time. An absent entry means the generated type is
/// used unmodified, which is not an error.
#[derive(Default)]
pub struct ExtensionTable {
    overrides: HashMap<String, WrapFn>,
}

impl ExtensionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, type_name: impl Into<String>, wrap: WrapFn) {
        self.overrides.insert(type_name.into(), wrap);
    }

    pub fn get(&self, type_name: &str) -> Option<WrapFn> {
        self.overrides.get(type_name).copied()
    }

    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}

/// A constructed proxy: either the generated instance or its extended
/// wrapper when an override is registered for the type name.
pub enum ProxyObject {
    Generated(ProxyInstance),
    Extended(Box<dyn ProxyExt>),
}

impl ProxyObject {
    /// The generated instance, regardless of extension.
    pub fn base(&self) -> &ProxyInstance {
        match self {
            ProxyObject::Generated(inst) => inst,
            ProxyObject::Extended(ext) => ext.base(),
        }
    }

    pub fn is_extended(&self) -> bool {
        matches!(self, ProxyObject::Extended(_))
    }
}
