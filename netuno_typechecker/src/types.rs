//! The Netuno semantic type model.
//!
//! Type identity is `Rc` pointer identity; the [`TypeRegistry`] owns every
//! built-in type and interns delegate types so structurally equal signatures
//! compare equal. The kind order encodes the binary promotion rule: the
//! operand whose kind has the smaller enumerator wins.

use crate::scope::Scope;
use netuno_nir::{Context, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Kind tags ordered for promotion: `string < f64 < f32 < u64 < i64 < u32 <
/// i32 < bool`, so mixed arithmetic prefers the wider operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NtTypeKind {
    Error,
    Undefined,
    Void,
    String,
    F64,
    F32,
    U64,
    I64,
    U32,
    I32,
    Bool,
    Delegate,
    Assembly,
    Module,
    Object,
    Custom,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: Rc<str>,
    pub ty: NtTypeRef,
}

#[derive(Debug, Clone)]
pub struct DelegateData {
    pub return_type: NtTypeRef,
    pub params: Vec<Param>,
}

pub type NtTypeRef = Rc<NtType>;

#[derive(Debug)]
pub struct NtType {
    pub kind: NtTypeKind,
    pub name: Rc<str>,
    pub base: Option<NtTypeRef>,
    /// Member scope: cast helpers on primitives, `equals`/`concat` on
    /// string, `write`/`readline` on console.
    pub fields: RefCell<Scope>,
    pub delegate: Option<DelegateData>,
}

/// Identity comparison; all semantic type equality in the compiler is
/// pointer equality on registry-owned types.
pub fn same_type(a: &NtTypeRef, b: &NtTypeRef) -> bool {
    Rc::ptr_eq(a, b)
}

impl NtType {
    pub fn primitive(kind: NtTypeKind, name: &str) -> NtTypeRef {
        Rc::new(NtType {
            kind,
            name: Rc::from(name),
            base: None,
            fields: RefCell::new(Scope::new(crate::scope::ScopeKind::Type)),
            delegate: None,
        })
    }

    pub fn with_base(kind: NtTypeKind, name: &str, base: NtTypeRef) -> NtTypeRef {
        Rc::new(NtType {
            kind,
            name: Rc::from(name),
            base: Some(base),
            fields: RefCell::new(Scope::new(crate::scope::ScopeKind::Type)),
            delegate: None,
        })
    }

    pub fn is_signed(&self) -> bool {
        matches!(self.kind, NtTypeKind::I32 | NtTypeKind::I64)
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self.kind,
            NtTypeKind::I32 | NtTypeKind::I64 | NtTypeKind::U32 | NtTypeKind::U64
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self.kind, NtTypeKind::F32 | NtTypeKind::F64)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Member lookup through the type's own fields, then the base chain.
    pub fn lookup_field(&self, name: &str) -> Option<crate::scope::Symbol> {
        if let Some(symbol) = self.fields.borrow().lookup(name) {
            return Some(symbol.clone());
        }
        self.base.as_ref().and_then(|base| base.lookup_field(name))
    }
}

impl fmt::Display for NtType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Whether a value of `from` may be passed where `to` is expected.
pub fn is_assignable_from(to: &NtTypeRef, from: &NtTypeRef) -> bool {
    if same_type(to, from) {
        return true;
    }
    // anything object-based may flow into `object`
    to.kind == NtTypeKind::Object
}

/// Map a semantic type to its IR representation. `module`/`assembly` have
/// no IR form; asking for one is a programming error.
pub fn to_nir_type(context: &mut Context, ty: &NtType) -> TypeId {
    match ty.kind {
        NtTypeKind::Error => context.error_type(),
        NtTypeKind::Void => context.void_type(),
        NtTypeKind::String => context.int32_ptr_type(),
        NtTypeKind::F64 => context.double_type(),
        NtTypeKind::F32 => context.float_type(),
        NtTypeKind::U64 | NtTypeKind::I64 => context.int64_type(),
        NtTypeKind::U32 | NtTypeKind::I32 => context.int32_type(),
        NtTypeKind::Bool => context.int1_type(),
        NtTypeKind::Object => context.opaque_pointer_type(),
        NtTypeKind::Delegate => {
            let delegate = ty.delegate.as_ref().expect("delegate type has a signature");
            let result = to_nir_type(context, &delegate.return_type);
            let params: Vec<TypeId> = delegate
                .params
                .iter()
                .map(|p| to_nir_type(context, &p.ty))
                .collect();
            context.function_type(result, &params, false)
        }
        NtTypeKind::Undefined
        | NtTypeKind::Assembly
        | NtTypeKind::Module
        | NtTypeKind::Custom => {
            debug_assert!(false, "type '{}' has no IR representation", ty.name);
            context.error_type()
        }
    }
}

/// Owns the built-in types and the delegate-type intern pool. Built once
/// per compilation against a Context; no process-wide state.
pub struct TypeRegistry {
    pub error: NtTypeRef,
    pub undefined: NtTypeRef,
    pub void: NtTypeRef,
    pub object: NtTypeRef,
    pub bool_: NtTypeRef,
    pub i32_: NtTypeRef,
    pub i64_: NtTypeRef,
    pub u32_: NtTypeRef,
    pub u64_: NtTypeRef,
    pub f32_: NtTypeRef,
    pub f64_: NtTypeRef,
    pub string: NtTypeRef,
    pub console: NtTypeRef,

    delegates: RefCell<Vec<NtTypeRef>>,
    /// IR modules holding the extern declarations of the built-in helper
    /// functions; kept for diagnostics dumps.
    pub builtin_modules: RefCell<Vec<netuno_nir::Module>>,
}

impl TypeRegistry {
    pub fn new(context: &mut Context) -> Rc<Self> {
        let object = NtType::primitive(NtTypeKind::Object, "object");

        let registry = Rc::new(TypeRegistry {
            error: NtType::primitive(NtTypeKind::Error, "error"),
            undefined: NtType::primitive(NtTypeKind::Undefined, "undefined"),
            void: NtType::primitive(NtTypeKind::Void, "void"),
            bool_: NtType::primitive(NtTypeKind::Bool, "bool"),
            i32_: NtType::primitive(NtTypeKind::I32, "i32"),
            i64_: NtType::primitive(NtTypeKind::I64, "i64"),
            u32_: NtType::primitive(NtTypeKind::U32, "u32"),
            u64_: NtType::primitive(NtTypeKind::U64, "u64"),
            f32_: NtType::primitive(NtTypeKind::F32, "f32"),
            f64_: NtType::primitive(NtTypeKind::F64, "f64"),
            string: NtType::with_base(NtTypeKind::String, "string", object.clone()),
            console: NtType::with_base(NtTypeKind::Module, "console", object.clone()),
            object,
            delegates: RefCell::new(Vec::new()),
            builtin_modules: RefCell::new(Vec::new()),
        });

        crate::builtins::register(context, &registry);
        registry
    }

    /// All the primitive types a source program can name.
    pub fn primitives(&self) -> [&NtTypeRef; 8] {
        [
            &self.bool_,
            &self.i32_,
            &self.i64_,
            &self.u32_,
            &self.u64_,
            &self.f32_,
            &self.f64_,
            &self.string,
        ]
    }

    /// Interned delegate type for a signature; equal signatures return the
    /// same type, so delegate identity comparison behaves like primitive
    /// identity comparison.
    pub fn take_delegate_type(&self, return_type: NtTypeRef, params: Vec<Param>) -> NtTypeRef {
        let mut pool = self.delegates.borrow_mut();
        for existing in pool.iter() {
            let delegate = existing.delegate.as_ref().expect("pool holds delegates");
            if same_type(&delegate.return_type, &return_type)
                && delegate.params.len() == params.len()
                && delegate
                    .params
                    .iter()
                    .zip(&params)
                    .all(|(a, b)| same_type(&a.ty, &b.ty))
            {
                return existing.clone();
            }
        }

        let name = {
            let params: Vec<&str> = params.iter().map(|p| &*p.ty.name).collect();
            format!("delegate({}): {}", params.join(", "), return_type.name)
        };
        let delegate = Rc::new(NtType {
            kind: NtTypeKind::Delegate,
            name: Rc::from(name.as_str()),
            base: Some(self.object.clone()),
            fields: RefCell::new(Scope::new(crate::scope::ScopeKind::Type)),
            delegate: Some(DelegateData {
                return_type,
                params,
            }),
        });
        pool.push(delegate.clone());
        delegate
    }

    /// A module type for a compiled source file.
    pub fn take_module_type(&self, name: &str) -> NtTypeRef {
        NtType::with_base(NtTypeKind::Module, name, self.object.clone())
    }
}
