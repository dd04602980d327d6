//! The interned type system.
//!
//! Each non-primitive kind has a pool in the Context; the `*_type`
//! constructors linearly search the pool for a structurally equal descriptor
//! and intern a new one when none matches. Equality of types downstream is
//! id equality within one Context. Type diversity is bounded by program
//! size, so the small pools stay cheap.

use crate::context::Context;
use crate::TypeId;
use smallvec::SmallVec;
use std::cell::Cell;

#[derive(Debug)]
pub struct Type {
    pub kind: TypeKind,
}

#[derive(Debug)]
pub enum TypeKind {
    Error,
    Void,
    Label,
    /// 32-bit IEEE float
    Float,
    /// 64-bit IEEE float
    Double,
    Integer {
        bits: u32,
    },
    /// `pointee == None` is the opaque pointer; all opaque pointers of one
    /// Context are the same descriptor.
    Pointer {
        pointee: Option<TypeId>,
    },
    Array {
        element: TypeId,
        num_elements: u64,
    },
    Struct {
        elements: Vec<TypeId>,
        has_body: bool,
        /// is-sized memo; structs created with a body start sized.
        sized: Cell<bool>,
    },
    Function {
        result: TypeId,
        params: SmallVec<[TypeId; 4]>,
        var_arg: bool,
    },
}

impl Context {
    pub fn error_type(&self) -> TypeId {
        self.error_type
    }

    pub fn void_type(&self) -> TypeId {
        self.void_type
    }

    pub fn label_type(&self) -> TypeId {
        self.label_type
    }

    /// The 32-bit float type.
    pub fn float_type(&self) -> TypeId {
        self.float_type
    }

    /// The 64-bit float type.
    pub fn double_type(&self) -> TypeId {
        self.double_type
    }

    pub fn opaque_pointer_type(&self) -> TypeId {
        self.opaque_ptr_type
    }

    pub fn int_type(&mut self, bits: u32) -> TypeId {
        for &id in &self.integer_types {
            if matches!(self.ty(id).kind, TypeKind::Integer { bits: b } if b == bits) {
                return id;
            }
        }

        let id = self.push_type(TypeKind::Integer { bits });
        self.integer_types.push(id);
        id
    }

    pub fn int1_type(&mut self) -> TypeId {
        self.int_type(1)
    }

    pub fn int8_type(&mut self) -> TypeId {
        self.int_type(8)
    }

    pub fn int16_type(&mut self) -> TypeId {
        self.int_type(16)
    }

    pub fn int32_type(&mut self) -> TypeId {
        self.int_type(32)
    }

    pub fn int64_type(&mut self) -> TypeId {
        self.int_type(64)
    }

    pub fn pointer_to(&mut self, pointee: TypeId) -> TypeId {
        for &id in &self.pointer_types {
            if matches!(self.ty(id).kind, TypeKind::Pointer { pointee: Some(p) } if p == pointee) {
                return id;
            }
        }

        let id = self.push_type(TypeKind::Pointer {
            pointee: Some(pointee),
        });
        self.pointer_types.push(id);
        id
    }

    pub fn int32_ptr_type(&mut self) -> TypeId {
        let int32 = self.int32_type();
        self.pointer_to(int32)
    }

    pub fn array_type(&mut self, element: TypeId, num_elements: u64) -> TypeId {
        for &id in &self.array_types {
            if matches!(
                self.ty(id).kind,
                TypeKind::Array { element: e, num_elements: n } if e == element && n == num_elements
            ) {
                return id;
            }
        }

        let id = self.push_type(TypeKind::Array {
            element,
            num_elements,
        });
        self.array_types.push(id);
        id
    }

    pub fn struct_type(&mut self, elements: &[TypeId]) -> TypeId {
        for &id in &self.struct_types {
            if matches!(&self.ty(id).kind, TypeKind::Struct { elements: e, .. } if e.as_slice() == elements)
            {
                return id;
            }
        }

        let id = self.push_type(TypeKind::Struct {
            elements: elements.to_vec(),
            has_body: true,
            sized: Cell::new(true),
        });
        self.struct_types.push(id);
        id
    }

    pub fn function_type(&mut self, result: TypeId, params: &[TypeId], var_arg: bool) -> TypeId {
        for &id in &self.function_types {
            if matches!(
                &self.ty(id).kind,
                TypeKind::Function { result: r, params: p, var_arg: v }
                    if *r == result && p.as_slice() == params && *v == var_arg
            ) {
                return id;
            }
        }

        let id = self.push_type(TypeKind::Function {
            result,
            params: SmallVec::from_slice(params),
            var_arg,
        });
        self.function_types.push(id);
        id
    }

    // ------------------------------------------------------------------
    // classification

    pub fn is_void_type(&self, id: TypeId) -> bool {
        matches!(self.ty(id).kind, TypeKind::Void)
    }

    pub fn is_error_type(&self, id: TypeId) -> bool {
        matches!(self.ty(id).kind, TypeKind::Error)
    }

    pub fn is_label_type(&self, id: TypeId) -> bool {
        matches!(self.ty(id).kind, TypeKind::Label)
    }

    pub fn is_float_type(&self, id: TypeId) -> bool {
        matches!(self.ty(id).kind, TypeKind::Float)
    }

    pub fn is_double_type(&self, id: TypeId) -> bool {
        matches!(self.ty(id).kind, TypeKind::Double)
    }

    pub fn is_integer_type(&self, id: TypeId) -> bool {
        matches!(self.ty(id).kind, TypeKind::Integer { .. })
    }

    pub fn is_integer_n_type(&self, id: TypeId, n: u32) -> bool {
        matches!(self.ty(id).kind, TypeKind::Integer { bits } if bits == n)
    }

    pub fn is_pointer_type(&self, id: TypeId) -> bool {
        matches!(self.ty(id).kind, TypeKind::Pointer { .. })
    }

    pub fn is_array_type(&self, id: TypeId) -> bool {
        matches!(self.ty(id).kind, TypeKind::Array { .. })
    }

    pub fn is_struct_type(&self, id: TypeId) -> bool {
        matches!(self.ty(id).kind, TypeKind::Struct { .. })
    }

    pub fn is_function_type(&self, id: TypeId) -> bool {
        matches!(self.ty(id).kind, TypeKind::Function { .. })
    }

    pub fn is_first_class_type(&self, id: TypeId) -> bool {
        !self.is_void_type(id) && !self.is_function_type(id)
    }

    pub fn is_single_value_type(&self, id: TypeId) -> bool {
        self.is_integer_type(id)
            || self.is_float_type(id)
            || self.is_double_type(id)
            || self.is_pointer_type(id)
    }

    pub fn is_aggregate_type(&self, id: TypeId) -> bool {
        self.is_struct_type(id) || self.is_array_type(id)
    }

    /// A struct or pointer without a body/pointee.
    pub fn is_opaque(&self, id: TypeId) -> bool {
        match &self.ty(id).kind {
            TypeKind::Struct { has_body, .. } => !has_body,
            TypeKind::Pointer { pointee } => pointee.is_none(),
            _ => {
                debug_assert!(false, "is_opaque on non-struct, non-pointer type");
                false
            }
        }
    }

    pub fn is_sized(&self, id: TypeId) -> bool {
        if self.is_integer_type(id)
            || self.is_float_type(id)
            || self.is_double_type(id)
            || self.is_pointer_type(id)
        {
            return true;
        }

        match &self.ty(id).kind {
            TypeKind::Array { element, .. } => self.is_sized(*element),
            TypeKind::Struct {
                elements,
                has_body,
                sized,
            } => {
                if sized.get() {
                    return true;
                }
                if !has_body {
                    return false;
                }
                if elements.iter().any(|&e| !self.is_sized(e)) {
                    return false;
                }
                // memorize that the type is sized
                sized.set(true);
                true
            }
            _ => false,
        }
    }

    pub fn primitive_size_in_bits(&self, id: TypeId) -> u32 {
        match self.ty(id).kind {
            TypeKind::Float => 32,
            TypeKind::Double => 64,
            TypeKind::Integer { bits } => bits,
            _ => 0,
        }
    }

    pub fn integer_bit_width(&self, id: TypeId) -> u32 {
        match self.ty(id).kind {
            TypeKind::Integer { bits } => bits,
            _ => {
                debug_assert!(false, "integer_bit_width on non-integer type");
                0
            }
        }
    }

    pub fn pointee_type(&self, id: TypeId) -> Option<TypeId> {
        match self.ty(id).kind {
            TypeKind::Pointer { pointee } => pointee,
            _ => {
                debug_assert!(false, "pointee_type on non-pointer type");
                None
            }
        }
    }

    pub fn array_element_type(&self, id: TypeId) -> TypeId {
        match self.ty(id).kind {
            TypeKind::Array { element, .. } => element,
            _ => panic!("array_element_type on non-array type"),
        }
    }

    pub fn array_num_elements(&self, id: TypeId) -> u64 {
        match self.ty(id).kind {
            TypeKind::Array { num_elements, .. } => num_elements,
            _ => panic!("array_num_elements on non-array type"),
        }
    }

    pub fn struct_num_elements(&self, id: TypeId) -> usize {
        match &self.ty(id).kind {
            TypeKind::Struct { elements, .. } => elements.len(),
            _ => panic!("struct_num_elements on non-struct type"),
        }
    }

    pub fn struct_element_type(&self, id: TypeId, n: usize) -> TypeId {
        match &self.ty(id).kind {
            TypeKind::Struct { elements, .. } => elements[n],
            _ => panic!("struct_element_type on non-struct type"),
        }
    }

    pub fn function_num_params(&self, id: TypeId) -> usize {
        match &self.ty(id).kind {
            TypeKind::Function { params, .. } => params.len(),
            _ => panic!("function_num_params on non-function type"),
        }
    }

    pub fn function_param_type(&self, id: TypeId, i: usize) -> TypeId {
        match &self.ty(id).kind {
            TypeKind::Function { params, .. } => params[i],
            _ => panic!("function_param_type on non-function type"),
        }
    }

    pub fn function_result_type(&self, id: TypeId) -> TypeId {
        match &self.ty(id).kind {
            TypeKind::Function { result, .. } => *result,
            _ => panic!("function_result_type on non-function type"),
        }
    }

    pub fn is_function_var_arg(&self, id: TypeId) -> bool {
        match &self.ty(id).kind {
            TypeKind::Function { var_arg, .. } => *var_arg,
            _ => panic!("is_function_var_arg on non-function type"),
        }
    }

    pub fn is_valid_element_type(&self, id: TypeId) -> bool {
        !self.is_void_type(id) && !self.is_label_type(id) && !self.is_function_type(id)
    }

    pub fn is_valid_return_type(&self, id: TypeId) -> bool {
        !self.is_function_type(id) && !self.is_label_type(id)
    }

    pub fn is_valid_argument_type(&self, id: TypeId) -> bool {
        self.is_first_class_type(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interning_returns_same_id() {
        let mut context = Context::new();

        let a = context.int_type(32);
        let b = context.int_type(32);
        assert_eq!(a, b);
        assert_ne!(a, context.int_type(64));

        let pa = context.pointer_to(a);
        let pb = context.pointer_to(b);
        assert_eq!(pa, pb);

        let fa = context.function_type(a, &[a, pa], false);
        let fb = context.function_type(a, &[a, pa], false);
        assert_eq!(fa, fb);
        assert_ne!(fa, context.function_type(a, &[a, pa], true));

        let aa = context.array_type(a, 4);
        assert_eq!(aa, context.array_type(a, 4));
        assert_ne!(aa, context.array_type(a, 5));

        let sa = context.struct_type(&[a, pa]);
        assert_eq!(sa, context.struct_type(&[a, pa]));
        assert_ne!(sa, context.struct_type(&[pa, a]));
    }

    #[test]
    fn test_opaque_pointer_is_a_singleton() {
        let context = Context::new();
        assert!(context.is_pointer_type(context.opaque_pointer_type()));
        assert!(context.is_opaque(context.opaque_pointer_type()));
    }

    #[test]
    fn test_first_class_and_single_value() {
        let mut context = Context::new();
        let int32 = context.int32_type();
        let ptr = context.pointer_to(int32);
        let void = context.void_type();
        let fun = context.function_type(void, &[], false);

        assert!(context.is_first_class_type(int32));
        assert!(context.is_first_class_type(ptr));
        assert!(!context.is_first_class_type(void));
        assert!(!context.is_first_class_type(fun));

        assert!(context.is_single_value_type(int32));
        assert!(context.is_single_value_type(context.float_type()));
        assert!(context.is_single_value_type(context.double_type()));
        assert!(context.is_single_value_type(ptr));
        assert!(!context.is_single_value_type(fun));
    }

    #[test]
    fn test_sized_predicates() {
        let mut context = Context::new();
        let int32 = context.int32_type();
        let arr = context.array_type(int32, 8);
        let st = context.struct_type(&[int32, arr]);

        assert!(context.is_sized(int32));
        assert!(context.is_sized(arr));
        assert!(context.is_sized(st));
        assert!(!context.is_sized(context.void_type()));
    }

    #[test]
    fn test_primitive_sizes() {
        let mut context = Context::new();
        assert_eq!(context.primitive_size_in_bits(context.float_type()), 32);
        assert_eq!(context.primitive_size_in_bits(context.double_type()), 64);
        let int1 = context.int1_type();
        assert_eq!(context.primitive_size_in_bits(int1), 1);
        assert_eq!(context.primitive_size_in_bits(context.void_type()), 0);
    }
}
