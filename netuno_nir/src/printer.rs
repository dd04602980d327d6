//! Plain-text printing of IR entities.
//!
//! Diagnostic output only, not a stable format. Each `display_*` method on
//! [`Context`] returns an adaptor implementing [`fmt::Display`] that borrows
//! the context for the duration of the print.

use crate::context::Context;
use crate::instruction::{InstData, Instruction};
use crate::module::Module;
use crate::types::TypeKind;
use crate::value::{Constant, ValueData};
use crate::{BlockId, FunctionId, TypeId, ValueId};
use std::fmt;

pub struct TypeDisplay<'a> {
    context: &'a Context,
    id: TypeId,
}

pub struct ValueNameDisplay<'a> {
    context: &'a Context,
    id: ValueId,
}

pub struct ValueDisplay<'a> {
    context: &'a Context,
    id: ValueId,
}

pub struct BlockDisplay<'a> {
    context: &'a Context,
    id: BlockId,
}

pub struct FunctionDisplay<'a> {
    context: &'a Context,
    id: FunctionId,
}

pub struct ModuleDisplay<'a> {
    context: &'a Context,
    module: &'a Module,
}

impl Context {
    pub fn display_type(&self, id: TypeId) -> TypeDisplay<'_> {
        TypeDisplay { context: self, id }
    }

    /// Short reference form: `%name` for named values, the inline constant
    /// otherwise.
    pub fn display_value_name(&self, id: ValueId) -> ValueNameDisplay<'_> {
        ValueNameDisplay { context: self, id }
    }

    pub fn display_value(&self, id: ValueId) -> ValueDisplay<'_> {
        ValueDisplay { context: self, id }
    }

    pub fn display_block(&self, id: BlockId) -> BlockDisplay<'_> {
        BlockDisplay { context: self, id }
    }

    pub fn display_function(&self, id: FunctionId) -> FunctionDisplay<'_> {
        FunctionDisplay { context: self, id }
    }

    pub fn display_module<'a>(&'a self, module: &'a Module) -> ModuleDisplay<'a> {
        ModuleDisplay {
            context: self,
            module,
        }
    }
}

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let context = self.context;
        match &context.ty(self.id).kind {
            TypeKind::Error => write!(f, "error"),
            TypeKind::Void => write!(f, "void"),
            TypeKind::Label => write!(f, "label"),
            TypeKind::Float => write!(f, "float"),
            TypeKind::Double => write!(f, "double"),
            TypeKind::Integer { bits } => write!(f, "i{}", bits),
            TypeKind::Pointer { pointee } => match pointee {
                Some(pointee) => write!(f, "{}*", context.display_type(*pointee)),
                None => write!(f, "ptr"),
            },
            TypeKind::Array {
                element,
                num_elements,
            } => write!(f, "{}[{}]", context.display_type(*element), num_elements),
            TypeKind::Struct { elements, .. } => {
                write!(f, "{{")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", context.display_type(*element))?;
                }
                write!(f, "}}")
            }
            TypeKind::Function { result, params, .. } => {
                write!(f, "{} <- (", context.display_type(*result))?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", context.display_type(*param))?;
                }
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for ValueNameDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.context.value(self.id);
        match (&value.name, &value.data) {
            (Some(name), data) if !matches!(data, ValueData::Constant(_)) => {
                write!(f, "%{}", name)
            }
            _ => write!(f, "{}", self.context.display_value(self.id)),
        }
    }
}

impl fmt::Display for ValueDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let context = self.context;
        let value = context.value(self.id);
        match &value.data {
            ValueData::Argument { index, .. } => write!(f, "arg{}", index),
            ValueData::Constant(constant) => match constant {
                Constant::Int { value } => write!(f, "#{}", value),
                Constant::Float { .. } => {
                    let v = context
                        .const_float_value(self.id)
                        .expect("float constant has a value");
                    write!(f, "#{}", v)
                }
                Constant::Str { chars } => {
                    write!(f, "\"")?;
                    for &c in chars {
                        match char::from_u32(c) {
                            Some(c) => write!(f, "{}", c.escape_default())?,
                            None => write!(f, "\\u{{{:x}}}", c)?,
                        }
                    }
                    write!(f, "\"")
                }
                Constant::Undef => write!(f, "undef"),
            },
            ValueData::Instruction(inst) => fmt_instruction(context, self.id, inst, f),
        }
    }
}

fn fmt_instruction(
    context: &Context,
    id: ValueId,
    inst: &Instruction,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    if let Some(name) = &context.value(id).name {
        write!(f, "%{} = ", name)?;
    }

    write!(f, "{}", inst.opcode.name())?;

    match &inst.data {
        InstData::Binary { lhs, rhs } => {
            write!(
                f,
                " {}, {}",
                context.display_value_name(*lhs),
                context.display_value_name(*rhs)
            )
        }
        InstData::Unary { operand } => {
            write!(
                f,
                " {} {}",
                context.display_type(context.value(id).ty),
                context.display_value_name(*operand)
            )
        }
        InstData::Branch {
            if_true,
            if_false,
            condition,
        } => match (condition, if_false) {
            (Some(condition), Some(if_false)) => write!(
                f,
                " {} {}, label {}, label {}",
                context.display_type(context.value_type(*condition)),
                context.display_value_name(*condition),
                context.block_name(*if_true),
                context.block_name(*if_false)
            ),
            _ => write!(f, " label {}", context.block_name(*if_true)),
        },
        InstData::Call {
            function_type,
            callee,
            args,
        } => {
            let result = context.function_result_type(*function_type);
            write!(
                f,
                " {} {}(",
                context.display_type(result),
                context.function_name(*callee)
            )?;
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(
                    f,
                    "{} {}",
                    context.display_type(context.value_type(*arg)),
                    context.display_value_name(*arg)
                )?;
            }
            write!(f, ")")
        }
        InstData::Cmp {
            predicate,
            lhs,
            rhs,
        } => write!(
            f,
            " {} {} {}, {}",
            predicate.name(),
            context.display_type(context.value_type(*lhs)),
            context.display_value_name(*lhs),
            context.display_value_name(*rhs)
        ),
        InstData::Phi { incomings } => {
            for (i, (value, block)) in incomings.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(
                    f,
                    " [ {}, {} ]",
                    context.display_value_name(*value),
                    context.block_name(*block)
                )?;
            }
            Ok(())
        }
        InstData::Return { value } => match value {
            Some(value) => write!(
                f,
                " {} {}",
                context.display_type(context.value_type(*value)),
                context.display_value_name(*value)
            ),
            None => Ok(()),
        },
        InstData::Select {
            condition,
            if_true,
            if_false,
        } => write!(
            f,
            " {}, {}, {}",
            context.display_value_name(*condition),
            context.display_value_name(*if_true),
            context.display_value_name(*if_false)
        ),
        InstData::Store { value, pointer } => write!(
            f,
            " {}, [{}]",
            context.display_value_name(*value),
            context.display_value_name(*pointer)
        ),
    }
}

impl fmt::Display for BlockDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let context = self.context;
        writeln!(f, "{}:", context.block_name(self.id))?;
        for &inst in context.block_instructions(self.id) {
            writeln!(f, "  {}", context.display_value(inst))?;
        }
        Ok(())
    }
}

impl fmt::Display for FunctionDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let context = self.context;
        let ty = context.function_ty(self.id);
        let result = context.function_result_type(ty);

        write!(
            f,
            "define {} {}(",
            context.display_type(result),
            context.function_name(self.id)
        )?;
        for index in 0..context.function_param_count(self.id) {
            if index > 0 {
                write!(f, ", ")?;
            }
            let arg = context.function_param_value(self.id, index);
            write!(
                f,
                "{} {}",
                context.display_type(context.value_type(arg)),
                context.display_value_name(arg)
            )?;
        }
        writeln!(f, ") {{")?;

        for &block in context.function_blocks(self.id) {
            write!(f, "{}", context.display_block(block))?;
        }

        writeln!(f, "}}")
    }
}

impl fmt::Display for ModuleDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(source) = &self.module.source_file_name {
            writeln!(f, "source_filename = {}", source)?;
        }
        if let Some(name) = &self.module.name {
            writeln!(f, "module_id = {}", name)?;
        }
        writeln!(f)?;

        for &function in &self.module.functions {
            writeln!(f, "{}", self.context.display_function(function))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Opcode;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_type_printing() {
        let mut context = Context::new();
        let int32 = context.int32_type();
        let ptr = context.pointer_to(int32);
        let fun = context.function_type(int32, &[int32, ptr], false);
        let arr = context.array_type(int32, 3);
        let st = context.struct_type(&[int32, ptr]);

        assert_eq!(context.display_type(int32).to_string(), "i32");
        assert_eq!(context.display_type(ptr).to_string(), "i32*");
        assert_eq!(context.display_type(fun).to_string(), "i32 <- (i32, i32*)");
        assert_eq!(context.display_type(arr).to_string(), "i32[3]");
        assert_eq!(context.display_type(st).to_string(), "{i32, i32*}");
        assert_eq!(
            context.display_type(context.opaque_pointer_type()).to_string(),
            "ptr"
        );
    }

    #[test]
    fn test_function_printing() {
        let mut context = Context::new();
        let int32 = context.int32_type();
        let ty = context.function_type(int32, &[int32], false);
        let f = context.create_function("f", ty);

        let entry = context.create_block("entry");
        context.insert_block_into(entry, f);

        let arg = context.function_param_value(f, 0);
        let one = context.const_int(int32, 1, false);
        let sum = context.create_binary(Opcode::Add, arg, one, "add", entry);
        context.create_return(Some(sum), entry);

        let printed = context.display_function(f).to_string();
        assert_eq!(
            printed,
            "define i32 f(i32 %arg0) {\nentry:\n  %add0 = add %arg0, #1\n  ret i32 %add0\n}\n"
        );
    }
}
