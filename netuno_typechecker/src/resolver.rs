//! The resolver pass.
//!
//! Two jobs, interleaved over the AST: expression typing (pure, memoized per
//! node in a [`TypeMap`]) and weak forward declaration of `def`/`sub`
//! symbols so recursion type-checks before the final, non-weak re-insert
//! with the inferred return type.

use crate::scope::{Scope, ScopeKind, ScopeStack, Symbol, SymbolKind};
use crate::types::{same_type, NtTypeKind, NtTypeRef, Param, TypeRegistry};
use netuno_common::Report;
use netuno_lexer::KeywordId;
use netuno_parser::{LiteralType, Node, NodeClass, NodeId, NodeKind};
use std::collections::HashMap;
use std::rc::Rc;

/// Side table of resolved types: expression types for expression nodes,
/// inferred return types for block nodes. Shared between the resolver and
/// the lowering engine so evaluation happens once.
#[derive(Debug, Default)]
pub struct TypeMap {
    map: HashMap<NodeId, NtTypeRef>,
}

impl TypeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: NodeId) -> Option<&NtTypeRef> {
        self.map.get(&id)
    }

    pub fn insert(&mut self, id: NodeId, ty: NtTypeRef) {
        self.map.insert(id, ty);
    }
}

/// Resolve a type annotation node to a semantic type.
pub fn find_type(
    registry: &TypeRegistry,
    report: &mut Report,
    scopes: &ScopeStack,
    node: &Node,
) -> NtTypeRef {
    if let Some(id) = node.token.keyword_id() {
        return match id {
            KeywordId::Bool => registry.bool_.clone(),
            KeywordId::I32 => registry.i32_.clone(),
            KeywordId::I64 => registry.i64_.clone(),
            KeywordId::U32 => registry.u32_.clone(),
            KeywordId::U64 => registry.u64_.clone(),
            KeywordId::F32 => registry.f32_.clone(),
            KeywordId::F64 => registry.f64_.clone(),
            KeywordId::String => registry.string.clone(),
            _ => {
                report.error_at(
                    node.position(),
                    format!("The keyword '{}' is not a type.", node.token.lexeme),
                );
                registry.error.clone()
            }
        };
    }

    match scopes.lookup(&node.token.lexeme) {
        None => {
            report.error_at(
                node.position(),
                format!("The type '{}' don't exist.", node.token.lexeme),
            );
            registry.error.clone()
        }
        Some(entry) if !entry.kind.contains(SymbolKind::TYPE) => {
            report.error_at(
                node.position(),
                format!("The identifier '{}' is not a type.", node.token.lexeme),
            );
            registry.error.clone()
        }
        Some(entry) => entry.expr_type.clone().unwrap_or_else(|| registry.error.clone()),
    }
}

/// Type of an expression node; memoized per node.
pub fn eval_expr_type(
    registry: &TypeRegistry,
    types: &mut TypeMap,
    report: &mut Report,
    scopes: &ScopeStack,
    node: &Node,
) -> NtTypeRef {
    debug_assert_eq!(node.class, NodeClass::Expr);

    if let Some(memoized) = types.get(node.id) {
        return memoized.clone();
    }

    let left = node
        .left()
        .map(|n| eval_expr_type(registry, types, report, scopes, n))
        .unwrap_or_else(|| registry.undefined.clone());
    let right = node
        .right()
        .map(|n| eval_expr_type(registry, types, report, scopes, n))
        .unwrap_or_else(|| registry.undefined.clone());

    let ty = match node.kind {
        NodeKind::Literal => match node.literal_type {
            LiteralType::Bool => registry.bool_.clone(),
            LiteralType::None => registry.object.clone(),
            LiteralType::String => registry.string.clone(),
            LiteralType::I32 => registry.i32_.clone(),
            LiteralType::I64 => registry.i64_.clone(),
            LiteralType::U32 => registry.u32_.clone(),
            LiteralType::U64 => registry.u64_.clone(),
            LiteralType::F32 => registry.f32_.clone(),
            LiteralType::F64 => registry.f64_.clone(),
        },
        NodeKind::Unary => match node.token.keyword_id() {
            Some(KeywordId::Minus) | Some(KeywordId::Inc) | Some(KeywordId::Dec) => {
                if left.kind == NtTypeKind::Undefined {
                    right
                } else {
                    left
                }
            }
            Some(KeywordId::Bang) => registry.bool_.clone(),
            Some(KeywordId::Tilde) => {
                if right.is_integer() {
                    right
                } else {
                    report.error_at(
                        node.position(),
                        "Invalid type for '~' operation! Must be a integer(i32, i64, u32 or u64).",
                    );
                    registry.error.clone()
                }
            }
            _ => {
                report.error_at(node.position(), "Invalid unary operator!");
                registry.error.clone()
            }
        },
        NodeKind::Binary => match node.token.keyword_id() {
            Some(KeywordId::Eq)
            | Some(KeywordId::Ne)
            | Some(KeywordId::Greater)
            | Some(KeywordId::Ge)
            | Some(KeywordId::Less)
            | Some(KeywordId::Le) => registry.bool_.clone(),
            Some(KeywordId::Plus)
            | Some(KeywordId::Minus)
            | Some(KeywordId::Star)
            | Some(KeywordId::Slash)
            | Some(KeywordId::Percent)
            | Some(KeywordId::Pipe)
            | Some(KeywordId::Amp)
            | Some(KeywordId::Caret) => {
                if left.kind == NtTypeKind::Custom || right.kind == NtTypeKind::Custom {
                    report.error_at(node.position(), "Invalid math operation with custom object.");
                    registry.error.clone()
                } else if left.kind < right.kind {
                    left
                } else {
                    right
                }
            }
            _ => {
                report.error_at(
                    node.position(),
                    format!("Invalid binary operation '{}'.", node.token.lexeme),
                );
                registry.error.clone()
            }
        },
        NodeKind::Logical => match node.token.keyword_id() {
            Some(KeywordId::LogAnd) | Some(KeywordId::LogOr) => registry.bool_.clone(),
            _ => {
                report.error_at(
                    node.position(),
                    format!("Invalid logical operation '{}'.", node.token.lexeme),
                );
                registry.error.clone()
            }
        },
        NodeKind::Get => {
            if left.kind == NtTypeKind::Error {
                left
            } else {
                match left.lookup_field(&node.token.lexeme) {
                    Some(member) => member
                        .expr_type
                        .unwrap_or_else(|| registry.error.clone()),
                    None => {
                        report.error_at(
                            node.position(),
                            format!(
                                "The type '{}' has no member '{}'.",
                                left.name, node.token.lexeme
                            ),
                        );
                        registry.error.clone()
                    }
                }
            }
        }
        NodeKind::Call => match left.kind {
            NtTypeKind::I32
            | NtTypeKind::U32
            | NtTypeKind::F32
            | NtTypeKind::I64
            | NtTypeKind::U64
            | NtTypeKind::F64
            | NtTypeKind::String => left,
            NtTypeKind::Delegate => {
                for arg in &node.children {
                    eval_expr_type(registry, types, report, scopes, arg);
                }
                left.delegate
                    .as_ref()
                    .map(|d| d.return_type.clone())
                    .unwrap_or_else(|| registry.error.clone())
            }
            _ => registry.error.clone(),
        },
        NodeKind::Variable => match scopes.lookup(&node.token.lexeme) {
            None => {
                report.error_at(node.position(), "The symbol must be declared.");
                registry.error.clone()
            }
            Some(entry) => {
                let allowed = SymbolKind::VARIABLE
                    | SymbolKind::CONSTANT
                    | SymbolKind::PARAM
                    | SymbolKind::TYPE
                    | SymbolKind::FUNCTION
                    | SymbolKind::SUBROUTINE
                    | SymbolKind::MODULE;
                if !entry.kind.intersects(allowed) {
                    report.error_at(
                        node.position(),
                        format!(
                            "The symbol '{}' is not a constant, parameter, variable, method or function!",
                            node.token.lexeme
                        ),
                    );
                    registry.error.clone()
                } else {
                    entry.expr_type.clone().unwrap_or_else(|| registry.error.clone())
                }
            }
        },
        NodeKind::Assign => {
            if !same_type(&left, &right) {
                report.error_at(
                    node.position(),
                    format!(
                        "Invalid type, variable is of type {}, but the value expression to assign is {}.",
                        left.name, right.name
                    ),
                );
                registry.error.clone()
            } else {
                left
            }
        }
        _ => {
            report.error_at(
                node.position(),
                format!("AST invalid format, node kind cannot be {:?}!", node.kind),
            );
            registry.error.clone()
        }
    };

    types.insert(node.id, ty.clone());
    ty
}

fn eval_if_return_type(
    registry: &TypeRegistry,
    types: &mut TypeMap,
    report: &mut Report,
    scopes: &ScopeStack,
    node: &Node,
) -> NtTypeRef {
    let then_branch = node.left().expect("if statement has a then branch");

    let mut ty = match then_branch.kind {
        NodeKind::Block => eval_block_return_type(registry, types, report, scopes, then_branch),
        NodeKind::Return => then_branch
            .left()
            .map(|e| eval_expr_type(registry, types, report, scopes, e))
            .unwrap_or_else(|| registry.undefined.clone()),
        _ => registry.undefined.clone(),
    };

    if let Some(else_branch) = node.right() {
        let else_ty = match else_branch.kind {
            NodeKind::If => eval_if_return_type(registry, types, report, scopes, else_branch),
            NodeKind::Block => {
                eval_block_return_type(registry, types, report, scopes, else_branch)
            }
            NodeKind::Return => else_branch
                .left()
                .map(|e| eval_expr_type(registry, types, report, scopes, e))
                .unwrap_or_else(|| registry.undefined.clone()),
            _ => registry.undefined.clone(),
        };

        if else_ty.kind != NtTypeKind::Undefined && ty.kind != NtTypeKind::Undefined {
            if !same_type(&else_ty, &ty) {
                report.error_at(
                    node.position(),
                    format!(
                        "The same type must be used in all return statements of if branches, expect type is {}, not {}",
                        ty.name, else_ty.name
                    ),
                );
                ty = registry.error.clone();
            } else {
                ty = else_ty;
            }
        }
    }

    ty
}

/// The unique return type flowing out of any `return`, `if`/`else` or loop
/// body inside the block; `undefined` when the block never returns, a
/// conflict is diagnosed. Memoized per block node.
pub fn eval_block_return_type(
    registry: &TypeRegistry,
    types: &mut TypeMap,
    report: &mut Report,
    scopes: &ScopeStack,
    node: &Node,
) -> NtTypeRef {
    debug_assert!(node.is(NodeClass::Stmt, NodeKind::Block));

    if let Some(memoized) = types.get(node.id) {
        return memoized.clone();
    }

    let mut block_return = registry.undefined.clone();

    for stmt in &node.children {
        let tmp = match stmt.kind {
            NodeKind::Return => stmt
                .left()
                .map(|e| eval_expr_type(registry, types, report, scopes, e))
                .unwrap_or_else(|| registry.undefined.clone()),
            NodeKind::Block => eval_block_return_type(registry, types, report, scopes, stmt),
            NodeKind::If => eval_if_return_type(registry, types, report, scopes, stmt),
            NodeKind::While | NodeKind::Until => {
                let body = stmt.left().expect("loop has a body");
                match body.kind {
                    NodeKind::Block => {
                        eval_block_return_type(registry, types, report, scopes, body)
                    }
                    NodeKind::Return => body
                        .left()
                        .map(|e| eval_expr_type(registry, types, report, scopes, e))
                        .unwrap_or_else(|| registry.undefined.clone()),
                    _ => registry.undefined.clone(),
                }
            }
            _ => registry.undefined.clone(),
        };

        if block_return.kind == NtTypeKind::Undefined && tmp.kind != NtTypeKind::Undefined {
            block_return = tmp;
        } else if block_return.kind != NtTypeKind::Undefined
            && tmp.kind != NtTypeKind::Undefined
            && !same_type(&tmp, &block_return)
        {
            report.error_at(
                stmt.position(),
                format!(
                    "The same type must be used in all return statements, expect type is {}, not {}",
                    block_return.name, tmp.name
                ),
            );
            block_return = registry.error.clone();
        }
    }

    types.insert(node.id, block_return.clone());
    block_return
}

/// Run the resolver over the parsed modules. Returns false when any error
/// diagnostic was reported.
pub fn resolve(
    registry: &Rc<TypeRegistry>,
    types: &mut TypeMap,
    report: &mut Report,
    global: Scope,
    modules: &[Node],
) -> bool {
    let mut resolver = Resolver {
        registry: registry.clone(),
        types,
        report,
        scopes: ScopeStack::new(global),
        public: false,
    };

    for module in modules {
        resolver.module(module);
    }

    !resolver.report.had_error()
}

struct Resolver<'a> {
    registry: Rc<TypeRegistry>,
    types: &'a mut TypeMap,
    report: &'a mut Report,
    scopes: ScopeStack,
    public: bool,
}

impl Resolver<'_> {
    fn eval(&mut self, node: &Node) -> NtTypeRef {
        eval_expr_type(&self.registry, self.types, self.report, &self.scopes, node)
    }

    fn add_type_symbol(&mut self, ty: &NtTypeRef) {
        let symbol = Symbol::new(ty.name.clone(), SymbolKind::TYPE, ty.clone());
        self.scopes.insert(symbol);
    }

    fn module(&mut self, node: &Node) {
        debug_assert!(node.is(NodeClass::Stmt, NodeKind::Module));

        let save_public = self.public;
        self.scopes.push(ScopeKind::None);

        for primitive in self.registry.primitives().map(Clone::clone) {
            self.add_type_symbol(&primitive);
        }

        for stmt in &node.children {
            match stmt.kind {
                NodeKind::Public => self.public = true,
                NodeKind::Private => self.public = false,
                _ => self.declaration(stmt),
            }
        }

        let module_scope = self.scopes.pop();
        self.publish_module_symbols(&node.token.lexeme, &module_scope);
        self.public = save_public;
    }

    /// Mirror the module's public functions onto its module type so
    /// qualified references from other files resolve.
    fn publish_module_symbols(&mut self, module_name: &str, module_scope: &Scope) {
        let Some(module_type) = self
            .scopes
            .global()
            .lookup(module_name)
            .and_then(|s| s.expr_type.clone())
        else {
            return;
        };

        let mut fields = module_type.fields.borrow_mut();
        for symbol in module_scope.symbols() {
            let callable = symbol
                .kind
                .intersects(SymbolKind::FUNCTION | SymbolKind::SUBROUTINE);
            if callable && symbol.kind.contains(SymbolKind::PUBLIC) {
                fields.insert(symbol.clone());
            }
        }
    }

    fn declaration(&mut self, node: &Node) {
        match node.kind {
            NodeKind::Def => self.declare_weak_function(node, true),
            NodeKind::Sub => self.declare_weak_function(node, false),
            NodeKind::Var => self.var_statement(node),
            NodeKind::Import => self.import_statement(node),
            _ => {}
        }
    }

    fn visibility(&self) -> SymbolKind {
        if self.public {
            SymbolKind::PUBLIC
        } else {
            SymbolKind::PRIVATE
        }
    }

    fn function_symbol(&self, name: &str, delegate_type: NtTypeRef, weak: bool) -> Symbol {
        let returns_value = delegate_type
            .delegate
            .as_ref()
            .map(|d| {
                d.return_type.kind != NtTypeKind::Undefined
                    && d.return_type.kind != NtTypeKind::Void
            })
            .unwrap_or(false);
        let kind = if returns_value {
            SymbolKind::FUNCTION
        } else {
            SymbolKind::SUBROUTINE
        };

        let mut symbol = Symbol::new(name, kind | self.visibility(), delegate_type);
        symbol.weak = weak;
        symbol
    }

    fn declare_weak_function(&mut self, node: &Node, return_value: bool) {
        let name = node.token.lexeme.clone();
        log::trace!("declaring '{}'", name);

        self.scopes.push(if return_value {
            ScopeKind::Function
        } else {
            ScopeKind::Method
        });

        let mut params = Vec::new();
        for param_node in &node.children {
            let type_node = param_node.left().expect("parameter has a type annotation");
            let ty = find_type(&self.registry, self.report, &self.scopes, type_node);

            let symbol = Symbol::new(param_node.token.lexeme.as_str(), SymbolKind::PARAM, ty.clone())
                .weak();
            self.scopes.insert(symbol);

            params.push(Param {
                name: Rc::from(param_node.token.lexeme.as_str()),
                ty,
            });
        }

        let mut return_type = if return_value {
            self.registry.undefined.clone()
        } else {
            self.registry.void.clone()
        };

        // a weak entry lands in the enclosing scope before the body is
        // walked so recursive calls type-check (possible only once the
        // return type is known)
        if !return_value || node.left().is_some() {
            if let Some(annotation) = node.left() {
                return_type =
                    find_type(&self.registry, self.report, &self.scopes, annotation);
            }
            let delegate_type = self
                .registry
                .take_delegate_type(return_type.clone(), params.clone());
            let symbol = self.function_symbol(&name, delegate_type, true);
            self.scopes.insert_at_parent(symbol);
        }

        let body = node.right().expect("function has a body");
        let mut statement_return = None;
        let mut has_return = false;
        for stmt in &body.children {
            self.statement(stmt, &mut statement_return);
            if statement_return.is_some() {
                has_return = true;
            }
        }

        if return_value {
            return_type =
                eval_block_return_type(&self.registry, self.types, self.report, &self.scopes, body);

            if !has_return {
                self.report.error_at(
                    node.position(),
                    format!("Function '{}' doesn't return a value on all code paths.", name),
                );
            }
        }

        self.scopes.pop();

        // final, non-weak entry with the inferred signature; a failed insert
        // is a redeclaration
        let delegate_type = self.registry.take_delegate_type(return_type, params);
        let symbol = self.function_symbol(&name, delegate_type, false);
        if !self.scopes.insert(symbol) {
            self.report.error_at(
                node.position(),
                format!("The symbol '{}' is already declared.", name),
            );
        }
    }

    fn statement(&mut self, node: &Node, return_type: &mut Option<NtTypeRef>) {
        if node.class != NodeClass::Stmt {
            self.report
                .error_at(node.position(), "Invalid node, the node must be a statement!");
            return;
        }

        match node.kind {
            NodeKind::Expr => {
                if let Some(expr) = node.left() {
                    self.eval(expr);
                }
            }
            NodeKind::If => self.if_statement(node, return_type),
            NodeKind::Block => self.block_statement(node, return_type),
            NodeKind::While | NodeKind::Until => self.loop_statement(node),
            NodeKind::Var => self.var_statement(node),
            NodeKind::Return => self.return_statement(node, return_type),
            NodeKind::Break | NodeKind::Continue => {}
            _ => {
                self.report.error_at(
                    node.position(),
                    format!("Invalid statement. The statement with kind '{:?}' is invalid.", node.kind),
                );
            }
        }
    }

    fn if_statement(&mut self, node: &Node, return_type: &mut Option<NtTypeRef>) {
        if let Some(condition) = node.condition() {
            self.eval(condition);
        }

        let mut then_return = None;
        self.statement(node.left().expect("if has a then branch"), &mut then_return);

        let mut else_return = None;
        if let Some(else_branch) = node.right() {
            self.statement(else_branch, &mut else_return);

            if let (Some(then_ty), Some(else_ty)) = (&then_return, &else_return) {
                if !same_type(then_ty, else_ty) {
                    self.report.error_at(
                        node.position(),
                        format!(
                            "The else branch expect '{}' type as return, but is '{}'.",
                            then_ty.name, else_ty.name
                        ),
                    );
                }
            }
        }

        if return_type.is_none() {
            if let (Some(then_ty), Some(_)) = (&then_return, &else_return) {
                *return_type = Some(then_ty.clone());
            }
        }
    }

    fn block_statement(&mut self, node: &Node, return_type: &mut Option<NtTypeRef>) {
        debug_assert!(node.is(NodeClass::Stmt, NodeKind::Block));

        let mut block_return = None;
        self.scopes.push(ScopeKind::None);
        for stmt in &node.children {
            self.statement(stmt, &mut block_return);
        }
        if return_type.is_none() {
            *return_type = block_return;
        }

        eval_block_return_type(&self.registry, self.types, self.report, &self.scopes, node);
        self.scopes.pop();
    }

    fn loop_statement(&mut self, node: &Node) {
        let body = node.left().expect("loop has a body");
        let mut body_return = None;

        self.scopes.push(ScopeKind::Breakable);
        self.statement(body, &mut body_return);
        if body.kind == NodeKind::Block {
            eval_block_return_type(&self.registry, self.types, self.report, &self.scopes, body);
        }
        self.scopes.pop();

        if let Some(condition) = node.condition() {
            self.eval(condition);
        }
    }

    fn var_statement(&mut self, node: &Node) {
        debug_assert!(node.is(NodeClass::Stmt, NodeKind::Var));

        let ty = if let Some(annotation) = node.left() {
            let ty = find_type(&self.registry, self.report, &self.scopes, annotation);
            if let Some(initializer) = node.right() {
                let init_ty = self.eval(initializer);
                if !same_type(&ty, &init_ty) {
                    self.report
                        .error_at(node.position(), "Invalid initializer type. Incompatible type!");
                    return;
                }
            }
            ty
        } else {
            match node.right() {
                Some(initializer) => self.eval(initializer),
                None => {
                    self.report.error_at(
                        node.position(),
                        "Variable declarations must has a type or initializer.",
                    );
                    return;
                }
            }
        };

        let symbol =
            Symbol::new(node.token.lexeme.as_str(), SymbolKind::VARIABLE, ty).weak();
        self.scopes.insert(symbol);
    }

    fn return_statement(&mut self, node: &Node, return_type: &mut Option<NtTypeRef>) {
        if let Some(expr) = node.left() {
            let ty = self.eval(expr);

            if ty.kind == NtTypeKind::Undefined {
                self.report.error_at(
                    node.position(),
                    "Return statement cannot has undefined type value.",
                );
            }
            if ty.kind == NtTypeKind::Void {
                self.report
                    .error_at(node.position(), "Return statement need a expression with value.");
            }

            *return_type = Some(ty);
        }
    }

    fn import_statement(&mut self, node: &Node) {
        let mut current = node.left();
        let mut entry: Option<Symbol> = None;
        let mut fields: Option<NtTypeRef> = None;

        while let Some(segment) = current {
            let looked_up = match &fields {
                None => self.scopes.global().lookup(&segment.token.lexeme).cloned(),
                Some(ty) => ty.fields.borrow().lookup(&segment.token.lexeme).cloned(),
            };

            let Some(symbol) = looked_up else {
                self.report
                    .error_at(node.position(), "Cannot resolve the import symbol");
                return;
            };

            if !symbol.kind.contains(SymbolKind::MODULE) {
                self.report.error_at(node.position(), "Symbol must be a module");
                return;
            }

            fields = symbol.expr_type.clone();
            entry = Some(symbol);
            current = segment.right();
        }

        if let Some(symbol) = entry {
            self.scopes.insert(symbol);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins;
    use netuno_nir::Context;
    use netuno_parser::parse_module;
    use test_case::test_case;

    fn run_resolver(source: &str) -> (Report, bool) {
        let mut context = Context::new();
        let registry = TypeRegistry::new(&mut context);
        let module = parse_module(source, "test").expect("parse");

        let mut types = TypeMap::new();
        let mut report = Report::new();
        let global = builtins::build_global_scope(&registry);
        let ok = resolve(
            &registry,
            &mut types,
            &mut report,
            global,
            std::slice::from_ref(&module),
        );
        (report, ok)
    }

    #[test]
    fn test_simple_function_resolves() {
        let (report, ok) = run_resolver("def f(): i32 => 42");
        assert!(ok, "diagnostics: {}", report);
    }

    #[test]
    fn test_recursion_through_weak_declaration() {
        let source = "def fact(n: i32): i32 if n == 0 return 1 else return n * fact(n - 1) next end";
        let (report, ok) = run_resolver(source);
        assert!(ok, "diagnostics: {}", report);
    }

    #[test_case("def f(): i32 => missing" ; "undeclared symbol")]
    #[test_case("def f(a: bool): i32 if a return 1 else return \"x\" next end" ; "return type conflict")]
    #[test_case("def f(a: bool): i32 var x = 1 end" ; "missing return")]
    #[test_case("def f(): i32 => 1 def f(): i32 => 2" ; "redeclaration")]
    #[test_case("sub g() var x = 1 x = \"s\" end" ; "assignment type mismatch")]
    #[test_case("sub g() missing() end" ; "call of undeclared function")]
    fn test_error_is_diagnosed(source: &str) {
        let (report, ok) = run_resolver(source);
        assert!(!ok);
        assert!(report.had_error());
    }

    #[test]
    fn test_console_member_resolves_via_global_scope() {
        let (report, ok) = run_resolver("sub main() console.write(\"hi\") end");
        assert!(ok, "diagnostics: {}", report);
    }

    #[test]
    fn test_promotion_prefers_smaller_kind() {
        let mut context = Context::new();
        let registry = TypeRegistry::new(&mut context);
        let module = parse_module("def f(a: i32, b: f32): f32 => a * b", "test").expect("parse");

        let mut types = TypeMap::new();
        let mut report = Report::new();
        let global = builtins::build_global_scope(&registry);
        let ok = resolve(
            &registry,
            &mut types,
            &mut report,
            global,
            std::slice::from_ref(&module),
        );
        assert!(ok, "diagnostics: {}", report);

        // the multiply node is the returned expression
        let def = &module.children[0];
        let ret = &def.right().unwrap().children[0];
        let mul = ret.left().unwrap();
        let ty = types.get(mul.id).expect("binary node was typed");
        assert!(same_type(ty, &registry.f32_));
    }
}
