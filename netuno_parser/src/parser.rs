//! Recursive-descent parser for Netuno.
//!
//! One function per precedence level, mirroring the grammar:
//! assignment, logical or/and, bitwise or/xor/and, equality, comparison,
//! term, factor, unary, call, primary. Declarations are `def`, `sub`, `var`,
//! `module`, `import` and the `public`/`private` section markers; blocks are
//! keyword-terminated (`end`, `next`, `else`) or single-statement `=>` arrow
//! bodies.

use crate::ast::{LiteralType, Node, NodeClass, NodeId, NodeKind};
use crate::error::ParseError;
use netuno_lexer::{KeywordId, Scanner, Token, TokenType};

const MAX_ARGS: usize = 255;

/// Parse one source file into its module node. A file that does not open
/// with `module NAME` becomes a module named after the file.
pub fn parse_module(source: &str, source_name: &str) -> Result<Node, ParseError> {
    let tokens = Scanner::new(source, source_name).tokenize()?;
    Parser::new(tokens, source_name).parse()
}

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    source_name: String,
    next_id: u32,
}

impl Parser {
    pub fn new(tokens: Vec<Token>, source_name: &str) -> Self {
        Self {
            tokens,
            current: 0,
            source_name: source_name.to_string(),
            next_id: 0,
        }
    }

    pub fn parse(mut self) -> Result<Node, ParseError> {
        self.module()
    }

    // ------------------------------------------------------------------
    // node construction

    fn make_node(
        &mut self,
        class: NodeClass,
        kind: NodeKind,
        token: Token,
        left: Option<Node>,
        right: Option<Node>,
    ) -> Node {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        Node {
            id,
            class,
            kind,
            literal_type: LiteralType::None,
            token,
            token2: None,
            left: left.map(Box::new),
            right: right.map(Box::new),
            condition: None,
            children: Vec::new(),
        }
    }

    fn make_literal(&mut self, token: Token, literal_type: LiteralType) -> Node {
        let mut node = self.make_node(NodeClass::Expr, NodeKind::Literal, token, None, None);
        node.literal_type = literal_type;
        node
    }

    fn make_variable(&mut self, token: Token) -> Node {
        self.make_node(NodeClass::Expr, NodeKind::Variable, token, None, None)
    }

    fn make_block(&mut self, token: Token, end: Token, statements: Vec<Node>) -> Node {
        let mut node = self.make_node(NodeClass::Stmt, NodeKind::Block, token, None, None);
        node.token2 = Some(end);
        node.children = statements;
        node
    }

    fn make_single_statement_block(&mut self, statement: Node) -> Node {
        let token = statement.token.clone();
        self.make_block(token.clone(), token, vec![statement])
    }

    // ------------------------------------------------------------------
    // token plumbing

    fn peek(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::Eof
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.is_at_end() {
            self.current += 1;
        }
        token
    }

    fn check(&self, token_type: TokenType) -> bool {
        self.peek().token_type == token_type
    }

    fn check_keyword(&self, id: KeywordId) -> bool {
        self.peek().is_keyword(id)
    }

    fn matches(&mut self, token_type: TokenType) -> bool {
        if self.check(token_type) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_keyword(&mut self, id: KeywordId) -> bool {
        self.matches(TokenType::Keyword(id))
    }

    fn consume(&mut self, token_type: TokenType, message: &str) -> Result<Token, ParseError> {
        if self.check(token_type) {
            Ok(self.advance())
        } else {
            Err(self.error_at_current(message))
        }
    }

    fn consume_keyword(&mut self, id: KeywordId, message: &str) -> Result<Token, ParseError> {
        self.consume(TokenType::Keyword(id), message)
    }

    fn error_at_current(&self, message: &str) -> ParseError {
        ParseError::UnexpectedToken {
            line: self.peek().line,
            message: format!("{} (found '{}')", message, self.peek().lexeme),
        }
    }

    // ------------------------------------------------------------------
    // declarations

    fn module(&mut self) -> Result<Node, ParseError> {
        // named module
        if self.match_keyword(KeywordId::Module) {
            let name = self.consume(
                TokenType::Identifier,
                "Expect a module name after module declaration.",
            )?;
            if name.lexeme != self.source_name {
                return Err(ParseError::UnexpectedToken {
                    line: name.line,
                    message: "Expect the toplevel module has same name as file".to_string(),
                });
            }
            return self.module_body(name, Some(KeywordId::End));
        }

        // filename as module name
        let name = Token::synthetic(TokenType::Identifier, self.source_name.clone());
        self.module_body(name, None)
    }

    fn module_body(&mut self, name: Token, end: Option<KeywordId>) -> Result<Node, ParseError> {
        let mut statements = Vec::new();

        while !self.is_at_end() && end.map_or(true, |id| !self.check_keyword(id)) {
            let current = if self.match_keyword(KeywordId::Public) {
                let token = self.previous().clone();
                self.make_node(NodeClass::Stmt, NodeKind::Public, token, None, None)
            } else if self.match_keyword(KeywordId::Private) {
                let token = self.previous().clone();
                self.make_node(NodeClass::Stmt, NodeKind::Private, token, None, None)
            } else {
                self.declaration(false)?
            };
            statements.push(current);
        }

        if let Some(id) = end {
            self.consume_keyword(id, "Expect 'end' after the module block.")?;
        }

        let mut node = self.make_node(NodeClass::Stmt, NodeKind::Module, name, None, None);
        node.children = statements;
        Ok(node)
    }

    fn declaration(&mut self, return_value: bool) -> Result<Node, ParseError> {
        if self.match_keyword(KeywordId::Module) {
            let name = self.consume(TokenType::Identifier, "Expect a identifier for the module.")?;
            return self.module_body(name, Some(KeywordId::End));
        }
        if self.match_keyword(KeywordId::Def) {
            return self.function_declaration(true);
        }
        if self.match_keyword(KeywordId::Sub) {
            return self.function_declaration(false);
        }
        if self.match_keyword(KeywordId::Var) {
            return self.variable_declaration();
        }
        if self.match_keyword(KeywordId::Import) {
            return self.import_declaration();
        }
        self.statement(return_value)
    }

    fn type_annotation(&mut self) -> Result<Node, ParseError> {
        const TYPE_KEYWORDS: [KeywordId; 8] = [
            KeywordId::Bool,
            KeywordId::I32,
            KeywordId::I64,
            KeywordId::U32,
            KeywordId::U64,
            KeywordId::F32,
            KeywordId::F64,
            KeywordId::String,
        ];

        for id in TYPE_KEYWORDS {
            if self.match_keyword(id) {
                let token = self.previous().clone();
                return Ok(self.make_node(NodeClass::Type, NodeKind::None, token, None, None));
            }
        }

        let token = self.consume(TokenType::Identifier, "Expect a identifier as a type.")?;
        Ok(self.make_node(NodeClass::Type, NodeKind::None, token, None, None))
    }

    fn parameter(&mut self) -> Result<Node, ParseError> {
        let name = self.consume(TokenType::Identifier, "Expect a identifier as parameter name.")?;
        self.consume_keyword(KeywordId::Colon, "Expect a ':' and a parameter type.")?;
        let ty = self.type_annotation()?;
        Ok(self.make_node(NodeClass::Stmt, NodeKind::Param, name, Some(ty), None))
    }

    fn function_declaration(&mut self, return_value: bool) -> Result<Node, ParseError> {
        let name = self.consume(TokenType::Identifier, "Expect a identifier for function/method.")?;

        self.consume_keyword(KeywordId::LeftParen, "Expect a '(' after function name.")?;
        let mut parameters = Vec::new();
        if !self.check_keyword(KeywordId::RightParen) {
            loop {
                if parameters.len() >= MAX_ARGS {
                    return Err(ParseError::TooMany {
                        line: self.peek().line,
                        what: "parameters",
                    });
                }
                parameters.push(self.parameter()?);
                if !self.match_keyword(KeywordId::Comma) {
                    break;
                }
            }
        }
        self.consume_keyword(KeywordId::RightParen, "Expect ')' after parameters.")?;

        let mut return_type = None;
        if self.match_keyword(KeywordId::Colon) {
            if !return_value {
                return Err(self.error_at_current("Expect a subroutine to have no return type."));
            }
            return_type = Some(self.type_annotation()?);
        }

        let body = if self.match_keyword(KeywordId::Arrow) {
            if return_value {
                let value = self.expression()?;
                let token = value.token.clone();
                let ret =
                    self.make_node(NodeClass::Stmt, NodeKind::Return, token, Some(value), None);
                self.make_single_statement_block(ret)
            } else {
                let stmt = self.statement(false)?;
                self.make_single_statement_block(stmt)
            }
        } else {
            self.block(KeywordId::End, return_value)?
        };

        let kind = if return_value {
            NodeKind::Def
        } else {
            NodeKind::Sub
        };
        let mut node = self.make_node(NodeClass::Stmt, kind, name, return_type, Some(body));
        node.children = parameters;
        Ok(node)
    }

    fn variable_declaration(&mut self) -> Result<Node, ParseError> {
        let name = self.consume(TokenType::Identifier, "Expect a identifier for variable.")?;

        let mut ty = None;
        if self.match_keyword(KeywordId::Colon) {
            ty = Some(self.type_annotation()?);
        }

        let mut initializer = None;
        if self.match_keyword(KeywordId::Assign) {
            initializer = Some(self.expression()?);
        }

        if ty.is_none() && initializer.is_none() {
            return Err(
                self.error_at_current("The variable declarations must has a type or initializer.")
            );
        }

        Ok(self.make_node(NodeClass::Stmt, NodeKind::Var, name, ty, initializer))
    }

    fn package_path(&mut self) -> Result<Node, ParseError> {
        let token = self.consume(TokenType::Identifier, "Expect a module identifier.")?;
        let mut right = None;
        if self.match_keyword(KeywordId::Dot) {
            right = Some(self.package_path()?);
        }
        Ok(self.make_node(NodeClass::Expr, NodeKind::Get, token, None, right))
    }

    fn import_declaration(&mut self) -> Result<Node, ParseError> {
        let import_token = self.previous().clone();
        let path = self.package_path()?;
        Ok(self.make_node(NodeClass::Stmt, NodeKind::Import, import_token, Some(path), None))
    }

    // ------------------------------------------------------------------
    // statements

    fn statement(&mut self, return_value: bool) -> Result<Node, ParseError> {
        if self.match_keyword(KeywordId::For) {
            return self.for_statement(return_value);
        }
        if self.match_keyword(KeywordId::Break) {
            let token = self.previous().clone();
            return Ok(self.make_node(NodeClass::Stmt, NodeKind::Break, token, None, None));
        }
        if self.match_keyword(KeywordId::Continue) {
            let token = self.previous().clone();
            return Ok(self.make_node(NodeClass::Stmt, NodeKind::Continue, token, None, None));
        }
        if self.match_keyword(KeywordId::If) {
            return self.if_statement(return_value);
        }
        if self.match_keyword(KeywordId::Return) {
            return self.return_statement(return_value);
        }
        if self.match_keyword(KeywordId::While) {
            return self.while_statement(return_value);
        }
        if self.match_keyword(KeywordId::Until) {
            return self.until_statement(return_value);
        }
        if self.match_keyword(KeywordId::Do) {
            return self.block(KeywordId::Next, return_value);
        }
        self.expression_statement()
    }

    fn expression_statement(&mut self) -> Result<Node, ParseError> {
        let expr = self.expression()?;
        let token = expr.token.clone();
        Ok(self.make_node(NodeClass::Stmt, NodeKind::Expr, token, Some(expr), None))
    }

    /// Statements until `end_kw`, consuming it.
    fn block(&mut self, end_kw: KeywordId, return_value: bool) -> Result<Node, ParseError> {
        let token = self.previous().clone();
        let mut statements = Vec::new();

        while !self.check_keyword(end_kw) && !self.is_at_end() {
            statements.push(self.declaration(return_value)?);
        }

        let end = self.consume_keyword(
            end_kw,
            &format!("Expect '{}' after the code block.", end_kw.lexeme()),
        )?;
        Ok(self.make_block(token, end, statements))
    }

    /// Statements until either terminator keyword, consuming it; the consumed
    /// token lands in `token2` so the caller can see which one closed the
    /// block.
    fn block2(
        &mut self,
        end1: KeywordId,
        end2: KeywordId,
        return_value: bool,
    ) -> Result<Node, ParseError> {
        let token = self.previous().clone();
        let mut statements = Vec::new();

        while !self.check_keyword(end1) && !self.check_keyword(end2) && !self.is_at_end() {
            statements.push(self.declaration(return_value)?);
        }

        if !self.check_keyword(end1) && !self.check_keyword(end2) {
            return Err(self.error_at_current(&format!(
                "Expect '{}' or '{}' after the code block.",
                end1.lexeme(),
                end2.lexeme()
            )));
        }
        let end = self.advance();
        Ok(self.make_block(token, end, statements))
    }

    fn if_statement(&mut self, return_value: bool) -> Result<Node, ParseError> {
        let token = self.previous().clone();
        let condition = self.expression()?;

        let mut else_branch = None;
        let then_branch = if self.match_keyword(KeywordId::Arrow) {
            let stmt = self.statement(return_value)?;
            self.make_single_statement_block(stmt)
        } else {
            let then_branch = self.block2(KeywordId::Next, KeywordId::Else, return_value)?;
            let closed_by_else = then_branch
                .token2
                .as_ref()
                .is_some_and(|t| t.is_keyword(KeywordId::Else));
            if closed_by_else {
                else_branch = Some(if self.match_keyword(KeywordId::If) {
                    self.if_statement(return_value)?
                } else if self.match_keyword(KeywordId::Arrow) {
                    let stmt = self.statement(return_value)?;
                    self.make_single_statement_block(stmt)
                } else {
                    self.block(KeywordId::Next, return_value)?
                });
            }
            then_branch
        };

        let mut node = self.make_node(
            NodeClass::Stmt,
            NodeKind::If,
            token,
            Some(then_branch),
            else_branch,
        );
        node.condition = Some(Box::new(condition));
        Ok(node)
    }

    fn loop_body(&mut self, return_value: bool) -> Result<Node, ParseError> {
        if self.match_keyword(KeywordId::Arrow) {
            let stmt = self.statement(return_value)?;
            Ok(self.make_single_statement_block(stmt))
        } else {
            self.block(KeywordId::Next, return_value)
        }
    }

    fn while_statement(&mut self, return_value: bool) -> Result<Node, ParseError> {
        let token = self.previous().clone();
        let condition = self.expression()?;
        let body = self.loop_body(return_value)?;

        let mut node = self.make_node(NodeClass::Stmt, NodeKind::While, token, Some(body), None);
        node.condition = Some(Box::new(condition));
        Ok(node)
    }

    fn until_statement(&mut self, return_value: bool) -> Result<Node, ParseError> {
        let token = self.previous().clone();
        let condition = self.expression()?;
        let body = self.loop_body(return_value)?;

        let mut node = self.make_node(NodeClass::Stmt, NodeKind::Until, token, Some(body), None);
        node.condition = Some(Box::new(condition));
        Ok(node)
    }

    /// `for i = a to b [step s]` desugars to
    /// `do var i = a  until i == b do <body> i = i + s next next`.
    fn for_statement(&mut self, return_value: bool) -> Result<Node, ParseError> {
        let token = self.previous().clone();

        let name = self.consume(TokenType::Identifier, "Expect a identifier to iterate.")?;
        self.consume_keyword(KeywordId::Assign, "Expect a initializer.")?;
        let initializer = self.expression()?;

        self.consume_keyword(KeywordId::To, "Expect a limit.")?;
        let limit = self.expression()?;

        let step = if self.match_keyword(KeywordId::Step) {
            self.expression()?
        } else {
            let one = Token::new(TokenType::I32, "1", name.line);
            self.make_literal(one, LiteralType::I32)
        };

        let main_body = self.loop_body(return_value)?;
        let body_end = main_body
            .token2
            .clone()
            .unwrap_or_else(|| main_body.token.clone());

        // body plus the increment statement
        let increment = self.make_increment_statement(&token, &name, step);
        let body = self.make_block(token.clone(), body_end, vec![main_body, increment]);

        // the loop itself: until i == limit
        let condition = self.make_equal_expression(&token, &name, limit);
        let mut until = self.make_node(NodeClass::Stmt, NodeKind::Until, token.clone(), Some(body), None);
        until.condition = Some(Box::new(condition));

        // declaration and initializer around it
        let var = self.make_node(NodeClass::Stmt, NodeKind::Var, name, None, Some(initializer));
        let end = until
            .left
            .as_ref()
            .and_then(|b| b.token2.clone())
            .unwrap_or_else(|| token.clone());
        Ok(self.make_block(token, end, vec![var, until]))
    }

    fn make_equal_expression(&mut self, main: &Token, name: &Token, expr: Node) -> Node {
        let variable = self.make_variable(name.clone());
        let op = Token::new(TokenType::Keyword(KeywordId::Eq), "==", main.line);
        self.make_node(NodeClass::Expr, NodeKind::Binary, op, Some(variable), Some(expr))
    }

    fn make_increment_statement(&mut self, main: &Token, name: &Token, step: Node) -> Node {
        let sum_op = Token::new(TokenType::Keyword(KeywordId::Plus), "+", main.line);
        let variable = self.make_variable(name.clone());
        let sum = self.make_node(NodeClass::Expr, NodeKind::Binary, sum_op, Some(variable), Some(step));

        let assign_op = Token::new(TokenType::Keyword(KeywordId::Assign), "=", main.line);
        let target = self.make_variable(name.clone());
        let assign = self.make_node(
            NodeClass::Expr,
            NodeKind::Assign,
            assign_op,
            Some(target),
            Some(sum),
        );
        self.make_node(NodeClass::Stmt, NodeKind::Expr, main.clone(), Some(assign), None)
    }

    fn return_statement(&mut self, return_value: bool) -> Result<Node, ParseError> {
        let token = self.previous().clone();
        let value = if return_value {
            Some(self.expression()?)
        } else {
            None
        };
        Ok(self.make_node(NodeClass::Stmt, NodeKind::Return, token, value, None))
    }

    // ------------------------------------------------------------------
    // expressions

    pub fn expression(&mut self) -> Result<Node, ParseError> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Node, ParseError> {
        let expr = self.logical_or()?;

        if self.match_keyword(KeywordId::Assign) {
            let equal = self.previous().clone();
            let value = self.assignment()?;

            if expr.kind == NodeKind::Variable {
                return Ok(self.make_node(
                    NodeClass::Expr,
                    NodeKind::Assign,
                    equal,
                    Some(expr),
                    Some(value),
                ));
            }
            return Err(ParseError::UnexpectedToken {
                line: equal.line,
                message: "Invalid assignment target.".to_string(),
            });
        }

        Ok(expr)
    }

    fn binary_level(
        &mut self,
        operators: &[KeywordId],
        kind: NodeKind,
        next: fn(&mut Self) -> Result<Node, ParseError>,
    ) -> Result<Node, ParseError> {
        let mut expr = next(self)?;

        'outer: loop {
            for &op in operators {
                if self.match_keyword(op) {
                    let token = self.previous().clone();
                    let right = next(self)?;
                    expr = self.make_node(NodeClass::Expr, kind, token, Some(expr), Some(right));
                    continue 'outer;
                }
            }
            break;
        }
        Ok(expr)
    }

    fn logical_or(&mut self) -> Result<Node, ParseError> {
        self.binary_level(&[KeywordId::LogOr], NodeKind::Logical, Self::logical_and)
    }

    fn logical_and(&mut self) -> Result<Node, ParseError> {
        self.binary_level(&[KeywordId::LogAnd], NodeKind::Logical, Self::bitwise_or)
    }

    fn bitwise_or(&mut self) -> Result<Node, ParseError> {
        self.binary_level(&[KeywordId::Pipe], NodeKind::Binary, Self::bitwise_xor)
    }

    fn bitwise_xor(&mut self) -> Result<Node, ParseError> {
        self.binary_level(&[KeywordId::Caret], NodeKind::Binary, Self::bitwise_and)
    }

    fn bitwise_and(&mut self) -> Result<Node, ParseError> {
        self.binary_level(&[KeywordId::Amp], NodeKind::Binary, Self::equality)
    }

    fn equality(&mut self) -> Result<Node, ParseError> {
        self.binary_level(&[KeywordId::Eq, KeywordId::Ne], NodeKind::Binary, Self::comparison)
    }

    fn comparison(&mut self) -> Result<Node, ParseError> {
        self.binary_level(
            &[KeywordId::Greater, KeywordId::Less, KeywordId::Ge, KeywordId::Le],
            NodeKind::Binary,
            Self::term,
        )
    }

    fn term(&mut self) -> Result<Node, ParseError> {
        self.binary_level(&[KeywordId::Minus, KeywordId::Plus], NodeKind::Binary, Self::factor)
    }

    fn factor(&mut self) -> Result<Node, ParseError> {
        self.binary_level(
            &[KeywordId::Slash, KeywordId::Star, KeywordId::Percent],
            NodeKind::Binary,
            Self::unary,
        )
    }

    fn unary(&mut self) -> Result<Node, ParseError> {
        const PREFIX: [KeywordId; 5] = [
            KeywordId::Minus,
            KeywordId::Bang,
            KeywordId::Tilde,
            KeywordId::Inc,
            KeywordId::Dec,
        ];

        for op in PREFIX {
            if self.match_keyword(op) {
                let token = self.previous().clone();
                let right = self.unary()?;
                return Ok(self.make_node(NodeClass::Expr, NodeKind::Unary, token, None, Some(right)));
            }
        }

        let expr = self.call()?;

        if self.match_keyword(KeywordId::Inc) || self.match_keyword(KeywordId::Dec) {
            let token = self.previous().clone();
            return Ok(self.make_node(NodeClass::Expr, NodeKind::Unary, token, Some(expr), None));
        }
        Ok(expr)
    }

    fn call(&mut self) -> Result<Node, ParseError> {
        let mut expr = self.primary()?;

        loop {
            if self.match_keyword(KeywordId::LeftParen) {
                expr = self.finish_call(expr)?;
            } else if self.match_keyword(KeywordId::Dot) {
                let name = self.consume(TokenType::Identifier, "Expect identifier after '.'.")?;
                expr = self.make_node(NodeClass::Expr, NodeKind::Get, name, Some(expr), None);
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Node) -> Result<Node, ParseError> {
        let mut arguments = Vec::new();

        if !self.check_keyword(KeywordId::RightParen) {
            loop {
                if arguments.len() >= MAX_ARGS {
                    return Err(ParseError::TooMany {
                        line: self.peek().line,
                        what: "arguments",
                    });
                }
                arguments.push(self.expression()?);
                if !self.match_keyword(KeywordId::Comma) {
                    break;
                }
            }
        }

        let paren = self.consume_keyword(KeywordId::RightParen, "Expect ')' after arguments.")?;
        let mut node = self.make_node(NodeClass::Expr, NodeKind::Call, paren, Some(callee), None);
        node.children = arguments;
        Ok(node)
    }

    fn primary(&mut self) -> Result<Node, ParseError> {
        if self.match_keyword(KeywordId::True) || self.match_keyword(KeywordId::False) {
            let token = self.previous().clone();
            return Ok(self.make_literal(token, LiteralType::Bool));
        }
        if self.match_keyword(KeywordId::None) {
            let token = self.previous().clone();
            return Ok(self.make_literal(token, LiteralType::None));
        }

        const NUMBERS: [(TokenType, LiteralType); 6] = [
            (TokenType::I32, LiteralType::I32),
            (TokenType::I64, LiteralType::I64),
            (TokenType::U32, LiteralType::U32),
            (TokenType::U64, LiteralType::U64),
            (TokenType::F32, LiteralType::F32),
            (TokenType::F64, LiteralType::F64),
        ];
        for (token_type, literal_type) in NUMBERS {
            if self.matches(token_type) {
                let token = self.previous().clone();
                return Ok(self.make_literal(token, literal_type));
            }
        }

        if self.matches(TokenType::String) {
            let token = self.previous().clone();
            return Ok(self.make_literal(token, LiteralType::String));
        }

        if self.matches(TokenType::Identifier) {
            let token = self.previous().clone();
            return Ok(self.make_variable(token));
        }

        if self.match_keyword(KeywordId::LeftParen) {
            let expr = self.expression()?;
            self.consume_keyword(KeywordId::RightParen, "Expect ')' after expression.")?;
            return Ok(expr);
        }

        // Type keywords may open cast calls like `i64(x)`; they resolve as a
        // variable named after the type.
        const TYPE_KEYWORDS: [KeywordId; 8] = [
            KeywordId::Bool,
            KeywordId::I32,
            KeywordId::I64,
            KeywordId::U32,
            KeywordId::U64,
            KeywordId::F32,
            KeywordId::F64,
            KeywordId::String,
        ];
        for id in TYPE_KEYWORDS {
            if self.match_keyword(id) {
                let mut token = self.previous().clone();
                token.token_type = TokenType::Identifier;
                return Ok(self.make_variable(token));
            }
        }

        Err(self.error_at_current("Expect expression."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn parse(source: &str) -> Node {
        parse_module(source, "test").expect("parse")
    }

    #[rstest]
    #[case::def_declaration("def f() => 1", NodeKind::Def)]
    #[case::sub_declaration("sub f() end", NodeKind::Sub)]
    #[case::var_declaration("var x = 1", NodeKind::Var)]
    #[case::import_declaration("import console", NodeKind::Import)]
    #[case::public_marker("public def f() => 1", NodeKind::Public)]
    fn test_top_level_declarations(#[case] source: &str, #[case] kind: NodeKind) {
        let module = parse(source);
        assert_eq!(module.children[0].kind, kind);
    }

    #[test]
    fn test_implicit_module_named_after_file() {
        let module = parse("def f() => 1");
        assert_eq!(module.kind, NodeKind::Module);
        assert_eq!(module.token.lexeme, "test");
        assert_eq!(module.children.len(), 1);
        assert_eq!(module.children[0].kind, NodeKind::Def);
    }

    #[test]
    fn test_arrow_body_wraps_return() {
        let module = parse("def f(): i32 => 42");
        let def = &module.children[0];
        let body = def.right().unwrap();
        assert_eq!(body.kind, NodeKind::Block);
        assert_eq!(body.children.len(), 1);
        let ret = &body.children[0];
        assert_eq!(ret.kind, NodeKind::Return);
        assert_eq!(ret.left().unwrap().kind, NodeKind::Literal);
        assert_eq!(ret.left().unwrap().literal_type, LiteralType::I32);
    }

    #[test]
    fn test_def_parameters_and_return_type() {
        let module = parse("def add(a: i32, b: i32): i32 => a + b");
        let def = &module.children[0];
        assert_eq!(def.children.len(), 2);
        assert_eq!(def.children[0].kind, NodeKind::Param);
        assert_eq!(def.children[0].token.lexeme, "a");
        assert_eq!(def.children[0].left().unwrap().class, NodeClass::Type);
        assert_eq!(def.left().unwrap().token.lexeme, "i32");
    }

    #[test]
    fn test_if_else_blocks() {
        let module = parse("sub f(x: i32) if x == 0 x = 1 else x = 2 next end");
        let sub = &module.children[0];
        let body = sub.right().unwrap();
        let if_stmt = &body.children[0];
        assert_eq!(if_stmt.kind, NodeKind::If);
        assert!(if_stmt.condition().is_some());
        assert_eq!(if_stmt.left().unwrap().kind, NodeKind::Block);
        assert_eq!(if_stmt.right().unwrap().kind, NodeKind::Block);
    }

    #[test]
    fn test_while_statement() {
        let module = parse("sub g(n: i32) var i = 0 while i < n i = i + 1 next end");
        let sub = &module.children[0];
        let body = sub.right().unwrap();
        assert_eq!(body.children[0].kind, NodeKind::Var);
        let while_stmt = &body.children[1];
        assert_eq!(while_stmt.kind, NodeKind::While);
        assert_eq!(while_stmt.condition().unwrap().kind, NodeKind::Binary);
    }

    #[test]
    fn test_for_desugars_to_block_var_until() {
        let module = parse("sub g() for i = 0 to 10 => continue end");
        let sub = &module.children[0];
        let body = sub.right().unwrap();
        let desugared = &body.children[0];
        assert_eq!(desugared.kind, NodeKind::Block);
        assert_eq!(desugared.children.len(), 2);
        assert_eq!(desugared.children[0].kind, NodeKind::Var);

        let until = &desugared.children[1];
        assert_eq!(until.kind, NodeKind::Until);
        let condition = until.condition().unwrap();
        assert_eq!(condition.kind, NodeKind::Binary);
        assert_eq!(condition.token.lexeme, "==");

        // loop body = { main body; i = i + step }
        let loop_body = until.left().unwrap();
        assert_eq!(loop_body.children.len(), 2);
        let increment = &loop_body.children[1];
        assert_eq!(increment.kind, NodeKind::Expr);
        assert_eq!(increment.left().unwrap().kind, NodeKind::Assign);
    }

    #[test]
    fn test_precedence_logical_over_comparison() {
        let module = parse("def f(a: i32, b: i32): bool => a < 1 && b > 2");
        let def = &module.children[0];
        let ret = &def.right().unwrap().children[0];
        let expr = ret.left().unwrap();
        assert_eq!(expr.kind, NodeKind::Logical);
        assert_eq!(expr.left().unwrap().kind, NodeKind::Binary);
        assert_eq!(expr.right().unwrap().kind, NodeKind::Binary);
    }

    #[test]
    fn test_call_and_member_access() {
        let module = parse("sub f() console.write(\"hi\") end");
        let sub = &module.children[0];
        let stmt = &sub.right().unwrap().children[0];
        let call = stmt.left().unwrap();
        assert_eq!(call.kind, NodeKind::Call);
        assert_eq!(call.children.len(), 1);
        let callee = call.left().unwrap();
        assert_eq!(callee.kind, NodeKind::Get);
        assert_eq!(callee.token.lexeme, "write");
        assert_eq!(callee.left().unwrap().kind, NodeKind::Variable);
    }

    #[test]
    fn test_cast_call_on_type_keyword() {
        let module = parse("def w(x: i32): i64 => i64(x)");
        let def = &module.children[0];
        let ret = &def.right().unwrap().children[0];
        let call = ret.left().unwrap();
        assert_eq!(call.kind, NodeKind::Call);
        let callee = call.left().unwrap();
        assert_eq!(callee.kind, NodeKind::Variable);
        assert_eq!(callee.token.lexeme, "i64");
    }

    #[test]
    fn test_invalid_assignment_target() {
        let result = parse_module("sub f() 1 = 2 end", "test");
        assert!(result.is_err());
    }

    #[test]
    fn test_named_module_must_match_file() {
        assert!(parse_module("module other end", "test").is_err());
        assert!(parse_module("module test end", "test").is_ok());
    }
}
