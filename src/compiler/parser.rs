use crate::compiler::ast::*;
use crate::compiler::span::Span;
use crate::compiler::token::{Token, TokenKind};
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════
//  Error type
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Error)]
#[error("parse error at {span}: {message}")]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

// ═══════════════════════════════════════════════════════════════
//  Parser
// ═══════════════════════════════════════════════════════════════

/// Recursive-descent parser over the token stream produced by
/// [`Lexer`](crate::compiler::lexer::Lexer).
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse_module(&mut self) -> Result<Module, ParseError> {
        let start_span = self.current_span();

        let mut body = Vec::new();
        while !self.check(&TokenKind::EOF) {
            if self.check(&TokenKind::Newline) {
                self.advance();
                continue;
            }
            if self.check(&TokenKind::Indent) {
                return Err(self.error("unexpected indent"));
            }
            body.push(self.parse_stmt()?);
        }

        Ok(Module {
            body,
            span: start_span.to(self.prev_span()),
        })
    }

    // ── Statements ───────────────────────────────────────────

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        match self.peek_kind() {
            TokenKind::Def => Ok(Stmt::FunctionDef(self.parse_function_def()?)),
            _ => self.parse_simple_stmt(),
        }
    }

    fn parse_function_def(&mut self) -> Result<FunctionDef, ParseError> {
        let start = self.current_span();
        self.expect(&TokenKind::Def)?;
        let name = self.expect_ident()?;

        self.expect(&TokenKind::LParen)?;
        let mut params = Vec::new();
        while !self.check(&TokenKind::RParen) {
            params.push(self.parse_param()?);
            if !self.check(&TokenKind::RParen) {
                self.expect(&TokenKind::Comma)?;
            }
        }
        self.expect(&TokenKind::RParen)?;

        let returns = if self.check(&TokenKind::Arrow) {
            self.advance();
            Some(self.parse_expr()?)
        } else {
            None
        };

        self.expect(&TokenKind::Colon)?;
        let body = self.parse_suite()?;

        Ok(FunctionDef {
            name,
            params,
            returns,
            body,
            span: start.to(self.prev_span()),
        })
    }

    fn parse_param(&mut self) -> Result<Param, ParseError> {
        let start = self.current_span();
        let name = self.expect_ident()?;
        let annotation = if self.check(&TokenKind::Colon) {
            self.advance();
            Some(self.parse_expr()?)
        } else {
            None
        };
        if self.check(&TokenKind::Eq) {
            return Err(self.error("default parameter values are not supported"));
        }
        Ok(Param {
            name,
            annotation,
            span: start.to(self.prev_span()),
        })
    }

    /// Either an indented block or a single statement on the header line.
    fn parse_suite(&mut self) -> Result<Vec<Stmt>, ParseError> {
        if !self.check(&TokenKind::Newline) {
            return Ok(vec![self.parse_simple_stmt()?]);
        }
        self.advance();
        if !self.check(&TokenKind::Indent) {
            return Err(self.error("expected an indented block"));
        }
        self.advance();

        let mut stmts = Vec::new();
        while !self.check(&TokenKind::Dedent) && !self.check(&TokenKind::EOF) {
            if self.check(&TokenKind::Indent) {
                return Err(self.error("unexpected indent"));
            }
            stmts.push(self.parse_stmt()?);
        }
        self.expect(&TokenKind::Dedent)?;
        Ok(stmts)
    }

    fn parse_simple_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current_span();

        let stmt = match self.peek_kind() {
            TokenKind::Return => {
                self.advance();
                let value = if self.check(&TokenKind::Newline) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                Stmt::Return(ReturnStmt {
                    value,
                    span: start.to(self.prev_span()),
                })
            }
            TokenKind::Pass => {
                self.advance();
                Stmt::Pass(start)
            }
            _ => self.parse_assign_or_expr_stmt()?,
        };

        self.expect(&TokenKind::Newline)?;
        Ok(stmt)
    }

    fn parse_assign_or_expr_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current_span();
        let expr = self.parse_expr()?;

        if !self.check(&TokenKind::Eq) {
            return Ok(Stmt::Expr(ExprStmt {
                value: expr,
                span: start.to(self.prev_span()),
            }));
        }

        // `a = b = value` chains every target onto one statement.
        let mut targets = vec![expr];
        let mut value;
        loop {
            self.expect(&TokenKind::Eq)?;
            value = self.parse_expr()?;
            if self.check(&TokenKind::Eq) {
                targets.push(value);
            } else {
                break;
            }
        }

        let targets = targets
            .into_iter()
            .map(Self::store_target)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Stmt::Assign(AssignStmt {
            targets,
            value,
            span: start.to(self.prev_span()),
        }))
    }

    fn store_target(mut expr: Expr) -> Result<Expr, ParseError> {
        match expr.kind {
            ExprKind::Name(ref mut name) => name.ctx = ExprContext::Store,
            ExprKind::Attribute(..) | ExprKind::Subscript(..) => {}
            ref other => {
                return Err(ParseError {
                    message: format!("cannot assign to {}", other.label()),
                    span: expr.span,
                });
            }
        }
        Ok(expr)
    }

    // ── Expressions (Pratt parser) ───────────────────────────

    pub fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        if self.check(&TokenKind::Not) {
            let start = self.current_span();
            self.advance();
            let operand = self.parse_expr()?;
            let span = start.to(operand.span);
            return Ok(Expr::new(
                ExprKind::UnaryOp(UnaryOp::Not, Box::new(operand)),
                span,
            ));
        }
        self.parse_expr_bp(0)
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;

        while let Some(op) = self.try_binop() {
            let (l_bp, r_bp) = infix_binding_power(op);
            if l_bp < min_bp {
                break;
            }
            self.advance();
            let rhs = self.parse_expr_bp(r_bp)?;
            let span = lhs.span.to(rhs.span);
            lhs = Expr::new(ExprKind::BinOp(Box::new(lhs), op, Box::new(rhs)), span);
        }

        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let start = self.current_span();
        let op = match self.peek_kind() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Pos,
            _ => return self.parse_postfix(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        let span = start.to(operand.span);
        Ok(Expr::new(ExprKind::UnaryOp(op, Box::new(operand)), span))
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.peek_kind() {
                TokenKind::LParen => {
                    self.advance();
                    let (args, keywords) = self.parse_call_args()?;
                    self.expect(&TokenKind::RParen)?;
                    let span = expr.span.to(self.prev_span());
                    expr = Expr::new(
                        ExprKind::Call(Call {
                            func: Box::new(expr),
                            args,
                            keywords,
                        }),
                        span,
                    );
                }
                TokenKind::Dot => {
                    self.advance();
                    let attr = self.expect_ident()?;
                    let span = expr.span.to(self.prev_span());
                    expr = Expr::new(ExprKind::Attribute(Box::new(expr), attr), span);
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect(&TokenKind::RBracket)?;
                    let span = expr.span.to(self.prev_span());
                    expr = Expr::new(
                        ExprKind::Subscript(Box::new(expr), Box::new(index)),
                        span,
                    );
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_call_args(&mut self) -> Result<(Vec<Expr>, Vec<Keyword>), ParseError> {
        let mut args = Vec::new();
        let mut keywords: Vec<Keyword> = Vec::new();

        while !self.check(&TokenKind::RParen) {
            let is_keyword = matches!(self.peek_kind(), TokenKind::Ident(_))
                && matches!(self.peek_kind_at(self.pos + 1), TokenKind::Eq);

            if is_keyword {
                let start = self.current_span();
                let arg = self.expect_ident()?;
                self.expect(&TokenKind::Eq)?;
                let value = self.parse_expr()?;
                keywords.push(Keyword {
                    arg,
                    value,
                    span: start.to(self.prev_span()),
                });
            } else {
                if !keywords.is_empty() {
                    return Err(self.error("positional argument follows keyword argument"));
                }
                args.push(self.parse_expr()?);
            }

            if !self.check(&TokenKind::RParen) {
                self.expect(&TokenKind::Comma)?;
            }
        }

        Ok((args, keywords))
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let start = self.current_span();

        let value = match self.peek_kind() {
            TokenKind::IntLit(n) => Constant::Int(n),
            TokenKind::FloatLit(n) => Constant::Float(n),
            TokenKind::None => Constant::None,
            TokenKind::True => Constant::Bool(true),
            TokenKind::False => Constant::Bool(false),
            TokenKind::Ellipsis => Constant::Ellipsis,
            TokenKind::StringLit(s) => {
                self.advance();
                // Adjacent literals concatenate: "a" "b" == "ab".
                let mut text = s;
                while let TokenKind::StringLit(next) = self.peek_kind() {
                    self.advance();
                    text.push_str(&next);
                }
                return Ok(Expr::constant(
                    Constant::Str(text),
                    start.to(self.prev_span()),
                ));
            }
            TokenKind::Ident(name) => {
                self.advance();
                return Ok(Expr::name(&name, ExprContext::Load, start));
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                if self.check(&TokenKind::Comma) {
                    return Err(self.error("tuple expressions are not supported"));
                }
                self.expect(&TokenKind::RParen)?;
                return Ok(inner);
            }
            other => {
                return Err(self.error(&format!("expected expression, found '{}'", other)));
            }
        };

        self.advance();
        Ok(Expr::constant(value, start))
    }

    fn try_binop(&self) -> Option<BinOp> {
        match self.peek_kind() {
            TokenKind::Plus => Some(BinOp::Add),
            TokenKind::Minus => Some(BinOp::Sub),
            TokenKind::Star => Some(BinOp::Mul),
            TokenKind::Slash => Some(BinOp::Div),
            TokenKind::Percent => Some(BinOp::Mod),
            _ => None,
        }
    }

    // ── Token utilities ──────────────────────────────────────

    fn peek_kind_at(&self, pos: usize) -> TokenKind {
        self.tokens
            .get(pos)
            .map(|t| t.kind.clone())
            .unwrap_or(TokenKind::EOF)
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek_kind_at(self.pos)
    }

    fn current_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|t| t.span)
            .unwrap_or(Span::synthetic())
    }

    fn prev_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            Span::synthetic()
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek_kind()) == std::mem::discriminant(kind)
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error(&format!(
                "expected '{}', found '{}'",
                kind,
                self.peek_kind()
            )))
        }
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        match self.peek_kind() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.error(&format!(
                "expected identifier, found '{}'",
                self.peek_kind()
            ))),
        }
    }

    fn error(&self, msg: &str) -> ParseError {
        ParseError {
            message: msg.to_string(),
            span: self.current_span(),
        }
    }
}

// ── Operator binding power (precedence) ──────────────────────

/// Returns (left_bp, right_bp). Higher = tighter binding.
fn infix_binding_power(op: BinOp) -> (u8, u8) {
    match op {
        BinOp::Add | BinOp::Sub => (1, 2),
        BinOp::Mul | BinOp::Div | BinOp::Mod => (3, 4),
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::lexer::Lexer;

    fn parse(input: &str) -> Module {
        let mut lexer = Lexer::new(input);
        let tokens = lexer.tokenize().unwrap();
        let mut parser = Parser::new(tokens);
        parser.parse_module().unwrap()
    }

    fn parse_err(input: &str) -> ParseError {
        let mut lexer = Lexer::new(input);
        let tokens = lexer.tokenize().unwrap();
        let mut parser = Parser::new(tokens);
        parser.parse_module().unwrap_err()
    }

    fn only_function(module: &Module) -> &FunctionDef {
        match &module.body[..] {
            [Stmt::FunctionDef(f)] => f,
            other => panic!("expected a single function, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_module() {
        assert!(parse("").body.is_empty());
        assert!(parse("\n\n# only a comment\n").body.is_empty());
    }

    #[test]
    fn test_hello_world() {
        let module = parse("def main() -> int:\n    print(\"Hello, World!\")\n");
        let f = only_function(&module);
        assert_eq!(f.name, "main");
        assert!(f.params.is_empty());
        assert_eq!(f.returns.as_ref().and_then(Expr::as_name), Some("int"));
        match &f.body[..] {
            [Stmt::Expr(stmt)] => match &stmt.value.kind {
                ExprKind::Call(call) => {
                    assert_eq!(call.func.as_name(), Some("print"));
                    assert_eq!(call.args[0].as_str_constant(), Some("Hello, World!"));
                }
                other => panic!("expected call, got {:?}", other),
            },
            other => panic!("expected one statement, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_annotation_is_none() {
        let module = parse("def f():\n    pass\n");
        let f = only_function(&module);
        assert!(f.returns.is_none());
        assert!(matches!(f.body[..], [Stmt::Pass(_)]));
    }

    #[test]
    fn test_none_annotation_is_constant() {
        let module = parse("def f() -> None:\n    return\n");
        let f = only_function(&module);
        assert!(matches!(
            f.returns,
            Some(Expr {
                kind: ExprKind::Constant(Constant::None),
                ..
            })
        ));
        assert!(matches!(
            f.body[..],
            [Stmt::Return(ReturnStmt { value: None, .. })]
        ));
    }

    #[test]
    fn test_single_line_suite() {
        let module = parse("def f() -> int: return 1\n");
        let f = only_function(&module);
        assert_eq!(f.body.len(), 1);
    }

    #[test]
    fn test_params_with_annotations() {
        let module = parse("def add(a: int, b) -> int:\n    return 0\n");
        let f = only_function(&module);
        assert_eq!(f.params.len(), 2);
        assert_eq!(f.params[0].name, "a");
        assert_eq!(
            f.params[0].annotation.as_ref().and_then(Expr::as_name),
            Some("int")
        );
        assert!(f.params[1].annotation.is_none());
    }

    #[test]
    fn test_docstrings_and_nested_def() {
        let module = parse(
            "\"\"\"Module doc.\"\"\"\n\
             def outer() -> None:\n\
             \x20   \"\"\"Outer doc.\"\"\"\n\
             \x20   def inner() -> None:\n\
             \x20       pass\n\
             \x20   print()\n",
        );
        assert_eq!(module.body.len(), 2);
        assert!(module.body[0].is_docstring());
        match &module.body[1] {
            Stmt::FunctionDef(f) => {
                assert!(f.body[0].is_docstring());
                assert!(matches!(f.body[1], Stmt::FunctionDef(_)));
                assert!(matches!(f.body[2], Stmt::Expr(_)));
            }
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_call_shapes() {
        let module = parse("print(x.y, a[0], sep=' ')\nobj.method()\n");
        match &module.body[0] {
            Stmt::Expr(stmt) => match &stmt.value.kind {
                ExprKind::Call(call) => {
                    assert!(matches!(call.args[0].kind, ExprKind::Attribute(..)));
                    assert!(matches!(call.args[1].kind, ExprKind::Subscript(..)));
                    assert_eq!(call.keywords.len(), 1);
                    assert_eq!(call.keywords[0].arg, "sep");
                }
                other => panic!("expected call, got {:?}", other),
            },
            other => panic!("expected expression statement, got {:?}", other),
        }
        match &module.body[1] {
            Stmt::Expr(stmt) => match &stmt.value.kind {
                ExprKind::Call(call) => {
                    assert!(matches!(call.func.kind, ExprKind::Attribute(..)));
                }
                other => panic!("expected call, got {:?}", other),
            },
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_assignment_targets_are_store() {
        let module = parse("x = y = 1\n");
        match &module.body[0] {
            Stmt::Assign(assign) => {
                assert_eq!(assign.targets.len(), 2);
                for target in &assign.targets {
                    assert!(matches!(
                        &target.kind,
                        ExprKind::Name(Name {
                            ctx: ExprContext::Store,
                            ..
                        })
                    ));
                }
            }
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_binary_precedence() {
        let module = parse("1 + 2 * 3\n");
        match &module.body[0] {
            Stmt::Expr(stmt) => match &stmt.value.kind {
                ExprKind::BinOp(_, BinOp::Add, rhs) => {
                    assert!(matches!(rhs.kind, ExprKind::BinOp(_, BinOp::Mul, _)));
                }
                other => panic!("expected addition, got {:?}", other),
            },
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_adjacent_strings_concatenate() {
        let module = parse("'ab' \"cd\"\n");
        match &module.body[0] {
            Stmt::Expr(stmt) => assert_eq!(stmt.value.as_str_constant(), Some("abcd")),
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_errors() {
        assert!(parse_err("def f(:\n    pass\n")
            .message
            .contains("expected identifier"));
        assert!(parse_err("def f() -> int:\nprint()\n")
            .message
            .contains("indented block"));
        assert!(parse_err("1 = x\n").message.contains("cannot assign"));
        assert!(parse_err("f(a=1, 2)\n")
            .message
            .contains("positional argument follows keyword"));
        assert!(parse_err("  x\n").message.contains("unexpected indent"));
    }
}
