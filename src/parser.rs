use crate::{
    ast::{
        BinaryOp, Expr, ExprKind, FunctionParam, Literal, LogicalOp, Pattern, Program, Stmt,
        StmtKind, UnaryOp, WhenArm,
    },
    diagnostics::{Diagnostic, DiagnosticKind, SourceSpan},
    lexer::{Keyword, Lexer, Token, TokenKind},
};

pub const STRICT_DIRECTIVE: &str = "use strict";

pub fn parse_program(source: &str) -> Result<Program, Diagnostic> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens).parse_program()
}

struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, current: 0 }
    }

    fn parse_program(&mut self) -> Result<Program, Diagnostic> {
        let mut items = Vec::new();
        while !self.check(TokenKind::Eof) {
            items.push(self.parse_statement()?);
        }

        let strict = matches!(
            items.first().map(|stmt| &stmt.kind),
            Some(StmtKind::Expr(Expr {
                kind: ExprKind::Literal(Literal::String(text)),
                ..
            })) if text == STRICT_DIRECTIVE
        );
        if strict {
            items.remove(0);
        }

        Ok(Program { strict, items })
    }

    fn parse_block_items(&mut self, terminator: TokenKind) -> Result<Vec<Stmt>, Diagnostic> {
        let mut items = Vec::new();
        while !self.check(terminator.clone()) && !self.check(TokenKind::Eof) {
            items.push(self.parse_statement()?);
        }
        self.consume(terminator, "expected block terminator")?;
        Ok(items)
    }

    fn parse_block(&mut self) -> Result<(Vec<Stmt>, SourceSpan), Diagnostic> {
        let start = self
            .consume(TokenKind::LBrace, "expected `{` to start block")?
            .span
            .start;
        let items = self.parse_block_items(TokenKind::RBrace)?;
        Ok((items, SourceSpan::new(start, self.previous().span.end)))
    }

    fn parse_statement(&mut self) -> Result<Stmt, Diagnostic> {
        if let Some(token) = self.peek() {
            match &token.kind {
                TokenKind::Keyword(Keyword::Var) => return self.parse_var_decl(),
                TokenKind::Keyword(Keyword::Const) => return self.parse_const_decl(),
                TokenKind::Keyword(Keyword::Fn) => return self.parse_function(),
                TokenKind::Keyword(Keyword::If) => return self.parse_if(),
                TokenKind::Keyword(Keyword::While) => return self.parse_while(),
                TokenKind::Keyword(Keyword::Loop) => return self.parse_loop(),
                TokenKind::Keyword(Keyword::For) => return self.parse_for(),
                TokenKind::Keyword(Keyword::When) => return self.parse_when(),
                TokenKind::Keyword(Keyword::Return) => return self.parse_return(),
                TokenKind::Keyword(Keyword::Break) => return self.parse_break(),
                TokenKind::Keyword(Keyword::Continue) => return self.parse_continue(),
                TokenKind::LBrace => {
                    let (items, span) = self.parse_block()?;
                    return Ok(Stmt {
                        kind: StmtKind::Block(items),
                        span,
                    });
                }
                _ => {}
            }
        }
        self.parse_expression_statement()
    }

    fn parse_var_decl(&mut self) -> Result<Stmt, Diagnostic> {
        let start = self.consume_keyword(Keyword::Var)?.span.start;
        self.matches_keyword(Keyword::Mut);
        let name = self.consume_identifier("expected variable name")?;
        let initializer = if self.matches(TokenKind::Assign) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.consume_optional_semicolon();
        let end = initializer
            .as_ref()
            .map_or(name.span.end, |expr| expr.span.end);
        let kind = StmtKind::VarDecl {
            name: name.lexeme,
            mutable: true,
            initializer,
        };
        Ok(stmt(kind, start, end))
    }

    fn parse_const_decl(&mut self) -> Result<Stmt, Diagnostic> {
        let start = self.consume_keyword(Keyword::Const)?.span.start;
        let name = self.consume_identifier("expected constant name")?;
        self.consume(TokenKind::Assign, "expected `=` in constant declaration")?;
        let value = self.parse_expression()?;
        self.consume_optional_semicolon();
        let end = value.span.end;
        let kind = StmtKind::ConstDecl {
            name: name.lexeme,
            value,
        };
        Ok(stmt(kind, start, end))
    }

    fn parse_function(&mut self) -> Result<Stmt, Diagnostic> {
        let start = self.consume_keyword(Keyword::Fn)?.span.start;
        let name = self.consume_identifier("expected function name")?;
        self.consume(TokenKind::LParen, "expected `(` after function name")?;
        let params = self.parse_params(TokenKind::RParen)?;
        self.consume(TokenKind::RParen, "expected `)` after parameters")?;
        let (body, span) = self.parse_block()?;
        let kind = StmtKind::Function {
            name: name.lexeme,
            params,
            body,
        };
        Ok(stmt(kind, start, span.end))
    }

    fn parse_params(&mut self, terminator: TokenKind) -> Result<Vec<FunctionParam>, Diagnostic> {
        let mut params: Vec<FunctionParam> = Vec::new();
        if self.check(terminator) {
            return Ok(params);
        }
        loop {
            let param = self.consume_identifier("expected parameter name")?;
            if params.iter().any(|existing| existing.name == param.lexeme) {
                return Err(self.error(
                    &param,
                    &format!("duplicate parameter name `{}`", param.lexeme),
                ));
            }
            params.push(FunctionParam {
                name: param.lexeme.clone(),
                span: param.span,
            });
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        Ok(params)
    }

    fn parse_if(&mut self) -> Result<Stmt, Diagnostic> {
        let start = self.consume_keyword(Keyword::If)?.span.start;
        let condition = self.parse_expression()?;
        let (then_branch, then_span) = self.parse_block()?;
        let mut end = then_span.end;
        let else_branch = if !self.matches_keyword(Keyword::Else) {
            None
        } else if self.check(TokenKind::Keyword(Keyword::If)) {
            let nested = self.parse_if()?;
            end = nested.span.end;
            Some(vec![nested])
        } else {
            let (branch, span) = self.parse_block()?;
            end = span.end;
            Some(branch)
        };
        let kind = StmtKind::If {
            condition,
            then_branch,
            else_branch,
        };
        Ok(stmt(kind, start, end))
    }

    fn parse_while(&mut self) -> Result<Stmt, Diagnostic> {
        let start = self.consume_keyword(Keyword::While)?.span.start;
        let condition = self.parse_expression()?;
        let (body, span) = self.parse_block()?;
        Ok(stmt(StmtKind::While { condition, body }, start, span.end))
    }

    fn parse_loop(&mut self) -> Result<Stmt, Diagnostic> {
        let start = self.consume_keyword(Keyword::Loop)?.span.start;
        let (body, span) = self.parse_block()?;
        Ok(stmt(StmtKind::Loop { body }, start, span.end))
    }

    fn parse_for(&mut self) -> Result<Stmt, Diagnostic> {
        let start = self.consume_keyword(Keyword::For)?.span.start;
        let binding = self.consume_identifier("expected loop binding")?.lexeme;
        self.consume_keyword(Keyword::In)?;
        let iterable = self.parse_expression()?;
        let (body, span) = self.parse_block()?;
        let kind = StmtKind::For {
            binding,
            iterable,
            body,
        };
        Ok(stmt(kind, start, span.end))
    }

    fn parse_when(&mut self) -> Result<Stmt, Diagnostic> {
        let start = self.consume_keyword(Keyword::When)?.span.start;
        let subject = self.parse_expression()?;
        let (arms, end) = self.parse_when_arms()?;
        Ok(stmt(StmtKind::When { subject, arms }, start, end))
    }

    fn parse_when_arms(&mut self) -> Result<(Vec<WhenArm>, usize), Diagnostic> {
        self.consume(TokenKind::LBrace, "expected `{` after when expression")?;
        let mut arms = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.check(TokenKind::Eof) {
            let pattern = if self.matches_keyword(Keyword::Else) {
                Pattern::Wildcard
            } else {
                self.parse_pattern()?
            };
            self.consume(TokenKind::Arrow, "expected `->` in when arm")?;
            let (body, span) = self.parse_block()?;
            arms.push(WhenArm {
                pattern,
                body,
                span,
            });
        }
        let end = self
            .consume(TokenKind::RBrace, "expected `}` after when arms")?
            .span
            .end;
        Ok((arms, end))
    }

    fn parse_pattern(&mut self) -> Result<Pattern, Diagnostic> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.error_eof("unexpected end of input in pattern"));
        };
        match &token.kind {
            TokenKind::Identifier if token.lexeme == "_" => {
                self.advance();
                Ok(Pattern::Wildcard)
            }
            TokenKind::Identifier => {
                self.advance();
                Ok(Pattern::Identifier(token.lexeme.clone()))
            }
            TokenKind::LParen => {
                self.advance();
                let mut elements = Vec::new();
                if !self.check(TokenKind::RParen) {
                    loop {
                        elements.push(self.parse_pattern()?);
                        if !self.matches(TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.consume(TokenKind::RParen, "expected `)` to close tuple pattern")?;
                Ok(Pattern::Tuple(elements))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Ok(Pattern::Literal(Literal::Bool(true)))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Ok(Pattern::Literal(Literal::Bool(false)))
            }
            TokenKind::Keyword(Keyword::None) => {
                self.advance();
                Ok(Pattern::Literal(Literal::None))
            }
            TokenKind::Number => {
                self.advance();
                Ok(Pattern::Literal(self.number_literal(&token)?))
            }
            TokenKind::Minus => {
                self.advance();
                let number = self.consume(TokenKind::Number, "expected number after `-`")?;
                let literal = match self.number_literal(&number)? {
                    Literal::Int(n) => Literal::Int(-n),
                    Literal::Float(n) => Literal::Float(-n),
                    other => other,
                };
                Ok(Pattern::Literal(literal))
            }
            TokenKind::String => {
                self.advance();
                Ok(Pattern::Literal(Literal::String(token.lexeme.clone())))
            }
            _ => Err(self.error(&token, "unexpected token in pattern")),
        }
    }

    fn parse_return(&mut self) -> Result<Stmt, Diagnostic> {
        let token = self.consume_keyword(Keyword::Return)?;
        let value = self.parse_trailing_value()?;
        let end = value.as_ref().map_or(token.span.end, |expr| expr.span.end);
        Ok(stmt(StmtKind::Return(value), token.span.start, end))
    }

    fn parse_break(&mut self) -> Result<Stmt, Diagnostic> {
        let token = self.consume_keyword(Keyword::Break)?;
        let value = self.parse_trailing_value()?;
        let end = value.as_ref().map_or(token.span.end, |expr| expr.span.end);
        Ok(stmt(StmtKind::Break(value), token.span.start, end))
    }

    /// The optional value after `return` or `break`. It is absent when the
    /// statement ends the block, the input, or is followed by `;`.
    fn parse_trailing_value(&mut self) -> Result<Option<Expr>, Diagnostic> {
        let ends_here = matches!(
            self.peek().map(|token| &token.kind),
            None | Some(TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof)
        );
        let value = if ends_here {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume_optional_semicolon();
        Ok(value)
    }

    fn parse_continue(&mut self) -> Result<Stmt, Diagnostic> {
        let token = self.consume_keyword(Keyword::Continue)?;
        self.consume_optional_semicolon();
        Ok(stmt(StmtKind::Continue, token.span.start, token.span.end))
    }

    fn parse_expression_statement(&mut self) -> Result<Stmt, Diagnostic> {
        let expr = self.parse_expression()?;
        self.consume_optional_semicolon();
        let span = expr.span;
        Ok(stmt(StmtKind::Expr(expr), span.start, span.end))
    }

    fn parse_expression(&mut self) -> Result<Expr, Diagnostic> {
        self.parse_assignment()
    }

    /// Assignment is right-associative and only targets names, fields and
    /// indexed elements.
    fn parse_assignment(&mut self) -> Result<Expr, Diagnostic> {
        let target = self.parse_or()?;
        if !self.matches(TokenKind::Assign) {
            return Ok(target);
        }
        let equals = self.previous().span;
        let value = self.parse_assignment()?;
        if !matches!(
            target.kind,
            ExprKind::Variable(_) | ExprKind::Index { .. } | ExprKind::Field { .. }
        ) {
            return Err(
                Diagnostic::new(DiagnosticKind::Parser, "invalid assignment target")
                    .with_span(equals),
            );
        }
        let (start, end) = (target.span.start, value.span.end);
        let kind = ExprKind::Assign {
            target: Box::new(target),
            value: Box::new(value),
        };
        Ok(node(kind, start, end))
    }

    fn parse_or(&mut self) -> Result<Expr, Diagnostic> {
        let mut expr = self.parse_and()?;
        while self.matches(TokenKind::DoublePipe) {
            let right = self.parse_and()?;
            expr = logical(LogicalOp::Or, expr, right);
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<Expr, Diagnostic> {
        let mut expr = self.parse_equality()?;
        while self.matches(TokenKind::DoubleAmpersand) {
            let right = self.parse_equality()?;
            expr = logical(LogicalOp::And, expr, right);
        }
        Ok(expr)
    }

    fn parse_equality(&mut self) -> Result<Expr, Diagnostic> {
        self.parse_binary_level(
            &[
                (TokenKind::EqualEqual, BinaryOp::Equal),
                (TokenKind::BangEqual, BinaryOp::NotEqual),
            ],
            Self::parse_comparison,
        )
    }

    fn parse_comparison(&mut self) -> Result<Expr, Diagnostic> {
        self.parse_binary_level(
            &[
                (TokenKind::LessEqual, BinaryOp::LessEqual),
                (TokenKind::GreaterEqual, BinaryOp::GreaterEqual),
                (TokenKind::Less, BinaryOp::Less),
                (TokenKind::Greater, BinaryOp::Greater),
            ],
            Self::parse_term,
        )
    }

    fn parse_term(&mut self) -> Result<Expr, Diagnostic> {
        self.parse_binary_level(
            &[
                (TokenKind::Plus, BinaryOp::Add),
                (TokenKind::Minus, BinaryOp::Sub),
            ],
            Self::parse_factor,
        )
    }

    fn parse_factor(&mut self) -> Result<Expr, Diagnostic> {
        self.parse_binary_level(
            &[
                (TokenKind::Star, BinaryOp::Mul),
                (TokenKind::Slash, BinaryOp::Div),
                (TokenKind::Percent, BinaryOp::Mod),
            ],
            Self::parse_unary,
        )
    }

    fn parse_binary_level(
        &mut self,
        operators: &[(TokenKind, BinaryOp)],
        operand: fn(&mut Self) -> Result<Expr, Diagnostic>,
    ) -> Result<Expr, Diagnostic> {
        let mut expr = operand(self)?;
        loop {
            let Some(op) = operators
                .iter()
                .find(|(kind, _)| self.peek().is_some_and(|token| &token.kind == kind))
                .map(|(_, op)| op.clone())
            else {
                return Ok(expr);
            };
            self.advance();
            let right = operand(self)?;
            let (start, end) = (expr.span.start, right.span.end);
            expr = node(
                ExprKind::Binary {
                    op,
                    left: Box::new(expr),
                    right: Box::new(right),
                },
                start,
                end,
            );
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, Diagnostic> {
        let op = if self.matches(TokenKind::Minus) {
            UnaryOp::Negate
        } else if self.matches(TokenKind::Bang) {
            UnaryOp::Not
        } else {
            return self.parse_postfix();
        };
        let start = self.previous().span.start;
        let operand = self.parse_unary()?;
        let end = operand.span.end;
        let kind = ExprKind::Unary {
            op,
            expr: Box::new(operand),
        };
        Ok(node(kind, start, end))
    }

    fn parse_postfix(&mut self) -> Result<Expr, Diagnostic> {
        let mut expr = self.parse_primary()?;
        loop {
            let start = expr.span.start;
            expr = if self.matches(TokenKind::LParen) {
                let args = self.parse_list(TokenKind::RParen)?;
                let end = self
                    .consume(TokenKind::RParen, "expected `)` after arguments")?
                    .span
                    .end;
                let kind = ExprKind::Call {
                    callee: Box::new(expr),
                    args,
                };
                node(kind, start, end)
            } else if self.matches(TokenKind::LBracket) {
                let index = self.parse_expression()?;
                let end = self
                    .consume(TokenKind::RBracket, "expected `]` after index")?
                    .span
                    .end;
                let kind = ExprKind::Index {
                    target: Box::new(expr),
                    index: Box::new(index),
                };
                node(kind, start, end)
            } else if self.matches(TokenKind::Dot) {
                let field = self.consume_identifier("expected field after `.`")?;
                let kind = ExprKind::Field {
                    target: Box::new(expr),
                    field: field.lexeme,
                };
                node(kind, start, field.span.end)
            } else {
                return Ok(expr);
            };
        }
    }

    /// Comma separated expressions up to (not including) `terminator`. A
    /// trailing comma is allowed.
    fn parse_list(&mut self, terminator: TokenKind) -> Result<Vec<Expr>, Diagnostic> {
        let mut items = Vec::new();
        while !self.check(terminator.clone()) {
            items.push(self.parse_expression()?);
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        Ok(items)
    }

    fn parse_primary(&mut self) -> Result<Expr, Diagnostic> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.error_eof("unexpected end of expression"));
        };
        let (start, end) = (token.span.start, token.span.end);
        let kind = match token.kind {
            TokenKind::Keyword(Keyword::True) => ExprKind::Literal(Literal::Bool(true)),
            TokenKind::Keyword(Keyword::False) => ExprKind::Literal(Literal::Bool(false)),
            TokenKind::Keyword(Keyword::None) => ExprKind::Literal(Literal::None),
            TokenKind::Keyword(Keyword::This) => ExprKind::This,
            TokenKind::Number => ExprKind::Literal(self.number_literal(&token)?),
            TokenKind::String => ExprKind::Literal(Literal::String(token.lexeme)),
            TokenKind::Identifier => ExprKind::Variable(token.lexeme),
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                let end = self
                    .consume(TokenKind::RParen, "expected `)` after expression")?
                    .span
                    .end;
                return Ok(node(ExprKind::Group(Box::new(inner)), start, end));
            }
            TokenKind::LBracket => {
                self.advance();
                let elements = self.parse_list(TokenKind::RBracket)?;
                let end = self
                    .consume(TokenKind::RBracket, "expected `]` after array literal")?
                    .span
                    .end;
                return Ok(node(ExprKind::ArrayLiteral(elements), start, end));
            }
            TokenKind::LBrace => return self.parse_inline_map(),
            TokenKind::Pipe | TokenKind::DoublePipe => return self.parse_lambda(),
            _ => return Err(self.error(&token, "unexpected token in expression")),
        };
        self.advance();
        Ok(node(kind, start, end))
    }

    fn number_literal(&self, token: &Token) -> Result<Literal, Diagnostic> {
        let digits = token.lexeme.replace('_', "");
        if digits.contains(['.', 'e', 'E']) {
            digits
                .parse()
                .map(Literal::Float)
                .map_err(|_| self.error(token, "invalid float literal"))
        } else {
            digits
                .parse()
                .map(Literal::Int)
                .map_err(|_| self.error(token, "integer literal out of range"))
        }
    }

    fn parse_inline_map(&mut self) -> Result<Expr, Diagnostic> {
        let start = self.advance().span.start;
        let mut entries = Vec::new();
        while !self.check(TokenKind::RBrace) {
            let key = self.parse_map_key()?;
            self.consume(TokenKind::Colon, "expected `:` in map literal")?;
            let value = self.parse_expression()?;
            entries.push((key, value));
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        let end = self
            .consume(TokenKind::RBrace, "expected `}` after map literal")?
            .span
            .end;
        Ok(node(ExprKind::MapLiteral(entries), start, end))
    }

    /// Bare words before `:` are string keys, as in `{ type: "Feature" }`.
    fn parse_map_key(&mut self) -> Result<Expr, Diagnostic> {
        let bare = matches!(
            self.peek().map(|token| &token.kind),
            Some(TokenKind::Identifier | TokenKind::Keyword(_))
        ) && matches!(
            self.tokens.get(self.current + 1).map(|token| &token.kind),
            Some(TokenKind::Colon)
        );
        if bare {
            let token = self.advance();
            return Ok(Expr {
                span: token.span,
                kind: ExprKind::Literal(Literal::String(token.lexeme.clone())),
            });
        }
        self.parse_expression()
    }

    fn parse_lambda(&mut self) -> Result<Expr, Diagnostic> {
        let start = self.peek().map_or(0, |token| token.span.start);
        let params = if self.matches(TokenKind::DoublePipe) {
            Vec::new()
        } else {
            self.consume(TokenKind::Pipe, "expected `|` to start lambda")?;
            let params = self.parse_params(TokenKind::Pipe)?;
            self.consume(TokenKind::Pipe, "expected closing `|` in lambda")?;
            params
        };

        let (body, end, implicit_return) = if self.check(TokenKind::LBrace) {
            let (body, span) = self.parse_block()?;
            (body, span.end, false)
        } else {
            let result = self.parse_expression()?;
            let span = result.span;
            (
                vec![stmt(StmtKind::Expr(result), span.start, span.end)],
                span.end,
                true,
            )
        };
        let kind = ExprKind::Lambda {
            params,
            body,
            implicit_return,
        };
        Ok(node(kind, start, end))
    }

    fn consume_optional_semicolon(&mut self) {
        let _ = self.matches(TokenKind::Semicolon);
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn matches_keyword(&mut self, keyword: Keyword) -> bool {
        self.matches(TokenKind::Keyword(keyword))
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> Result<Token, Diagnostic> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self
                .peek()
                .map(|tok| self.error(tok, message))
                .unwrap_or_else(|| self.error_eof(message)))
        }
    }

    fn consume_keyword(&mut self, keyword: Keyword) -> Result<Token, Diagnostic> {
        let message = format!("expected keyword `{keyword:?}`");
        self.consume(TokenKind::Keyword(keyword), &message)
    }

    fn consume_identifier(&mut self, message: &str) -> Result<Token, Diagnostic> {
        self.consume(TokenKind::Identifier, message)
    }

    fn check(&self, kind: TokenKind) -> bool {
        if let Some(token) = self.peek() {
            token.kind == kind
        } else {
            false
        }
    }

    fn advance(&mut self) -> Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous().clone()
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.current)
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Eof) | None)
    }

    fn error(&self, token: &Token, message: &str) -> Diagnostic {
        let found = match token.kind {
            TokenKind::Eof => "end of input".to_string(),
            _ => format!("`{}`", token.lexeme),
        };
        Diagnostic::new(DiagnosticKind::Parser, format!("{message}, found {found}"))
            .with_span(token.span)
    }

    fn error_eof(&self, message: &str) -> Diagnostic {
        Diagnostic::new(DiagnosticKind::Parser, message.to_string())
    }
}

fn node(kind: ExprKind, start: usize, end: usize) -> Expr {
    Expr {
        kind,
        span: SourceSpan::new(start, end),
    }
}

fn stmt(kind: StmtKind, start: usize, end: usize) -> Stmt {
    Stmt {
        kind,
        span: SourceSpan::new(start, end),
    }
}

fn logical(op: LogicalOp, left: Expr, right: Expr) -> Expr {
    let (start, end) = (left.span.start, right.span.end);
    node(
        ExprKind::Logical {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        start,
        end,
    )
}
