//! Recursive-descent parser over the token stream.
//!
//! A line is parsed twice at most: first as a standalone expression and,
//! only when that fails with a syntax error, as a sequence of statements.

use std::rc::Rc;

use crate::interp::ast::{
    Alias, BinOp, CmpOp, Comprehension, Constant, Expr, FunctionBody, FunctionDef, Index, Param,
    Stmt, Target, UnaryOp,
};
use crate::interp::error::{EvalError, EvalResult};
use crate::interp::lexer::{tokenize, AugOp, Keyword, Token, TokenKind};

/// Deepest bracket/unary nesting accepted before giving up.
const MAX_NESTING: usize = 100;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

/// Parse the whole line as a single expression (comma lists become tuples).
pub fn parse_expression(source: &str) -> EvalResult<Expr> {
    let mut parser = Parser::new(tokenize(source)?);
    let expr = parser.parse_testlist()?;
    parser.expect_end()?;
    Ok(expr)
}

/// Parse the line as one or more statements.
pub fn parse_statements(source: &str) -> EvalResult<Vec<Stmt>> {
    let mut parser = Parser::new(tokenize(source)?);
    parser.parse_program()
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    // ---------------------------------------------------------------------
    // Token helpers
    // ---------------------------------------------------------------------

    fn peek(&self) -> &TokenKind {
        self.tokens
            .get(self.pos)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn peek_at(&self, offset: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        kind
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek() == kind
    }

    fn check_keyword(&self, kw: Keyword) -> bool {
        matches!(self.peek(), TokenKind::Keyword(k) if *k == kw)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, kw: Keyword) -> bool {
        if self.check_keyword(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> EvalResult<()> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn expect_keyword(&mut self, kw: Keyword, what: &str) -> EvalResult<()> {
        if self.eat_keyword(kw) {
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn expect_name(&mut self) -> EvalResult<String> {
        match self.advance() {
            TokenKind::Name(name) => Ok(name),
            _ => {
                self.pos = self.pos.saturating_sub(1);
                Err(self.unexpected("a name"))
            }
        }
    }

    fn expect_end(&self) -> EvalResult<()> {
        if self.check(&TokenKind::Eof) {
            Ok(())
        } else {
            Err(self.unexpected("end of line"))
        }
    }

    fn unexpected(&self, expected: &str) -> EvalError {
        let position = self.tokens.get(self.pos).map(|t| t.position).unwrap_or(0);
        EvalError::syntax(format!(
            "invalid syntax: expected {expected} at position {position}"
        ))
    }

    fn enter(&mut self) -> EvalResult<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(EvalError::syntax("too many nested parentheses"));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn at_statement_end(&self) -> bool {
        matches!(
            self.peek(),
            TokenKind::Eof | TokenKind::Newline | TokenKind::Semicolon
        )
    }

    // ---------------------------------------------------------------------
    // Statements
    // ---------------------------------------------------------------------

    fn parse_program(&mut self) -> EvalResult<Vec<Stmt>> {
        let mut stmts = Vec::new();
        loop {
            while self.eat(&TokenKind::Newline) || self.eat(&TokenKind::Semicolon) {}
            if self.check(&TokenKind::Eof) {
                return Ok(stmts);
            }
            self.parse_statement(&mut stmts)?;
            if !self.at_statement_end() {
                return Err(self.unexpected("end of statement"));
            }
        }
    }

    fn parse_statement(&mut self, out: &mut Vec<Stmt>) -> EvalResult<()> {
        match self.peek() {
            TokenKind::Keyword(Keyword::Def) => out.push(self.parse_def()?),
            TokenKind::Keyword(Keyword::If) => out.push(self.parse_if()?),
            TokenKind::Keyword(Keyword::For) => out.push(self.parse_for()?),
            TokenKind::Keyword(Keyword::While) => out.push(self.parse_while()?),
            _ => {
                out.push(self.parse_simple()?);
                while self.check(&TokenKind::Semicolon) && !self.is_trailing_semicolon() {
                    self.advance();
                    out.push(self.parse_simple()?);
                }
            }
        }
        Ok(())
    }

    fn is_trailing_semicolon(&self) -> bool {
        matches!(self.peek_at(1), TokenKind::Eof | TokenKind::Newline)
    }

    /// Body of a compound statement: simple statements on the same line.
    fn parse_suite(&mut self) -> EvalResult<Vec<Stmt>> {
        self.expect(&TokenKind::Colon, "':'")?;
        if self.at_statement_end() {
            return Err(EvalError::syntax(
                "expected a statement on the same line after ':'",
            ));
        }
        let mut body = vec![self.parse_simple()?];
        while self.check(&TokenKind::Semicolon) && !self.is_trailing_semicolon() {
            self.advance();
            body.push(self.parse_simple()?);
        }
        Ok(body)
    }

    fn parse_def(&mut self) -> EvalResult<Stmt> {
        self.expect_keyword(Keyword::Def, "'def'")?;
        let name = self.expect_name()?;
        self.expect(&TokenKind::LeftParen, "'('")?;
        let params = self.parse_params(&TokenKind::RightParen)?;
        self.expect(&TokenKind::RightParen, "')'")?;
        let body = self.parse_suite()?;
        Ok(Stmt::FunctionDef(Rc::new(FunctionDef {
            name,
            params,
            body: FunctionBody::Block(body),
        })))
    }

    fn parse_params(&mut self, close: &TokenKind) -> EvalResult<Vec<Param>> {
        let mut params: Vec<Param> = Vec::new();
        while !self.check(close) {
            let name = self.expect_name()?;
            if params.iter().any(|p| p.name == name) {
                return Err(EvalError::syntax(format!(
                    "duplicate argument '{name}' in function definition"
                )));
            }
            let default = if self.eat(&TokenKind::Assign) {
                Some(self.parse_expr()?)
            } else {
                if params.iter().any(|p| p.default.is_some()) {
                    return Err(EvalError::syntax(
                        "non-default argument follows default argument",
                    ));
                }
                None
            };
            params.push(Param { name, default });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(params)
    }

    fn parse_if(&mut self) -> EvalResult<Stmt> {
        self.advance();
        let test = self.parse_expr()?;
        let body = self.parse_suite()?;
        let orelse = self.parse_else_clause()?;
        Ok(Stmt::If { test, body, orelse })
    }

    /// `elif`/`else` clauses may follow on the next physical line.
    fn parse_else_clause(&mut self) -> EvalResult<Vec<Stmt>> {
        let mut lookahead = 0;
        while matches!(self.peek_at(lookahead), TokenKind::Newline) {
            lookahead += 1;
        }
        match self.peek_at(lookahead) {
            TokenKind::Keyword(Keyword::Elif) => {
                self.pos += lookahead;
                Ok(vec![self.parse_if()?])
            }
            TokenKind::Keyword(Keyword::Else) => {
                self.pos += lookahead + 1;
                self.parse_suite()
            }
            _ => Ok(Vec::new()),
        }
    }

    fn parse_for(&mut self) -> EvalResult<Stmt> {
        self.advance();
        let target = self.parse_target_list()?;
        self.expect_keyword(Keyword::In, "'in'")?;
        let iter = self.parse_testlist()?;
        let body = self.parse_suite()?;
        Ok(Stmt::For { target, iter, body })
    }

    fn parse_while(&mut self) -> EvalResult<Stmt> {
        self.advance();
        let test = self.parse_expr()?;
        let body = self.parse_suite()?;
        Ok(Stmt::While { test, body })
    }

    fn parse_simple(&mut self) -> EvalResult<Stmt> {
        match self.peek() {
            TokenKind::Keyword(Keyword::Pass) => {
                self.advance();
                Ok(Stmt::Pass)
            }
            TokenKind::Keyword(Keyword::Break) => {
                self.advance();
                Ok(Stmt::Break)
            }
            TokenKind::Keyword(Keyword::Continue) => {
                self.advance();
                Ok(Stmt::Continue)
            }
            TokenKind::Keyword(Keyword::Return) => {
                self.advance();
                if self.at_statement_end() {
                    Ok(Stmt::Return(None))
                } else {
                    Ok(Stmt::Return(Some(self.parse_testlist()?)))
                }
            }
            TokenKind::Keyword(Keyword::Import) => self.parse_import(),
            TokenKind::Keyword(Keyword::From) => self.parse_from_import(),
            TokenKind::Keyword(
                Keyword::Def | Keyword::If | Keyword::For | Keyword::While | Keyword::Elif
                | Keyword::Else,
            ) => Err(EvalError::syntax(
                "compound statements are not allowed here",
            )),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_dotted_name(&mut self) -> EvalResult<String> {
        let mut name = self.expect_name()?;
        while self.eat(&TokenKind::Dot) {
            name.push('.');
            name.push_str(&self.expect_name()?);
        }
        Ok(name)
    }

    fn parse_import(&mut self) -> EvalResult<Stmt> {
        self.advance();
        let mut aliases = Vec::new();
        loop {
            let name = self.parse_dotted_name()?;
            let asname = if self.eat_keyword(Keyword::As) {
                Some(self.expect_name()?)
            } else {
                None
            };
            aliases.push(Alias { name, asname });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(Stmt::Import(aliases))
    }

    fn parse_from_import(&mut self) -> EvalResult<Stmt> {
        self.advance();
        let module = self.parse_dotted_name()?;
        self.expect_keyword(Keyword::Import, "'import'")?;
        if self.eat(&TokenKind::Star) {
            return Ok(Stmt::ImportFrom {
                module,
                names: vec![Alias {
                    name: "*".to_string(),
                    asname: None,
                }],
            });
        }
        let parenthesized = self.eat(&TokenKind::LeftParen);
        let mut names = Vec::new();
        loop {
            let name = self.expect_name()?;
            let asname = if self.eat_keyword(Keyword::As) {
                Some(self.expect_name()?)
            } else {
                None
            };
            names.push(Alias { name, asname });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
            if parenthesized && self.check(&TokenKind::RightParen) {
                break;
            }
        }
        if parenthesized {
            self.expect(&TokenKind::RightParen, "')'")?;
        }
        Ok(Stmt::ImportFrom { module, names })
    }

    fn parse_expression_statement(&mut self) -> EvalResult<Stmt> {
        let first = self.parse_testlist()?;

        if let TokenKind::AugAssign(op) = self.peek().clone() {
            self.advance();
            let target = to_target(first)?;
            if matches!(target, Target::Tuple(_)) {
                return Err(EvalError::syntax(
                    "illegal expression for augmented assignment",
                ));
            }
            let value = self.parse_testlist()?;
            return Ok(Stmt::AugAssign {
                target,
                op: aug_to_binop(op),
                value,
            });
        }

        if !self.check(&TokenKind::Assign) {
            return Ok(Stmt::Expr(first));
        }

        let mut exprs = vec![first];
        while self.eat(&TokenKind::Assign) {
            exprs.push(self.parse_testlist()?);
        }
        let value = exprs.pop().ok_or_else(|| self.unexpected("a value"))?;
        let targets = exprs
            .into_iter()
            .map(to_target)
            .collect::<EvalResult<Vec<_>>>()?;
        Ok(Stmt::Assign { targets, value })
    }

    /// Loop targets stop before `in`, so they are parsed below comparisons.
    fn parse_target_list(&mut self) -> EvalResult<Target> {
        let mut items = vec![self.parse_bitor()?];
        let mut trailing_comma = false;
        while self.eat(&TokenKind::Comma) {
            trailing_comma = true;
            if self.check_keyword(Keyword::In) {
                break;
            }
            items.push(self.parse_bitor()?);
            trailing_comma = false;
        }
        if items.len() == 1 && !trailing_comma {
            to_target(items.remove(0))
        } else {
            to_target(Expr::Tuple(items))
        }
    }

    // ---------------------------------------------------------------------
    // Expressions
    // ---------------------------------------------------------------------

    /// Comma-separated expressions; more than one (or a trailing comma) makes a tuple.
    pub fn parse_testlist(&mut self) -> EvalResult<Expr> {
        let first = self.parse_expr()?;
        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(&TokenKind::Comma) {
            if self.at_expression_end() {
                break;
            }
            items.push(self.parse_expr()?);
        }
        Ok(Expr::Tuple(items))
    }

    fn at_expression_end(&self) -> bool {
        matches!(
            self.peek(),
            TokenKind::Eof
                | TokenKind::Newline
                | TokenKind::Semicolon
                | TokenKind::Assign
                | TokenKind::AugAssign(_)
                | TokenKind::RightParen
                | TokenKind::RightBracket
                | TokenKind::RightBrace
                | TokenKind::Colon
        )
    }

    pub fn parse_expr(&mut self) -> EvalResult<Expr> {
        self.enter()?;
        let result = if self.check_keyword(Keyword::Lambda) {
            self.parse_lambda()
        } else {
            self.parse_conditional()
        };
        self.leave();
        result
    }

    fn parse_lambda(&mut self) -> EvalResult<Expr> {
        self.advance();
        let params = self.parse_params(&TokenKind::Colon)?;
        self.expect(&TokenKind::Colon, "':'")?;
        let body = self.parse_expr()?;
        Ok(Expr::Lambda(Rc::new(FunctionDef {
            name: "<lambda>".to_string(),
            params,
            body: FunctionBody::Expr(body),
        })))
    }

    fn parse_conditional(&mut self) -> EvalResult<Expr> {
        let body = self.parse_or()?;
        if !self.check_keyword(Keyword::If) {
            return Ok(body);
        }
        self.advance();
        let test = self.parse_or()?;
        self.expect_keyword(Keyword::Else, "'else'")?;
        let orelse = self.parse_expr()?;
        Ok(Expr::IfExp {
            test: Box::new(test),
            body: Box::new(body),
            orelse: Box::new(orelse),
        })
    }

    fn parse_or(&mut self) -> EvalResult<Expr> {
        let mut left = self.parse_and()?;
        while self.eat_keyword(Keyword::Or) {
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> EvalResult<Expr> {
        let mut left = self.parse_not()?;
        while self.eat_keyword(Keyword::And) {
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> EvalResult<Expr> {
        if self.eat_keyword(Keyword::Not) {
            self.enter()?;
            let operand = self.parse_not();
            self.leave();
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand?),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> EvalResult<Expr> {
        let left = self.parse_bitor()?;
        let mut comparisons = Vec::new();
        loop {
            let op = match self.peek() {
                TokenKind::EqualEqual => CmpOp::Eq,
                TokenKind::NotEqual => CmpOp::NotEq,
                TokenKind::Less => CmpOp::Lt,
                TokenKind::LessEqual => CmpOp::LtE,
                TokenKind::Greater => CmpOp::Gt,
                TokenKind::GreaterEqual => CmpOp::GtE,
                TokenKind::Keyword(Keyword::In) => CmpOp::In,
                TokenKind::Keyword(Keyword::Not)
                    if matches!(self.peek_at(1), TokenKind::Keyword(Keyword::In)) =>
                {
                    self.advance();
                    CmpOp::NotIn
                }
                TokenKind::Keyword(Keyword::Is) => {
                    if matches!(self.peek_at(1), TokenKind::Keyword(Keyword::Not)) {
                        self.advance();
                        CmpOp::IsNot
                    } else {
                        CmpOp::Is
                    }
                }
                _ => break,
            };
            self.advance();
            comparisons.push((op, self.parse_bitor()?));
        }
        if comparisons.is_empty() {
            Ok(left)
        } else {
            Ok(Expr::Compare {
                left: Box::new(left),
                comparisons,
            })
        }
    }

    fn parse_binary_level(
        &mut self,
        next: fn(&mut Self) -> EvalResult<Expr>,
        table: &[(TokenKind, BinOp)],
    ) -> EvalResult<Expr> {
        let mut left = next(self)?;
        'outer: loop {
            for (token, op) in table {
                if self.check(token) {
                    self.advance();
                    let right = next(self)?;
                    left = Expr::Binary {
                        op: *op,
                        left: Box::new(left),
                        right: Box::new(right),
                    };
                    continue 'outer;
                }
            }
            return Ok(left);
        }
    }

    fn parse_bitor(&mut self) -> EvalResult<Expr> {
        self.parse_binary_level(Self::parse_bitxor, &[(TokenKind::Pipe, BinOp::BitOr)])
    }

    fn parse_bitxor(&mut self) -> EvalResult<Expr> {
        self.parse_binary_level(Self::parse_bitand, &[(TokenKind::Caret, BinOp::BitXor)])
    }

    fn parse_bitand(&mut self) -> EvalResult<Expr> {
        self.parse_binary_level(Self::parse_shift, &[(TokenKind::Amp, BinOp::BitAnd)])
    }

    fn parse_shift(&mut self) -> EvalResult<Expr> {
        self.parse_binary_level(
            Self::parse_arith,
            &[
                (TokenKind::LeftShift, BinOp::LeftShift),
                (TokenKind::RightShift, BinOp::RightShift),
            ],
        )
    }

    fn parse_arith(&mut self) -> EvalResult<Expr> {
        self.parse_binary_level(
            Self::parse_term,
            &[(TokenKind::Plus, BinOp::Add), (TokenKind::Minus, BinOp::Sub)],
        )
    }

    fn parse_term(&mut self) -> EvalResult<Expr> {
        self.parse_binary_level(
            Self::parse_factor,
            &[
                (TokenKind::Star, BinOp::Mul),
                (TokenKind::Slash, BinOp::Div),
                (TokenKind::DoubleSlash, BinOp::FloorDiv),
                (TokenKind::Percent, BinOp::Mod),
            ],
        )
    }

    fn parse_factor(&mut self) -> EvalResult<Expr> {
        let op = match self.peek() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Pos,
            TokenKind::Tilde => UnaryOp::Invert,
            _ => return self.parse_power(),
        };
        self.advance();
        self.enter()?;
        let operand = self.parse_factor();
        self.leave();
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand?),
        })
    }

    fn parse_power(&mut self) -> EvalResult<Expr> {
        let base = self.parse_primary()?;
        if self.eat(&TokenKind::DoubleStar) {
            // Right-associative, and binds tighter than unary minus on the left only.
            self.enter()?;
            let exponent = self.parse_factor();
            self.leave();
            return Ok(Expr::Binary {
                op: BinOp::Pow,
                left: Box::new(base),
                right: Box::new(exponent?),
            });
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> EvalResult<Expr> {
        let mut expr = self.parse_atom()?;
        loop {
            match self.peek() {
                TokenKind::LeftParen => {
                    self.advance();
                    let (args, keywords) = self.parse_call_args()?;
                    self.expect(&TokenKind::RightParen, "')'")?;
                    expr = Expr::Call {
                        func: Box::new(expr),
                        args,
                        keywords,
                    };
                }
                TokenKind::LeftBracket => {
                    self.advance();
                    let index = self.parse_subscript()?;
                    self.expect(&TokenKind::RightBracket, "']'")?;
                    expr = Expr::Subscript {
                        value: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                TokenKind::Dot => {
                    self.advance();
                    let attr = self.expect_name()?;
                    expr = Expr::Attribute {
                        value: Box::new(expr),
                        attr,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_call_args(&mut self) -> EvalResult<(Vec<Expr>, Vec<(String, Expr)>)> {
        let mut args = Vec::new();
        let mut keywords: Vec<(String, Expr)> = Vec::new();
        while !self.check(&TokenKind::RightParen) {
            if let (TokenKind::Name(name), TokenKind::Assign) = (self.peek(), self.peek_at(1)) {
                let name = name.clone();
                self.advance();
                self.advance();
                if keywords.iter().any(|(k, _)| *k == name) {
                    return Err(EvalError::syntax(format!(
                        "keyword argument repeated: {name}"
                    )));
                }
                keywords.push((name, self.parse_expr()?));
            } else {
                if !keywords.is_empty() {
                    return Err(EvalError::syntax(
                        "positional argument follows keyword argument",
                    ));
                }
                let arg = self.parse_expr()?;
                if self.check_keyword(Keyword::For) {
                    // Bare generator argument: `sum(x for x in xs)`.
                    let generators = self.parse_comprehension_clauses()?;
                    args.push(Expr::ListComp {
                        element: Box::new(arg),
                        generators,
                    });
                } else {
                    args.push(arg);
                }
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok((args, keywords))
    }

    fn parse_subscript(&mut self) -> EvalResult<Index> {
        let lower = if self.check(&TokenKind::Colon) {
            None
        } else {
            let first = self.parse_testlist()?;
            if !self.check(&TokenKind::Colon) {
                return Ok(Index::Single(first));
            }
            Some(first)
        };
        self.expect(&TokenKind::Colon, "':'")?;
        let upper = if matches!(self.peek(), TokenKind::Colon | TokenKind::RightBracket) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        let step = if self.eat(&TokenKind::Colon) && !self.check(&TokenKind::RightBracket) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        Ok(Index::Slice { lower, upper, step })
    }

    fn parse_comprehension_clauses(&mut self) -> EvalResult<Vec<Comprehension>> {
        let mut generators = Vec::new();
        while self.eat_keyword(Keyword::For) {
            let target = self.parse_target_list()?;
            self.expect_keyword(Keyword::In, "'in'")?;
            let iter = self.parse_or()?;
            let mut conditions = Vec::new();
            while self.eat_keyword(Keyword::If) {
                conditions.push(self.parse_or()?);
            }
            generators.push(Comprehension {
                target,
                iter,
                conditions,
            });
        }
        Ok(generators)
    }

    fn parse_atom(&mut self) -> EvalResult<Expr> {
        let expr = match self.advance() {
            TokenKind::Int(v) => Expr::Constant(Constant::Int(v)),
            TokenKind::Float(v) => Expr::Constant(Constant::Float(v)),
            TokenKind::Imaginary(v) => Expr::Constant(Constant::Imaginary(v)),
            TokenKind::Str(first) => {
                let mut text = first;
                while let TokenKind::Str(next) = self.peek() {
                    text.push_str(next);
                    self.advance();
                }
                Expr::Constant(Constant::Str(Rc::from(text)))
            }
            TokenKind::Name(name) => Expr::Name(name),
            TokenKind::Keyword(Keyword::True) => Expr::Constant(Constant::Bool(true)),
            TokenKind::Keyword(Keyword::False) => Expr::Constant(Constant::Bool(false)),
            TokenKind::Keyword(Keyword::None) => Expr::Constant(Constant::None),
            TokenKind::LeftParen => {
                self.enter()?;
                let inner = self.parse_paren_body();
                self.leave();
                inner?
            }
            TokenKind::LeftBracket => {
                self.enter()?;
                let inner = self.parse_list_body();
                self.leave();
                inner?
            }
            TokenKind::LeftBrace => {
                self.enter()?;
                let inner = self.parse_dict_body();
                self.leave();
                inner?
            }
            _ => {
                self.pos = self.pos.saturating_sub(1);
                return Err(self.unexpected("an expression"));
            }
        };
        Ok(expr)
    }

    fn parse_paren_body(&mut self) -> EvalResult<Expr> {
        if self.eat(&TokenKind::RightParen) {
            return Ok(Expr::Tuple(Vec::new()));
        }
        let first = self.parse_expr()?;
        if self.check_keyword(Keyword::For) {
            let generators = self.parse_comprehension_clauses()?;
            self.expect(&TokenKind::RightParen, "')'")?;
            return Ok(Expr::ListComp {
                element: Box::new(first),
                generators,
            });
        }
        if self.eat(&TokenKind::RightParen) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(&TokenKind::Comma) {
            if self.check(&TokenKind::RightParen) {
                break;
            }
            items.push(self.parse_expr()?);
        }
        self.expect(&TokenKind::RightParen, "')'")?;
        Ok(Expr::Tuple(items))
    }

    fn parse_list_body(&mut self) -> EvalResult<Expr> {
        if self.eat(&TokenKind::RightBracket) {
            return Ok(Expr::List(Vec::new()));
        }
        let first = self.parse_expr()?;
        if self.check_keyword(Keyword::For) {
            let generators = self.parse_comprehension_clauses()?;
            self.expect(&TokenKind::RightBracket, "']'")?;
            return Ok(Expr::ListComp {
                element: Box::new(first),
                generators,
            });
        }
        let mut items = vec![first];
        while self.eat(&TokenKind::Comma) {
            if self.check(&TokenKind::RightBracket) {
                break;
            }
            items.push(self.parse_expr()?);
        }
        self.expect(&TokenKind::RightBracket, "']'")?;
        Ok(Expr::List(items))
    }

    fn parse_dict_body(&mut self) -> EvalResult<Expr> {
        let mut entries = Vec::new();
        while !self.check(&TokenKind::RightBrace) {
            let key = self.parse_expr()?;
            if !self.eat(&TokenKind::Colon) {
                return Err(EvalError::syntax("set displays are not supported"));
            }
            let value = self.parse_expr()?;
            entries.push((key, value));
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RightBrace, "'}'")?;
        Ok(Expr::Dict(entries))
    }
}

fn aug_to_binop(op: AugOp) -> BinOp {
    match op {
        AugOp::Add => BinOp::Add,
        AugOp::Sub => BinOp::Sub,
        AugOp::Mul => BinOp::Mul,
        AugOp::Div => BinOp::Div,
        AugOp::FloorDiv => BinOp::FloorDiv,
        AugOp::Mod => BinOp::Mod,
        AugOp::Pow => BinOp::Pow,
    }
}

fn to_target(expr: Expr) -> EvalResult<Target> {
    match expr {
        Expr::Name(name) => Ok(Target::Name(name)),
        Expr::Tuple(items) | Expr::List(items) => Ok(Target::Tuple(
            items.into_iter().map(to_target).collect::<EvalResult<_>>()?,
        )),
        Expr::Subscript { value, index } => Ok(Target::Subscript {
            value: *value,
            index: *index,
        }),
        Expr::Attribute { value, attr } => Ok(Target::Attribute {
            value: *value,
            attr,
        }),
        Expr::Call { .. } => Err(EvalError::syntax("cannot assign to function call")),
        Expr::Constant(_) => Err(EvalError::syntax("cannot assign to literal")),
        _ => Err(EvalError::syntax("cannot assign to expression")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assignment_is_not_an_expression() {
        let err = parse_expression("x = 5").unwrap_err();
        assert!(err.is_syntax());
        let stmts = parse_statements("x = 5").unwrap();
        assert!(matches!(&stmts[0], Stmt::Assign { targets, .. } if targets.len() == 1));
    }

    #[test]
    fn test_power_binds_tighter_than_unary_minus() {
        let expr = parse_expression("-2 ** 2").unwrap();
        assert!(matches!(
            expr,
            Expr::Unary {
                op: UnaryOp::Neg,
                ..
            }
        ));
    }

    #[test]
    fn test_chained_comparison() {
        let expr = parse_expression("1 < x <= 3").unwrap();
        match expr {
            Expr::Compare { comparisons, .. } => assert_eq!(comparisons.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_one_line_compound_statements() {
        let stmts = parse_statements("for i in range(3): total += i; count += 1").unwrap();
        match &stmts[0] {
            Stmt::For { body, .. } => assert_eq!(body.len(), 2),
            other => panic!("unexpected {other:?}"),
        }

        let stmts = parse_statements("def sq(x, p=2): return x ** p").unwrap();
        assert!(matches!(&stmts[0], Stmt::FunctionDef(def) if def.params.len() == 2));
    }

    #[test]
    fn test_if_with_else_on_next_line() {
        let stmts = parse_statements("if x: y = 1\nelse: y = 2").unwrap();
        match &stmts[0] {
            Stmt::If { orelse, .. } => assert_eq!(orelse.len(), 1),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_imports() {
        let stmts = parse_statements("import numpy as np, math").unwrap();
        match &stmts[0] {
            Stmt::Import(aliases) => {
                assert_eq!(aliases[0].name, "numpy");
                assert_eq!(aliases[0].asname.as_deref(), Some("np"));
                assert_eq!(aliases[1].name, "math");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            &parse_statements("from math import sqrt, pi as PI").unwrap()[0],
            Stmt::ImportFrom { names, .. } if names.len() == 2
        ));
    }

    #[test]
    fn test_comprehension_and_generator_argument() {
        assert!(matches!(
            parse_expression("[x * x for x in range(5) if x % 2]").unwrap(),
            Expr::ListComp { .. }
        ));
        match parse_expression("sum(x for x in xs)").unwrap() {
            Expr::Call { args, .. } => assert!(matches!(args[0], Expr::ListComp { .. })),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_slices() {
        match parse_expression("xs[1:]").unwrap() {
            Expr::Subscript { index, .. } => assert!(matches!(
                *index,
                Index::Slice {
                    lower: Some(_),
                    upper: None,
                    step: None
                }
            )),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}1{}", "(".repeat(500), ")".repeat(500));
        let err = parse_expression(&deep).unwrap_err();
        assert!(err.message.contains("nested"));
    }

    #[test]
    fn test_invalid_targets() {
        assert!(parse_statements("f() = 1").is_err());
        assert!(parse_statements("1 = x").is_err());
    }
}
