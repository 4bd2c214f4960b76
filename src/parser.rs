use crate::ast::{
    BinaryOp, Decl, Expr, ForInit, FunctionDecl, ModuleDecl, ModuleKind, Param, Primitive,
    Program, RecordDecl, RecordKind, RecordMember, Stmt, TypeNode, UnaryOp, VarDecl,
};
use crate::diagnostics::{Diagnostics, ParseError};
use crate::libc_abi::registry::lookup_libc_name;
use crate::token::{SourcePos, Token, TokenKind};

/// Recursive-descent parser with Pratt-style precedence for binary
/// expressions (`spec.md` §4.2). Holds one token of lookahead plus the
/// ability to peek a second token for the function-pointer declarator case.
pub struct Parser<'file> {
    tokens: Vec<Token<'file>>,
    cursor: usize,
    diagnostics: Diagnostics,
}

type PResult<T> = Result<T, ParseError>;

impl<'file> Parser<'file> {
    #[must_use]
    pub fn new(tokens: Vec<Token<'file>>, warnings_as_errors: bool) -> Self {
        Self {
            tokens,
            cursor: 0,
            diagnostics: Diagnostics::new(warnings_as_errors),
        }
    }

    /// Parses the whole token stream into a translation unit, recording
    /// recoverable errors along the way (`spec.md` §4.2 "Error recovery").
    pub fn parse_program(mut self) -> (Option<Program<'file>>, Diagnostics) {
        let mut program = Program::new();
        while !self.at(TokenKind::Eof) {
            match self.parse_top_level_decl() {
                Ok(Some(decl)) => program.declarations.push(decl),
                Ok(None) => {}
                Err(ParseError::UnexpectedEof { .. }) => {
                    if program.declarations.is_empty() {
                        return (None, self.diagnostics);
                    }
                    break;
                }
            }
        }
        (Some(program), self.diagnostics)
    }

    // --- token cursor -----------------------------------------------

    fn peek(&self) -> &Token<'file> {
        &self.tokens[self.cursor.min(self.tokens.len() - 1)]
    }

    fn peek_at(&self, ahead: usize) -> &Token<'file> {
        let idx = (self.cursor + ahead).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn advance(&mut self) -> Token<'file> {
        let tok = self.tokens[self.cursor.min(self.tokens.len() - 1)].clone();
        if self.cursor < self.tokens.len() - 1 {
            self.cursor += 1;
        }
        tok
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, context: &'static str) -> PResult<Token<'file>> {
        if self.at(kind) {
            Ok(self.advance())
        } else if self.at(TokenKind::Eof) {
            Err(ParseError::UnexpectedEof {
                context,
                pos: self.peek().pos.to_string(),
            })
        } else {
            let tok = self.peek().clone();
            self.diagnostics.error(
                tok.pos,
                format!(
                    "unexpected token {:?} ({:?}) while parsing {context}",
                    tok.kind,
                    tok.text()
                ),
            );
            Ok(tok)
        }
    }

    /// Skip forward to the next token that can begin a declaration or a
    /// `;`, whichever comes first (`spec.md` §4.2 "Error recovery").
    fn recover(&mut self) {
        loop {
            if self.at(TokenKind::Eof) {
                return;
            }
            if self.peek().kind.begins_declaration() {
                return;
            }
            if self.at(TokenKind::Semicolon) {
                self.advance();
                return;
            }
            self.advance();
        }
    }

    // --- top level ----------------------------------------------------

    fn parse_top_level_decl(&mut self) -> PResult<Option<Decl<'file>>> {
        let start = self.peek().pos;
        match self.peek().kind {
            TokenKind::Struct | TokenKind::Union | TokenKind::Enum => {
                self.parse_record_decl().map(|r| Some(Decl::Record(r)))
            }
            TokenKind::Module | TokenKind::Import | TokenKind::Export => {
                self.parse_module_decl().map(|m| Some(Decl::Module(m)))
            }
            k if k.begins_declaration() => self.parse_declarator_decl(),
            TokenKind::Eof => Err(ParseError::UnexpectedEof {
                context: "top-level declaration",
                pos: start.to_string(),
            }),
            _ => {
                let tok = self.peek().clone();
                self.diagnostics.error(
                    tok.pos,
                    format!("expected a declaration, found {:?}", tok.kind),
                );
                self.recover();
                Ok(None)
            }
        }
    }

    fn parse_module_decl(&mut self) -> PResult<ModuleDecl<'file>> {
        let start = self.peek().pos;
        let kind = match self.advance().kind {
            TokenKind::Module => ModuleKind::Module,
            TokenKind::Import => ModuleKind::Import,
            _ => ModuleKind::Export,
        };
        let name_tok = self.expect(TokenKind::Identifier, "module declaration name")?;
        let name = name_tok.text().to_string();
        let path = if self.eat(TokenKind::From) {
            let path_tok = self.expect(TokenKind::StringLiteral, "module path")?;
            Some(decode_string_literal(path_tok.text()))
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        } else {
            None
        };
        self.expect(TokenKind::Semicolon, "module declaration")?;
        Ok(ModuleDecl {
            kind,
            name,
            path,
            pos: start,
        })
    }

    fn parse_record_decl(&mut self) -> PResult<RecordDecl<'file>> {
        let start = self.peek().pos;
        let kind = match self.advance().kind {
            TokenKind::Struct => RecordKind::Struct,
            TokenKind::Union => RecordKind::Union,
            _ => RecordKind::Enum,
        };
        let tag = if self.at(TokenKind::Identifier) {
            Some(self.advance().text().to_string())
        } else {
            None
        };
        let mut members = Vec::new();
        if self.eat(TokenKind::LBrace) {
            while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
                let member_pos = self.peek().pos;
                let type_node = self.parse_type_specifier()?;
                let type_node = self.parse_pointer_stars(type_node);
                let name_tok = self.expect(TokenKind::Identifier, "record member")?;
                self.expect(TokenKind::Semicolon, "record member")?;
                members.push(RecordMember {
                    name: name_tok.text().to_string(),
                    type_node,
                    pos: member_pos,
                });
            }
            self.expect(TokenKind::RBrace, "record declaration")?;
        }
        self.expect(TokenKind::Semicolon, "record declaration")?;
        Ok(RecordDecl {
            kind,
            tag,
            members,
            pos: start,
        })
    }

    /// `<type-specifier> <pointer-stars>* <identifier> [...]`, branching on
    /// what follows the identifier (`spec.md` §4.2 "Declaration parsing").
    fn parse_declarator_decl(&mut self) -> PResult<Option<Decl<'file>>> {
        let start = self.peek().pos;
        let base_type = self.parse_type_specifier()?;
        let type_node = self.parse_pointer_stars(base_type);
        let name_tok = self.expect(TokenKind::Identifier, "declarator")?;
        let name = name_tok.text().to_string();

        if self.at(TokenKind::LParen) {
            return self
                .parse_function_tail(name, type_node, start)
                .map(|f| Some(Decl::Function(f)));
        }

        let type_node = self.parse_array_suffix(type_node)?;
        let initializer = if self.eat(TokenKind::Assign) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon, "variable declaration")?;
        Ok(Some(Decl::Variable(VarDecl {
            name,
            type_node,
            initializer,
            pos: start,
        })))
    }

    fn parse_function_tail(
        &mut self,
        name: String,
        return_type: TypeNode<'file>,
        start: SourcePos<'file>,
    ) -> PResult<FunctionDecl<'file>> {
        self.expect(TokenKind::LParen, "function parameter list")?;
        let mut params = Vec::new();
        if !self.at(TokenKind::RParen) {
            loop {
                let param_pos = self.peek().pos;
                if self.at(TokenKind::Void) && self.peek_at(1).kind == TokenKind::RParen {
                    self.advance();
                    break;
                }
                let base = self.parse_type_specifier()?;
                let type_node = self.parse_pointer_stars(base);
                let name = if self.at(TokenKind::Identifier) {
                    Some(self.advance().text().to_string())
                } else {
                    None
                };
                let type_node = self.parse_array_suffix(type_node)?;
                params.push(Param {
                    name,
                    type_node,
                    pos: param_pos,
                });
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "function parameter list")?;

        let body = if self.at(TokenKind::LBrace) {
            Some(self.parse_compound_stmt()?)
        } else {
            self.expect(TokenKind::Semicolon, "function prototype")?;
            None
        };

        Ok(FunctionDecl {
            name,
            return_type,
            params,
            body,
            pos: start,
        })
    }

    fn parse_type_specifier(&mut self) -> PResult<TypeNode<'file>> {
        while matches!(
            self.peek().kind,
            TokenKind::Const | TokenKind::Volatile | TokenKind::Static | TokenKind::Extern
        ) {
            self.advance();
        }

        let prim = match self.peek().kind {
            TokenKind::Void => Primitive::Void,
            TokenKind::Char => Primitive::Char,
            TokenKind::Short => Primitive::Short,
            TokenKind::Int => Primitive::Int,
            TokenKind::Long => Primitive::Long,
            TokenKind::Float => Primitive::Float,
            TokenKind::Double => Primitive::Double,
            TokenKind::Signed => Primitive::Signed,
            TokenKind::Unsigned => Primitive::Unsigned,
            TokenKind::Struct | TokenKind::Union | TokenKind::Enum => {
                self.advance();
                if self.at(TokenKind::Identifier) {
                    self.advance();
                }
                return Ok(TypeNode::Primitive(Primitive::Int));
            }
            _ => {
                let tok = self.peek().clone();
                self.diagnostics
                    .error(tok.pos, format!("expected a type specifier, found {:?}", tok.kind));
                Primitive::Int
            }
        };
        self.advance();

        // swallow extra specifiers (`unsigned long`, `long long`, etc.)
        while matches!(
            self.peek().kind,
            TokenKind::Void
                | TokenKind::Char
                | TokenKind::Short
                | TokenKind::Int
                | TokenKind::Long
                | TokenKind::Float
                | TokenKind::Double
                | TokenKind::Signed
                | TokenKind::Unsigned
                | TokenKind::Const
                | TokenKind::Volatile
        ) {
            self.advance();
        }
        Ok(TypeNode::Primitive(prim))
    }

    fn parse_pointer_stars(&mut self, base: TypeNode<'file>) -> TypeNode<'file> {
        let mut depth = 0;
        while self.eat(TokenKind::Star) {
            depth += 1;
        }
        if depth == 0 {
            base
        } else {
            TypeNode::PointerTo {
                base: Box::new(base),
                depth,
            }
        }
    }

    fn parse_array_suffix(&mut self, element: TypeNode<'file>) -> PResult<TypeNode<'file>> {
        if !self.at(TokenKind::LBracket) {
            return Ok(element);
        }
        let mut dimensions = Vec::new();
        while self.eat(TokenKind::LBracket) {
            let size = if self.at(TokenKind::RBracket) {
                None
            } else {
                Some(Box::new(self.parse_expr()?))
            };
            self.expect(TokenKind::RBracket, "array declarator")?;
            dimensions.push(size);
        }
        let size = dimensions.first().cloned().flatten();
        Ok(TypeNode::ArrayOf {
            element: Box::new(element),
            size,
            dimensions,
        })
    }

    // --- statements -----------------------------------------------------

    fn parse_stmt(&mut self) -> PResult<Stmt<'file>> {
        let start = self.peek().pos;
        match self.peek().kind {
            TokenKind::LBrace => self.parse_compound_stmt(),
            TokenKind::If => self.parse_if_stmt(),
            TokenKind::While => self.parse_while_stmt(),
            TokenKind::For => self.parse_for_stmt(),
            TokenKind::Return => {
                self.advance();
                let value = if self.at(TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect(TokenKind::Semicolon, "return statement")?;
                Ok(Stmt::Return { value, pos: start })
            }
            TokenKind::Break => {
                self.advance();
                self.expect(TokenKind::Semicolon, "break statement")?;
                Ok(Stmt::Break { pos: start })
            }
            TokenKind::Continue => {
                self.advance();
                self.expect(TokenKind::Semicolon, "continue statement")?;
                Ok(Stmt::Continue { pos: start })
            }
            k if k.begins_declaration() && !matches!(k, TokenKind::Module | TokenKind::Import | TokenKind::Export) => {
                Ok(Stmt::VarDecl(self.parse_local_var_decl()?))
            }
            _ => {
                let expr = self.parse_expr()?;
                self.expect(TokenKind::Semicolon, "expression statement")?;
                Ok(Stmt::ExprStmt { expr, pos: start })
            }
        }
    }

    fn parse_local_var_decl(&mut self) -> PResult<VarDecl<'file>> {
        let start = self.peek().pos;
        let base = self.parse_type_specifier()?;
        let type_node = self.parse_pointer_stars(base);
        let name_tok = self.expect(TokenKind::Identifier, "local variable declaration")?;
        let type_node = self.parse_array_suffix(type_node)?;
        let initializer = if self.eat(TokenKind::Assign) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon, "local variable declaration")?;
        Ok(VarDecl {
            name: name_tok.text().to_string(),
            type_node,
            initializer,
            pos: start,
        })
    }

    fn parse_compound_stmt(&mut self) -> PResult<Stmt<'file>> {
        let start = self.peek().pos;
        self.expect(TokenKind::LBrace, "compound statement")?;
        let mut statements = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            match self.parse_stmt() {
                Ok(stmt) => statements.push(stmt),
                Err(e) => return Err(e),
            }
        }
        self.expect(TokenKind::RBrace, "compound statement")?;
        Ok(Stmt::Compound { statements, pos: start })
    }

    fn parse_if_stmt(&mut self) -> PResult<Stmt<'file>> {
        let start = self.peek().pos;
        self.advance();
        self.expect(TokenKind::LParen, "if condition")?;
        let condition = self.parse_expr()?;
        self.expect(TokenKind::RParen, "if condition")?;
        let then_branch = Box::new(self.parse_stmt()?);
        let else_branch = if self.eat(TokenKind::Else) {
            Some(Box::new(self.parse_stmt()?))
        } else {
            None
        };
        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
            pos: start,
        })
    }

    fn parse_while_stmt(&mut self) -> PResult<Stmt<'file>> {
        let start = self.peek().pos;
        self.advance();
        self.expect(TokenKind::LParen, "while condition")?;
        let condition = self.parse_expr()?;
        self.expect(TokenKind::RParen, "while condition")?;
        let body = Box::new(self.parse_stmt()?);
        Ok(Stmt::While {
            condition,
            body,
            pos: start,
        })
    }

    fn parse_for_stmt(&mut self) -> PResult<Stmt<'file>> {
        let start = self.peek().pos;
        self.advance();
        self.expect(TokenKind::LParen, "for clause")?;

        let init = if self.at(TokenKind::Semicolon) {
            self.advance();
            None
        } else if self.peek().kind.begins_declaration() {
            let decl = self.parse_local_var_decl()?;
            Some(Box::new(ForInit::Decl(decl)))
        } else {
            let expr = self.parse_expr()?;
            self.expect(TokenKind::Semicolon, "for-loop init")?;
            Some(Box::new(ForInit::Expr(expr)))
        };

        let condition = if self.at(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(TokenKind::Semicolon, "for-loop condition")?;

        let increment = if self.at(TokenKind::RParen) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(TokenKind::RParen, "for clause")?;

        let body = Box::new(self.parse_stmt()?);
        Ok(Stmt::For {
            init,
            condition,
            increment,
            body,
            pos: start,
        })
    }

    // --- expressions: Pratt precedence climbing --------------------------
    //
    // Precedence table from `spec.md` §4.2. All operators left-associative
    // except the assignment family (right-associative).

    fn parse_expr(&mut self) -> PResult<Expr<'file>> {
        self.parse_binary_expr(0)
    }

    fn parse_binary_expr(&mut self, min_prec: u8) -> PResult<Expr<'file>> {
        let mut left = self.parse_unary_expr()?;
        loop {
            let Some((op, prec, right_assoc)) = binary_op_for(self.peek().kind) else {
                break;
            };
            if prec < min_prec {
                break;
            }
            let pos = self.peek().pos;
            self.advance();
            let next_min = if right_assoc { prec } else { prec + 1 };
            let right = self.parse_binary_expr(next_min)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                pos,
            };
        }
        Ok(left)
    }

    fn parse_unary_expr(&mut self) -> PResult<Expr<'file>> {
        let pos = self.peek().pos;
        let op = match self.peek().kind {
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Not => Some(UnaryOp::Not),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            TokenKind::Star => Some(UnaryOp::Deref),
            TokenKind::Amp => Some(UnaryOp::AddrOf),
            TokenKind::Inc => Some(UnaryOp::PreInc),
            TokenKind::Dec => Some(UnaryOp::PreDec),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = Box::new(self.parse_unary_expr()?);
            return Ok(Expr::Unary { op, operand, pos });
        }
        self.parse_postfix_expr()
    }

    fn parse_postfix_expr(&mut self) -> PResult<Expr<'file>> {
        let mut expr = self.parse_primary_expr()?;
        loop {
            let pos = self.peek().pos;
            match self.peek().kind {
                TokenKind::LParen => {
                    self.advance();
                    let mut args = Vec::new();
                    if !self.at(TokenKind::RParen) {
                        loop {
                            args.push(self.parse_expr()?);
                            if !self.eat(TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(TokenKind::RParen, "call argument list")?;
                    let (is_libc, libc_call_id) = match &expr {
                        Expr::Identifier { name, .. } => match lookup_libc_name(name) {
                            Some(id) => (true, id as u16),
                            None => (false, 0),
                        },
                        _ => (false, 0),
                    };
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                        is_libc,
                        libc_call_id,
                        pos,
                    };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect(TokenKind::RBracket, "array subscript")?;
                    expr = Expr::Subscript {
                        array: Box::new(expr),
                        index: Box::new(index),
                        pos,
                    };
                }
                TokenKind::Dot => {
                    self.advance();
                    let member = self.expect(TokenKind::Identifier, "member access")?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        member: member.text().to_string(),
                        pos,
                    };
                }
                TokenKind::Arrow => {
                    self.advance();
                    let member = self.expect(TokenKind::Identifier, "arrow member access")?;
                    expr = Expr::ArrowMember {
                        pointer: Box::new(expr),
                        member: member.text().to_string(),
                        pos,
                    };
                }
                TokenKind::Inc => {
                    self.advance();
                    expr = Expr::Unary {
                        op: UnaryOp::PostInc,
                        operand: Box::new(expr),
                        pos,
                    };
                }
                TokenKind::Dec => {
                    self.advance();
                    expr = Expr::Unary {
                        op: UnaryOp::PostDec,
                        operand: Box::new(expr),
                        pos,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary_expr(&mut self) -> PResult<Expr<'file>> {
        let pos = self.peek().pos;
        match self.peek().kind {
            TokenKind::IntLiteral => {
                let tok = self.advance();
                let value = parse_int_literal(tok.text());
                Ok(Expr::IntConst { value, pos })
            }
            TokenKind::FloatLiteral => {
                let tok = self.advance();
                let value = parse_float_literal(tok.text());
                Ok(Expr::FloatConst { value, pos })
            }
            TokenKind::StringLiteral => {
                let tok = self.advance();
                Ok(Expr::StringLit {
                    value: decode_string_literal(tok.text()),
                    pos,
                })
            }
            TokenKind::CharLiteral => {
                let tok = self.advance();
                let bytes = decode_string_literal(tok.text());
                let value = i64::from(*bytes.first().unwrap_or(&0));
                Ok(Expr::IntConst { value, pos })
            }
            TokenKind::Identifier => {
                let tok = self.advance();
                Ok(Expr::Identifier {
                    name: tok.text().to_string(),
                    pos,
                })
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen, "parenthesized expression")?;
                Ok(inner)
            }
            TokenKind::LBrace => {
                self.advance();
                let mut elements = Vec::new();
                if !self.at(TokenKind::RBrace) {
                    loop {
                        elements.push(self.parse_expr()?);
                        if !self.eat(TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RBrace, "compound literal")?;
                Ok(Expr::CompoundLiteral { elements, pos })
            }
            TokenKind::Eof => Err(ParseError::UnexpectedEof {
                context: "expression",
                pos: pos.to_string(),
            }),
            _ => {
                let tok = self.peek().clone();
                self.diagnostics.error(
                    tok.pos,
                    format!("expected an expression, found {:?}", tok.kind),
                );
                self.advance();
                Ok(Expr::IntConst { value: 0, pos })
            }
        }
    }
}

fn binary_op_for(kind: TokenKind) -> Option<(BinaryOp, u8, bool)> {
    use TokenKind as K;
    Some(match kind {
        K::Star => (BinaryOp::Mul, 13, false),
        K::Slash => (BinaryOp::Div, 13, false),
        K::Percent => (BinaryOp::Mod, 13, false),
        K::Plus => (BinaryOp::Add, 12, false),
        K::Minus => (BinaryOp::Sub, 12, false),
        K::Shl => (BinaryOp::Shl, 11, false),
        K::Shr => (BinaryOp::Shr, 11, false),
        K::Lt => (BinaryOp::Lt, 10, false),
        K::Le => (BinaryOp::Le, 10, false),
        K::Gt => (BinaryOp::Gt, 10, false),
        K::Ge => (BinaryOp::Ge, 10, false),
        K::Eq => (BinaryOp::Eq, 9, false),
        K::Ne => (BinaryOp::Ne, 9, false),
        K::Amp => (BinaryOp::BitAnd, 8, false),
        K::Caret => (BinaryOp::BitXor, 7, false),
        K::Pipe => (BinaryOp::BitOr, 6, false),
        K::AmpAmp => (BinaryOp::And, 5, false),
        K::PipePipe => (BinaryOp::Or, 4, false),
        K::Assign => (BinaryOp::Assign, 2, true),
        K::PlusAssign => (BinaryOp::AddAssign, 2, true),
        K::MinusAssign => (BinaryOp::SubAssign, 2, true),
        K::StarAssign => (BinaryOp::MulAssign, 2, true),
        K::SlashAssign => (BinaryOp::DivAssign, 2, true),
        K::PercentAssign => (BinaryOp::ModAssign, 2, true),
        K::AmpAssign => (BinaryOp::AndAssign, 2, true),
        K::PipeAssign => (BinaryOp::OrAssign, 2, true),
        K::CaretAssign => (BinaryOp::XorAssign, 2, true),
        K::ShlAssign => (BinaryOp::ShlAssign, 2, true),
        K::ShrAssign => (BinaryOp::ShrAssign, 2, true),
        _ => return None,
    })
}

fn parse_int_literal(text: &str) -> i64 {
    let trimmed = text.trim_end_matches(['f', 'F', 'l', 'L', 'u', 'U']);
    trimmed.parse().unwrap_or(0)
}

fn parse_float_literal(text: &str) -> f64 {
    let trimmed = text.trim_end_matches(['f', 'F', 'l', 'L']);
    trimmed.parse().unwrap_or(0.0)
}

/// Decodes a quoted lexeme (string or char literal, including its
/// delimiters) into raw bytes with C escape sequences resolved.
fn decode_string_literal(lexeme: &str) -> Vec<u8> {
    let inner = lexeme
        .strip_prefix(['"', '\''])
        .and_then(|s| s.strip_suffix(['"', '\'']))
        .unwrap_or(lexeme);
    let mut out = Vec::new();
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next() {
            Some('n') => out.push(b'\n'),
            Some('t') => out.push(b'\t'),
            Some('r') => out.push(b'\r'),
            Some('0') => out.push(0),
            Some('\\') => out.push(b'\\'),
            Some('\'') => out.push(b'\''),
            Some('"') => out.push(b'"'),
            Some(other) => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(other.encode_utf8(&mut buf).as_bytes());
            }
            None => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(src: &str) -> (Option<Program<'_>>, Diagnostics) {
        let tokens = Lexer::new(src, "test.c").tokenize();
        Parser::new(tokens, false).parse_program()
    }

    #[test]
    fn empty_main() {
        let (program, diags) = parse("int main(void) { return 0; }");
        assert!(!diags.has_errors());
        let program = program.unwrap();
        assert_eq!(program.declarations.len(), 1);
        match &program.declarations[0] {
            Decl::Function(f) => {
                assert_eq!(f.name, "main");
                assert!(f.body.is_some());
            }
            _ => panic!("expected function decl"),
        }
    }

    #[test]
    fn arithmetic_precedence() {
        let (program, diags) = parse("int main(void) { return 2 + 3 * 4; }");
        assert!(!diags.has_errors());
        let program = program.unwrap();
        let Decl::Function(f) = &program.declarations[0] else {
            panic!()
        };
        let Stmt::Compound { statements, .. } = f.body.as_ref().unwrap() else {
            panic!()
        };
        let Stmt::Return { value: Some(expr), .. } = &statements[0] else {
            panic!()
        };
        match expr {
            Expr::Binary { op: BinaryOp::Add, right, .. } => {
                assert!(matches!(**right, Expr::Binary { op: BinaryOp::Mul, .. }));
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn libc_call_is_tagged() {
        let (program, _) = parse(r#"int main(void) { printf("ok\n"); return 0; }"#);
        let program = program.unwrap();
        let Decl::Function(f) = &program.declarations[0] else {
            panic!()
        };
        let Stmt::Compound { statements, .. } = f.body.as_ref().unwrap() else {
            panic!()
        };
        let Stmt::ExprStmt { expr: Expr::Call { is_libc, .. }, .. } = &statements[0] else {
            panic!()
        };
        assert!(is_libc);
    }

    #[test]
    fn syntax_error_recovers_to_next_decl() {
        let (program, diags) = parse("int main(void) { return )(; } int other(void) { return 1; }");
        assert!(diags.has_errors());
        let program = program.unwrap();
        assert_eq!(program.declarations.len(), 2);
    }

    #[test]
    fn assignment_is_right_associative() {
        let (program, _) = parse("int main(void) { int x = 0; int y = 0; x = y = 3; return x; }");
        let program = program.unwrap();
        let Decl::Function(f) = &program.declarations[0] else {
            panic!()
        };
        let Stmt::Compound { statements, .. } = f.body.as_ref().unwrap() else {
            panic!()
        };
        let Stmt::ExprStmt { expr: Expr::Binary { op: BinaryOp::Assign, right, .. }, .. } =
            &statements[2]
        else {
            panic!()
        };
        assert!(matches!(**right, Expr::Binary { op: BinaryOp::Assign, .. }));
    }
}
