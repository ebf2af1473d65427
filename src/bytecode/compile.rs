use std::mem;
use std::rc::Rc;

use log::{debug, log_enabled};

use crate::{
    bytecode::{
        chunk::Chunk,
        compile_error::{CompileError, CompileErrors, ErrorLocation},
        disasm::disassemble_function,
        op::OpCode,
    },
    frontend::{
        lexer::Lexer,
        token::{Token, TokenKind},
    },
    lang::{
        object::{Function, Obj},
        value::Value,
    },
};

/// Locals per function, including the reserved slot 0.
pub const LOCALS_MAX: usize = 256;

/// Largest jump distance the compiler will encode.
pub const MAX_JUMP: usize = 255 * 255;

/// Compiles a whole program into the implicit top-level function.
///
/// Every syntax error in the source is collected; any error means no
/// function is returned.
pub fn compile(source: &str) -> Result<Function, CompileErrors> {
    let mut compiler = Compiler::new(source);
    compiler.advance();
    while !compiler.matches(TokenKind::Eof) {
        compiler.declaration();
    }
    let function = compiler.end_function();

    if compiler.errors.is_empty() {
        Ok(function)
    } else {
        Err(CompileErrors(compiler.errors))
    }
}

// =============================================================================
// PRECEDENCE AND PARSE RULES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    None,
    Assignment, // =
    Or,         // or
    And,        // and
    Equality,   // == !=
    Comparison, // < > <= >=
    Term,       // + -
    Factor,     // * /
    Unary,      // ! -
    Call,       // ()
    Primary,
}

impl Precedence {
    /// One level tighter. Left-associative binary operators parse their
    /// right operand at this level.
    fn next(self) -> Self {
        match self {
            Precedence::None => Precedence::Assignment,
            Precedence::Assignment => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Equality,
            Precedence::Equality => Precedence::Comparison,
            Precedence::Comparison => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor => Precedence::Unary,
            Precedence::Unary => Precedence::Call,
            Precedence::Call | Precedence::Primary => Precedence::Primary,
        }
    }
}

type ParseFn<'src> = fn(&mut Compiler<'src>, bool);

#[derive(Clone, Copy)]
struct ParseRule<'src> {
    prefix: Option<ParseFn<'src>>,
    infix: Option<ParseFn<'src>>,
    precedence: Precedence,
}

impl<'src> ParseRule<'src> {
    fn new(
        prefix: Option<ParseFn<'src>>,
        infix: Option<ParseFn<'src>>,
        precedence: Precedence,
    ) -> Self {
        ParseRule {
            prefix,
            infix,
            precedence,
        }
    }
}

// =============================================================================
// PER-FUNCTION STATE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionKind {
    Script,
    Function,
}

struct Local<'src> {
    name: &'src str,
    /// `None` while the variable's own initializer is being compiled.
    depth: Option<usize>,
}

/// State for the function currently being compiled. The enclosing function's
/// state is held on the Rust stack while a nested body compiles.
struct FunctionState<'src> {
    function: Function,
    kind: FunctionKind,
    locals: Vec<Local<'src>>,
    scope_depth: usize,
}

impl<'src> FunctionState<'src> {
    fn new(kind: FunctionKind, name: Option<&str>) -> Self {
        let mut locals = Vec::with_capacity(LOCALS_MAX);
        // slot 0 holds the callee
        locals.push(Local {
            name: "",
            depth: Some(0),
        });
        FunctionState {
            function: Function::new(name),
            kind,
            locals,
            scope_depth: 0,
        }
    }
}

// =============================================================================
// COMPILER
// =============================================================================

struct Compiler<'src> {
    lexer: Lexer<'src>,
    current: Token<'src>,
    previous: Token<'src>,
    panic_mode: bool,
    errors: Vec<CompileError>,
    state: FunctionState<'src>,
}

impl<'src> Compiler<'src> {
    fn new(source: &'src str) -> Self {
        Compiler {
            lexer: Lexer::new(source),
            current: Token::synthetic(TokenKind::Eof),
            previous: Token::synthetic(TokenKind::Eof),
            panic_mode: false,
            errors: Vec::new(),
            state: FunctionState::new(FunctionKind::Script, None),
        }
    }

    fn rule(kind: TokenKind) -> ParseRule<'src> {
        use TokenKind as T;
        match kind {
            T::LeftParen => ParseRule::new(Some(Self::grouping), Some(Self::call), Precedence::Call),
            T::Minus => ParseRule::new(Some(Self::unary), Some(Self::binary), Precedence::Term),
            T::Plus => ParseRule::new(None, Some(Self::binary), Precedence::Term),
            T::Slash | T::Star => ParseRule::new(None, Some(Self::binary), Precedence::Factor),
            T::Bang => ParseRule::new(Some(Self::unary), None, Precedence::None),
            T::BangEqual | T::EqualEqual => {
                ParseRule::new(None, Some(Self::binary), Precedence::Equality)
            }
            T::Greater | T::GreaterEqual | T::Less | T::LessEqual => {
                ParseRule::new(None, Some(Self::binary), Precedence::Comparison)
            }
            T::Identifier => ParseRule::new(Some(Self::variable), None, Precedence::None),
            T::String => ParseRule::new(Some(Self::string), None, Precedence::None),
            T::Number => ParseRule::new(Some(Self::number), None, Precedence::None),
            T::And => ParseRule::new(None, Some(Self::and), Precedence::And),
            T::Or => ParseRule::new(None, Some(Self::or), Precedence::Or),
            T::False | T::True | T::Nil => {
                ParseRule::new(Some(Self::literal), None, Precedence::None)
            }
            _ => ParseRule::new(None, None, Precedence::None),
        }
    }

    // -------------------------------------------------------------------------
    // Token plumbing
    // -------------------------------------------------------------------------

    fn advance(&mut self) {
        self.previous = self.current;
        loop {
            self.current = self.lexer.next_token();
            if self.current.kind != TokenKind::Error {
                break;
            }
            let message = self.current.lexeme;
            self.error_at_current(message);
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if !self.check(kind) {
            return false;
        }
        self.advance();
        true
    }

    fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.check(kind) {
            self.advance();
        } else {
            self.error_at_current(message);
        }
    }

    // -------------------------------------------------------------------------
    // Diagnostics
    // -------------------------------------------------------------------------

    fn error_at(&mut self, token: Token<'src>, message: &str) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;

        let location = match token.kind {
            TokenKind::Eof => ErrorLocation::AtEnd,
            TokenKind::Error => ErrorLocation::Unknown,
            _ => ErrorLocation::At(token.lexeme.to_string()),
        };
        self.errors
            .push(CompileError::new(token.line, location, message));
    }

    fn error(&mut self, message: &str) {
        self.error_at(self.previous, message);
    }

    fn error_at_current(&mut self, message: &str) {
        self.error_at(self.current, message);
    }

    /// Skips tokens until a statement boundary so one mistake is reported once.
    fn synchronize(&mut self) {
        self.panic_mode = false;

        while self.current.kind != TokenKind::Eof {
            if self.previous.kind == TokenKind::Semicolon || self.current.kind.starts_statement() {
                return;
            }
            self.advance();
        }
    }

    // -------------------------------------------------------------------------
    // Emission
    // -------------------------------------------------------------------------

    fn chunk(&mut self) -> &mut Chunk {
        &mut self.state.function.chunk
    }

    fn emit_byte(&mut self, byte: u8) {
        let line = self.previous.line;
        self.chunk().write(byte, line);
    }

    fn emit_op(&mut self, op: OpCode) {
        self.emit_byte(op.into());
    }

    fn emit_op_arg(&mut self, op: OpCode, arg: u8) {
        self.emit_op(op);
        self.emit_byte(arg);
    }

    fn emit_return(&mut self) {
        self.emit_op(OpCode::Nil);
        self.emit_op(OpCode::Return);
    }

    fn make_constant(&mut self, value: Value) -> u8 {
        match self.chunk().add_constant(value) {
            Ok(index) => index,
            Err(err) => {
                self.error(&err.to_string());
                0
            }
        }
    }

    fn emit_constant(&mut self, value: Value) {
        let index = self.make_constant(value);
        self.emit_op_arg(OpCode::Constant, index);
    }

    /// Emits a jump with a placeholder operand and returns the operand offset.
    fn emit_jump(&mut self, op: OpCode) -> usize {
        self.emit_op(op);
        self.emit_byte(0xff);
        self.emit_byte(0xff);
        self.chunk().len() - 2
    }

    fn patch_jump(&mut self, offset: usize) {
        // -2 for the operand itself
        let jump = self.chunk().len() - offset - 2;
        match u16::try_from(jump) {
            Ok(jump) if usize::from(jump) <= MAX_JUMP => self.chunk().patch_u16(offset, jump),
            _ => self.error("Too much code to jump over."),
        }
    }

    fn emit_loop(&mut self, loop_start: usize) {
        self.emit_op(OpCode::Loop);

        // +2 for the operand about to be written
        let offset = self.chunk().len() - loop_start + 2;
        if offset > MAX_JUMP {
            self.error("Loop body too large.");
        }
        let [hi, lo] = u16::try_from(offset).unwrap_or(u16::MAX).to_be_bytes();
        self.emit_byte(hi);
        self.emit_byte(lo);
    }

    /// Finishes the current function: appends the implicit `return nil` and
    /// hands the function back, leaving an empty one in its place.
    fn end_function(&mut self) -> Function {
        self.emit_return();
        let function = mem::take(&mut self.state.function);

        if self.errors.is_empty() && log_enabled!(log::Level::Debug) {
            debug!("compiled\n{}", disassemble_function(&function));
        }
        function
    }

    // -------------------------------------------------------------------------
    // Scopes and variables
    // -------------------------------------------------------------------------

    fn begin_scope(&mut self) {
        self.state.scope_depth += 1;
    }

    fn end_scope(&mut self) {
        self.state.scope_depth -= 1;
        let depth = self.state.scope_depth;

        while self
            .state
            .locals
            .last()
            .is_some_and(|local| local.depth.is_none_or(|d| d > depth))
        {
            self.emit_op(OpCode::Pop);
            self.state.locals.pop();
        }
    }

    fn identifier_constant(&mut self, name: Token<'src>) -> u8 {
        self.make_constant(Value::string(name.lexeme))
    }

    fn resolve_local(&mut self, name: Token<'src>) -> Option<u8> {
        let (slot, local) = self
            .state
            .locals
            .iter()
            .enumerate()
            .rev()
            .find(|(_, local)| local.name == name.lexeme)?;

        if local.depth.is_none() {
            self.error(&format!(
                "Can't read local variable {} in it's own initializer.",
                name.lexeme
            ));
        }
        // LOCALS_MAX keeps every slot within a byte
        u8::try_from(slot).ok()
    }

    fn add_local(&mut self, name: Token<'src>) {
        if self.state.locals.len() == LOCALS_MAX {
            self.error("Too many local variables in function.");
            return;
        }
        self.state.locals.push(Local {
            name: name.lexeme,
            depth: None,
        });
    }

    fn declare_variable(&mut self) {
        if self.state.scope_depth == 0 {
            return;
        }

        let name = self.previous;
        let depth = self.state.scope_depth;
        let duplicate = self
            .state
            .locals
            .iter()
            .rev()
            .take_while(|local| local.depth.is_none_or(|d| d >= depth))
            .any(|local| local.name == name.lexeme);

        if duplicate {
            self.error(&format!(
                "Already a variable called {} in this scope.",
                name.lexeme
            ));
        }
        self.add_local(name);
    }

    fn parse_variable(&mut self, message: &str) -> u8 {
        self.consume(TokenKind::Identifier, message);

        self.declare_variable();
        if self.state.scope_depth > 0 {
            return 0;
        }
        self.identifier_constant(self.previous)
    }

    fn mark_initialized(&mut self) {
        if self.state.scope_depth == 0 {
            return;
        }
        let depth = self.state.scope_depth;
        if let Some(local) = self.state.locals.last_mut() {
            local.depth = Some(depth);
        }
    }

    fn define_variable(&mut self, global: u8) {
        if self.state.scope_depth > 0 {
            self.mark_initialized();
            return;
        }
        self.emit_op_arg(OpCode::DefineGlobal, global);
    }

    fn named_variable(&mut self, name: Token<'src>, can_assign: bool) {
        let (get_op, set_op, arg) = match self.resolve_local(name) {
            Some(slot) => (OpCode::GetLocal, OpCode::SetLocal, slot),
            None => {
                let index = self.identifier_constant(name);
                (OpCode::GetGlobal, OpCode::SetGlobal, index)
            }
        };

        if can_assign && self.matches(TokenKind::Equal) {
            self.expression();
            self.emit_op_arg(set_op, arg);
        } else {
            self.emit_op_arg(get_op, arg);
        }
    }

    // -------------------------------------------------------------------------
    // Expressions
    // -------------------------------------------------------------------------

    fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    fn parse_precedence(&mut self, precedence: Precedence) {
        self.advance();
        let Some(prefix) = Self::rule(self.previous.kind).prefix else {
            self.error("Expect expression.");
            return;
        };

        let can_assign = precedence <= Precedence::Assignment;
        prefix(self, can_assign);

        while precedence <= Self::rule(self.current.kind).precedence {
            self.advance();
            if let Some(infix) = Self::rule(self.previous.kind).infix {
                infix(self, can_assign);
            }
        }

        if can_assign && self.matches(TokenKind::Equal) {
            self.error("Invalid assignment target.");
        }
    }

    fn number(&mut self, _can_assign: bool) {
        match self.previous.lexeme.parse::<f64>() {
            Ok(n) => self.emit_constant(Value::Number(n)),
            Err(_) => self.error("Invalid number literal."),
        }
    }

    fn string(&mut self, _can_assign: bool) {
        let lexeme = self.previous.lexeme;
        let text = lexeme
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap_or(lexeme);
        self.emit_constant(Value::string(text));
    }

    fn literal(&mut self, _can_assign: bool) {
        match self.previous.kind {
            TokenKind::False => self.emit_op(OpCode::False),
            TokenKind::Nil => self.emit_op(OpCode::Nil),
            TokenKind::True => self.emit_op(OpCode::True),
            _ => {}
        }
    }

    fn variable(&mut self, can_assign: bool) {
        self.named_variable(self.previous, can_assign);
    }

    fn grouping(&mut self, _can_assign: bool) {
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after expression.");
    }

    fn unary(&mut self, _can_assign: bool) {
        let operator = self.previous.kind;
        self.parse_precedence(Precedence::Unary);

        match operator {
            TokenKind::Bang => self.emit_op(OpCode::Not),
            TokenKind::Minus => self.emit_op(OpCode::Negate),
            _ => {}
        }
    }

    fn binary(&mut self, _can_assign: bool) {
        let operator = self.previous.kind;
        let rule = Self::rule(operator);
        self.parse_precedence(rule.precedence.next());

        match operator {
            TokenKind::BangEqual => {
                self.emit_op(OpCode::Equal);
                self.emit_op(OpCode::Not);
            }
            TokenKind::EqualEqual => self.emit_op(OpCode::Equal),
            TokenKind::Greater => self.emit_op(OpCode::Greater),
            TokenKind::GreaterEqual => {
                self.emit_op(OpCode::Less);
                self.emit_op(OpCode::Not);
            }
            TokenKind::Less => self.emit_op(OpCode::Less),
            TokenKind::LessEqual => {
                self.emit_op(OpCode::Greater);
                self.emit_op(OpCode::Not);
            }
            TokenKind::Plus => self.emit_op(OpCode::Add),
            TokenKind::Minus => self.emit_op(OpCode::Subtract),
            TokenKind::Star => self.emit_op(OpCode::Multiply),
            TokenKind::Slash => self.emit_op(OpCode::Divide),
            _ => {}
        }
    }

    fn and(&mut self, _can_assign: bool) {
        let end_jump = self.emit_jump(OpCode::JumpIfFalse);

        self.emit_op(OpCode::Pop);
        self.parse_precedence(Precedence::And);

        self.patch_jump(end_jump);
    }

    fn or(&mut self, _can_assign: bool) {
        let else_jump = self.emit_jump(OpCode::JumpIfFalse);
        let end_jump = self.emit_jump(OpCode::Jump);

        self.patch_jump(else_jump);
        self.emit_op(OpCode::Pop);

        self.parse_precedence(Precedence::Or);
        self.patch_jump(end_jump);
    }

    fn call(&mut self, _can_assign: bool) {
        let arg_count = self.argument_list();
        self.emit_op_arg(OpCode::Call, arg_count);
    }

    fn argument_list(&mut self) -> u8 {
        let mut count: u8 = 0;
        if !self.check(TokenKind::RightParen) {
            loop {
                self.expression();
                if count == u8::MAX {
                    self.error("Can't have more than 255 arguments.");
                } else {
                    count += 1;
                }
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after arguments.");
        count
    }

    // -------------------------------------------------------------------------
    // Declarations and statements
    // -------------------------------------------------------------------------

    fn declaration(&mut self) {
        if self.matches(TokenKind::Fun) {
            self.fun_declaration();
        } else if self.matches(TokenKind::Var) {
            self.var_declaration();
        } else {
            self.statement();
        }

        if self.panic_mode {
            self.synchronize();
        }
    }

    fn fun_declaration(&mut self) {
        let global = self.parse_variable("Expect function name.");
        // a local function may refer to itself
        self.mark_initialized();
        self.function(self.previous.lexeme);
        self.define_variable(global);
    }

    fn function(&mut self, name: &str) {
        let enclosing = mem::replace(
            &mut self.state,
            FunctionState::new(FunctionKind::Function, Some(name)),
        );
        self.begin_scope();

        self.consume(TokenKind::LeftParen, "Expect '(' after function name.");
        if !self.check(TokenKind::RightParen) {
            loop {
                if self.state.function.arity == u8::MAX {
                    self.error_at_current("Can't have more than 255 parameters.");
                } else {
                    self.state.function.arity += 1;
                }
                let param = self.parse_variable("Expect parameter name.");
                self.define_variable(param);

                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after parameters.");
        self.consume(TokenKind::LeftBrace, "Expect '{' before function body.");
        self.block();

        let function = self.end_function();
        self.state = enclosing;

        self.emit_constant(Value::Object(Obj::Function(Rc::new(function))));
    }

    fn var_declaration(&mut self) {
        let global = self.parse_variable("Expect variable name.");

        if self.matches(TokenKind::Equal) {
            self.expression();
        } else {
            self.emit_op(OpCode::Nil);
        }
        self.consume(
            TokenKind::Semicolon,
            "Expect ';' after variable declaration.",
        );

        self.define_variable(global);
    }

    fn statement(&mut self) {
        if self.matches(TokenKind::Print) {
            self.print_statement();
        } else if self.matches(TokenKind::For) {
            self.for_statement();
        } else if self.matches(TokenKind::If) {
            self.if_statement();
        } else if self.matches(TokenKind::Return) {
            self.return_statement();
        } else if self.matches(TokenKind::While) {
            self.while_statement();
        } else if self.matches(TokenKind::LeftBrace) {
            self.begin_scope();
            self.block();
            self.end_scope();
        } else {
            self.expression_statement();
        }
    }

    fn block(&mut self) {
        while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Eof) {
            self.declaration();
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after block.");
    }

    fn print_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after value.");
        self.emit_op(OpCode::Print);
    }

    fn expression_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after expression.");
        self.emit_op(OpCode::Pop);
    }

    fn return_statement(&mut self) {
        if self.state.kind == FunctionKind::Script {
            self.error("Can't return from top-level code.");
        }

        if self.matches(TokenKind::Semicolon) {
            self.emit_return();
        } else {
            self.expression();
            self.consume(TokenKind::Semicolon, "Expect ';' after return value.");
            self.emit_op(OpCode::Return);
        }
    }

    fn if_statement(&mut self) {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.");
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after condition.");

        let then_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.statement();

        let else_jump = self.emit_jump(OpCode::Jump);
        self.patch_jump(then_jump);
        self.emit_op(OpCode::Pop);

        if self.matches(TokenKind::Else) {
            self.statement();
        }
        self.patch_jump(else_jump);
    }

    fn while_statement(&mut self) {
        let loop_start = self.chunk().len();
        self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.");
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after condition.");

        let exit_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.statement();
        self.emit_loop(loop_start);

        self.patch_jump(exit_jump);
        self.emit_op(OpCode::Pop);
    }

    /// `for (init; cond; incr) body` runs the increment after the body by
    /// jumping over it on entry and looping back to it at the end of the body.
    fn for_statement(&mut self) {
        self.begin_scope();
        self.consume(TokenKind::LeftParen, "Expect '(' after 'for'.");
        if self.matches(TokenKind::Semicolon) {
            // no initializer
        } else if self.matches(TokenKind::Var) {
            self.var_declaration();
        } else {
            self.expression_statement();
        }

        let mut loop_start = self.chunk().len();

        let mut exit_jump = None;
        if !self.matches(TokenKind::Semicolon) {
            self.expression();
            self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.");

            exit_jump = Some(self.emit_jump(OpCode::JumpIfFalse));
            self.emit_op(OpCode::Pop);
        }

        if !self.matches(TokenKind::RightParen) {
            let body_jump = self.emit_jump(OpCode::Jump);

            let increment_start = self.chunk().len();
            self.expression();
            self.emit_op(OpCode::Pop);
            self.consume(TokenKind::RightParen, "Expect ')' after for clauses.");

            self.emit_loop(loop_start);
            loop_start = increment_start;
            self.patch_jump(body_jump);
        }

        self.statement();
        self.emit_loop(loop_start);

        if let Some(exit_jump) = exit_jump {
            self.patch_jump(exit_jump);
            self.emit_op(OpCode::Pop);
        }

        self.end_scope();
    }
}

// =============================================================================
// TESTS
// =============================================================================
