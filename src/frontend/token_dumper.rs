use std::io::{self, Write};

use crate::frontend::token::{Token, TokenKind};

pub struct TokenDumper {
    pub color: bool,
    pub show_debug_repr: bool, // if false, prints the lexeme instead of the Debug form
}

impl Default for TokenDumper {
    fn default() -> Self {
        Self {
            color: true,
            show_debug_repr: true,
        }
    }
}

impl TokenDumper {
    // ANSI colors
    const RESET: &'static str = "\x1b[0m";
    const DIM: &'static str = "\x1b[2m";
    const RED: &'static str = "\x1b[31m";
    const GRN: &'static str = "\x1b[32m";
    const YEL: &'static str = "\x1b[33m";
    const CYN: &'static str = "\x1b[36m";
    const MAG: &'static str = "\x1b[35m";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn pretty(mut self) -> Self {
        self.show_debug_repr = false;
        self
    }

    pub fn dump(&self, out: &mut impl Write, tokens: &[Token<'_>]) -> io::Result<()> {
        for token in tokens {
            self.print_one(out, token)?;
        }
        Ok(())
    }

    fn print_one(&self, out: &mut impl Write, token: &Token<'_>) -> io::Result<()> {
        let kind = self.kind(token.kind);
        let colr = if self.color { self.color(token.kind) } else { "" };
        let reset = if self.color { Self::RESET } else { "" };

        if self.show_debug_repr {
            writeln!(
                out,
                "[{:02}] {}{:<8} {:?}{}",
                token.line, colr, kind, token.kind, reset
            )
        } else {
            match token.kind {
                TokenKind::Eof => writeln!(out, "[{:02}] {}{:<8}{}", token.line, colr, kind, reset),
                TokenKind::Error => writeln!(
                    out,
                    "[{:02}] {}{:<8} {}{}",
                    token.line, colr, kind, token.lexeme, reset
                ),
                _ => writeln!(
                    out,
                    "[{:02}] {}{:<8} {}{}",
                    token.line, colr, kind, token, reset
                ),
            }
        }
    }

    fn kind(&self, kind: TokenKind) -> &'static str {
        use TokenKind::*;
        match kind {
            Eof => "EOF",
            Error => "ERROR",

            // literals
            Number => "NUMBER",
            String => "STRING",
            True | False | Nil => "LITERAL",

            // names
            Identifier => "IDENT",

            // structure
            LeftParen | RightParen => "PAREN",
            LeftBrace | RightBrace => "BRACE",
            Comma | Semicolon => "PUNCT",

            // ops / comparisons
            Plus | Minus | Star | Slash | Bang | Equal => "OP",
            EqualEqual | BangEqual | Less | LessEqual | Greater | GreaterEqual => "CMP",

            // everything else = keyword
            _ => "KEYWORD",
        }
    }

    fn color(&self, kind: TokenKind) -> &'static str {
        use TokenKind::*;
        match kind {
            Eof | Comma | Semicolon => Self::DIM,
            Error => Self::RED,
            String => Self::GRN,
            Number | True | False | Nil => Self::CYN,
            Identifier => Self::YEL,
            Plus | Minus | Star | Slash | Bang | Equal => Self::MAG,
            EqualEqual | BangEqual | Less | LessEqual | Greater | GreaterEqual => Self::MAG,
            _ => Self::RESET,
        }
    }
}
