use crate::frontend::token::{Token, TokenKind};

/// On-demand scanner: each call to [`Lexer::next_token`] produces exactly one
/// token. Once the input is exhausted it keeps returning `Eof`.
pub struct Lexer<'src> {
    source: &'src str,
    bytes: &'src [u8],
    start: usize,
    current: usize,
    line: u32,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Lexer {
            source,
            bytes: source.as_bytes(),
            start: 0,
            current: 0,
            line: 1,
        }
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.bytes.len()
    }

    fn current(&self) -> Option<u8> {
        self.bytes.get(self.current).copied()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.current + 1).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.current();
        self.current += 1;
        ch
    }

    fn matches(&mut self, expected: u8) -> bool {
        if self.current() == Some(expected) {
            self.current += 1;
            true
        } else {
            false
        }
    }

    fn make_token(&self, kind: TokenKind) -> Token<'src> {
        Token {
            kind,
            lexeme: &self.source[self.start..self.current],
            line: self.line,
        }
    }

    fn error_token(&self, message: &'static str) -> Token<'src> {
        Token {
            kind: TokenKind::Error,
            lexeme: message,
            line: self.line,
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current() {
            match ch {
                b' ' | b'\r' | b'\t' => {
                    self.advance();
                }
                b'\n' => {
                    self.line += 1;
                    self.advance();
                }
                b'/' if self.peek() == Some(b'/') => {
                    while self.current().is_some_and(|c| c != b'\n') {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn read_string(&mut self) -> Token<'src> {
        while let Some(ch) = self.current() {
            if ch == b'"' {
                break;
            }
            if ch == b'\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            return self.error_token("Unterminated string.");
        }

        // closing quote
        self.advance();
        self.make_token(TokenKind::String)
    }

    fn read_number(&mut self) -> Token<'src> {
        while self.current().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        // Only treat '.' as a decimal point if followed by a digit
        if self.current() == Some(b'.') && self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            while self.current().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        self.make_token(TokenKind::Number)
    }

    fn read_identifier(&mut self) -> Token<'src> {
        while self.current().is_some_and(is_ident_continue) {
            self.advance();
        }

        let kind = match &self.source[self.start..self.current] {
            "and" => TokenKind::And,
            "else" => TokenKind::Else,
            "false" => TokenKind::False,
            "for" => TokenKind::For,
            "fun" => TokenKind::Fun,
            "if" => TokenKind::If,
            "nil" => TokenKind::Nil,
            "or" => TokenKind::Or,
            "print" => TokenKind::Print,
            "return" => TokenKind::Return,
            "true" => TokenKind::True,
            "var" => TokenKind::Var,
            "while" => TokenKind::While,
            _ => TokenKind::Identifier,
        };

        self.make_token(kind)
    }

    /// Scans and returns the next token.
    pub fn next_token(&mut self) -> Token<'src> {
        self.skip_whitespace();
        self.start = self.current;

        let Some(ch) = self.advance() else {
            self.current = self.bytes.len();
            return self.make_token(TokenKind::Eof);
        };

        if is_ident_start(ch) {
            return self.read_identifier();
        }
        if ch.is_ascii_digit() {
            return self.read_number();
        }

        match ch {
            b'(' => self.make_token(TokenKind::LeftParen),
            b')' => self.make_token(TokenKind::RightParen),
            b'{' => self.make_token(TokenKind::LeftBrace),
            b'}' => self.make_token(TokenKind::RightBrace),
            b',' => self.make_token(TokenKind::Comma),
            b';' => self.make_token(TokenKind::Semicolon),
            b'-' => self.make_token(TokenKind::Minus),
            b'+' => self.make_token(TokenKind::Plus),
            b'/' => self.make_token(TokenKind::Slash),
            b'*' => self.make_token(TokenKind::Star),
            b'!' => {
                let kind = if self.matches(b'=') {
                    TokenKind::BangEqual
                } else {
                    TokenKind::Bang
                };
                self.make_token(kind)
            }
            b'=' => {
                let kind = if self.matches(b'=') {
                    TokenKind::EqualEqual
                } else {
                    TokenKind::Equal
                };
                self.make_token(kind)
            }
            b'<' => {
                let kind = if self.matches(b'=') {
                    TokenKind::LessEqual
                } else {
                    TokenKind::Less
                };
                self.make_token(kind)
            }
            b'>' => {
                let kind = if self.matches(b'=') {
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                };
                self.make_token(kind)
            }
            b'"' => self.read_string(),
            _ => {
                // swallow the rest of a multi-byte character
                while !self.is_at_end() && !self.source.is_char_boundary(self.current) {
                    self.current += 1;
                }
                self.error_token("Unexpected character.")
            }
        }
    }

    /// Scans the whole input. The returned vector always ends with `Eof`.
    pub fn tokenize(&mut self) -> Vec<Token<'src>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            tokens.push(token);
            if token.kind == TokenKind::Eof {
                break;
            }
        }
        tokens
    }
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_ident_continue(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .into_iter()
            .map(|t| t.kind)
            .filter(|k| *k != TokenKind::Eof)
            .collect()
    }

    fn lexemes(source: &str) -> Vec<String> {
        Lexer::new(source)
            .tokenize()
            .into_iter()
            .filter(|t| t.kind != TokenKind::Eof)
            .map(|t| t.lexeme.to_string())
            .collect()
    }

    #[test]
    fn test_print_statement() {
        assert_eq!(
            kinds("print 1 + 2;"),
            vec![
                TokenKind::Print,
                TokenKind::Number,
                TokenKind::Plus,
                TokenKind::Number,
                TokenKind::Semicolon
            ]
        );
    }

    #[test]
    fn test_one_and_two_char_operators() {
        assert_eq!(
            kinds("! != = == < <= > >="),
            vec![
                TokenKind::Bang,
                TokenKind::BangEqual,
                TokenKind::Equal,
                TokenKind::EqualEqual,
                TokenKind::Less,
                TokenKind::LessEqual,
                TokenKind::Greater,
                TokenKind::GreaterEqual
            ]
        );
    }

    #[test]
    fn test_delimiters() {
        assert_eq!(
            kinds("(){},;-+/*"),
            vec![
                TokenKind::LeftParen,
                TokenKind::RightParen,
                TokenKind::LeftBrace,
                TokenKind::RightBrace,
                TokenKind::Comma,
                TokenKind::Semicolon,
                TokenKind::Minus,
                TokenKind::Plus,
                TokenKind::Slash,
                TokenKind::Star
            ]
        );
    }

    #[test]
    fn test_all_keywords() {
        use TokenKind::*;
        assert_eq!(
            kinds("and else false for fun if nil or print return true var while"),
            vec![And, Else, False, For, Fun, If, Nil, Or, Print, Return, True, Var, While]
        );
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        assert_eq!(
            kinds("andy orchid variable _fun fun1"),
            vec![TokenKind::Identifier; 5]
        );
    }

    #[test]
    fn test_ampersand_forms_not_recognised() {
        let t = Lexer::new("&&").tokenize();
        assert_eq!(t[0].kind, TokenKind::Error);
        assert_eq!(t[0].lexeme, "Unexpected character.");
        assert_eq!(t[1].kind, TokenKind::Error);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(lexemes("12 3.5 0.25"), vec!["12", "3.5", "0.25"]);
    }

    #[test]
    fn test_trailing_dot_is_not_part_of_number() {
        let t = Lexer::new("7.").tokenize();
        assert_eq!(t[0].kind, TokenKind::Number);
        assert_eq!(t[0].lexeme, "7");
        assert_eq!(t[1].kind, TokenKind::Error);
    }

    #[test]
    fn test_string_keeps_quotes_in_lexeme() {
        let t = Lexer::new(r#""hello world""#).tokenize();
        assert_eq!(t[0].kind, TokenKind::String);
        assert_eq!(t[0].lexeme, "\"hello world\"");
    }

    #[test]
    fn test_multiline_string_advances_line() {
        let t = Lexer::new("\"a\nb\" x").tokenize();
        assert_eq!(t[0].kind, TokenKind::String);
        assert_eq!(t[1].kind, TokenKind::Identifier);
        assert_eq!(t[1].line, 2);
    }

    #[test]
    fn test_unterminated_string_error() {
        let t = Lexer::new("\"abc").tokenize();
        assert_eq!(t[0].kind, TokenKind::Error);
        assert_eq!(t[0].lexeme, "Unterminated string.");
        assert_eq!(t[1].kind, TokenKind::Eof);
    }

    #[test]
    fn test_comments_and_newlines() {
        let t = Lexer::new("// comment\nvar // trailing\n  x").tokenize();
        assert_eq!(t[0].kind, TokenKind::Var);
        assert_eq!(t[0].line, 2);
        assert_eq!(t[1].kind, TokenKind::Identifier);
        assert_eq!(t[1].line, 3);
        assert_eq!(t[2].kind, TokenKind::Eof);
    }

    #[test]
    fn test_slash_alone_is_operator() {
        assert_eq!(
            kinds("a / b"),
            vec![TokenKind::Identifier, TokenKind::Slash, TokenKind::Identifier]
        );
    }

    #[test]
    fn test_unexpected_multibyte_character() {
        let t = Lexer::new("é x").tokenize();
        assert_eq!(t[0].kind, TokenKind::Error);
        assert_eq!(t[1].kind, TokenKind::Identifier);
        assert_eq!(t[1].lexeme, "x");
    }

    #[test]
    fn test_eof_repeats() {
        let mut lexer = Lexer::new("");
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
    }
}
