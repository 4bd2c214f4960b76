use crate::token::{SourcePos, Token, TokenKind};

/// A byte-oriented cursor over the source buffer, tracking line/column as it
/// advances. Shaped after the teacher's `bits::Cursor`: an immutable
/// backing buffer plus a single advancing offset, with `peek`/`advance`
/// kept separate so lookahead never mutates position.
struct Cursor<'src> {
    buffer: &'src [u8],
    offset: usize,
    line: u32,
    column: u32,
}

impl<'src> Cursor<'src> {
    fn new(buffer: &'src [u8]) -> Self {
        Self {
            buffer,
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.buffer.get(self.offset).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.buffer.get(self.offset + ahead).copied()
    }

    fn is_at_end(&self) -> bool {
        self.offset >= self.buffer.len()
    }

    fn advance(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.offset += 1;
        if byte == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(byte)
    }

    fn eat_if(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }
}

/// Produces a finite, non-restartable sequence of tokens from a source
/// buffer (`spec.md` §4.1). Tokens are consumed left-to-right, once.
pub struct Lexer<'src> {
    cursor: Cursor<'src>,
    file: &'src str,
    in_directive: bool,
    at_line_start: bool,
}

impl<'src> Lexer<'src> {
    #[must_use]
    pub fn new(source: &'src str, file: &'src str) -> Self {
        Self {
            cursor: Cursor::new(source.as_bytes()),
            file,
            in_directive: false,
            at_line_start: true,
        }
    }

    /// Tokenizes the entire buffer, terminating the sequence with `Eof`.
    pub fn tokenize(mut self) -> Vec<Token<'src>> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token();
            let done = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if done {
                break;
            }
        }
        tokens
    }

    fn pos(&self) -> SourcePos<'src> {
        SourcePos::new(self.file, self.cursor.line, self.cursor.column)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.cursor.peek() {
                Some(b' ') | Some(b'\t') | Some(b'\r') => {
                    self.cursor.advance();
                }
                Some(b'\n') => {
                    self.cursor.advance();
                    self.in_directive = false;
                    self.at_line_start = true;
                }
                Some(b'/') if self.cursor.peek_at(1) == Some(b'/') => {
                    while !matches!(self.cursor.peek(), None | Some(b'\n')) {
                        self.cursor.advance();
                    }
                }
                Some(b'/') if self.cursor.peek_at(1) == Some(b'*') => {
                    self.cursor.advance();
                    self.cursor.advance();
                    loop {
                        match self.cursor.peek() {
                            None => break,
                            Some(b'*') if self.cursor.peek_at(1) == Some(b'/') => {
                                self.cursor.advance();
                                self.cursor.advance();
                                break;
                            }
                            _ => {
                                self.cursor.advance();
                            }
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> Token<'src> {
        self.skip_trivia();
        let was_line_start = std::mem::replace(&mut self.at_line_start, false);
        let start = self.pos();

        let Some(byte) = self.cursor.peek() else {
            return Token::new(TokenKind::Eof, None, start);
        };

        if byte == b'#' && was_line_start {
            self.cursor.advance();
            self.in_directive = true;
            self.skip_trivia();
            let name_start = self.pos();
            if is_ident_start(self.cursor.peek()) {
                let name = self.scan_ident_text();
                return Token::new(TokenKind::PpIdentifier, Some(name), name_start);
            }
            return Token::new(TokenKind::Hash, None, start);
        }

        if is_ident_start(Some(byte)) {
            let text = self.scan_ident_text();
            let kind = TokenKind::keyword(&text).unwrap_or(TokenKind::Identifier);
            return Token::new(kind, Some(text), start);
        }

        if byte.is_ascii_digit() {
            return self.scan_number(start);
        }

        match byte {
            b'"' => self.scan_string(start),
            b'\'' => self.scan_char(start),
            _ => self.scan_operator(start),
        }
    }

    fn scan_ident_text(&mut self) -> String {
        let mut text = String::new();
        while let Some(b) = self.cursor.peek() {
            if is_ident_continue(b) {
                text.push(b as char);
                self.cursor.advance();
            } else {
                break;
            }
        }
        text
    }

    fn scan_number(&mut self, start: SourcePos<'src>) -> Token<'src> {
        let mut text = String::new();
        let mut is_float = false;

        while matches!(self.cursor.peek(), Some(b) if b.is_ascii_digit()) {
            text.push(self.cursor.advance().unwrap() as char);
        }

        if self.cursor.peek() == Some(b'.') {
            is_float = true;
            text.push(self.cursor.advance().unwrap() as char);
            while matches!(self.cursor.peek(), Some(b) if b.is_ascii_digit()) {
                text.push(self.cursor.advance().unwrap() as char);
            }
        }

        if matches!(self.cursor.peek(), Some(b'e') | Some(b'E')) {
            let mut lookahead = 1;
            if matches!(self.cursor.peek_at(1), Some(b'+') | Some(b'-')) {
                lookahead = 2;
            }
            if matches!(self.cursor.peek_at(lookahead), Some(b) if b.is_ascii_digit()) {
                is_float = true;
                text.push(self.cursor.advance().unwrap() as char);
                if matches!(self.cursor.peek(), Some(b'+') | Some(b'-')) {
                    text.push(self.cursor.advance().unwrap() as char);
                }
                while matches!(self.cursor.peek(), Some(b) if b.is_ascii_digit()) {
                    text.push(self.cursor.advance().unwrap() as char);
                }
            } else {
                return Token::new(
                    TokenKind::Error,
                    Some("malformed exponent: no digits".to_string()),
                    start,
                );
            }
        }

        while matches!(
            self.cursor.peek(),
            Some(b'f') | Some(b'F') | Some(b'l') | Some(b'L') | Some(b'u') | Some(b'U')
        ) {
            text.push(self.cursor.advance().unwrap() as char);
        }

        let kind = if is_float {
            TokenKind::FloatLiteral
        } else {
            TokenKind::IntLiteral
        };
        Token::new(kind, Some(text), start)
    }

    fn scan_string(&mut self, start: SourcePos<'src>) -> Token<'src> {
        let mut text = String::new();
        text.push(self.cursor.advance().unwrap() as char); // opening quote
        loop {
            match self.cursor.peek() {
                None | Some(b'\n') => {
                    return Token::new(
                        TokenKind::Error,
                        Some("unterminated string literal".to_string()),
                        start,
                    );
                }
                Some(b'\\') => {
                    text.push(self.cursor.advance().unwrap() as char);
                    if let Some(escaped) = self.cursor.advance() {
                        text.push(escaped as char);
                    }
                }
                Some(b'"') => {
                    text.push(self.cursor.advance().unwrap() as char);
                    break;
                }
                Some(_) => {
                    text.push(self.cursor.advance().unwrap() as char);
                }
            }
        }
        Token::new(TokenKind::StringLiteral, Some(text), start)
    }

    fn scan_char(&mut self, start: SourcePos<'src>) -> Token<'src> {
        let mut text = String::new();
        text.push(self.cursor.advance().unwrap() as char); // opening quote
        loop {
            match self.cursor.peek() {
                None | Some(b'\n') => {
                    return Token::new(
                        TokenKind::Error,
                        Some("unterminated character literal".to_string()),
                        start,
                    );
                }
                Some(b'\\') => {
                    text.push(self.cursor.advance().unwrap() as char);
                    if let Some(escaped) = self.cursor.advance() {
                        text.push(escaped as char);
                    }
                }
                Some(b'\'') => {
                    text.push(self.cursor.advance().unwrap() as char);
                    break;
                }
                Some(_) => {
                    text.push(self.cursor.advance().unwrap() as char);
                }
            }
        }
        Token::new(TokenKind::CharLiteral, Some(text), start)
    }

    /// Longest-match operator lexing per the table in `spec.md` §4.1.
    fn scan_operator(&mut self, start: SourcePos<'src>) -> Token<'src> {
        let byte = self.cursor.advance().unwrap();
        let kind = match byte {
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b';' => TokenKind::Semicolon,
            b',' => TokenKind::Comma,
            b'.' => TokenKind::Dot,
            b'?' => TokenKind::Question,
            b':' => TokenKind::Colon,
            b'~' => TokenKind::Tilde,
            b'=' => {
                if self.cursor.eat_if(b'=') {
                    TokenKind::Eq
                } else {
                    TokenKind::Assign
                }
            }
            b'!' => {
                if self.cursor.eat_if(b'=') {
                    TokenKind::Ne
                } else {
                    TokenKind::Not
                }
            }
            b'<' => {
                if self.cursor.eat_if(b'=') {
                    TokenKind::Le
                } else if self.cursor.eat_if(b'<') {
                    if self.cursor.eat_if(b'=') {
                        TokenKind::ShlAssign
                    } else {
                        TokenKind::Shl
                    }
                } else {
                    TokenKind::Lt
                }
            }
            b'>' => {
                if self.cursor.eat_if(b'=') {
                    TokenKind::Ge
                } else if self.cursor.eat_if(b'>') {
                    if self.cursor.eat_if(b'=') {
                        TokenKind::ShrAssign
                    } else {
                        TokenKind::Shr
                    }
                } else {
                    TokenKind::Gt
                }
            }
            b'+' => {
                if self.cursor.eat_if(b'+') {
                    TokenKind::Inc
                } else if self.cursor.eat_if(b'=') {
                    TokenKind::PlusAssign
                } else {
                    TokenKind::Plus
                }
            }
            b'-' => {
                if self.cursor.eat_if(b'-') {
                    TokenKind::Dec
                } else if self.cursor.eat_if(b'=') {
                    TokenKind::MinusAssign
                } else if self.cursor.eat_if(b'>') {
                    TokenKind::Arrow
                } else {
                    TokenKind::Minus
                }
            }
            b'*' => {
                if self.cursor.eat_if(b'=') {
                    TokenKind::StarAssign
                } else {
                    TokenKind::Star
                }
            }
            b'/' => {
                if self.cursor.eat_if(b'=') {
                    TokenKind::SlashAssign
                } else {
                    TokenKind::Slash
                }
            }
            b'%' => {
                if self.cursor.eat_if(b'=') {
                    TokenKind::PercentAssign
                } else {
                    TokenKind::Percent
                }
            }
            b'&' => {
                if self.cursor.eat_if(b'&') {
                    TokenKind::AmpAmp
                } else if self.cursor.eat_if(b'=') {
                    TokenKind::AmpAssign
                } else {
                    TokenKind::Amp
                }
            }
            b'|' => {
                if self.cursor.eat_if(b'|') {
                    TokenKind::PipePipe
                } else if self.cursor.eat_if(b'=') {
                    TokenKind::PipeAssign
                } else {
                    TokenKind::Pipe
                }
            }
            b'^' => {
                if self.cursor.eat_if(b'=') {
                    TokenKind::CaretAssign
                } else {
                    TokenKind::Caret
                }
            }
            other => {
                return Token::new(TokenKind::Error, Some((other as char).to_string()), start);
            }
        };
        Token::new(kind, None, start)
    }
}

fn is_ident_start(byte: Option<u8>) -> bool {
    matches!(byte, Some(b) if b.is_ascii_alphabetic() || b == b'_')
}

fn is_ident_continue(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src, "test.c")
            .tokenize()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            kinds("int main foo_bar"),
            vec![
                TokenKind::Int,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn numeric_literals() {
        assert_eq!(
            kinds("42 3.14 1e10 2.5f"),
            vec![
                TokenKind::IntLiteral,
                TokenKind::FloatLiteral,
                TokenKind::FloatLiteral,
                TokenKind::FloatLiteral,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn bad_exponent_is_error_token() {
        assert_eq!(
            kinds("1e+"),
            vec![TokenKind::Error, TokenKind::Eof]
        );
    }

    #[test]
    fn longest_match_operators() {
        assert_eq!(
            kinds("<<= >> ->"),
            vec![
                TokenKind::ShlAssign,
                TokenKind::Shr,
                TokenKind::Arrow,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn unterminated_string_is_error() {
        let tokens = Lexer::new("\"abc", "test.c").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Error);
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("// line\nint /* block */ x;"),
            vec![
                TokenKind::Int,
                TokenKind::Identifier,
                TokenKind::Semicolon,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn preprocessor_directive_name_is_tokenized() {
        assert_eq!(kinds("#define FOO"), {
            vec![TokenKind::PpIdentifier, TokenKind::Identifier, TokenKind::Eof]
        });
    }
}
