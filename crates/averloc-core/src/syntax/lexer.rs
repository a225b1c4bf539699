//! Tokenizer for the Java subset the engine understands.
//!
//! Comments are dropped; everything else becomes a [`Token`].

use super::ParseErrorKind;

/// Lexical category of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier or keyword.
    Ident,
    /// Numeric literal.
    Number,
    /// String literal, quotes included.
    Str,
    /// Character literal, quotes included.
    Char,
    /// Text block, triple quotes included.
    TextBlock,
    /// Operator, separator or delimiter.
    Punct,
}

/// A single lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// 1-based line of the first character; 0 for synthesized tokens.
    pub line: u32,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            line: 0,
        }
    }

    pub fn is_ident(&self) -> bool {
        self.kind == TokenKind::Ident
    }

    pub fn is_punct(&self, s: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == s
    }
}

/// Multi-character operators, longest first.
const OPERATORS: &[&str] = &[
    ">>>=", "<<=", ">>=", ">>>", "...", "->", "::", "++", "--", "&&", "||", "==", "!=", "<=",
    ">=", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<", ">>",
];

const SINGLE: &str = "(){}[];,.@=><!~?:+-*/&|^%";

/// Lexing failure with the line it occurred on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub line: u32,
    pub kind: ParseErrorKind,
}

struct Lexer<'a> {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    src: &'a str,
}

/// Tokenize `src`.
pub fn tokenize(src: &str) -> Result<Vec<Token>, LexError> {
    Lexer {
        chars: src.chars().collect(),
        pos: 0,
        line: 1,
        src,
    }
    .run()
}

impl Lexer<'_> {
    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek(0)?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn error(&self, line: u32, kind: ParseErrorKind) -> LexError {
        LexError { line, kind }
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::with_capacity(self.src.len() / 3);

        while let Some(c) = self.peek(0) {
            let line = self.line;

            if c.is_whitespace() {
                self.bump();
            } else if c == '/' && self.peek(1) == Some('/') {
                while let Some(c) = self.peek(0) {
                    if c == '\n' {
                        break;
                    }
                    self.bump();
                }
            } else if c == '/' && self.peek(1) == Some('*') {
                self.block_comment(line)?;
            } else if c.is_alphabetic() || c == '_' || c == '$' {
                let text = self.take_while(|c| c.is_alphanumeric() || c == '_' || c == '$');
                tokens.push(self.token(TokenKind::Ident, text, line));
            } else if c.is_ascii_digit() || (c == '.' && self.peek(1).is_some_and(|d| d.is_ascii_digit())) {
                let text = self.number();
                tokens.push(self.token(TokenKind::Number, text, line));
            } else if c == '"' && self.peek(1) == Some('"') && self.peek(2) == Some('"') {
                let text = self.text_block(line)?;
                tokens.push(self.token(TokenKind::TextBlock, text, line));
            } else if c == '"' {
                let text = self.quoted('"', ParseErrorKind::UnterminatedString, line)?;
                tokens.push(self.token(TokenKind::Str, text, line));
            } else if c == '\'' {
                let text = self.quoted('\'', ParseErrorKind::UnterminatedChar, line)?;
                tokens.push(self.token(TokenKind::Char, text, line));
            } else if let Some(op) = self.operator() {
                tokens.push(self.token(TokenKind::Punct, op, line));
            } else {
                return Err(self.error(line, ParseErrorKind::UnexpectedChar(c)));
            }
        }

        Ok(tokens)
    }

    fn token(&self, kind: TokenKind, text: String, line: u32) -> Token {
        Token { kind, text, line }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut text = String::new();
        while let Some(c) = self.peek(0) {
            if !pred(c) {
                break;
            }
            text.push(c);
            self.bump();
        }
        text
    }

    fn number(&mut self) -> String {
        let mut text = String::new();
        loop {
            text.push_str(&self.take_while(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.'));

            let hex = text.starts_with("0x") || text.starts_with("0X");
            let exponent = if hex {
                text.ends_with(['p', 'P'])
            } else {
                text.ends_with(['e', 'E'])
            };

            match self.peek(0) {
                Some(sign @ ('+' | '-')) if exponent => {
                    text.push(sign);
                    self.bump();
                }
                _ => return text,
            }
        }
    }

    fn quoted(&mut self, quote: char, unterminated: ParseErrorKind, line: u32) -> Result<String, LexError> {
        let mut text = String::new();
        text.push(quote);
        self.bump();

        loop {
            match self.bump() {
                Some('\\') => {
                    text.push('\\');
                    match self.bump() {
                        Some('\n') | None => return Err(self.error(line, unterminated)),
                        Some(c) => text.push(c),
                    }
                }
                Some('\n') | None => return Err(self.error(line, unterminated)),
                Some(c) if c == quote => {
                    text.push(c);
                    return Ok(text);
                }
                Some(c) => text.push(c),
            }
        }
    }

    fn text_block(&mut self, line: u32) -> Result<String, LexError> {
        let mut text = String::from("\"\"\"");
        self.pos += 3;

        loop {
            if self.peek(0) == Some('"') && self.peek(1) == Some('"') && self.peek(2) == Some('"') {
                self.pos += 3;
                text.push_str("\"\"\"");
                return Ok(text);
            }
            match self.bump() {
                Some('\\') => {
                    text.push('\\');
                    if let Some(c) = self.bump() {
                        text.push(c);
                    }
                }
                Some(c) => text.push(c),
                None => return Err(self.error(line, ParseErrorKind::UnterminatedTextBlock)),
            }
        }
    }

    fn block_comment(&mut self, line: u32) -> Result<(), LexError> {
        self.pos += 2;
        loop {
            match self.bump() {
                Some('*') if self.peek(0) == Some('/') => {
                    self.pos += 1;
                    return Ok(());
                }
                Some(_) => {}
                None => return Err(self.error(line, ParseErrorKind::UnterminatedComment)),
            }
        }
    }

    fn operator(&mut self) -> Option<String> {
        for op in OPERATORS {
            let len = op.chars().count();
            if self.chars.len() >= self.pos + len
                && op.chars().zip(&self.chars[self.pos..]).all(|(a, b)| a == *b)
            {
                self.pos += len;
                return Some((*op).to_string());
            }
        }

        let c = self.peek(0)?;
        if SINGLE.contains(c) {
            self.pos += 1;
            Some(c.to_string())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(src: &str) -> Vec<String> {
        tokenize(src).unwrap().into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn test_basic_tokens() {
        assert_eq!(
            texts("int x = a >>= 2; // trailing"),
            vec!["int", "x", "=", "a", ">>=", "2", ";"]
        );
    }

    #[test]
    fn test_literals() {
        let tokens = tokenize(r#"s = "a\"b"; c = '\n'; d = 1.5e-3f; h = 0x1F;"#).unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();

        assert_eq!(tokens[2].text, r#""a\"b""#);
        assert_eq!(kinds[2], TokenKind::Str);
        assert_eq!(tokens[6].text, r"'\n'");
        assert_eq!(kinds[6], TokenKind::Char);
        assert_eq!(tokens[10].text, "1.5e-3f");
        assert_eq!(tokens[14].text, "0x1F");
    }

    #[test]
    fn test_block_comment_tracks_lines() {
        let tokens = tokenize("/* a\n b */\nfoo").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].line, 3);
    }

    #[test]
    fn test_text_block() {
        let tokens = tokenize("x = \"\"\"\nhello \"q\"\n\"\"\";").unwrap();
        assert_eq!(tokens[2].kind, TokenKind::TextBlock);
        assert_eq!(tokens[3].text, ";");
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("x = \"open\ny").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnterminatedString);
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_unterminated_comment() {
        let err = tokenize("a /* never closed").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnterminatedComment);
    }

    #[test]
    fn test_unexpected_char() {
        let err = tokenize("int #x;").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedChar('#'));
    }
}
