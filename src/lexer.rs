use crate::error::{Span, SyntaxError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    // Single-character tokens
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Comma,
    Colon,
    Dot,
    Question,
    Minus,
    Plus,
    Percent,

    // One or two character tokens
    Star,
    StarStar,
    Slash,
    SlashSlash,
    Bang,
    BangEqual,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    AmpAmp,
    PipePipe,

    // Literals
    Identifier,
    String,
    Integer,
    Float,

    // Special
    Eof,
}

impl TokenType {
    /// How the token is written in source, for error messages.
    pub fn describe(self) -> &'static str {
        match self {
            TokenType::LeftParen => "'('",
            TokenType::RightParen => "')'",
            TokenType::LeftBracket => "'['",
            TokenType::RightBracket => "']'",
            TokenType::Comma => "','",
            TokenType::Colon => "':'",
            TokenType::Dot => "'.'",
            TokenType::Question => "'?'",
            TokenType::Minus => "'-'",
            TokenType::Plus => "'+'",
            TokenType::Percent => "'%'",
            TokenType::Star => "'*'",
            TokenType::StarStar => "'**'",
            TokenType::Slash => "'/'",
            TokenType::SlashSlash => "'//'",
            TokenType::Bang => "'!'",
            TokenType::BangEqual => "'!='",
            TokenType::EqualEqual => "'=='",
            TokenType::Greater => "'>'",
            TokenType::GreaterEqual => "'>='",
            TokenType::Less => "'<'",
            TokenType::LessEqual => "'<='",
            TokenType::AmpAmp => "'&&'",
            TokenType::PipePipe => "'||'",
            TokenType::Identifier => "identifier",
            TokenType::String => "string literal",
            TokenType::Integer => "integer literal",
            TokenType::Float => "float literal",
            TokenType::Eof => "end of input",
        }
    }
}

/// A lexed token.
///
/// For string literals `lexeme` holds the unescaped contents without the
/// surrounding quotes; for everything else it is the exact source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub lexeme: String,
    pub span: Span,
}

impl Token {
    pub fn new(token_type: TokenType, lexeme: String, span: Span) -> Self {
        Self {
            token_type,
            lexeme,
            span,
        }
    }
}

/// Lazily produces tokens from source text.
///
/// Iteration stops after the first error. The end-of-input token is not
/// yielded by the iterator; [`Lexer::scan_tokens`] appends it.
pub struct Lexer<'src> {
    source: &'src str,
    chars: Vec<char>,
    start: usize,
    current: usize,
    failed: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            start: 0,
            current: 0,
            failed: false,
        }
    }

    pub fn scan_tokens(self) -> Result<Vec<Token>, SyntaxError> {
        let end = self.chars.len();
        let mut tokens = self.collect::<Result<Vec<_>, _>>()?;
        tokens.push(Token::new(TokenType::Eof, String::new(), Span::new(end, end)));
        Ok(tokens)
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.chars.len()
    }

    fn skip_whitespace(&mut self) {
        while !self.is_at_end() && self.peek().is_whitespace() {
            self.current += 1;
        }
    }

    fn scan_token(&mut self) -> Result<Token, SyntaxError> {
        let c = self.advance();

        match c {
            '(' => Ok(self.make_token(TokenType::LeftParen)),
            ')' => Ok(self.make_token(TokenType::RightParen)),
            '[' => Ok(self.make_token(TokenType::LeftBracket)),
            ']' => Ok(self.make_token(TokenType::RightBracket)),
            ',' => Ok(self.make_token(TokenType::Comma)),
            ':' => Ok(self.make_token(TokenType::Colon)),
            '.' => Ok(self.make_token(TokenType::Dot)),
            '?' => Ok(self.make_token(TokenType::Question)),
            '-' => Ok(self.make_token(TokenType::Minus)),
            '+' => Ok(self.make_token(TokenType::Plus)),
            '%' => Ok(self.make_token(TokenType::Percent)),
            '*' => Ok(self.one_or_two('*', TokenType::StarStar, TokenType::Star)),
            '/' => Ok(self.one_or_two('/', TokenType::SlashSlash, TokenType::Slash)),
            '!' => Ok(self.one_or_two('=', TokenType::BangEqual, TokenType::Bang)),
            '>' => Ok(self.one_or_two('=', TokenType::GreaterEqual, TokenType::Greater)),
            '<' => Ok(self.one_or_two('=', TokenType::LessEqual, TokenType::Less)),
            '=' => self.required_pair('=', TokenType::EqualEqual, "'==' for equality"),
            '&' => self.required_pair('&', TokenType::AmpAmp, "'&&' for logical and"),
            '|' => self.required_pair('|', TokenType::PipePipe, "'||' for logical or"),
            '\'' | '"' => self.string(c),
            c if c.is_ascii_digit() => self.number(),
            c if c.is_ascii_alphabetic() || c == '_' => Ok(self.identifier()),
            _ => Err(SyntaxError::new(
                self.source,
                Span::single(self.start),
                format!("Unexpected character: '{}'", c),
            )),
        }
    }

    fn advance(&mut self) -> char {
        let c = self.peek();
        self.current += 1;
        c
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.peek() != expected {
            false
        } else {
            self.current += 1;
            true
        }
    }

    fn peek(&self) -> char {
        self.chars.get(self.current).copied().unwrap_or('\0')
    }

    fn one_or_two(&mut self, second: char, pair: TokenType, single: TokenType) -> Token {
        let token_type = if self.match_char(second) { pair } else { single };
        self.make_token(token_type)
    }

    fn required_pair(&mut self, second: char, pair: TokenType, hint: &str) -> Result<Token, SyntaxError> {
        if self.match_char(second) {
            Ok(self.make_token(pair))
        } else {
            let c = self.chars[self.start];
            Err(SyntaxError::new(
                self.source,
                Span::single(self.start),
                format!("Unexpected character: '{}'", c),
            )
            .with_help(format!("Did you mean {}?", hint)))
        }
    }

    fn string(&mut self, quote: char) -> Result<Token, SyntaxError> {
        let mut contents = String::new();

        loop {
            if self.is_at_end() {
                return Err(SyntaxError::new(
                    self.source,
                    Span::single(self.start),
                    "Unterminated string".to_string(),
                )
                .with_help(format!("Close the string with a matching {} quote.", quote)));
            }

            let c = self.advance();
            if c == quote {
                break;
            }
            if c == '\\' && self.peek() == quote {
                self.current += 1;
                contents.push(quote);
            } else {
                contents.push(c);
            }
        }

        Ok(Token::new(
            TokenType::String,
            contents,
            Span::new(self.start, self.current),
        ))
    }

    fn number(&mut self) -> Result<Token, SyntaxError> {
        while self.peek().is_ascii_digit() {
            self.current += 1;
        }

        // A dot directly after the digits makes a float, even with no
        // fractional digits ("2." is 2.0).
        if self.match_char('.') {
            while self.peek().is_ascii_digit() {
                self.current += 1;
            }
            return Ok(self.make_token(TokenType::Float));
        }

        let token = self.make_token(TokenType::Integer);
        if token.lexeme.parse::<i64>().is_err() {
            return Err(SyntaxError::new(
                self.source,
                token.span,
                format!("Integer literal too large: {}", token.lexeme),
            )
            .with_help("Integers are 64-bit; use a float literal for larger magnitudes."));
        }
        Ok(token)
    }

    fn identifier(&mut self) -> Token {
        while self.peek().is_ascii_alphanumeric() || self.peek() == '_' {
            self.current += 1;
        }
        self.make_token(TokenType::Identifier)
    }

    fn make_token(&self, token_type: TokenType) -> Token {
        let text: String = self.chars[self.start..self.current].iter().collect();
        Token::new(token_type, text, Span::new(self.start, self.current))
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, SyntaxError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        self.skip_whitespace();
        if self.is_at_end() {
            return None;
        }

        self.start = self.current;
        let result = self.scan_token();
        self.failed = result.is_err();
        Some(result)
    }
}

/// Tokenize `source`, ending with an [`TokenType::Eof`] token.
pub fn tokenize(source: &str) -> Result<Vec<Token>, SyntaxError> {
    Lexer::new(source).scan_tokens()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenType> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|token| token.token_type)
            .collect()
    }

    #[test]
    fn multi_character_operators_win_over_prefixes() {
        assert_eq!(
            kinds("a ** b // c >= d <= e != f == g && h || !i"),
            vec![
                TokenType::Identifier,
                TokenType::StarStar,
                TokenType::Identifier,
                TokenType::SlashSlash,
                TokenType::Identifier,
                TokenType::GreaterEqual,
                TokenType::Identifier,
                TokenType::LessEqual,
                TokenType::Identifier,
                TokenType::BangEqual,
                TokenType::Identifier,
                TokenType::EqualEqual,
                TokenType::Identifier,
                TokenType::AmpAmp,
                TokenType::Identifier,
                TokenType::PipePipe,
                TokenType::Bang,
                TokenType::Identifier,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn numbers() {
        let tokens = tokenize("01234 2. 16.5").unwrap();
        assert_eq!(tokens[0].token_type, TokenType::Integer);
        assert_eq!(tokens[0].lexeme, "01234");
        assert_eq!(tokens[1].token_type, TokenType::Float);
        assert_eq!(tokens[1].lexeme, "2.");
        assert_eq!(tokens[2].token_type, TokenType::Float);
        assert_eq!(tokens[2].span, Span::new(9, 13));
    }

    #[test]
    fn bare_dot_is_not_a_float() {
        assert_eq!(
            kinds(".5"),
            vec![TokenType::Dot, TokenType::Integer, TokenType::Eof]
        );
    }

    #[test]
    fn strings_unescape_their_own_quote_only() {
        let tokens = tokenize(r#"'foo\'s' "say \"hi\"" 'a\"b' 'c\d'"#).unwrap();
        assert_eq!(tokens[0].lexeme, "foo's");
        assert_eq!(tokens[1].lexeme, "say \"hi\"");
        assert_eq!(tokens[2].lexeme, "a\\\"b");
        assert_eq!(tokens[3].lexeme, "c\\d");
    }

    #[test]
    fn unterminated_string_points_at_opening_quote() {
        let error = tokenize("1 + 'foo").unwrap_err();
        assert_eq!(error.offset, 4);
        assert_eq!(error.message, "Unterminated string");
    }

    #[test]
    fn mismatched_quote_does_not_close() {
        assert!(tokenize("'foo\"").is_err());
    }

    #[test]
    fn unknown_character_is_reported_at_its_offset() {
        let error = tokenize("a = b").unwrap_err();
        assert_eq!(error.offset, 2);
        let error = tokenize("a & b").unwrap_err();
        assert_eq!(error.offset, 2);
        let error = tokenize("x @").unwrap_err();
        assert_eq!(error.offset, 2);
    }

    #[test]
    fn offsets_count_characters() {
        let tokens = tokenize("'héllo' + x").unwrap();
        assert_eq!(tokens[1].span, Span::new(8, 9));
        assert_eq!(tokens[2].span, Span::new(10, 11));
    }

    #[test]
    fn lexer_stops_after_first_error() {
        let results: Vec<_> = Lexer::new("a # b").collect();
        assert_eq!(results.len(), 2);
        assert!(results[1].is_err());
    }

    #[test]
    fn oversized_integer_is_rejected() {
        assert!(tokenize("99999999999999999999").is_err());
    }
}
