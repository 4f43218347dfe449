use std::{iter::Peekable, str::CharIndices};

use crate::diagnostics::{Diagnostic, DiagnosticKind, SourceSpan};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyword {
    Var,
    Mut,
    Const,
    Fn,
    If,
    Else,
    When,
    Loop,
    While,
    For,
    In,
    Break,
    Continue,
    Return,
    True,
    False,
    None,
    This,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Number,
    String,
    Keyword(Keyword),
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Colon,
    Semicolon,
    Arrow,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Pipe,
    DoubleAmpersand,
    DoublePipe,
    Bang,
    BangEqual,
    EqualEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Eof,
}

/// A token. For strings `lexeme` holds the unescaped contents; for
/// everything else it is the source slice.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub span: SourceSpan,
}

pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
        }
    }

    /// Splits the whole source. The last token is always `Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Token>, Diagnostic> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        let end = self.source.len();
        tokens.push(Token {
            kind: TokenKind::Eof,
            lexeme: String::new(),
            span: SourceSpan::new(end, end),
        });
        Ok(tokens)
    }

    fn offset(&mut self) -> usize {
        self.chars
            .peek()
            .map_or(self.source.len(), |&(idx, _)| idx)
    }

    fn rest(&mut self) -> &'a str {
        let source = self.source;
        &source[self.offset()..]
    }

    fn eat(&mut self, expected: char) -> bool {
        self.chars.next_if(|&(_, ch)| ch == expected).is_some()
    }

    fn eat_while(&mut self, mut predicate: impl FnMut(char) -> bool) {
        while self.chars.next_if(|&(_, ch)| predicate(ch)).is_some() {}
    }

    fn either(&mut self, second: char, joined: TokenKind, single: TokenKind) -> TokenKind {
        if self.eat(second) {
            joined
        } else {
            single
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, Diagnostic> {
        use self::TokenKind as Tk;

        self.skip_trivia()?;
        let Some((start, ch)) = self.chars.next() else {
            return Ok(None);
        };

        let kind = match ch {
            _ if ch.is_ascii_alphabetic() || ch == '_' => {
                self.eat_while(continues_identifier);
                let end = self.offset();
                keyword_for(&self.source[start..end]).unwrap_or(Tk::Identifier)
            }
            '0'..='9' => {
                self.number();
                Tk::Number
            }
            '"' | '\'' => return self.string(start, ch).map(Some),
            '(' => Tk::LParen,
            ')' => Tk::RParen,
            '{' => Tk::LBrace,
            '}' => Tk::RBrace,
            '[' => Tk::LBracket,
            ']' => Tk::RBracket,
            ',' => Tk::Comma,
            '.' => Tk::Dot,
            ':' => Tk::Colon,
            ';' => Tk::Semicolon,
            '+' => Tk::Plus,
            '*' => Tk::Star,
            '/' => Tk::Slash,
            '%' => Tk::Percent,
            '-' => self.either('>', Tk::Arrow, Tk::Minus),
            '=' => self.either('=', Tk::EqualEqual, Tk::Assign),
            '!' => self.either('=', Tk::BangEqual, Tk::Bang),
            '<' => self.either('=', Tk::LessEqual, Tk::Less),
            '>' => self.either('=', Tk::GreaterEqual, Tk::Greater),
            '|' => self.either('|', Tk::DoublePipe, Tk::Pipe),
            '&' if self.eat('&') => Tk::DoubleAmpersand,
            other => {
                let span = SourceSpan::new(start, start + other.len_utf8());
                return Err(Diagnostic::new(
                    DiagnosticKind::Lexer,
                    format!("unexpected character `{other}`"),
                )
                .with_span(span));
            }
        };

        let end = self.offset();
        Ok(Some(Token {
            kind,
            lexeme: self.source[start..end].to_string(),
            span: SourceSpan::new(start, end),
        }))
    }

    fn skip_trivia(&mut self) -> Result<(), Diagnostic> {
        loop {
            self.eat_while(char::is_whitespace);
            let rest = self.rest();
            if rest.starts_with("//") {
                self.eat_while(|ch| ch != '\n');
            } else if rest.starts_with("/*") {
                self.block_comment()?;
            } else {
                return Ok(());
            }
        }
    }

    /// Block comments nest.
    fn block_comment(&mut self) -> Result<(), Diagnostic> {
        let start = self.offset();
        self.chars.nth(1);
        let mut depth = 1usize;
        while let Some((_, ch)) = self.chars.next() {
            match ch {
                '/' if self.eat('*') => depth += 1,
                '*' if self.eat('/') => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
        Err(Diagnostic::new(DiagnosticKind::Lexer, "unterminated block comment")
            .with_span(SourceSpan::new(start, self.source.len())))
    }

    /// Digits with optional `_` separators, a fraction and an exponent. A dot
    /// only starts a fraction when a digit follows it.
    fn number(&mut self) {
        let digits = |ch: char| ch.is_ascii_digit() || ch == '_';
        self.eat_while(digits);

        let rest = self.rest();
        if rest.starts_with('.') && rest[1..].starts_with(|ch: char| ch.is_ascii_digit()) {
            self.chars.next();
            self.eat_while(digits);
        }
        if self.chars.next_if(|&(_, ch)| ch == 'e' || ch == 'E').is_some() {
            self.chars.next_if(|&(_, ch)| ch == '+' || ch == '-');
            self.eat_while(|ch| ch.is_ascii_digit());
        }
    }

    fn string(&mut self, start: usize, quote: char) -> Result<Token, Diagnostic> {
        let mut value = String::new();
        while let Some((idx, ch)) = self.chars.next() {
            match ch {
                _ if ch == quote => {
                    return Ok(Token {
                        kind: TokenKind::String,
                        lexeme: value,
                        span: SourceSpan::new(start, idx + 1),
                    });
                }
                '\\' => match self.chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 'r')) => value.push('\r'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, escaped)) => value.push(escaped),
                    None => break,
                },
                _ => value.push(ch),
            }
        }
        Err(
            Diagnostic::new(DiagnosticKind::Lexer, "unterminated string literal")
                .with_span(SourceSpan::new(start, self.source.len())),
        )
    }
}

fn continues_identifier(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

fn keyword_for(ident: &str) -> Option<TokenKind> {
    use self::Keyword as Kw;
    let keyword = match ident {
        "var" => Kw::Var,
        "mut" => Kw::Mut,
        "const" => Kw::Const,
        "fn" => Kw::Fn,
        "if" => Kw::If,
        "else" => Kw::Else,
        "when" => Kw::When,
        "loop" => Kw::Loop,
        "while" => Kw::While,
        "for" => Kw::For,
        "in" => Kw::In,
        "break" => Kw::Break,
        "continue" => Kw::Continue,
        "return" => Kw::Return,
        "true" => Kw::True,
        "false" => Kw::False,
        "none" => Kw::None,
        "this" => Kw::This,
        _ => return None,
    };
    Some(TokenKind::Keyword(keyword))
}

/// Whether `name` can be declared as a binding: identifier syntax, not a keyword.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(continues_identifier) && keyword_for(name).is_none()
}
