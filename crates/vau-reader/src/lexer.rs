use vau_core::{Span, VauError};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LParen,
    RParen,
    /// Raw number text; validated and converted by the parser.
    Number(String),
    String(String),
    Symbol(String),
}

#[derive(Debug, Clone)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
}

impl Lexer {
    fn new(input: &str) -> Self {
        Lexer {
            chars: input.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn span(&self) -> Span {
        Span::new(self.line, self.col)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    /// `keyword` at the cursor, followed by whitespace or end of input.
    fn at_keyword(&self, keyword: &str) -> bool {
        let mut len = 0;
        for (i, expected) in keyword.chars().enumerate() {
            if self.peek_at(i) != Some(expected) {
                return false;
            }
            len = i + 1;
        }
        self.peek_at(len).map_or(true, char::is_whitespace)
    }

    fn skip_disabled_block(&mut self) -> Result<(), VauError> {
        let span = self.span();
        for _ in 0.."#skip".len() {
            self.bump();
        }
        while self.peek().is_some() {
            if self.at_keyword("#end") {
                for _ in 0.."#end".len() {
                    self.bump();
                }
                return Ok(());
            }
            self.bump();
        }
        Err(VauError::reader("unterminated #skip block", span))
    }

    fn skip_trivia(&mut self) -> Result<(), VauError> {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.bump();
            } else if ch == ';' {
                while self.peek().is_some_and(|c| c != '\n') {
                    self.bump();
                }
            } else if self.at_keyword("#skip") {
                self.skip_disabled_block()?;
            } else {
                break;
            }
        }
        Ok(())
    }

    fn read_string(&mut self, span: Span) -> Result<String, VauError> {
        self.bump(); // opening quote
        let mut result = String::new();
        loop {
            match self.bump() {
                None => return Err(VauError::reader("unterminated string", span)),
                Some('"') => return Ok(result),
                Some('\\') => match self.bump() {
                    None => return Err(VauError::reader("unterminated string", span)),
                    Some('n') => result.push('\n'),
                    Some('t') => result.push('\t'),
                    Some('e') => result.push('\x1b'),
                    Some(other) => result.push(other),
                },
                Some(ch) => result.push(ch),
            }
        }
    }

    fn read_atom_text(&mut self) -> String {
        let mut text = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() || matches!(ch, '(' | ')' | ';' | '"') {
                break;
            }
            text.push(ch);
            self.bump();
        }
        text
    }

    /// Number text, including a parenthesised repeating tail such as `0.1(6)`.
    fn read_number_text(&mut self, span: Span) -> Result<String, VauError> {
        let mut text = self.read_atom_text();
        let repeating_allowed = text
            .split_once('.')
            .is_some_and(|(_, frac)| frac.bytes().all(|b| b.is_ascii_digit()));
        if repeating_allowed && self.peek() == Some('(') {
            text.push('(');
            self.bump();
            loop {
                match self.bump() {
                    Some(')') => break,
                    Some(ch) if ch.is_ascii_digit() => text.push(ch),
                    _ => return Err(VauError::reader("unterminated repeating decimal", span)),
                }
            }
            text.push(')');
        }
        Ok(text)
    }
}

fn starts_number(ch: char, next: Option<char>) -> bool {
    ch.is_ascii_digit() || (ch == '-' && next.is_some_and(|c| c.is_ascii_digit()))
}

pub fn tokenize(input: &str) -> Result<Vec<SpannedToken>, VauError> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();

    loop {
        lexer.skip_trivia()?;
        let Some(ch) = lexer.peek() else {
            break;
        };
        let span = lexer.span();
        let token = match ch {
            '(' => {
                lexer.bump();
                Token::LParen
            }
            ')' => {
                lexer.bump();
                Token::RParen
            }
            '"' => Token::String(lexer.read_string(span)?),
            _ if starts_number(ch, lexer.peek_at(1)) => {
                Token::Number(lexer.read_number_text(span)?)
            }
            _ => Token::Symbol(lexer.read_atom_text()),
        };
        tokens.push(SpannedToken { token, span });
    }

    Ok(tokens)
}
