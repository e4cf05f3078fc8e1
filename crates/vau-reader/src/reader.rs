use std::rc::Rc;

use vau_core::{Number, Span, Value, VauError};

use crate::lexer::{tokenize, SpannedToken, Token};

struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
    end: Span,
}

impl Parser {
    fn new(tokens: Vec<SpannedToken>, end: Span) -> Self {
        Parser {
            tokens,
            pos: 0,
            end,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn span(&self) -> Span {
        self.tokens.get(self.pos).map_or(self.end, |t| t.span)
    }

    fn advance(&mut self) -> Option<&SpannedToken> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn parse_expr(&mut self) -> Result<Value, VauError> {
        let span = self.span();
        match self.advance().map(|t| t.token.clone()) {
            None => Err(VauError::reader("unexpected end of input", span)),
            Some(Token::LParen) => self.parse_list(span),
            Some(Token::RParen) => Err(VauError::reader("unexpected ')'", span)),
            Some(Token::Number(text)) => Number::parse(&text)
                .map(Value::number)
                .map_err(|e| VauError::reader(e.message(), span)),
            Some(Token::String(s)) => Ok(Value::String(Rc::new(s))),
            Some(Token::Symbol(s)) => Ok(Value::symbol(&s)),
        }
    }

    fn parse_list(&mut self, open: Span) -> Result<Value, VauError> {
        let mut items = Vec::new();
        loop {
            match self.peek() {
                None => return Err(VauError::reader("unterminated list", open)),
                Some(Token::RParen) => {
                    self.advance();
                    return Ok(Value::list(items));
                }
                Some(_) => items.push(self.parse_expr()?),
            }
        }
    }
}

fn end_span(input: &str) -> Span {
    let line = input.matches('\n').count() + 1;
    let col = input.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
    Span::new(line, col)
}

/// Read the first expression in `input`. Empty input reads as nil.
pub fn read(input: &str) -> Result<Value, VauError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Ok(Value::Nil);
    }
    let mut parser = Parser::new(tokens, end_span(input));
    parser.parse_expr()
}

/// Read every expression in `input`.
pub fn read_many(input: &str) -> Result<Vec<Value>, VauError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser::new(tokens, end_span(input));
    let mut exprs = Vec::new();
    while parser.peek().is_some() {
        exprs.push(parser.parse_expr()?);
    }
    Ok(exprs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_integer() {
        assert_eq!(read("42").unwrap(), Value::integer(42));
        assert_eq!(read("-17").unwrap(), Value::integer(-17));
    }

    #[test]
    fn read_rationals() {
        assert_eq!(read("22/7").unwrap().to_string(), "3.(142857)");
        assert_eq!(read("0.1(6)").unwrap(), read("1/6").unwrap());
        assert_eq!(read("-0.(9)").unwrap(), Value::integer(-1));
        assert_eq!(read("1.0").unwrap(), Value::integer(1));
    }

    #[test]
    fn zero_denominator_is_a_reader_error() {
        let err = read("1/0").unwrap_err();
        assert!(matches!(err, VauError::Reader { .. }));
    }

    #[test]
    fn invalid_number_is_a_reader_error() {
        let err = read("12abc").unwrap_err();
        assert!(err.to_string().contains("invalid number: 12abc"));
    }

    #[test]
    fn read_string_and_symbol() {
        assert_eq!(read("\"hi\"").unwrap(), Value::string("hi"));
        assert_eq!(read("define-mutable").unwrap(), Value::symbol("define-mutable"));
        assert_eq!(read("set!").unwrap(), Value::symbol("set!"));
    }

    #[test]
    fn empty_list_is_nil() {
        assert_eq!(read("()").unwrap(), Value::Nil);
        assert_eq!(read("").unwrap(), Value::Nil);
    }

    #[test]
    fn lists_are_proper_pair_chains() {
        let v = read("(a (b 1) \"c\")").unwrap();
        assert_eq!(v.to_string(), "(a (b 1) \"c\")");
        assert_eq!(v.to_vec().unwrap().len(), 3);
    }

    #[test]
    fn read_returns_only_the_first_expression() {
        assert_eq!(read("1 2 3").unwrap(), Value::integer(1));
    }

    #[test]
    fn read_many_exprs() {
        let exprs = read_many("(define x 5)\nx ; comment\n").unwrap();
        assert_eq!(exprs.len(), 2);
        assert_eq!(exprs[1], Value::symbol("x"));
        assert!(read_many("  ; nothing\n").unwrap().is_empty());
    }

    #[test]
    fn unterminated_list_reports_opening_span() {
        let err = read("\n  (a b").unwrap_err();
        match err {
            VauError::Reader { message, span } => {
                assert_eq!(message, "unterminated list");
                assert_eq!(span, Span::new(2, 3));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn stray_close_paren_is_an_error() {
        let err = read_many("a )").unwrap_err();
        assert!(err.to_string().contains("unexpected ')'"));
    }

    #[test]
    fn deep_nesting_reads() {
        let depth = 200;
        let text = format!("{}x{}", "(".repeat(depth), ")".repeat(depth));
        let mut v = read(&text).unwrap();
        for _ in 0..depth {
            v = v.first("first").unwrap();
        }
        assert_eq!(v, Value::symbol("x"));
    }
}
