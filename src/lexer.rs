//! Byte-level tokenizer for contract source
//!
//! Token rules are tried in a fixed priority order at every position: punctuation,
//! integer, float, character literal, string, symbol. Numeric, character and
//! string tokens only match when a boundary (whitespace, `(`, `)` or the end of
//! input) follows; otherwise the bytes fall through to the symbol rule, so `12ab`
//! is a symbol and `5.` is a symbol.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take, take_while1, take_while_m_n},
    character::complete::one_of,
    combinator::{map, map_opt, opt, recognize, value},
    error::ErrorKind,
    sequence::{delimited, preceded, terminated},
};

use crate::ParseError;
use crate::ast::Value;

/// Most decimal digits accepted in an integer or in the integer part of a float
const MAX_DIGITS: usize = 16;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Open,
    /// `'(`, the opener of a quasi list
    QuasiOpen,
    Close,
    Atom(Value),
}

fn is_space(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

fn is_boundary(c: u8) -> bool {
    is_space(c) || c == b'(' || c == b')'
}

fn fail<T>(input: &[u8], kind: ErrorKind) -> IResult<&[u8], T> {
    Err(nom::Err::Error(nom::error::Error::new(input, kind)))
}

/// Succeeds without consuming when the next byte ends a token
fn at_boundary(input: &[u8]) -> IResult<&[u8], ()> {
    match input.first() {
        Some(&c) if !is_boundary(c) => fail(input, ErrorKind::Verify),
        _ => Ok((input, ())),
    }
}

fn decimal_digits(input: &[u8]) -> IResult<&[u8], &[u8]> {
    take_while_m_n(1, MAX_DIGITS, |c: u8| c.is_ascii_digit()).parse(input)
}

fn int_lexeme(input: &[u8]) -> IResult<&[u8], &[u8]> {
    recognize((opt(one_of("+-")), decimal_digits)).parse(input)
}

fn float_lexeme(input: &[u8]) -> IResult<&[u8], &[u8]> {
    let fraction = || recognize((tag("."), take_while1(|c: u8| c.is_ascii_digit())));
    let exponent = recognize((one_of("eE"), int_lexeme));
    recognize((
        opt(one_of("+-")),
        alt((recognize((decimal_digits, opt(fraction()))), fraction())),
        opt(exponent),
    ))
    .parse(input)
}

fn lexeme_text(bytes: &[u8]) -> Result<&str, std::str::Utf8Error> {
    std::str::from_utf8(bytes)
}

fn integer_value(input: &[u8]) -> IResult<&[u8], i64> {
    map_opt(int_lexeme, |lexeme| lexeme_text(lexeme).ok()?.parse::<i64>().ok()).parse(input)
}

fn float_value(input: &[u8]) -> IResult<&[u8], f64> {
    map_opt(float_lexeme, |lexeme| {
        lexeme_text(lexeme).ok()?.parse::<f64>().ok()
    })
    .parse(input)
}

/// Read a signed decimal integer from the start of `bytes`
///
/// Returns the value and the number of bytes consumed; trailing bytes are ignored.
pub(crate) fn parse_int(bytes: &[u8]) -> Option<(i64, usize)> {
    integer_value(bytes)
        .ok()
        .map(|(rest, n)| (n, bytes.len() - rest.len()))
}

/// Read a decimal float (optional fraction and exponent) from the start of `bytes`
pub(crate) fn parse_float(bytes: &[u8]) -> Option<(f64, usize)> {
    float_value(bytes)
        .ok()
        .map(|(rest, x)| (x, bytes.len() - rest.len()))
}

fn punctuation(input: &[u8]) -> IResult<&[u8], Token> {
    match input {
        [b'\'', b'(', next, ..] if *next != b'\'' => Ok((&input[2..], Token::QuasiOpen)),
        [b'(', ..] => Ok((&input[1..], Token::Open)),
        [b')', ..] => Ok((&input[1..], Token::Close)),
        _ => fail(input, ErrorKind::Tag),
    }
}

fn radix_value(digits: &[u8], radix: u32) -> Option<i64> {
    let text = lexeme_text(digits).ok()?;
    i64::from_str_radix(text, radix).ok()
}

/// The escape body after a backslash inside a character literal
fn escape(input: &[u8]) -> IResult<&[u8], i64> {
    alt((
        map_opt(
            take_while_m_n(1, 3, |c: u8| matches!(c, b'0'..=b'7')),
            |digits| radix_value(digits, 8).filter(|n| *n < 256),
        ),
        map_opt(
            preceded(one_of("xX"), take_while_m_n(2, 2, |c: u8| c.is_ascii_hexdigit())),
            |digits| radix_value(digits, 16),
        ),
        map_opt(
            preceded(one_of("uU"), take_while_m_n(4, 4, |c: u8| c.is_ascii_hexdigit())),
            |digits| radix_value(digits, 16),
        ),
        value(0x09, tag("t")),
        value(0x0d, tag("r")),
        value(0x0a, tag("n")),
        value(0x0b, tag("v")),
        value(0x0c, tag("f")),
        map(take(1usize), |c: &[u8]| i64::from(c[0])),
    ))
    .parse(input)
}

/// One UTF-8 encoded character as its code point
fn utf8_char(input: &[u8]) -> IResult<&[u8], i64> {
    let width = match input.first().copied() {
        Some(0x00..=0x7f) => 1,
        Some(0xc0..=0xdf) => 2,
        Some(0xe0..=0xef) => 3,
        Some(0xf0..=0xf7) => 4,
        _ => return fail(input, ErrorKind::Char),
    };
    let decoded = input
        .get(..width)
        .and_then(|bytes| std::str::from_utf8(bytes).ok())
        .and_then(|text| text.chars().next());
    match decoded {
        Some(c) => Ok((&input[width..], i64::from(u32::from(c)))),
        None => fail(input, ErrorKind::Char),
    }
}

fn char_literal(input: &[u8]) -> IResult<&[u8], i64> {
    delimited(
        tag("'"),
        alt((preceded(tag("\\"), escape), utf8_char)),
        tag("'"),
    )
    .parse(input)
}

/// Raw bytes between double quotes; a backslash keeps the next byte in the string
fn string_literal(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    let (body, _) = tag("\"").parse(input)?;
    let mut i = 0;
    while i < body.len() && body[i] != b'"' {
        if body[i] == b'\\' {
            i += 1;
        }
        i += 1;
    }
    if i >= body.len() {
        return fail(input, ErrorKind::Char);
    }
    Ok((&body[i + 1..], body[..i].to_vec()))
}

fn symbol(input: &[u8]) -> IResult<&[u8], String> {
    map(take_while1(|c: u8| !is_boundary(c)), |name: &[u8]| {
        String::from_utf8_lossy(name).into_owned()
    })
    .parse(input)
}

fn token(input: &[u8]) -> IResult<&[u8], Token> {
    alt((
        punctuation,
        map(terminated(integer_value, at_boundary), |n| {
            Token::Atom(Value::Integer(n))
        }),
        map(terminated(float_value, at_boundary), |x| {
            Token::Atom(Value::Float(x))
        }),
        map(terminated(char_literal, at_boundary), |c| {
            Token::Atom(Value::Integer(c))
        }),
        map(terminated(string_literal, at_boundary), |s| {
            Token::Atom(Value::String(s))
        }),
        map(symbol, |name| Token::Atom(Value::Symbol(name))),
    ))
    .parse(input)
}

/// Split source bytes into tokens
pub fn scan(input: &[u8]) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut rest = input;
    loop {
        let skipped = rest.iter().take_while(|&&c| is_space(c)).count();
        rest = &rest[skipped..];
        if rest.is_empty() {
            return Ok(tokens);
        }
        match token(rest) {
            Ok((next, tok)) => {
                tokens.push(tok);
                rest = next;
            }
            Err(_) => return Err(ParseError::trailing(input, input.len() - rest.len())),
        }
    }
}
