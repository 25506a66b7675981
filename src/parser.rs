//! Groups scanned tokens into expression trees.
//!
//! `(`...`)` runs become [`Value::List`] and `'(`...`)` runs become
//! [`Value::QuasiList`]; every other token is already an atom. Nesting is limited
//! to [`MAX_PARSE_DEPTH`] levels so hostile input cannot exhaust the stack.

use crate::ast::Value;
use crate::lexer::{Token, scan};
use crate::{MAX_PARSE_DEPTH, ParseError, ParseErrorKind};

/// Build the top-level forms of a token stream
pub fn tree(tokens: &[Token]) -> Result<Vec<Value>, ParseError> {
    let mut pos = 0;
    group(tokens, &mut pos, 0)
}

/// Scan and group source bytes
pub fn parse(source: &[u8]) -> Result<Vec<Value>, ParseError> {
    tree(&scan(source)?)
}

/// Collect items up to the close matching the opener at `depth`
fn group(tokens: &[Token], pos: &mut usize, depth: usize) -> Result<Vec<Value>, ParseError> {
    let mut items = Vec::new();
    while let Some(token) = tokens.get(*pos) {
        *pos += 1;
        let item = match token {
            Token::Atom(value) => value.clone(),
            Token::Close if depth > 0 => return Ok(items),
            Token::Close => return Err(ParseError::unbalanced()),
            Token::Open => Value::List(nested(tokens, pos, depth)?),
            Token::QuasiOpen => Value::QuasiList(nested(tokens, pos, depth)?),
        };
        items.push(item);
    }
    if depth > 0 {
        return Err(ParseError::unbalanced());
    }
    Ok(items)
}

fn nested(tokens: &[Token], pos: &mut usize, depth: usize) -> Result<Vec<Value>, ParseError> {
    if depth >= MAX_PARSE_DEPTH {
        return Err(ParseError::from_message(
            ParseErrorKind::TooDeeplyNested,
            format!("expression too deeply nested (max depth: {MAX_PARSE_DEPTH})"),
        ));
    }
    group(tokens, pos, depth + 1)
}
