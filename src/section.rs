//! Multi-line input accumulator
//!
//! A [`Section`] collects source lines until the parentheses balance outside of any
//! string, so console input and files can be fed one line at a time. `#` starts a
//! comment that runs to the end of the line unless it sits inside a string or a
//! character literal.

use crate::ParseError;

#[derive(Debug, Default, Clone)]
pub struct Section {
    /// Inside a double-quoted string; strings may span lines
    in_string: bool,
    depth: i64,
    source: Vec<u8>,
}

impl Section {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one line, dropping its comment
    ///
    /// Fails when a character literal is left open at the end of the line or more
    /// groups have been closed than opened; the line is not kept in that case.
    pub fn feed(&mut self, line: &[u8]) -> Result<(), ParseError> {
        let mut in_string = self.in_string;
        let mut depth = self.depth;
        let mut in_char = false;
        let mut end = line.len();
        let mut i = 0;
        while i < end {
            let c = line[i];
            if in_string {
                match c {
                    b'"' => in_string = false,
                    b'\\' => i += 1,
                    _ => {}
                }
            } else if in_char {
                match c {
                    b'\'' => in_char = false,
                    b'\\' => i += 1,
                    _ => {}
                }
            } else {
                match c {
                    b'(' => depth += 1,
                    b')' => depth -= 1,
                    b'\'' if i + 1 < end => {
                        if line[i + 1] == b'(' && line.get(i + 2) != Some(&b'\'') {
                            depth += 1;
                            i += 1;
                        } else {
                            in_char = true;
                        }
                    }
                    b'"' => in_string = true,
                    b'#' => end = i,
                    _ => {}
                }
            }
            i += 1;
        }

        if in_char || depth < 0 {
            return Err(ParseError::unbalanced());
        }
        self.in_string = in_string;
        self.depth = depth;
        self.source.extend_from_slice(&line[..end]);
        // A stripped comment still ends its line
        if end < line.len() && line.ends_with(b"\n") {
            self.source.push(b'\n');
        }
        Ok(())
    }

    /// True once every group is closed and no string is open
    pub fn is_complete(&self) -> bool {
        self.depth == 0 && !self.in_string
    }

    /// True when nothing but whitespace has been collected
    pub fn is_empty(&self) -> bool {
        self.source.iter().all(u8::is_ascii_whitespace)
    }

    pub fn source(&self) -> &[u8] {
        &self.source
    }

    pub fn into_source(self) -> Vec<u8> {
        self.source
    }
}
