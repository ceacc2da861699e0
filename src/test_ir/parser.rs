//! Test IR parser implementation.

use hashbrown::HashMap;
use thiserror::Error;

use crate::ir::{AluInstr, AluOp, AluSrc};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

pub fn parse_program(text: &str) -> Result<Vec<AluInstr>, ParseError> {
    Parser::new(text).parse()
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
    line: usize,

    /// Line on which each SSA value was defined.
    defined: HashMap<u32, usize>,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            line: 1,
            defined: HashMap::new(),
        }
    }

    fn parse(mut self) -> Result<Vec<AluInstr>, ParseError> {
        let mut program = Vec::new();

        loop {
            self.skip_whitespace(true);
            if self.is_eof() {
                break;
            }

            program.push(self.parse_instr()?);

            self.skip_whitespace(false);
            match self.current_char() {
                None | Some('\n') => {}
                Some(ch) => return Err(self.error(format!("Unexpected '{}' after instruction", ch))),
            }
        }

        Ok(program)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            line: self.line,
            message: message.into(),
        }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn current_char(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            if ch == '\n' {
                self.line += 1;
            }
            self.pos += ch.len_utf8();
        }
    }

    fn skip_whitespace(&mut self, skip_newlines: bool) {
        while let Some(ch) = self.current_char() {
            if ch == ';' {
                // Comment runs to the end of the line
                while let Some(ch) = self.current_char() {
                    if ch == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else if ch.is_whitespace() {
                if ch == '\n' && !skip_newlines {
                    break;
                }
                self.advance();
            } else {
                break;
            }
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace(false);
        if self.current_char() == Some(expected) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!(
                "Expected '{}' but found {:?}",
                expected,
                self.current_char()
            )))
        }
    }

    fn read_identifier(&mut self) -> Result<&'a str, ParseError> {
        self.skip_whitespace(false);
        let start = self.pos;

        match self.current_char() {
            Some(ch) if ch.is_ascii_alphabetic() => {}
            Some(ch) => return Err(self.error(format!("Expected identifier but found '{}'", ch))),
            None => return Err(self.error("Expected identifier but found EOF")),
        }

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }

        Ok(&self.text[start..self.pos])
    }

    fn read_number(&mut self) -> Result<u32, ParseError> {
        let start = self.pos;
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }

        let digits = &self.text[start..self.pos];
        if digits.is_empty() {
            return Err(self.error(format!(
                "Expected number but found {:?}",
                self.current_char()
            )));
        }
        digits
            .parse()
            .map_err(|_| self.error(format!("Number '{}' out of range", digits)))
    }

    fn read_value(&mut self) -> Result<u32, ParseError> {
        self.expect('%')?;
        self.read_number()
    }

    fn read_component(&mut self) -> Result<u8, ParseError> {
        if self.current_char() != Some('.') {
            return Ok(0);
        }
        self.advance();

        let component = match self.current_char() {
            Some('x') => 0,
            Some('y') => 1,
            Some('z') => 2,
            Some('w') => 3,
            other => return Err(self.error(format!("Invalid swizzle component {:?}", other))),
        };
        self.advance();
        Ok(component)
    }

    /// `%5:f32 = fexp2 %0.y`
    fn parse_instr(&mut self) -> Result<AluInstr, ParseError> {
        let line = self.line;
        let dest = self.read_value()?;

        self.expect(':')?;
        self.expect('f')?;
        let bits = self.read_number()?;
        self.expect('=')?;

        let name = self.read_identifier()?;
        let op = AluOp::from_name(name)
            .ok_or_else(|| self.error(format!("Unknown operation '{}'", name)))?;

        let value = self.read_value()?;
        let component = self.read_component()?;

        if let Some(first) = self.defined.insert(dest, line) {
            return Err(ParseError {
                line,
                message: format!("Value %{} already defined on line {}", dest, first),
            });
        }

        Ok(AluInstr::new(
            op,
            AluSrc::with_component(value, component),
            dest,
            bits,
        ))
    }
}
