use std::future::ready;

use react_agent_core::tool::{Error as ToolError, Tool, ToolResult};

use super::unquote;

/// How deeply parentheses and unary signs may nest.
const MAX_DEPTH: usize = 256;

/// A tool that evaluates arithmetic expressions.
///
/// Supports `+ - * / %`, unary minus, parentheses and decimal numbers.
#[derive(Clone, Copy, Debug, Default)]
pub struct CalculatorTool;

impl CalculatorTool {
    /// Creates a new calculator tool.
    #[inline]
    pub fn new() -> Self {
        CalculatorTool
    }
}

impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        r#"
Evaluates an arithmetic expression and returns the result.
Supports + - * / % and parentheses, for example: (3 + 4) * 2.5"#
    }

    fn execute(
        &self,
        input: String,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let result = evaluate(unquote(&input)).map(format_number);
        ready(result)
    }
}

/// Evaluates `expr`, reporting syntax errors as invalid input.
fn evaluate(expr: &str) -> Result<f64, ToolError> {
    let mut parser = Parser {
        src: expr.as_bytes(),
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    parser.skip_spaces();
    if let Some(c) = parser.peek() {
        return Err(parser.unexpected(c));
    }
    if !value.is_finite() {
        return Err(ToolError::execution_error().with_reason("result overflows"));
    }
    Ok(value)
}

fn format_number(value: f64) -> String {
    // Whole numbers print without a fractional part.
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn skip_spaces(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, expected: u8) -> bool {
        self.skip_spaces();
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn unexpected(&self, c: u8) -> ToolError {
        ToolError::invalid_input().with_reason(format!(
            "unexpected '{}' at position {}",
            c as char,
            self.pos + 1
        ))
    }

    fn nested(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<f64, ToolError>,
    ) -> Result<f64, ToolError> {
        if self.depth >= MAX_DEPTH {
            return Err(ToolError::invalid_input()
                .with_reason("expression is nested too deeply"));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    // expr = term (('+' | '-') term)*
    fn expr(&mut self) -> Result<f64, ToolError> {
        let mut value = self.term()?;
        loop {
            if self.eat(b'+') {
                value += self.term()?;
            } else if self.eat(b'-') {
                value -= self.term()?;
            } else {
                return Ok(value);
            }
        }
    }

    // term = factor (('*' | '/' | '%') factor)*
    fn term(&mut self) -> Result<f64, ToolError> {
        let mut value = self.factor()?;
        loop {
            if self.eat(b'*') {
                value *= self.factor()?;
            } else if self.eat(b'/') {
                let rhs = self.factor()?;
                if rhs == 0.0 {
                    return Err(division_by_zero());
                }
                value /= rhs;
            } else if self.eat(b'%') {
                let rhs = self.factor()?;
                if rhs == 0.0 {
                    return Err(division_by_zero());
                }
                value %= rhs;
            } else {
                return Ok(value);
            }
        }
    }

    // factor = ('-' | '+') factor | '(' expr ')' | number
    fn factor(&mut self) -> Result<f64, ToolError> {
        if self.eat(b'-') {
            return self.nested(|p| Ok(-p.factor()?));
        }
        if self.eat(b'+') {
            return self.nested(Self::factor);
        }
        if self.eat(b'(') {
            return self.nested(|p| {
                let value = p.expr()?;
                if !p.eat(b')') {
                    return Err(match p.peek() {
                        Some(c) => p.unexpected(c),
                        None => ToolError::invalid_input()
                            .with_reason("missing closing parenthesis"),
                    });
                }
                Ok(value)
            });
        }
        self.number()
    }

    fn number(&mut self) -> Result<f64, ToolError> {
        self.skip_spaces();
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == b'.') {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(match self.peek() {
                Some(c) => self.unexpected(c),
                None => ToolError::invalid_input()
                    .with_reason("unexpected end of expression"),
            });
        }
        // The scanned range only holds ASCII digits and dots.
        let text = str::from_utf8(&self.src[start..self.pos]).unwrap_or("");
        text.parse::<f64>().map_err(|_| {
            ToolError::invalid_input()
                .with_reason(format!("invalid number '{text}'"))
        })
    }
}

fn division_by_zero() -> ToolError {
    ToolError::execution_error().with_reason("division by zero")
}
