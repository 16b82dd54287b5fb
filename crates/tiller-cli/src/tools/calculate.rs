//! Arithmetic expression tool

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::json;

use loop_core::{JsonMap, ParameterProperty, ParameterSchema, Tool, ToolResult};

/// Tool for evaluating arithmetic expressions.
pub struct CalculateTool;

#[async_trait]
impl Tool for CalculateTool {
    fn name(&self) -> &str {
        "calculate"
    }

    fn description(&self) -> &str {
        "Evaluate an arithmetic expression. Supports + - * / ^ and parentheses."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        ParameterSchema::new().with_required(
            "expression",
            ParameterProperty::string("The expression to evaluate, e.g. \"2+2*10\""),
        )
    }

    async fn execute(&self, args: &JsonMap) -> Result<ToolResult> {
        let expression = args
            .get("expression")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("Missing required parameter: expression"))?;

        match evaluate(expression) {
            Ok(value) => {
                let rendered = format_number(value);
                let mut data = JsonMap::new();
                data.insert("expression".to_string(), json!(expression));
                data.insert("result".to_string(), json!(value));
                Ok(ToolResult::success_with_data(
                    format!("Result: {}", rendered),
                    data,
                ))
            }
            Err(e) => Ok(ToolResult::error(format!(
                "Failed to evaluate '{}': {}",
                expression, e
            ))),
        }
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Evaluate an expression with a small recursive-descent parser.
///
/// Grammar: expr := term (('+'|'-') term)*
///          term := unary (('*'|'/') unary)*
///          unary := ('-'|'+') unary | power
///          power := atom (('^'|'**') unary)?
///          atom := number | '(' expr ')'
fn evaluate(expression: &str) -> Result<f64, String> {
    let mut parser = Parser {
        input: expression.as_bytes(),
        pos: 0,
    };
    let value = parser.expr()?;
    parser.skip_whitespace();
    match parser.peek() {
        None => Ok(value),
        Some(c) => Err(format!("unexpected character '{}'", c as char)),
    }
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t')) {
            self.pos += 1;
        }
    }

    fn expr(&mut self) -> Result<f64, String> {
        let mut value = self.term()?;
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(b'+') => {
                    self.bump();
                    value += self.term()?;
                }
                Some(b'-') => {
                    self.bump();
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> Result<f64, String> {
        let mut value = self.unary()?;
        loop {
            self.skip_whitespace();
            match self.peek() {
                // '**' is power, not multiplication
                Some(b'*') if self.input.get(self.pos + 1) != Some(&b'*') => {
                    self.bump();
                    value *= self.unary()?;
                }
                Some(b'/') => {
                    self.bump();
                    let divisor = self.unary()?;
                    if divisor == 0.0 {
                        return Err("division by zero".to_string());
                    }
                    value /= divisor;
                }
                _ => return Ok(value),
            }
        }
    }

    fn unary(&mut self) -> Result<f64, String> {
        self.skip_whitespace();
        match self.peek() {
            Some(b'-') => {
                self.bump();
                Ok(-self.unary()?)
            }
            Some(b'+') => {
                self.bump();
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<f64, String> {
        let base = self.atom()?;
        self.skip_whitespace();
        let is_power = match self.peek() {
            Some(b'^') => {
                self.bump();
                true
            }
            Some(b'*') if self.input.get(self.pos + 1) == Some(&b'*') => {
                self.bump();
                self.bump();
                true
            }
            _ => false,
        };
        if is_power {
            let exponent = self.unary()?;
            Ok(base.powf(exponent))
        } else {
            Ok(base)
        }
    }

    fn atom(&mut self) -> Result<f64, String> {
        self.skip_whitespace();
        match self.peek() {
            Some(b'(') => {
                self.bump();
                let value = self.expr()?;
                self.skip_whitespace();
                match self.bump() {
                    Some(b')') => Ok(value),
                    _ => Err("expected ')'".to_string()),
                }
            }
            Some(c) if c.is_ascii_digit() || c == b'.' => self.number(),
            Some(c) => Err(format!("unexpected character '{}'", c as char)),
            None => Err("unexpected end of expression".to_string()),
        }
    }

    fn number(&mut self) -> Result<f64, String> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == b'.') {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| "invalid number".to_string())?;
        text.parse::<f64>()
            .map_err(|_| format!("invalid number '{}'", text))
    }
}
