//! Parsing and rendering of Python-style literals used in field values.

use serde_json::{Map, Number, Value};

#[derive(Debug, PartialEq, Eq)]
pub enum LiteralError {
    UnexpectedEnd,
    UnexpectedChar { found: char, at: usize },
    BadScalar { at: usize },
    TrailingText { at: usize },
}

/// Parses a mapping literal like `{'name': "Betty", 'age': 30}`.
///
/// Keys must be quoted strings. Values may be quoted strings, numbers,
/// `True`/`False`/`None` (JSON spellings too), lists or nested mappings.
/// A trailing comma before the closing brace is accepted.
pub fn parse_mapping(text: &str) -> Result<Map<String, Value>, LiteralError> {
    let mut parser = LiteralParser::new(text);
    parser.skip_spaces();
    parser.expect('{')?;
    let mapping = parser.parse_mapping_body()?;
    parser.skip_spaces();
    match parser.peek() {
        None => Ok(mapping),
        Some(_) => Err(LiteralError::TrailingText { at: parser.pos }),
    }
}

struct LiteralParser {
    input: Vec<char>,
    pos: usize,
}

impl LiteralParser {
    fn new(text: &str) -> LiteralParser {
        LiteralParser {
            input: text.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let current = self.peek();
        if current.is_some() {
            self.pos += 1;
        }
        current
    }

    fn skip_spaces(&mut self) {
        while self.peek().is_some_and(|c| c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), LiteralError> {
        match self.bump() {
            Some(found) if found == expected => Ok(()),
            Some(found) => Err(LiteralError::UnexpectedChar {
                found,
                at: self.pos - 1,
            }),
            None => Err(LiteralError::UnexpectedEnd),
        }
    }

    /// Parses entries up to and including the closing brace. The opening
    /// brace has already been consumed.
    fn parse_mapping_body(&mut self) -> Result<Map<String, Value>, LiteralError> {
        let mut mapping = Map::new();
        loop {
            self.skip_spaces();
            match self.peek() {
                Some('}') => {
                    self.bump();
                    return Ok(mapping);
                }
                Some('\'') | Some('"') => {}
                Some(found) => {
                    return Err(LiteralError::UnexpectedChar {
                        found,
                        at: self.pos,
                    });
                }
                None => return Err(LiteralError::UnexpectedEnd),
            }
            let key = self.parse_quoted()?;
            self.skip_spaces();
            self.expect(':')?;
            let value = self.parse_value()?;
            mapping.insert(key, value);
            self.skip_spaces();
            match self.bump() {
                Some(',') => continue,
                Some('}') => return Ok(mapping),
                Some(found) => {
                    return Err(LiteralError::UnexpectedChar {
                        found,
                        at: self.pos - 1,
                    });
                }
                None => return Err(LiteralError::UnexpectedEnd),
            }
        }
    }

    fn parse_value(&mut self) -> Result<Value, LiteralError> {
        self.skip_spaces();
        match self.peek() {
            Some('{') => {
                self.bump();
                self.parse_mapping_body().map(Value::Object)
            }
            Some('[') => {
                self.bump();
                self.parse_list_body()
            }
            Some('\'') | Some('"') => self.parse_quoted().map(Value::String),
            Some(_) => self.parse_scalar(),
            None => Err(LiteralError::UnexpectedEnd),
        }
    }

    fn parse_list_body(&mut self) -> Result<Value, LiteralError> {
        let mut items = Vec::new();
        loop {
            self.skip_spaces();
            if self.peek() == Some(']') {
                self.bump();
                return Ok(Value::Array(items));
            }
            items.push(self.parse_value()?);
            self.skip_spaces();
            match self.bump() {
                Some(',') => continue,
                Some(']') => return Ok(Value::Array(items)),
                Some(found) => {
                    return Err(LiteralError::UnexpectedChar {
                        found,
                        at: self.pos - 1,
                    });
                }
                None => return Err(LiteralError::UnexpectedEnd),
            }
        }
    }

    /// Reads a quoted string starting at the opening quote. Backslash
    /// escapes for `n`, `t`, `r`, the quotes and the backslash itself are
    /// decoded; an unknown escape keeps the backslash.
    fn parse_quoted(&mut self) -> Result<String, LiteralError> {
        let quote = match self.bump() {
            Some(q) => q,
            None => return Err(LiteralError::UnexpectedEnd),
        };
        let mut text = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(text),
                Some('\\') => match self.bump() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some('r') => text.push('\r'),
                    Some(c @ ('\\' | '\'' | '"')) => text.push(c),
                    Some(other) => {
                        text.push('\\');
                        text.push(other);
                    }
                    None => return Err(LiteralError::UnexpectedEnd),
                },
                Some(c) => text.push(c),
                None => return Err(LiteralError::UnexpectedEnd),
            }
        }
    }

    /// Reads an unquoted scalar: a keyword or a number.
    fn parse_scalar(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if matches!(c, ',' | '}' | ']' | ':') {
                break;
            }
            word.push(c);
            self.pos += 1;
        }
        let word = word.trim();
        if word.is_empty() {
            return Err(match self.peek() {
                Some(found) => LiteralError::UnexpectedChar {
                    found,
                    at: self.pos,
                },
                None => LiteralError::UnexpectedEnd,
            });
        }
        match word {
            "True" | "true" => return Ok(Value::Bool(true)),
            "False" | "false" => return Ok(Value::Bool(false)),
            "None" | "null" => return Ok(Value::Null),
            _ => {}
        }
        if let Ok(whole) = word.parse::<i64>() {
            return Ok(Value::Number(whole.into()));
        }
        if let Ok(real) = word.parse::<f64>() {
            if let Some(number) = Number::from_f64(real) {
                return Ok(Value::Number(number));
            }
        }
        Err(LiteralError::BadScalar { at: start })
    }
}

/// Renders a value the way record mappings are printed: single-quoted
/// strings, everything else in its JSON form.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(text) => render_string(text),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(render_value).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Object(entries) => {
            let parts: Vec<String> = entries
                .iter()
                .map(|(name, value)| format!("{}: {}", render_string(name), render_value(value)))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
        other => other.to_string(),
    }
}

pub fn render_string(text: &str) -> String {
    format!("'{}'", text.replace('\\', "\\\\").replace('\'', "\\'"))
}
