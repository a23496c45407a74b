// src/core/parser.rs

//! Recursive-descent parser turning template text into an [`Items`] tree.
//!
//! ```text
//! template   := (literal | '\' char | special)*
//! special    := '$' '$'? ( name '(' args ')' | '(' ident ')' | ident )
//! ident      := [a-zA-Z0-9_-]+          (digits: 1-based positional, 'N-' to the end)
//! ```
//!
//! `$(name,args)` is not accepted: the parenthesised form holds exactly one
//! identifier and anything before the `)` is an "Expected ')'" error.
//! Functions may nest at most [`MAX_NESTING`] levels deep.
//!
//! Each argument is itself a template, parsed until one of the characters in
//! its stop set. Nested calls consume their own `)`, so only unescaped
//! separators at the current depth end an argument.

use crate::core::{
    items::{Function, Item, Items},
    json_path::JsonPath,
    reader::StringReader,
};
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

// --- ERRORS ---

/// A template that could not be parsed, with the char offset of the problem.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} at position {offset}")]
pub struct ParseError {
    /// What went wrong.
    pub message: String,
    /// 0-based char index into the parsed text.
    pub offset: usize,
}

impl ParseError {
    /// Creates an error at `offset`.
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }

    /// Renders `input` with a caret under the offending character.
    pub fn render(&self, input: &str) -> String {
        let caret_at = self.offset.min(input.chars().count());
        format!("{}\n{}^ {}", input, " ".repeat(caret_at), self.message)
    }
}

// --- GRAMMAR ---

lazy_static! {
    static ref NUMBERED: Regex = Regex::new(r"^([0-9]+)(-)?$").unwrap_or_else(|_| unreachable!());
}

/// Deepest allowed nesting of `$` specials inside function arguments.
pub const MAX_NESTING: usize = 64;

/// Top level: the whole input.
const END: &[char] = &[];
/// An argument followed by more arguments or the closing paren.
const PARAM: &[char] = &[',', ')'];
/// An argument that must be followed by another one; `)` is literal text.
const MID: &[char] = &[','];
/// The final argument; `,` is literal text.
const LAST: &[char] = &[')'];
/// A `$switch` case key.
const CASE_KEY: &[char] = &[':', ',', ')'];

/// Parses a template.
pub fn parse(input: &str) -> Result<Items, ParseError> {
    let mut parser = Parser {
        reader: StringReader::new(input),
        depth: 0,
    };
    let items = parser.items(END, true)?;
    log::debug!("Parsed template into {} top-level items", items.items().len());
    Ok(items)
}

struct Parser {
    reader: StringReader,
    depth: usize,
}

impl Parser {
    // --- SCANNING ---

    fn items(&mut self, stops: &[char], top_level: bool) -> Result<Items, ParseError> {
        let mut items = Vec::new();
        let mut literal = String::new();
        while let Some(c) = self.reader.peek() {
            if stops.contains(&c) {
                break;
            }
            self.reader.next();
            match c {
                '\\' => {
                    if let Some(escaped) = self.reader.next() {
                        literal.push(escaped);
                    }
                }
                '$' => {
                    if !literal.is_empty() {
                        items.push(Item::Literal(std::mem::take(&mut literal)));
                    }
                    let item = self.special_thing()?;
                    if top_level {
                        items.push(Item::SpecialEscape(Box::new(item)));
                    } else {
                        items.push(item);
                    }
                }
                _ => literal.push(c),
            }
        }
        if !literal.is_empty() {
            items.push(Item::Literal(literal));
        }
        Ok(Items::new(items))
    }

    fn accept(&mut self, c: char) -> bool {
        if self.reader.peek() == Some(c) {
            self.reader.next();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<(), ParseError> {
        if self.accept(c) {
            Ok(())
        } else {
            Err(self.error(format!("Expected '{}'", c)))
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.reader.next_pos())
    }

    fn read_while(&mut self, accept: impl Fn(char) -> bool) -> String {
        let mut text = String::new();
        while let Some(c) = self.reader.peek()
            && accept(c)
        {
            text.push(c);
            self.reader.next();
        }
        text
    }

    // --- SPECIALS ---

    /// Called after a `$` has been consumed.
    fn special_thing(&mut self) -> Result<Item, ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error(format!("Nested deeper than {} levels", MAX_NESTING)));
        }
        self.depth += 1;
        let item = self.special();
        self.depth -= 1;
        item
    }

    fn special(&mut self) -> Result<Item, ParseError> {
        let required = self.accept('$');
        let name_start = self.reader.next_pos();
        let name = self.read_while(|c| c.is_ascii_alphabetic());

        if !name.is_empty() && self.reader.peek() == Some('(') {
            let function = self.function(&name, name_start)?;
            return Ok(Item::Function {
                function: Box::new(function),
                required,
            });
        }

        let identifier = if name.is_empty() && self.accept('(') {
            let start = self.reader.next_pos();
            let text = self.read_while(is_identifier_char);
            let item = identifier_item(&text, start)?;
            self.expect(')')?;
            item
        } else {
            let text = name + &self.read_while(is_identifier_char);
            identifier_item(&text, name_start)?
        };
        Ok(Item::Replacement {
            item: Box::new(identifier),
            required,
        })
    }

    /// First argument of functions that test an identifier: a bare name, or a
    /// full template when it starts with `$`.
    fn identifier_param(&mut self) -> Result<Items, ParseError> {
        if self.reader.peek() == Some('$') {
            return self.items(PARAM, false);
        }
        let start = self.reader.next_pos();
        let text = self.read_while(is_identifier_char);
        let item = identifier_item(&text, start)?;
        Ok(Items::new(vec![Item::Replacement {
            item: Box::new(item),
            required: false,
        }]))
    }

    // --- ARGUMENTS ---

    /// Parses `(a, b, ...)` with one stop set per position. At least `min`
    /// arguments are required; `stops.len()` is the maximum.
    fn args(&mut self, stops: &[&[char]], min: usize) -> Result<Vec<Items>, ParseError> {
        self.expect('(')?;
        if min == 0 && self.accept(')') {
            return Ok(Vec::new());
        }
        self.more_args(Vec::new(), stops, min)
    }

    /// Continues an argument list whose first `parsed.len()` arguments are done.
    fn more_args(
        &mut self,
        mut parsed: Vec<Items>,
        stops: &[&[char]],
        min: usize,
    ) -> Result<Vec<Items>, ParseError> {
        while let Some(stop) = stops.get(parsed.len()) {
            parsed.push(self.items(stop, false)?);
            if parsed.len() == stops.len() || !self.accept(',') {
                break;
            }
        }
        if parsed.len() < min {
            return Err(self.error("Expected ','"));
        }
        self.expect(')')?;
        Ok(parsed)
    }

    /// Parses `(a, b, ...)` with any number of arguments.
    fn variadic_args(&mut self) -> Result<Vec<Items>, ParseError> {
        self.expect('(')?;
        let mut parsed = vec![self.items(PARAM, false)?];
        while self.accept(',') {
            parsed.push(self.items(PARAM, false)?);
        }
        self.expect(')')?;
        Ok(parsed)
    }

    /// `(ident, ...)` where the remaining positions use `stops[1..]`.
    fn identifier_args(&mut self, stops: &[&[char]], min: usize) -> Result<Vec<Items>, ParseError> {
        self.expect('(')?;
        let first = self.identifier_param()?;
        self.expect(',')?;
        self.more_args(vec![first], stops, min)
    }

    // --- FUNCTIONS ---

    fn function(&mut self, name: &str, name_start: usize) -> Result<Function, ParseError> {
        let function = match name.to_lowercase().as_str() {
            "if" => {
                let mut a = self.identifier_args(&[PARAM, PARAM, LAST], 2)?.into_iter();
                Function::If {
                    condition: a.next().unwrap_or_default(),
                    then: a.next().unwrap_or_default(),
                    otherwise: a.next(),
                }
            }
            "ifeq" => {
                let mut a = self.identifier_args(&[PARAM, MID, PARAM, LAST], 3)?.into_iter();
                Function::IfEq {
                    condition: a.next().unwrap_or_default(),
                    compare: a.next().unwrap_or_default(),
                    then: a.next().unwrap_or_default(),
                    otherwise: a.next(),
                }
            }
            "switch" => self.switch()?,
            "join" => {
                let mut a = self.identifier_args(&[PARAM, LAST], 2)?.into_iter();
                Function::Join {
                    item: a.next().unwrap_or_default(),
                    separator: a.next().unwrap_or_default(),
                }
            }
            "lower" => Function::Lower(self.single()?),
            "upper" => Function::Upper(self.single()?),
            "trim" => Function::Trim(self.single()?),
            "urlencode" => Function::UrlEncode(self.single()?),
            "calc" => Function::Calc(self.single()?),
            "is" => Function::Is(self.single()?),
            "rand" => Function::Rand(self.variadic_args()?),
            "randnum" => {
                let mut a = self.args(&[PARAM, LAST], 1)?.into_iter();
                Function::RandNum {
                    from: a.next().unwrap_or_default(),
                    to: a.next(),
                }
            }
            "datetime" => {
                let mut a = self.args(&[PARAM, PARAM, PARAM, LAST], 0)?.into_iter();
                Function::DateTime {
                    format: a.next(),
                    zone: a.next(),
                    locale: a.next(),
                    timestamp: a.next(),
                }
            }
            "sort" => {
                let mut a = self.args(&[PARAM, PARAM, LAST], 1)?.into_iter();
                Function::Sort {
                    item: a.next().unwrap_or_default(),
                    separator: a.next(),
                    kind: a.next(),
                }
            }
            "replace" => {
                let mut a = self.args(&[MID, MID, PARAM, LAST], 3)?.into_iter();
                Function::Replace {
                    item: a.next().unwrap_or_default(),
                    search: a.next().unwrap_or_default(),
                    replacement: a.next().unwrap_or_default(),
                    kind: a.next(),
                }
            }
            "quote" => {
                let mut a = self.args(&[PARAM, LAST], 1)?.into_iter();
                Function::Quote {
                    item: a.next().unwrap_or_default(),
                    quote: a.next(),
                }
            }
            "round" => {
                let mut a = self.args(&[PARAM, PARAM, PARAM, LAST], 1)?.into_iter();
                Function::Round {
                    item: a.next().unwrap_or_default(),
                    decimals: a.next(),
                    mode: a.next(),
                    min_decimals: a.next(),
                }
            }
            "get" => {
                let mut a = self.args(&[PARAM, LAST], 1)?.into_iter();
                Function::Get {
                    setting: a.next().unwrap_or_default(),
                    key: a.next(),
                }
            }
            "json" => {
                let mut a = self.args(&[MID, LAST], 2)?.into_iter();
                Function::Json {
                    input: a.next().unwrap_or_default(),
                    output: a.next().unwrap_or_default(),
                }
            }
            "j" => self.json_path()?,
            "request" => {
                let mut a = self.variadic_args()?.into_iter();
                Function::Request {
                    url: a.next().unwrap_or_default(),
                    options: a.collect(),
                }
            }
            "input" => {
                let mut a = self.args(&[PARAM, PARAM, LAST], 0)?.into_iter();
                Function::Input {
                    kind: a.next(),
                    message: a.next(),
                    initial: a.next(),
                }
            }
            _ => {
                return Err(ParseError::new(
                    format!("Invalid function '{}'", name),
                    name_start,
                ));
            }
        };
        Ok(function)
    }

    fn single(&mut self) -> Result<Items, ParseError> {
        Ok(self.args(&[LAST], 1)?.into_iter().next().unwrap_or_default())
    }

    /// `$switch(ident, key:out, key,out, ..., default)`
    fn switch(&mut self) -> Result<Function, ParseError> {
        self.expect('(')?;
        let value = self.identifier_param()?;
        self.expect(',')?;

        let mut cases: Vec<(Items, Items)> = Vec::new();
        let mut default = None;
        loop {
            let key_start = self.reader.next_pos();
            let key = self.items(CASE_KEY, false)?;
            if !self.accept(':') && !self.accept(',') {
                default = Some(key);
                break;
            }
            let output = self.items(PARAM, false)?;
            if cases.iter().any(|(existing, _)| *existing == key) {
                return Err(ParseError::new("Duplicate case", key_start));
            }
            cases.push((key, output));
            if !self.accept(',') {
                break;
            }
        }

        if cases.is_empty() {
            return Err(self.error("Expected at least one case"));
        }
        self.expect(')')?;
        Ok(Function::Switch {
            value,
            cases,
            default,
        })
    }

    /// `$j(path[, default])`
    fn json_path(&mut self) -> Result<Function, ParseError> {
        self.expect('(')?;
        let path = JsonPath::parse(&mut self.reader, PARAM)?;
        let default = if self.accept(',') {
            Some(self.items(LAST, false)?)
        } else {
            None
        };
        self.expect(')')?;
        Ok(Function::JsonPath { path, default })
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Builds a named or positional identifier from its text.
fn identifier_item(text: &str, start: usize) -> Result<Item, ParseError> {
    if text.is_empty() {
        return Err(ParseError::new("Expected identifier", start));
    }
    let Some(caps) = NUMBERED.captures(text) else {
        return Ok(Item::Identifier(text.to_lowercase()));
    };
    let digits = caps.get(1).map_or("", |m| m.as_str());
    let index: usize = digits
        .parse()
        .map_err(|_| ParseError::new(format!("Invalid numeric identifier {}", digits), start))?;
    if index == 0 {
        return Err(ParseError::new("Invalid numeric identifier 0", start));
    }
    Ok(Item::Range {
        index,
        to_end: caps.get(2).is_some(),
    })
}
