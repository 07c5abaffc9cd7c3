//! Conditional-compilation pruning ahead of parsing.
//!
//! tree-sitter parses raw text, so `#if` groups are resolved here first.
//! A group whose condition is decided by the command's `-D`/`-U` flags, the
//! selected language, or a `#define` seen earlier in the file is blanked when
//! inactive. Blanking replaces bytes with spaces, so offsets and line numbers
//! in the tree still match the file on disk.
//!
//! Headers are not read. A condition that depends on a macro nothing above
//! has decided stays open and every branch of it is kept.

use std::collections::HashMap;

use super::Language;

/// `__cplusplus` when no `-std=` names a C++ standard.
const DEFAULT_CPLUSPLUS: i64 = 201703;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Macro {
    /// Defined, with its value when that is a plain integer.
    Defined(Option<i64>),
    Undefined,
}

/// What is known about macros at a point in the file.
///
/// A name missing from the table is unknown, not undefined: it may come
/// from a header.
#[derive(Debug, Clone, Default)]
pub struct MacroTable {
    macros: HashMap<String, Macro>,
}

impl MacroTable {
    /// Macros predefined for `language`.
    pub fn for_language(language: Language) -> Self {
        Self::predefined(language, None)
    }

    /// Predefined macros plus the `-D`/`-U` flags of a command line, in order.
    pub fn from_arguments(arguments: &[String], language: Language) -> Self {
        let standard = arguments.iter().rev().find_map(|arg| {
            arg.strip_prefix("-std=")
                .or_else(|| arg.strip_prefix("--std="))
        });
        let mut table = Self::predefined(language, standard);

        let mut iter = arguments.iter().skip(1);
        while let Some(arg) = iter.next() {
            if arg == "-D" {
                if let Some(definition) = iter.next() {
                    table.apply_definition(definition);
                }
            } else if let Some(definition) = arg.strip_prefix("-D") {
                table.apply_definition(definition);
            } else if arg == "-U" {
                if let Some(name) = iter.next() {
                    table.undefine(name);
                }
            } else if let Some(name) = arg.strip_prefix("-U") {
                table.undefine(name);
            }
        }
        table
    }

    fn predefined(language: Language, standard: Option<&str>) -> Self {
        let mut table = Self::default();
        table.define("__STDC__", Some(1));
        match language {
            Language::C => table.undefine("__cplusplus"),
            Language::Cpp => table.define("__cplusplus", Some(cplusplus_value(standard))),
        }
        table
    }

    pub fn define(&mut self, name: &str, value: Option<i64>) {
        self.macros.insert(name.to_string(), Macro::Defined(value));
    }

    pub fn undefine(&mut self, name: &str) {
        self.macros.insert(name.to_string(), Macro::Undefined);
    }

    fn forget(&mut self, name: &str) {
        self.macros.remove(name);
    }

    /// `NAME`, `NAME=VALUE` or `NAME(args)=BODY`, as `-D` takes them.
    fn apply_definition(&mut self, definition: &str) {
        let (head, value) = match definition.split_once('=') {
            Some((head, body)) => (head, parse_integer(body.trim())),
            None => (definition, Some(1)),
        };
        match head.split_once('(') {
            Some((name, _)) => self.define(name, None),
            None => self.define(head, value),
        }
    }

    fn is_defined(&self, name: &str) -> Option<bool> {
        match self.macros.get(name)? {
            Macro::Defined(_) => Some(true),
            Macro::Undefined => Some(false),
        }
    }

    /// Value of `name` in an `#if` expression; undefined names are `0`.
    fn value(&self, name: &str) -> Option<i64> {
        match self.macros.get(name)? {
            Macro::Defined(value) => *value,
            Macro::Undefined => Some(0),
        }
    }
}

fn cplusplus_value(standard: Option<&str>) -> i64 {
    let version = standard.and_then(|s| s.strip_prefix("c++").or_else(|| s.strip_prefix("gnu++")));
    match version {
        Some("98" | "03") => 199711,
        Some("11" | "0x") => 201103,
        Some("14" | "1y") => 201402,
        Some("17" | "1z") => 201703,
        Some("20" | "2a") => 202002,
        Some("23" | "2b") => 202302,
        Some("26" | "2c") => 202400,
        _ => DEFAULT_CPLUSPLUS,
    }
}

/// Integer literal with optional `u`/`l` suffixes and `'` separators.
fn parse_integer(text: &str) -> Option<i64> {
    let digits: String = text
        .trim_end_matches(['u', 'U', 'l', 'L'])
        .chars()
        .filter(|c| *c != '\'')
        .collect();
    if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = digits.strip_prefix("0b").or_else(|| digits.strip_prefix("0B")) {
        i64::from_str_radix(bin, 2).ok()
    } else if digits.len() > 1 && digits.starts_with('0') {
        i64::from_str_radix(&digits[1..], 8).ok()
    } else {
        digits.parse().ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Liveness {
    Live,
    /// Depends on something unknown; kept.
    Maybe,
    Dead,
}

impl Liveness {
    fn from_condition(value: Option<bool>) -> Self {
        match value {
            Some(true) => Liveness::Live,
            Some(false) => Liveness::Dead,
            None => Liveness::Maybe,
        }
    }

    fn within(self, parent: Liveness) -> Self {
        match (parent, self) {
            (Liveness::Dead, _) | (_, Liveness::Dead) => Liveness::Dead,
            (Liveness::Live, own) => own,
            (Liveness::Maybe, _) => Liveness::Maybe,
        }
    }
}

/// One open `#if` group.
struct Conditional {
    parent: Liveness,
    /// Whether an earlier branch was taken.
    taken: Option<bool>,
    current: Liveness,
}

struct Pruner {
    macros: MacroTable,
    stack: Vec<Conditional>,
}

impl Pruner {
    fn current(&self) -> Liveness {
        self.stack.last().map_or(Liveness::Live, |group| group.current)
    }

    /// Open a group; returns the liveness of the line holding the directive.
    fn open(&mut self, value: Option<bool>) -> Liveness {
        let parent = self.current();
        self.stack.push(Conditional {
            parent,
            taken: value,
            current: Liveness::from_condition(value).within(parent),
        });
        parent
    }

    /// `#elif`-style branch switch; `#else` passes `Some(true)`.
    fn alternate(&mut self, value: Option<bool>) -> Liveness {
        let Some(group) = self.stack.last_mut() else {
            return Liveness::Live;
        };
        let own = match group.taken {
            Some(true) => Liveness::Dead,
            Some(false) => Liveness::from_condition(value),
            None if value == Some(false) => Liveness::Dead,
            None => Liveness::Maybe,
        };
        group.taken = match (group.taken, value) {
            (Some(true), _) | (_, Some(true)) => Some(true),
            (Some(false), Some(false)) => Some(false),
            _ => None,
        };
        group.current = own.within(group.parent);
        group.parent
    }

    fn close(&mut self) -> Liveness {
        self.stack
            .pop()
            .map_or(Liveness::Live, |group| group.parent)
    }

    /// Apply one directive; returns the liveness of its own line.
    fn directive(&mut self, text: &str) -> Liveness {
        let text = text.trim_start();
        let keyword_end = text
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(text.len());
        let (keyword, rest) = text.split_at(keyword_end);

        match keyword {
            "if" => {
                let value = evaluate(rest, &self.macros);
                self.open(value)
            }
            "ifdef" => {
                let value = self.defined(rest);
                self.open(value)
            }
            "ifndef" => {
                let value = self.defined(rest).map(|defined| !defined);
                self.open(value)
            }
            "elif" => {
                let value = evaluate(rest, &self.macros);
                self.alternate(value)
            }
            "elifdef" => {
                let value = self.defined(rest);
                self.alternate(value)
            }
            "elifndef" => {
                let value = self.defined(rest).map(|defined| !defined);
                self.alternate(value)
            }
            "else" => self.alternate(Some(true)),
            "endif" => self.close(),
            "define" | "undef" => {
                let live = self.current();
                self.track_definition(keyword == "define", rest, live);
                live
            }
            _ => self.current(),
        }
    }

    fn defined(&self, rest: &str) -> Option<bool> {
        first_identifier(rest).and_then(|name| self.macros.is_defined(name))
    }

    fn track_definition(&mut self, define: bool, rest: &str, live: Liveness) {
        let rest = rest.trim_start();
        let Some(name) = first_identifier(rest) else {
            return;
        };
        match live {
            Liveness::Dead => {}
            Liveness::Maybe => self.macros.forget(name),
            Liveness::Live if !define => self.macros.undefine(name),
            Liveness::Live => {
                let after = &rest[name.len()..];
                let value = if after.starts_with('(') {
                    None
                } else {
                    parse_integer(after.trim())
                };
                self.macros.define(name, value);
            }
        }
    }
}

fn first_identifier(text: &str) -> Option<&str> {
    let text = text.trim_start();
    let end = text
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(text.len());
    let name = &text[..end];
    let starts_well = name
        .chars()
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    starts_well.then_some(name)
}

/// Blank every line of `source` in an inactive conditional group.
///
/// Returns the number of lines blanked.
pub fn blank_inactive_lines(source: &mut [u8], macros: MacroTable) -> usize {
    let lines = line_spans(source);
    let mut pruner = Pruner {
        macros,
        stack: Vec::new(),
    };
    let mut in_comment = false;
    let mut blanked = 0;
    let mut index = 0;

    while index < lines.len() {
        let (start, end) = lines[index];
        let directive = if in_comment {
            None
        } else {
            directive_offset(&source[start..end])
        };

        let (mut last, live) = match directive {
            Some(offset) => {
                let mut last = index;
                while last + 1 < lines.len() && continues(&source[lines[last].0..lines[last].1]) {
                    last += 1;
                }
                let text = logical_line(source, &lines[index..=last], start + offset);
                (last, pruner.directive(&strip_comments(&text)))
            }
            None => (index, pruner.current()),
        };

        let mut line = index;
        while line <= last {
            let (start, end) = lines[line];
            in_comment = scan_comments(&source[start..end], in_comment);
            if live == Liveness::Dead {
                blank(&mut source[start..end]);
                blanked += 1;
            }
            // A comment opened on a directive line belongs to that line.
            if line == last && in_comment && directive.is_some() && last + 1 < lines.len() {
                last += 1;
            }
            line += 1;
        }
        index = last + 1;
    }

    blanked
}

/// `(start, end)` of each line, excluding the newline.
fn line_spans(source: &[u8]) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = 0;
    for (i, byte) in source.iter().enumerate() {
        if *byte == b'\n' {
            spans.push((start, i));
            start = i + 1;
        }
    }
    if start < source.len() {
        spans.push((start, source.len()));
    }
    spans
}

/// Offset just past `#` when the line is a directive.
fn directive_offset(line: &[u8]) -> Option<usize> {
    let hash = line.iter().position(|b| *b != b' ' && *b != b'\t')?;
    (line[hash] == b'#').then_some(hash + 1)
}

fn continues(line: &[u8]) -> bool {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    line.ends_with(b"\\")
}

/// Join a directive's physical lines, dropping the `\` continuations.
fn logical_line(source: &[u8], lines: &[(usize, usize)], text_start: usize) -> String {
    let mut text = String::new();
    for (i, &(start, end)) in lines.iter().enumerate() {
        let start = if i == 0 { text_start } else { start };
        let line = &source[start..end];
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        let line = line.strip_suffix(b"\\").unwrap_or(line);
        text.push_str(&String::from_utf8_lossy(line));
        text.push(' ');
    }
    text
}

fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    loop {
        let block = rest.find("/*");
        let line = rest.find("//");
        match (block, line) {
            (Some(b), l) if l.map_or(true, |l| b < l) => {
                out.push_str(&rest[..b]);
                out.push(' ');
                match rest[b + 2..].find("*/") {
                    Some(close) => rest = &rest[b + 2 + close + 2..],
                    None => return out,
                }
            }
            (_, Some(l)) => {
                out.push_str(&rest[..l]);
                return out;
            }
            _ => {
                out.push_str(rest);
                return out;
            }
        }
    }
}

/// Track `/* */` comments across lines, skipping string and character literals.
fn scan_comments(line: &[u8], mut in_comment: bool) -> bool {
    let mut i = 0;
    while i < line.len() {
        if in_comment {
            if line[i..].starts_with(b"*/") {
                in_comment = false;
                i += 2;
            } else {
                i += 1;
            }
            continue;
        }
        match line[i] {
            b'/' if line.get(i + 1) == Some(&b'/') => return false,
            b'/' if line.get(i + 1) == Some(&b'*') => {
                in_comment = true;
                i += 2;
            }
            quote @ (b'"' | b'\'') => {
                i += 1;
                while i < line.len() && line[i] != quote {
                    if line[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i += 1;
            }
            _ => i += 1,
        }
    }
    in_comment
}

fn blank(line: &mut [u8]) {
    for byte in line.iter_mut().filter(|b| **b != b'\r') {
        *byte = b' ';
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Number(Option<i64>),
    Ident(String),
    Punct(&'static str),
    Other,
}

const PUNCTUATORS: &[&str] = &[
    "&&", "||", "==", "!=", "<=", ">=", "<<", ">>", "!", "~", "-", "+", "*", "/", "%", "<", ">",
    "&", "^", "|", "?", ":", "(", ")", ",",
];

fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut rest = text;
    while let Some(c) = rest.chars().next() {
        if c.is_whitespace() {
            rest = &rest[c.len_utf8()..];
        } else if c.is_ascii_digit() {
            let end = rest
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '\'' || c == '.'))
                .unwrap_or(rest.len());
            tokens.push(Token::Number(parse_integer(&rest[..end])));
            rest = &rest[end..];
        } else if c.is_ascii_alphabetic() || c == '_' {
            let end = rest
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(rest.len());
            tokens.push(Token::Ident(rest[..end].to_string()));
            rest = &rest[end..];
        } else if c == '\'' || c == '"' {
            let close = rest[1..].find(c).map_or(rest.len(), |i| i + 2);
            tokens.push(if c == '\'' { Token::Number(None) } else { Token::Other });
            rest = &rest[close..];
        } else if let Some(punct) = PUNCTUATORS.iter().find(|p| rest.starts_with(**p)) {
            tokens.push(Token::Punct(*punct));
            rest = &rest[punct.len()..];
        } else {
            tokens.push(Token::Other);
            rest = &rest[c.len_utf8()..];
        }
    }
    tokens
}

/// The expression could not be parsed.
struct Malformed;

/// Value of an `#if` expression; `None` when it depends on an unknown macro.
type Value = Option<i64>;

/// Precedence-climbing evaluator for `#if` expressions.
struct Evaluator<'a> {
    tokens: Vec<Token>,
    pos: usize,
    macros: &'a MacroTable,
}

impl Evaluator<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat(&mut self, punct: &str) -> bool {
        if matches!(self.peek(), Some(Token::Punct(p)) if *p == punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, punct: &str) -> Result<(), Malformed> {
        if self.eat(punct) {
            Ok(())
        } else {
            Err(Malformed)
        }
    }

    fn conditional(&mut self) -> Result<Value, Malformed> {
        let condition = self.binary(1)?;
        if !self.eat("?") {
            return Ok(condition);
        }
        let then = self.conditional()?;
        self.expect(":")?;
        let otherwise = self.conditional()?;
        Ok(match condition {
            Some(c) if c != 0 => then,
            Some(_) => otherwise,
            None if then == otherwise => then,
            None => None,
        })
    }

    fn binary(&mut self, min_precedence: u8) -> Result<Value, Malformed> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Punct(op)) => *op,
                _ => break,
            };
            let Some(precedence) = precedence(op).filter(|p| *p >= min_precedence) else {
                break;
            };
            self.pos += 1;
            let rhs = self.binary(precedence + 1)?;
            lhs = apply_binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Value, Malformed> {
        match self.next() {
            Some(Token::Punct("!")) => Ok(self.unary()?.map(|v| i64::from(v == 0))),
            Some(Token::Punct("~")) => Ok(self.unary()?.map(|v| !v)),
            Some(Token::Punct("-")) => Ok(self.unary()?.and_then(i64::checked_neg)),
            Some(Token::Punct("+")) => self.unary(),
            Some(Token::Punct("(")) => {
                let value = self.conditional()?;
                self.expect(")")?;
                Ok(value)
            }
            Some(Token::Number(value)) => Ok(value),
            Some(Token::Ident(name)) if name == "defined" => self.defined(),
            Some(Token::Ident(name)) => {
                if self.eat("(") {
                    // Function-like macro or `__has_include`; never known here.
                    self.skip_arguments()?;
                    Ok(None)
                } else {
                    Ok(self.macros.value(&name))
                }
            }
            _ => Err(Malformed),
        }
    }

    fn defined(&mut self) -> Result<Value, Malformed> {
        let parenthesized = self.eat("(");
        let name = match self.next() {
            Some(Token::Ident(name)) => name,
            _ => return Err(Malformed),
        };
        if parenthesized {
            self.expect(")")?;
        }
        Ok(self.macros.is_defined(&name).map(i64::from))
    }

    fn skip_arguments(&mut self) -> Result<(), Malformed> {
        let mut depth = 1;
        while depth > 0 {
            match self.next() {
                Some(Token::Punct("(")) => depth += 1,
                Some(Token::Punct(")")) => depth -= 1,
                Some(_) => {}
                None => return Err(Malformed),
            }
        }
        Ok(())
    }
}

fn precedence(op: &str) -> Option<u8> {
    Some(match op {
        "||" => 1,
        "&&" => 2,
        "|" => 3,
        "^" => 4,
        "&" => 5,
        "==" | "!=" => 6,
        "<" | ">" | "<=" | ">=" => 7,
        "<<" | ">>" => 8,
        "+" | "-" => 9,
        "*" | "/" | "%" => 10,
        _ => return None,
    })
}

fn apply_binary(op: &str, lhs: Value, rhs: Value) -> Value {
    match op {
        // A known operand can decide these even when the other is unknown.
        "&&" => match (lhs, rhs) {
            (Some(0), _) | (_, Some(0)) => Some(0),
            (Some(_), Some(_)) => Some(1),
            _ => None,
        },
        "||" => match (lhs, rhs) {
            (Some(a), _) if a != 0 => Some(1),
            (_, Some(b)) if b != 0 => Some(1),
            (Some(_), Some(_)) => Some(0),
            _ => None,
        },
        _ => {
            let (a, b) = (lhs?, rhs?);
            match op {
                "|" => Some(a | b),
                "^" => Some(a ^ b),
                "&" => Some(a & b),
                "==" => Some(i64::from(a == b)),
                "!=" => Some(i64::from(a != b)),
                "<" => Some(i64::from(a < b)),
                ">" => Some(i64::from(a > b)),
                "<=" => Some(i64::from(a <= b)),
                ">=" => Some(i64::from(a >= b)),
                "<<" => a.checked_shl(u32::try_from(b).ok()?),
                ">>" => a.checked_shr(u32::try_from(b).ok()?),
                "+" => a.checked_add(b),
                "-" => a.checked_sub(b),
                "*" => a.checked_mul(b),
                "/" => a.checked_div(b),
                "%" => a.checked_rem(b),
                _ => None,
            }
        }
    }
}

/// Evaluate an `#if` condition; `None` when it cannot be decided.
fn evaluate(expression: &str, macros: &MacroTable) -> Option<bool> {
    let mut evaluator = Evaluator {
        tokens: tokenize(expression),
        pos: 0,
        macros,
    };
    match evaluator.conditional() {
        Ok(value) if evaluator.pos == evaluator.tokens.len() => value.map(|v| v != 0),
        _ => None,
    }
}
