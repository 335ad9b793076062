//! Parser for human-readable function signatures such as
//! `function text(bytes32 node, string key) view returns (string)`.
//!
//! Only types contribute to the selector, so parameter names are optional.
//! Unnamed parameters get a letter assigned by their position across the whole
//! signature: inputs first, then outputs.

use crate::{
    descriptor::{
        MethodDescriptor,
        Parameter,
        StateMutability,
    },
    error::SignatureError,
};

use alloy_dyn_abi::DynSolType;
use regex::Regex;
use std::sync::LazyLock;

static FUNCTION_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("static regex"));

static PARAMETER_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex"));

/// Solidity keywords that may be pasted along with a signature but carry no
/// ABI meaning.
const VISIBILITY: [&str; 2] = ["external", "public"];
const DATA_LOCATIONS: [&str; 3] = ["memory", "calldata", "storage"];

type Result<T> = std::result::Result<T, SignatureError>;

fn invalid(offset: usize, reason: &'static str) -> SignatureError {
    SignatureError::InvalidSignature { offset, reason }
}

/// Parses a signature into a [`MethodDescriptor`] with its selector computed.
pub fn parse_signature(signature: &str) -> Result<MethodDescriptor> {
    let mut cursor = Cursor::new(signature);

    cursor.skip_ws();
    cursor.keyword("function", "expected `function` keyword")?;
    if !cursor.skip_ws() {
        return Err(invalid(cursor.pos, "expected whitespace after `function`"));
    }

    let (name_at, name) = cursor
        .word()
        .ok_or_else(|| invalid(cursor.pos, "expected function name"))?;
    if !FUNCTION_NAME.is_match(name) {
        return Err(invalid(name_at, "invalid function name"));
    }

    cursor.skip_ws();
    let (input_at, input) = cursor.group()?;

    cursor.skip_ws();
    let (mut keyword_at, mut keyword) = cursor
        .word()
        .ok_or_else(|| invalid(cursor.pos, "expected `pure` or `view`"))?;
    if VISIBILITY.contains(&keyword) {
        cursor.skip_ws();
        (keyword_at, keyword) = cursor
            .word()
            .ok_or_else(|| invalid(cursor.pos, "expected `pure` or `view`"))?;
    }
    let mutability = match keyword {
        "pure" => StateMutability::Pure,
        "view" => StateMutability::View,
        _ => return Err(invalid(keyword_at, "expected `pure` or `view`")),
    };

    cursor.skip_ws();
    cursor.keyword("returns", "expected `returns` keyword")?;
    cursor.skip_ws();
    let (output_at, output) = cursor.group()?;

    cursor.skip_ws();
    if cursor.peek() == Some(';') {
        cursor.pos += 1;
        cursor.skip_ws();
    }
    if cursor.pos != signature.len() {
        return Err(invalid(cursor.pos, "unexpected trailing input"));
    }

    let inputs = parse_parameters(input, input_at, 0)?;
    let outputs = parse_parameters(output, output_at, inputs.len())?;

    Ok(MethodDescriptor::new(name, mutability, inputs, outputs))
}

/// Parses a comma separated parameter list. `offset` is the position of the list
/// within the signature and `first_index` the position of its first entry among
/// all parameters of the function.
fn parse_parameters(list: &str, offset: usize, first_index: usize) -> Result<Vec<Parameter>> {
    if list.trim().is_empty() {
        return Ok(Vec::new());
    }

    split_top_level(list, |c| c == ',')
        .into_iter()
        .enumerate()
        .map(|(index, (entry_at, entry))| {
            let entry_at = offset + entry_at + (entry.len() - entry.trim_start().len());
            let entry = entry.trim();
            if entry.is_empty() {
                return Err(invalid(entry_at, "empty parameter entry"));
            }
            parse_parameter(entry, entry_at, first_index + index)
        })
        .collect()
}

fn parse_parameter(entry: &str, entry_at: usize, index: usize) -> Result<Parameter> {
    let tokens: Vec<(usize, &str)> = split_top_level(entry, char::is_whitespace)
        .into_iter()
        .filter(|(_, token)| !token.is_empty())
        .collect();

    let (ty, location, name) = match tokens.as_slice() {
        [(_, ty)] => (*ty, None, None),
        [(_, ty), (at, location)] if DATA_LOCATIONS.contains(location) => {
            (*ty, Some(*at), None)
        }
        [(_, ty), name] => (*ty, None, Some(*name)),
        [(_, ty), (at, location), name] if DATA_LOCATIONS.contains(location) => {
            (*ty, Some(*at), Some(*name))
        }
        _ => return Err(invalid(entry_at, "malformed parameter entry")),
    };

    let name = match name {
        None => default_name(index),
        Some((name_at, name)) => {
            if !PARAMETER_NAME.is_match(name) || DATA_LOCATIONS.contains(&name) {
                return Err(invalid(entry_at + name_at, "invalid parameter name"));
            }
            name.to_string()
        }
    };

    let ty: String = ty.chars().filter(|c| !c.is_whitespace()).collect();
    let parsed = DynSolType::parse(&ty)
        .map_err(|source| SignatureError::InvalidParameterType { ty, source })?;

    // A data location only applies to reference types.
    if let Some(location_at) = location {
        if !is_reference_type(&parsed) {
            return Err(invalid(
                entry_at + location_at,
                "data location on a value type",
            ));
        }
    }

    Ok(Parameter::new(name, parsed))
}

fn is_reference_type(ty: &DynSolType) -> bool {
    matches!(
        ty,
        DynSolType::String
            | DynSolType::Bytes
            | DynSolType::Array(_)
            | DynSolType::FixedArray(..)
            | DynSolType::Tuple(_)
    )
}

/// Name given to an unnamed parameter: `a`..`z`, then `a1`..`z1`, and so on.
fn default_name(index: usize) -> String {
    #[allow(clippy::cast_possible_truncation)]
    let letter = char::from(b'a' + (index % 26) as u8);
    match index / 26 {
        0 => letter.to_string(),
        round => format!("{letter}{round}"),
    }
}

/// Splits `s` on separator characters that are not nested inside parentheses,
/// returning each piece with its byte offset in `s`.
fn split_top_level(s: &str, is_separator: impl Fn(char) -> bool) -> Vec<(usize, &str)> {
    let mut pieces = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            c if depth == 0 && is_separator(c) => {
                pieces.push((start, &s[start..i]));
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    pieces.push((start, &s[start..]));
    pieces
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Skips whitespace, returning whether any was consumed.
    fn skip_ws(&mut self) -> bool {
        let rest = self.rest();
        let skipped = rest.len() - rest.trim_start().len();
        self.pos += skipped;
        skipped > 0
    }

    /// Reads a run of identifier characters.
    fn word(&mut self) -> Option<(usize, &'a str)> {
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        if len == 0 {
            return None;
        }
        let start = self.pos;
        self.pos += len;
        Some((start, &rest[..len]))
    }

    fn keyword(&mut self, keyword: &str, reason: &'static str) -> Result<()> {
        let start = self.pos;
        match self.word() {
            Some((_, word)) if word == keyword => Ok(()),
            _ => Err(invalid(start, reason)),
        }
    }

    /// Reads a parenthesised group, returning the offset and text between the
    /// outer parentheses.
    fn group(&mut self) -> Result<(usize, &'a str)> {
        if self.peek() != Some('(') {
            return Err(invalid(self.pos, "expected `(`"));
        }
        let open = self.pos;
        let mut depth = 0usize;
        for (i, c) in self.rest().char_indices() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        let inner = &self.src[open + 1..open + i];
                        self.pos = open + i + 1;
                        return Ok((open + 1, inner));
                    }
                }
                _ => {}
            }
        }
        Err(invalid(open, "unbalanced parentheses"))
    }
}
