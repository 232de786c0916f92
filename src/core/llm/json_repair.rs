//! Recovery of a JSON object from free-form LLM output.
//!
//! Recovery is an ordered chain of [`RepairStrategy`] stages. Each stage sees the current
//! text (and the last parse failure, if any) and either produces the parsed object, hands a
//! rewritten text to the next stage, records a failure, or passes. When every stage has
//! passed, [`recover_object`] substitutes a neutral assessment instead of failing.
//!
//! Stages, in order: extract, clean, strict parse, selective repair at the reported error
//! offset, permissive (YAML) parse, flat key/value scrape.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

/// Top-level keys every recovered assessment carries
pub const REQUIRED_FIELDS: [&str; 4] = ["factors", "overall_score", "readiness_level", "summary"];

const SELECTIVE_REPAIR_ROUNDS: usize = 16;

fn regex(source: &str) -> Regex {
    Regex::new(source).unwrap_or_else(|e| panic!("Invalid JSON repair pattern {source:?}: {e}"))
}

static FENCED_JSON: Lazy<Regex> = Lazy::new(|| regex(r"(?s)```json\s*(.*?)\s*```"));
static OUTER_OBJECT: Lazy<Regex> = Lazy::new(|| regex(r"(?s)\{.*\}"));

static CONTROL_CHARS: Lazy<Regex> = Lazy::new(|| regex(r"[\x00-\x1F\x7F]"));
static STRING_LITERAL: Lazy<Regex> = Lazy::new(|| regex(r#"(?s)"(?:[^"\\]|\\.)*""#));
static MASKED_LITERAL: Lazy<Regex> = Lazy::new(|| regex(r#""\x01(\d+)\x01""#));
static MISSING_COMMA: Lazy<Regex> =
    Lazy::new(|| regex(r#"("[^"]+"\s*:\s*[^,{}\[\]"\s][^,{}\[\]"]*?)\s+""#));
static BARE_KEY: Lazy<Regex> = Lazy::new(|| regex(r"([{,])\s*([a-zA-Z0-9_]+)\s*:"));
static BARE_VALUE: Lazy<Regex> =
    Lazy::new(|| regex(r#""([^"]+)"\s*:\s*([^",{}\[\]\n]+)([,}\]])"#));
static OBJECT_END_BEFORE_KEY: Lazy<Regex> = Lazy::new(|| regex(r#"(["}])\s*\}\s*""#));
static ARRAY_END_BEFORE_KEY: Lazy<Regex> = Lazy::new(|| regex(r#"(["}])\s*\]\s*""#));
static TRAILING_COMMA_OBJECT: Lazy<Regex> = Lazy::new(|| regex(r",\s*\}"));
static TRAILING_COMMA_ARRAY: Lazy<Regex> = Lazy::new(|| regex(r",\s*\]"));
static ADJACENT_OPENER: Lazy<Regex> = Lazy::new(|| regex(r#"(["}\]0-9])\s+([\[{])"#));

static NUMBER: Lazy<Regex> = Lazy::new(|| regex(r"^-?\d+(\.\d+)?$"));
static UNQUOTED_VALUE: Lazy<Regex> = Lazy::new(|| regex(r#":\s*([^{}\[\]",:]+)([,}\]])"#));
static TRAILING_COMMA: Lazy<Regex> = Lazy::new(|| regex(r",\s*[}\]]"));
static LEADING_BARE_KEY: Lazy<Regex> = Lazy::new(|| regex(r"^\s*([A-Za-z0-9_]+)\s*:"));
static KEY_VALUE_PAIR: Lazy<Regex> = Lazy::new(|| regex(r#""([^"]+)"\s*:\s*([^,}\]]+)"#));

/// What the JSON parser complained about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    ExpectingValue,
    ExpectingDelimiter,
    TrailingComma,
    KeyMustBeString,
    Eof,
    NotAnObject,
    Other,
}

/// A failed parse: error kind, byte offset into the parsed text, and the parser's message
#[derive(Debug, Clone, PartialEq)]
pub struct ParseFailure {
    pub kind: ParseErrorKind,
    pub offset: usize,
    pub message: String,
}

impl ParseFailure {
    pub fn from_error(input: &str, error: &serde_json::Error) -> Self {
        let message = error.to_string();
        let kind = if error.is_eof() {
            ParseErrorKind::Eof
        } else if message.contains("trailing comma") {
            ParseErrorKind::TrailingComma
        } else if message.contains("key must be a string") {
            ParseErrorKind::KeyMustBeString
        } else if message.contains("expected `,` or `}`") || message.contains("expected `,` or `]`") {
            ParseErrorKind::ExpectingDelimiter
        } else if message.contains("expected value") || message.contains("expected ident") {
            ParseErrorKind::ExpectingValue
        } else {
            ParseErrorKind::Other
        };

        Self {
            kind,
            offset: byte_offset(input, error.line(), error.column()),
            message,
        }
    }

    fn not_an_object(value: &Value) -> Self {
        let found = match value {
            Value::Null => "null",
            Value::Bool(_) => "a boolean",
            Value::Number(_) => "a number",
            Value::String(_) => "a string",
            Value::Array(_) => "an array",
            Value::Object(_) => "an object",
        };
        Self {
            kind: ParseErrorKind::NotAnObject,
            offset: 0,
            message: format!("expected a JSON object, found {found}"),
        }
    }
}

/// Result of one stage
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Recovery finished with this object
    Parsed(Value),
    /// Continue with this rewritten text
    Next(String),
    /// The text does not parse; later stages see this failure
    Rejected(ParseFailure),
    /// Nothing to contribute
    Unchanged,
}

pub trait RepairStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, input: &str, failure: Option<&ParseFailure>) -> Outcome;
}

/// A recovered object and the stage that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Recovered {
    pub value: Value,
    pub stage: &'static str,
}

pub struct RepairChain {
    strategies: Vec<Box<dyn RepairStrategy>>,
}

impl Default for RepairChain {
    fn default() -> Self {
        Self::standard()
    }
}

impl RepairChain {
    pub fn new(strategies: Vec<Box<dyn RepairStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(Extract),
            Box::new(Clean),
            Box::new(StrictParse),
            Box::new(SelectiveRepair::default()),
            Box::new(Permissive),
            Box::new(KvScrape),
        ])
    }

    /// Run every stage in order until one yields an object
    pub fn run(&self, raw: &str) -> Result<Recovered, ParseFailure> {
        let mut current = raw.to_string();
        let mut failure: Option<ParseFailure> = None;

        for strategy in &self.strategies {
            match strategy.apply(&current, failure.as_ref()) {
                Outcome::Parsed(value) => {
                    return Ok(Recovered {
                        value,
                        stage: strategy.name(),
                    })
                }
                Outcome::Next(text) => {
                    debug!("JSON repair stage '{}' rewrote the input", strategy.name());
                    current = text;
                }
                Outcome::Rejected(reason) => {
                    debug!("JSON repair stage '{}' failed: {}", strategy.name(), reason.message);
                    failure = Some(reason);
                }
                Outcome::Unchanged => {}
            }
        }

        Err(failure.unwrap_or(ParseFailure {
            kind: ParseErrorKind::Other,
            offset: 0,
            message: "no JSON object found in response".to_string(),
        }))
    }
}

/// Recover an assessment object from raw LLM text. Never fails: when nothing can be
/// recovered the neutral fallback object is returned. Required fields are backfilled.
pub fn recover_object(raw: &str) -> Value {
    let mut value = match RepairChain::standard().run(raw) {
        Ok(recovered) => {
            debug!("LLM JSON recovered by the '{}' stage", recovered.stage);
            recovered.value
        }
        Err(failure) => {
            warn!("Could not recover JSON from LLM response: {}", failure.message);
            unparseable_fallback(&failure.message)
        }
    };
    backfill_required(&mut value);
    value
}

/// The neutral assessment used when the response holds no usable JSON
pub fn unparseable_fallback(reason: &str) -> Value {
    json!({
        "factors": {},
        "overall_score": 50,
        "readiness_level": "Cloud-Friendly",
        "summary": format!("Error parsing LLM response: {reason}"),
        "key_strengths": ["Unable to determine due to parsing error"],
        "key_weaknesses": ["Unable to determine due to parsing error"],
        "error": reason,
    })
}

/// Fill missing top-level fields with neutral defaults
pub fn backfill_required(value: &mut Value) {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    let Some(map) = value.as_object_mut() else {
        return;
    };

    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| !map.contains_key(*field))
        .collect();
    if !missing.is_empty() {
        debug!("LLM response missing fields: {:?}", missing);
    }

    if !map.get("factors").is_some_and(Value::is_object) {
        map.insert("factors".to_string(), Value::Object(Map::new()));
    }
    map.entry("overall_score").or_insert(json!(50));
    map.entry("readiness_level").or_insert(json!("Cloud-Friendly"));
    map.entry("summary").or_insert(json!("Analysis completed with limited data."));
    map.entry("key_strengths").or_insert(json!([]));
    map.entry("key_weaknesses").or_insert(json!([]));
}

/// Pull the JSON candidate out of surrounding prose
pub struct Extract;

impl RepairStrategy for Extract {
    fn name(&self) -> &'static str {
        "extract"
    }

    fn apply(&self, input: &str, _failure: Option<&ParseFailure>) -> Outcome {
        let candidate = FENCED_JSON
            .captures(input)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .or_else(|| OUTER_OBJECT.find(input).map(|m| m.as_str().to_string()))
            .or_else(|| brace_balanced_lines(input));

        match candidate {
            Some(text) if !text.trim().is_empty() => Outcome::Next(text),
            _ => Outcome::Next(input.to_string()),
        }
    }
}

/// Lines from the first one opening a brace until the braces balance again
fn brace_balanced_lines(input: &str) -> Option<String> {
    let mut lines = Vec::new();
    let mut depth: i64 = 0;
    let mut inside = false;

    for line in input.lines() {
        if !inside {
            if !line.contains('{') {
                continue;
            }
            inside = true;
        }
        lines.push(line);
        depth += line.matches('{').count() as i64;
        depth -= line.matches('}').count() as i64;
        if depth <= 0 {
            break;
        }
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Regex clean pass for the usual LLM mistakes. Text that already parses is left alone.
pub struct Clean;

impl RepairStrategy for Clean {
    fn name(&self) -> &'static str {
        "clean"
    }

    fn apply(&self, input: &str, _failure: Option<&ParseFailure>) -> Outcome {
        if input.trim().is_empty() || serde_json::from_str::<Value>(input).is_ok() {
            return Outcome::Unchanged;
        }
        Outcome::Next(clean(input))
    }
}

/// Rewrites only touch text between string literals; literal contents are kept verbatim
/// apart from dropped control characters.
pub fn clean(input: &str) -> String {
    let (masked, literals) = mask_literals(input.trim());

    let text = MISSING_COMMA.replace_all(&masked, "${1}, \"");
    let text = BARE_KEY.replace_all(&text, "${1}\"${2}\":");
    let text = BARE_VALUE.replace_all(&text, |caps: &Captures| quote_bare_value(caps));
    let text = OBJECT_END_BEFORE_KEY.replace_all(&text, "${1}}, \"");
    let text = ARRAY_END_BEFORE_KEY.replace_all(&text, "${1}], \"");
    let text = TRAILING_COMMA_OBJECT.replace_all(&text, "}");
    let text = TRAILING_COMMA_ARRAY.replace_all(&text, "]");
    let text = ADJACENT_OPENER.replace_all(&text, "${1}, ${2}");

    MASKED_LITERAL
        .replace_all(&text, |caps: &Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|index| literals.get(index))
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Swap every complete string literal for a numbered placeholder. Between literals, escaped
/// `\n` and control characters become spaces; inside them control characters are dropped.
fn mask_literals(text: &str) -> (String, Vec<String>) {
    let mut masked = String::with_capacity(text.len());
    let mut literals = Vec::new();
    let mut last = 0;

    for found in STRING_LITERAL.find_iter(text) {
        masked.push_str(&clean_gap(&text[last..found.start()]));
        masked.push_str(&format!("\"\x01{}\x01\"", literals.len()));
        literals.push(CONTROL_CHARS.replace_all(found.as_str(), "").into_owned());
        last = found.end();
    }
    masked.push_str(&clean_gap(&text[last..]));

    (masked, literals)
}

fn clean_gap(gap: &str) -> String {
    CONTROL_CHARS.replace_all(&gap.replace("\\n", " "), " ").into_owned()
}

fn quote_bare_value(caps: &Captures) -> String {
    let key = &caps[1];
    let value = caps[2].trim();
    let delimiter = &caps[3];

    if is_literal(value) {
        format!("\"{key}\": {value}{delimiter}")
    } else {
        format!("\"{key}\": \"{}\"{delimiter}", escape(value))
    }
}

fn is_literal(value: &str) -> bool {
    matches!(value, "true" | "false" | "null") || NUMBER.is_match(value)
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Plain `serde_json` parse; only objects are accepted
pub struct StrictParse;

impl RepairStrategy for StrictParse {
    fn name(&self) -> &'static str {
        "strict_parse"
    }

    fn apply(&self, input: &str, _failure: Option<&ParseFailure>) -> Outcome {
        match serde_json::from_str::<Value>(input) {
            Ok(value @ Value::Object(_)) => Outcome::Parsed(value),
            Ok(other) => Outcome::Rejected(ParseFailure::not_an_object(&other)),
            Err(e) => Outcome::Rejected(ParseFailure::from_error(input, &e)),
        }
    }
}

/// Targeted fixes at the offset the parser reported, repeated while each fix exposes a
/// new error
pub struct SelectiveRepair {
    max_rounds: usize,
}

impl Default for SelectiveRepair {
    fn default() -> Self {
        Self {
            max_rounds: SELECTIVE_REPAIR_ROUNDS,
        }
    }
}

impl RepairStrategy for SelectiveRepair {
    fn name(&self) -> &'static str {
        "selective_repair"
    }

    fn apply(&self, input: &str, failure: Option<&ParseFailure>) -> Outcome {
        let Some(first) = failure else {
            return Outcome::Unchanged;
        };

        let mut text = input.to_string();
        let mut failure = first.clone();

        for round in 0..self.max_rounds {
            let Some(fixed) = repair_at(&text, &failure) else {
                debug!("No selective fix for '{}' (round {})", failure.message, round + 1);
                break;
            };
            if fixed == text {
                break;
            }

            match serde_json::from_str::<Value>(&fixed) {
                Ok(value @ Value::Object(_)) => return Outcome::Parsed(value),
                Ok(_) => break,
                Err(e) => {
                    failure = ParseFailure::from_error(&fixed, &e);
                    text = fixed;
                }
            }
        }

        Outcome::Unchanged
    }
}

/// One fix for one failure, if a rule applies
pub fn repair_at(text: &str, failure: &ParseFailure) -> Option<String> {
    let offset = floor_char_boundary(text, failure.offset);
    match failure.kind {
        ParseErrorKind::ExpectingValue => quote_bare_token(text, offset),
        ParseErrorKind::ExpectingDelimiter => insert_missing_comma(text, offset),
        ParseErrorKind::TrailingComma => {
            strip_trailing_comma(text, offset).or_else(|| quote_bare_key(text, offset))
        }
        ParseErrorKind::KeyMustBeString => {
            quote_bare_key(text, offset).or_else(|| strip_trailing_comma(text, offset))
        }
        ParseErrorKind::Eof => close_unbalanced(text),
        ParseErrorKind::NotAnObject | ParseErrorKind::Other => None,
    }
}

fn quote_bare_token(text: &str, offset: usize) -> Option<String> {
    let start = floor_char_boundary(text, offset.saturating_sub(100));
    let end = ceil_char_boundary(text, offset + 20);
    let window = &text[start..end];

    let nearest = UNQUOTED_VALUE
        .captures_iter(window)
        .filter_map(|caps| caps.get(1))
        .filter(|m| start + m.start() <= offset && !is_literal(m.as_str().trim()))
        .last();

    if let Some(m) = nearest {
        let (from, to) = (start + m.start(), start + m.end());
        let value = text[from..to].trim();
        return Some(format!("{}\"{}\"{}", &text[..from], escape(value), &text[to..]));
    }

    // Fall back to the token at the error position
    let rest = &text[offset..];
    let stop = rest
        .char_indices()
        .take(100)
        .find(|(_, c)| matches!(c, ',' | '}' | ']'))
        .map(|(i, _)| i)?;
    let token = rest[..stop].trim();
    if token.is_empty() || token.starts_with('"') || is_literal(token) {
        return None;
    }
    Some(format!("{}\"{}\"{}", &text[..offset], escape(token), &rest[stop..]))
}

fn insert_missing_comma(text: &str, offset: usize) -> Option<String> {
    let bytes = text.as_bytes();
    let lower = offset.saturating_sub(50);
    // The reported column can sit one past the offending byte
    let mut i = (offset + 2).min(bytes.len());

    loop {
        if i < bytes.len() && matches!(bytes[i], b'"' | b'{' | b'[') && ends_with_value(&text[..i]) {
            return Some(format!("{},{}", &text[..i], &text[i..]));
        }
        if i <= lower {
            return None;
        }
        i -= 1;
    }
}

fn ends_with_value(before: &str) -> bool {
    let before = before.trim_end();
    match before.chars().last() {
        Some('"' | '}' | ']') => true,
        Some(c) if c.is_ascii_digit() => true,
        Some(_) => ["true", "false", "null"].iter().any(|lit| before.ends_with(lit)),
        None => false,
    }
}

fn strip_trailing_comma(text: &str, offset: usize) -> Option<String> {
    let start = floor_char_boundary(text, offset.saturating_sub(50));
    let end = ceil_char_boundary(text, offset + 50);

    let comma = TRAILING_COMMA
        .find_iter(&text[start..end])
        .map(|m| start + m.start())
        .min_by_key(|pos| pos.abs_diff(offset))?;

    Some(format!("{}{}", &text[..comma], &text[comma + 1..]))
}

fn quote_bare_key(text: &str, offset: usize) -> Option<String> {
    let rest = &text[offset..];
    let key = LEADING_BARE_KEY.captures(rest)?.get(1)?;
    Some(format!(
        "{}\"{}\"{}",
        &text[..offset + key.start()],
        key.as_str(),
        &text[offset + key.end()..]
    ))
}

/// Close an unterminated string and any open brackets, for truncated responses
fn close_unbalanced(text: &str) -> Option<String> {
    let mut closers = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => closers.push('}'),
            '[' => closers.push(']'),
            '}' | ']' => {
                closers.pop();
            }
            _ => {}
        }
    }

    let mut out = text.to_string();
    if in_string {
        if escaped {
            out.pop();
        }
        out.push('"');
    }

    out.truncate(out.trim_end().len());
    if out.ends_with(',') {
        out.pop();
    } else if out.ends_with(':') {
        out.push_str(" null");
    }
    while let Some(closer) = closers.pop() {
        out.push(closer);
    }

    (out != text).then_some(out)
}

/// YAML is a superset of JSON and tolerates unquoted scalars
pub struct Permissive;

impl RepairStrategy for Permissive {
    fn name(&self) -> &'static str {
        "permissive"
    }

    fn apply(&self, input: &str, _failure: Option<&ParseFailure>) -> Outcome {
        match serde_yaml::from_str::<Value>(input) {
            Ok(value @ Value::Object(_)) => Outcome::Parsed(value),
            Ok(other) => Outcome::Rejected(ParseFailure::not_an_object(&other)),
            Err(e) => {
                debug!("Permissive parse failed: {}", e);
                Outcome::Unchanged
            }
        }
    }
}

/// Last resort: every `"key": value` pair anywhere in the text, as one flat object
pub struct KvScrape;

impl RepairStrategy for KvScrape {
    fn name(&self) -> &'static str {
        "kv_scrape"
    }

    fn apply(&self, input: &str, _failure: Option<&ParseFailure>) -> Outcome {
        let mut map = Map::new();
        let mut pos = 0;

        while pos < input.len() {
            let Some(caps) = KEY_VALUE_PAIR.captures(&input[pos..]) else {
                break;
            };
            let (Some(key), Some(value)) = (caps.get(1), caps.get(2)) else {
                break;
            };

            let raw = value.as_str().trim();
            if raw.starts_with('{') || raw.starts_with('[') {
                // Nested container: look for pairs inside it
                pos += value.start() + 1;
                continue;
            }

            map.insert(key.as_str().to_string(), scalar(raw));
            pos += value.end();
        }

        if map.is_empty() {
            Outcome::Unchanged
        } else {
            Outcome::Parsed(Value::Object(map))
        }
    }
}

fn scalar(raw: &str) -> Value {
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        return serde_json::from_str::<String>(raw)
            .map(Value::String)
            .unwrap_or_else(|_| Value::String(raw[1..raw.len() - 1].to_string()));
    }
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" => return Value::Null,
        _ => {}
    }
    if let Ok(int) = raw.parse::<i64>() {
        return Value::from(int);
    }
    if let Some(number) = raw.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
        return Value::Number(number);
    }
    Value::String(raw.trim_matches('"').to_string())
}

fn byte_offset(input: &str, line: usize, column: usize) -> usize {
    let line_start: usize = input
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    floor_char_boundary(input, line_start + column.saturating_sub(1))
}

fn floor_char_boundary(text: &str, index: usize) -> usize {
    let mut index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(text: &str, index: usize) -> usize {
    let mut index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index += 1;
    }
    index
}
