// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt;

use jiff::Timestamp;
use jiff::fmt::strtime;
use jiff::tz::TimeZone;

use crate::Error;
use crate::json;
use crate::json::EncodeOptions;
use crate::packer::Packer;
use crate::record::Record;
use crate::value::Map;
use crate::value::Value;

/// The pattern used by [`LinePacker::default`].
pub const DEFAULT_PATTERN: &str = "{timestamp} | {channel} | {tag} | {context} | {payload}";

/// The widest column a pattern may ask for.
pub const MAX_WIDTH: usize = u16::MAX as usize;

/// ISO-8601 with offset, seconds precision.
const ATOM: &str = "%Y-%m-%dT%H:%M:%S%:z";

/// A packer rendering records through a line pattern.
///
/// Placeholders are `{timestamp}`, `{timestamp:FMT}` (FMT is a strftime pattern), `{channel}`,
/// `{tag}`, `{context}`, `{context:KEY}`, `{payload}` and `{payload:KEY}`. Each may be followed
/// by a width: `-N` left-aligns the value in N columns, `N` or `+N` right-aligns it. `\{` stands
/// for a literal brace.
///
/// `{context}` and `{payload}` render the whole map as JSON. With a key, the single value is
/// rendered as JSON with its surrounding quotes stripped; a missing key renders as empty.
///
/// # Examples
///
/// ```
/// use flogger::packer::LinePacker;
///
/// let packer = LinePacker::new("[{timestamp:%H:%M:%S}] {tag}-8 {payload:message}").unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct LinePacker {
    template: Vec<Piece>,
    fields: Vec<Field>,
    options: EncodeOptions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Slot(Align),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    None,
    Left(usize),
    Right(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Field {
    Timestamp(Option<String>),
    Channel,
    Tag,
    Context(Option<String>),
    Payload(Option<String>),
}

impl Default for LinePacker {
    fn default() -> Self {
        let literal = || Piece::Literal(" | ".to_string());
        Self {
            template: vec![
                Piece::Slot(Align::None),
                literal(),
                Piece::Slot(Align::None),
                literal(),
                Piece::Slot(Align::None),
                literal(),
                Piece::Slot(Align::None),
                literal(),
                Piece::Slot(Align::None),
            ],
            fields: vec![
                Field::Timestamp(None),
                Field::Channel,
                Field::Tag,
                Field::Context(None),
                Field::Payload(None),
            ],
            options: EncodeOptions::default(),
        }
    }
}

impl LinePacker {
    /// Compile `pattern`.
    ///
    /// Fails with a configuration error if a timestamp format cannot be applied or a width
    /// exceeds [`MAX_WIDTH`].
    pub fn new(pattern: &str) -> Result<Self, Error> {
        let (template, fields) = compile(pattern)?;
        Ok(Self {
            template,
            fields,
            options: EncodeOptions::default(),
        })
    }

    /// Set the encoder options used for `{context}` and `{payload}`.
    pub fn options(mut self, options: EncodeOptions) -> Self {
        self.options = options;
        self
    }
}

impl fmt::Display for LinePacker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LinePacker")
    }
}

impl Packer for LinePacker {
    fn pack(&self, record: &Record) -> Result<String, Error> {
        let values = self
            .fields
            .iter()
            .map(|field| self.render(field, record))
            .collect::<Result<Vec<_>, _>>()?;

        let mut values = values.into_iter();
        let mut out = String::new();
        for piece in &self.template {
            match piece {
                Piece::Literal(text) => out.push_str(text),
                Piece::Slot(align) => {
                    let value = values.next().unwrap_or_default();
                    match *align {
                        Align::None => out.push_str(&value),
                        Align::Left(width) => {
                            out.push_str(&value);
                            pad(&mut out, &value, width);
                        }
                        Align::Right(width) => {
                            pad(&mut out, &value, width);
                            out.push_str(&value);
                        }
                    }
                }
            }
        }
        Ok(out)
    }
}

impl LinePacker {
    fn render(&self, field: &Field, record: &Record) -> Result<String, Error> {
        match field {
            Field::Timestamp(format) => {
                let format = format.as_deref().unwrap_or(ATOM);
                strtime::format(format, record.timestamp()).map_err(|err| {
                    Error::pack("failed to format timestamp")
                        .with_context("format", format)
                        .with_source(err)
                })
            }
            Field::Channel => Ok(record.channel().to_string()),
            Field::Tag => Ok(record.tag().to_string()),
            Field::Context(key) => Ok(self.render_map(record.context(), key.as_deref())),
            Field::Payload(key) => Ok(self.render_map(record.payload(), key.as_deref())),
        }
    }

    fn render_map(&self, map: &Map, key: Option<&str>) -> String {
        match key {
            None => json::encode(&Value::Map(map.clone()), &self.options),
            Some(key) => {
                let value = map.get(key).cloned().unwrap_or_else(|| Value::from(""));
                json::encode(&value, &self.options)
                    .trim_matches('"')
                    .to_string()
            }
        }
    }
}

fn compile(pattern: &str) -> Result<(Vec<Piece>, Vec<Field>), Error> {
    let mut template = vec![];
    let mut fields = vec![];
    let mut literal = String::new();

    let mut rest = pattern;
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("\\{") {
            literal.push('{');
            rest = after;
            continue;
        }

        if rest.starts_with('{') {
            if let Some((field, align, after)) = placeholder(rest)? {
                if !literal.is_empty() {
                    template.push(Piece::Literal(std::mem::take(&mut literal)));
                }
                template.push(Piece::Slot(align));
                fields.push(field);
                rest = after;
                continue;
            }
        }

        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            literal.push(c);
        }
        rest = chars.as_str();
    }

    if !literal.is_empty() {
        template.push(Piece::Literal(literal));
    }
    Ok((template, fields))
}

/// Parse a placeholder at the start of `s`, which begins with `{`.
///
/// Returns `None` when `s` does not start with a valid placeholder.
fn placeholder(s: &str) -> Result<Option<(Field, Align, &str)>, Error> {
    let Some(end) = s[1..].find(['{', '}']).map(|i| i + 1) else {
        return Ok(None);
    };
    if !s[end..].starts_with('}') {
        return Ok(None);
    }

    let body = &s[1..end];
    let (name, arg) = match body.split_once(':') {
        Some((name, arg)) => (name, Some(arg.trim()).filter(|arg| !arg.is_empty())),
        None => (body, None),
    };
    let arg = arg.map(str::to_string);

    let field = match name {
        "timestamp" => {
            if let Some(format) = &arg {
                check_timestamp_format(format)?;
            }
            Field::Timestamp(arg)
        }
        "channel" => Field::Channel,
        "tag" => Field::Tag,
        "context" => Field::Context(arg),
        "payload" => Field::Payload(arg),
        _ => return Ok(None),
    };

    let (align, rest) = width(&s[end + 1..])?;
    Ok(Some((field, align, rest)))
}

fn width(s: &str) -> Result<(Align, &str), Error> {
    let (left, start) = match s.as_bytes().first() {
        Some(b'-') => (true, 1),
        Some(b'+') => (false, 1),
        _ => (false, 0),
    };

    let digits = s[start..].bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return Ok((Align::None, s));
    }

    let end = start + digits;
    let width = s[start..end]
        .parse::<usize>()
        .ok()
        .filter(|width| *width <= MAX_WIDTH)
        .ok_or_else(|| {
            Error::configuration("invalid column width")
                .with_context("width", &s[start..end])
                .with_context("max", MAX_WIDTH)
        })?;

    let align = match (width, left) {
        (0, _) => Align::None,
        (width, true) => Align::Left(width),
        (width, false) => Align::Right(width),
    };
    Ok((align, &s[end..]))
}

/// Fill up to `width` columns, counted in chars.
fn pad(out: &mut String, value: &str, width: usize) {
    let len = value.chars().count();
    out.extend(std::iter::repeat_n(' ', width.saturating_sub(len)));
}

fn check_timestamp_format(format: &str) -> Result<(), Error> {
    let probe = Timestamp::UNIX_EPOCH.to_zoned(TimeZone::UTC);
    strtime::format(format, &probe).map(|_| ()).map_err(|err| {
        Error::configuration("invalid timestamp format")
            .with_context("format", format)
            .with_source(err)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::packer::testing::record;

    fn simple() -> Record {
        record("foo", "bar", Map::new(), Map::new())
    }

    #[test]
    fn test_default_pattern() {
        let packer = LinePacker::default();
        let compiled = LinePacker::new(DEFAULT_PATTERN).unwrap();
        assert_eq!(packer.template, compiled.template);
        assert_eq!(packer.fields, compiled.fields);

        let record = record(
            "foo",
            "app.error",
            Map::from([("zig", "zag")]),
            Map::from([("zoid", "berg")]),
        );
        assert_eq!(
            packer.pack(&record).unwrap(),
            r#"2024-08-11T14:44:57+00:00 | foo | app.error | {"zoid":"berg"} | {"zig":"zag"}"#
        );
    }

    #[test]
    fn test_timestamp_format() {
        let packer = LinePacker::new("[{timestamp:%d/%m/%Y %H:%M:%S}-30] [{timestamp}+30]").unwrap();
        assert_eq!(
            packer.pack(&simple()).unwrap(),
            "[11/08/2024 14:44:57           ] [     2024-08-11T14:44:57+00:00]"
        );
    }

    #[test]
    fn test_channel_and_tag_alignment() {
        let packer = LinePacker::new("[{channel}-10] [{channel}10]").unwrap();
        assert_eq!(packer.pack(&simple()).unwrap(), "[foo       ] [       foo]");

        let packer = LinePacker::new("[{tag}-30] [{tag}+30]").unwrap();
        assert_eq!(
            packer.pack(&simple()).unwrap(),
            format!("[{:<30}] [{:>30}]", "bar", "bar")
        );
    }

    #[test]
    fn test_context_and_payload_keys() {
        let record = record(
            "foo",
            "bar",
            Map::from([("zoid", Value::from("berg")), ("n", Value::from(1))]),
            Map::from([("zoid", Value::from("berg")), ("list", Value::from(vec![1, 2]))]),
        );

        let packer = LinePacker::new("[zoid: {context:zoid}+10]").unwrap();
        assert_eq!(packer.pack(&record).unwrap(), "[zoid:       berg]");

        let packer = LinePacker::new("[zoid: {context:foo}-10]").unwrap();
        assert_eq!(packer.pack(&record).unwrap(), "[zoid:           ]");

        let packer = LinePacker::new("[zoid: {payload:zoid}10]").unwrap();
        assert_eq!(packer.pack(&record).unwrap(), "[zoid:       berg]");

        let packer = LinePacker::new("{context:list} {payload:n} {payload: n }").unwrap();
        assert_eq!(packer.pack(&record).unwrap(), "[1,2] 1 1");
    }

    #[test]
    fn test_special_chars() {
        let packer = LinePacker::new(r"\{{channel}-10} % \{{tag}10} \{tag}").unwrap();
        assert_eq!(
            packer.pack(&simple()).unwrap(),
            "{foo       } % {       bar} {tag}"
        );
    }

    #[test]
    fn test_unknown_and_unclosed_placeholders_are_literal() {
        let packer = LinePacker::new("{level} {tag {channel}- {tag}+x").unwrap();
        assert_eq!(packer.pack(&simple()).unwrap(), "{level} {tag foo- bar+x");
    }

    #[test]
    fn test_padding_counts_characters() {
        let record = record("zoë", "bar", Map::new(), Map::new());
        let packer = LinePacker::new("[{channel}5]").unwrap();
        assert_eq!(packer.pack(&record).unwrap(), "[  zoë]");
    }

    #[test]
    fn test_column_width_limit() {
        let packer = LinePacker::new(&format!("[{{channel}}-{MAX_WIDTH}]")).unwrap();
        let line = packer.pack(&simple()).unwrap();
        assert_eq!(line.chars().count(), MAX_WIDTH + 2);
        assert!(line.starts_with("[foo "));

        for pattern in ["[{channel}70000]", "[{tag}-99999999999999999999999]"] {
            let err = LinePacker::new(pattern).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration);
            assert_eq!(err.message(), "invalid column width");
        }
    }

    #[test]
    fn test_invalid_timestamp_format() {
        let err = LinePacker::new("{timestamp:%Y-%}").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
