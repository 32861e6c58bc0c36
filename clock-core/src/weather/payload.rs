//! Forecast document parser.
//!
//! A small JSON reader built on `winnow` that walks the body once and keeps
//! only the fields the clock displays. Unknown members are skipped with a
//! nesting limit; absent or mistyped fields leave their slot empty so the
//! caller can fall back to neutral values.

use core::fmt;

use heapless::String;
use winnow::ascii::{float, multispace0};
use winnow::combinator::{alt, opt, peek};
use winnow::error::{ContextError, ErrMode};
use winnow::ModalResult;
use winnow::prelude::*;
use winnow::token::{any, one_of, take_till};

use crate::error::{ClockError, MalformedKind};
use crate::text::copy_truncated;

/// Largest body accepted from the forecast service.
pub const MAX_RESPONSE_LEN: usize = 1536;
/// Deepest object/array nesting the skipper will walk.
pub const MAX_NESTING: usize = 8;
/// Capacity for an ISO-8601 timestamp copied out of the body.
pub const TIMESTAMP_CAPACITY: usize = 24;

/// Reasons a forecast body is rejected.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PayloadError {
    Oversized,
    TooDeep,
    InvalidUtf8,
    UnexpectedToken,
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PayloadError::Oversized => "body too large",
            PayloadError::TooDeep => "nesting too deep",
            PayloadError::InvalidUtf8 => "invalid utf-8",
            PayloadError::UnexpectedToken => "unexpected token",
        })
    }
}

impl From<PayloadError> for ClockError {
    fn from(error: PayloadError) -> Self {
        ClockError::MalformedResponse(match error {
            PayloadError::Oversized => MalformedKind::Oversized,
            PayloadError::TooDeep => MalformedKind::TooDeep,
            PayloadError::InvalidUtf8 => MalformedKind::InvalidField,
            PayloadError::UnexpectedToken => MalformedKind::UnexpectedToken,
        })
    }
}

/// Fields extracted from a forecast body.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ForecastDocument {
    pub temperature: Option<f32>,
    pub weather_code: Option<i16>,
    pub windspeed: Option<f32>,
    pub humidity: Option<f32>,
    pub sunrise: Option<String<TIMESTAMP_CAPACITY>>,
    pub sunset: Option<String<TIMESTAMP_CAPACITY>>,
}

/// Parses a raw response body.
///
/// # Errors
///
/// Returns [`PayloadError`] when the body is too large, not UTF-8, nested
/// beyond [`MAX_NESTING`] or not a JSON object.
pub fn parse_forecast_bytes(body: &[u8]) -> Result<ForecastDocument, PayloadError> {
    if body.len() > MAX_RESPONSE_LEN {
        return Err(PayloadError::Oversized);
    }
    let text = core::str::from_utf8(body).map_err(|_| PayloadError::InvalidUtf8)?;
    parse_forecast(text)
}

/// Parses a forecast body already known to be text.
///
/// # Errors
///
/// See [`parse_forecast_bytes`].
pub fn parse_forecast(body: &str) -> Result<ForecastDocument, PayloadError> {
    if body.len() > MAX_RESPONSE_LEN {
        return Err(PayloadError::Oversized);
    }
    if nesting_depth(body) > MAX_NESTING {
        return Err(PayloadError::TooDeep);
    }

    let mut input = body;
    let mut document = ForecastDocument::default();
    forecast(&mut input, &mut document).map_err(|_| PayloadError::UnexpectedToken)?;
    if !input.trim_start().is_empty() {
        return Err(PayloadError::UnexpectedToken);
    }
    Ok(document)
}

fn forecast(input: &mut &str, document: &mut ForecastDocument) -> ModalResult<()> {
    ws(input)?;
    members(input, |key, input| match key {
        "current_weather" | "current" if peeks_object(input) => {
            members(input, |key, input| current_field(key, input, document))
        }
        "daily" if peeks_object(input) => {
            members(input, |key, input| daily_field(key, input, document))
        }
        _ => skip_value(input, 1),
    })
}

fn current_field(key: &str, input: &mut &str, document: &mut ForecastDocument) -> ModalResult<()> {
    match key {
        "temperature" | "temperature_2m" => document.temperature = number(input)?,
        "windspeed" | "wind_speed_10m" => document.windspeed = number(input)?,
        "relative_humidity_2m" | "humidity" => document.humidity = number(input)?,
        "weathercode" | "weather_code" => document.weather_code = number(input)?.and_then(whole_code),
        _ => skip_value(input, 2)?,
    }
    Ok(())
}

fn daily_field(key: &str, input: &mut &str, document: &mut ForecastDocument) -> ModalResult<()> {
    let slot = match key {
        "sunrise" => &mut document.sunrise,
        "sunset" => &mut document.sunset,
        _ => return skip_value(input, 2),
    };
    if !peeks(input, '[') {
        return skip_value(input, 2);
    }
    elements(input, |index, input| {
        if index == 0 && peeks(input, '"') {
            *slot = Some(copy_truncated(string(input)?));
            Ok(())
        } else {
            skip_value(input, 3)
        }
    })
}

/// WMO codes are small whole numbers; anything else is discarded.
#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn whole_code(value: f32) -> Option<i16> {
    if !(-1.0..=999.0).contains(&value) {
        return None;
    }
    let code = value as i16;
    (f32::from(code) == value).then_some(code)
}

/// Reads a number, leaving `None` for any other value type.
fn number(input: &mut &str) -> ModalResult<Option<f32>> {
    if matches!(input.chars().next(), Some('-' | '0'..='9')) {
        let value: f32 = float.parse_next(input)?;
        Ok(Some(value))
    } else {
        skip_value(input, 2)?;
        Ok(None)
    }
}

fn members<'a>(
    input: &mut &'a str,
    mut on_member: impl FnMut(&'a str, &mut &'a str) -> ModalResult<()>,
) -> ModalResult<()> {
    '{'.parse_next(input)?;
    ws(input)?;
    if opt('}').parse_next(input)?.is_some() {
        return Ok(());
    }
    loop {
        ws(input)?;
        let key = string(input)?;
        ws(input)?;
        ':'.parse_next(input)?;
        ws(input)?;
        on_member(key, input)?;
        ws(input)?;
        if one_of([',', '}']).parse_next(input)? == '}' {
            return Ok(());
        }
    }
}

fn elements<'a>(
    input: &mut &'a str,
    mut on_element: impl FnMut(usize, &mut &'a str) -> ModalResult<()>,
) -> ModalResult<()> {
    '['.parse_next(input)?;
    ws(input)?;
    if opt(']').parse_next(input)?.is_some() {
        return Ok(());
    }
    let mut index = 0;
    loop {
        ws(input)?;
        on_element(index, input)?;
        index += 1;
        ws(input)?;
        if one_of([',', ']']).parse_next(input)? == ']' {
            return Ok(());
        }
    }
}

/// Consumes any JSON value without keeping it.
fn skip_value(input: &mut &str, depth: usize) -> ModalResult<()> {
    if depth > MAX_NESTING {
        return Err(ErrMode::Cut(ContextError::new()));
    }
    match peek(any).parse_next(input)? {
        '{' => members(input, |_, input| skip_value(input, depth + 1)),
        '[' => elements(input, |_, input| skip_value(input, depth + 1)),
        '"' => string.void().parse_next(input),
        't' | 'f' | 'n' => alt(("true", "false", "null")).void().parse_next(input),
        _ => float::<_, f64, _>.void().parse_next(input),
    }
}

/// Reads a string body without unescaping it.
fn string<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    '"'.parse_next(input)?;
    let body = *input;
    loop {
        take_till(0.., ['"', '\\']).parse_next(input)?;
        if any.parse_next(input)? == '"' {
            break;
        }
        any.parse_next(input)?;
    }
    let consumed = body.len() - input.len() - 1;
    Ok(&body[..consumed])
}

fn ws(input: &mut &str) -> ModalResult<()> {
    multispace0.void().parse_next(input)
}

fn peeks(input: &str, token: char) -> bool {
    input.starts_with(token)
}

fn peeks_object(input: &str) -> bool {
    peeks(input, '{')
}

/// Deepest bracket nesting outside string literals.
fn nesting_depth(body: &str) -> usize {
    let mut depth = 0_usize;
    let mut deepest = 0;
    let mut in_string = false;
    let mut escaped = false;
    for byte in body.bytes() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' | b'[' => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            b'}' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    deepest
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "latitude": 37.19,
        "longitude": -8.54,
        "current_weather": {"temperature": 16.4, "windspeed": 11.2, "winddirection": 270, "weathercode": 3, "is_day": 1, "time": "2026-01-02T14:00"},
        "daily_units": {"sunrise": "iso8601", "sunset": "iso8601"},
        "daily": {"time": ["2026-01-02"], "sunrise": ["2026-01-02T07:52"], "sunset": ["2026-01-02T17:31"]}
    }"#;

    #[test]
    fn extracts_current_weather_and_sun_times() {
        let document = parse_forecast(SAMPLE).unwrap();
        assert_eq!(document.temperature, Some(16.4));
        assert_eq!(document.windspeed, Some(11.2));
        assert_eq!(document.weather_code, Some(3));
        assert_eq!(document.humidity, None);
        assert_eq!(document.sunrise.as_deref(), Some("2026-01-02T07:52"));
        assert_eq!(document.sunset.as_deref(), Some("2026-01-02T17:31"));
    }

    #[test]
    fn mistyped_fields_fall_back_to_empty() {
        let document =
            parse_forecast(r#"{"current_weather": {"temperature": "warm", "weathercode": null}}"#)
                .unwrap();
        assert_eq!(document.temperature, None);
        assert_eq!(document.weather_code, None);
    }

    #[test]
    fn escaped_quotes_stay_inside_strings() {
        let document =
            parse_forecast(r#"{"note": "say \"hi\" {", "current_weather": {"temperature": -2.5}}"#)
                .unwrap();
        assert_eq!(document.temperature, Some(-2.5));
    }

    #[test]
    fn rejects_truncated_and_trailing_input() {
        assert_eq!(
            parse_forecast(r#"{"current_weather": {"temperature": 1"#),
            Err(PayloadError::UnexpectedToken)
        );
        assert_eq!(parse_forecast("{} x"), Err(PayloadError::UnexpectedToken));
        assert_eq!(parse_forecast("<html>"), Err(PayloadError::UnexpectedToken));
    }

    #[test]
    fn rejects_deep_nesting() {
        assert_eq!(
            parse_forecast(r#"{"a":[[[[[[[[[1]]]]]]]]]}"#),
            Err(PayloadError::TooDeep)
        );
    }

    #[test]
    fn rejects_oversized_bodies() {
        let body = [b' '; MAX_RESPONSE_LEN + 1];
        assert_eq!(parse_forecast_bytes(&body), Err(PayloadError::Oversized));
    }
}
