//! Query-string handling for the chart endpoints.

use chrono::{DateTime, Duration, Utc};

use crate::models::{ChartOptions, OutputFormat, QuerySpec};
use crate::{ChartError, Result};

pub const MISSING_QUERY: &str = "Expected ?query=... parameter";

/// Points per inch of chart width when no step is requested.
const POINTS_PER_INCH: f64 = 25.0;

/// Raw query-string pairs. When a name repeats the first value wins.
pub struct Params<'a>(&'a [(String, String)]);

impl<'a> Params<'a> {
    pub fn new(pairs: &'a [(String, String)]) -> Self {
        Self(pairs)
    }

    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    fn float(&self, name: &str) -> Result<Option<f64>> {
        self.get(name)
            .map(|raw| {
                raw.trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| invalid(name, raw))
            })
            .transpose()
    }

    fn duration(&self, name: &str, default: Duration) -> Result<Duration> {
        match self.get(name) {
            None => Ok(default),
            Some(raw) => parse_duration(raw).map_err(|_| invalid(name, raw)),
        }
    }
}

fn invalid(name: &str, raw: &str) -> ChartError {
    ChartError::Validation(format!("invalid value {:?} for parameter {}", raw, name))
}

/// Turns the query string of a chart request into the backend query and the
/// rendering options. `now` anchors the relative `since`/`until` window.
pub fn parse_request(
    pairs: &[(String, String)],
    format: OutputFormat,
    now: DateTime<Utc>,
) -> Result<(QuerySpec, ChartOptions)> {
    let params = Params::new(pairs);

    let query = params
        .get("query")
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ChartError::Validation(MISSING_QUERY.to_string()))?;

    let since = params.duration("since", Duration::hours(24))?;
    let until = params.duration("until", Duration::zero())?;
    let start = now - since;
    let end = now - until;
    if start >= end {
        return Err(ChartError::Validation(
            "since must reach further back than until".to_string(),
        ));
    }

    let defaults = ChartOptions::default();
    let width = positive(&params, "width")?.unwrap_or(defaults.width_inches);
    let height = positive(&params, "height")?.unwrap_or(defaults.height_inches);

    let step_seconds = match params.get("step") {
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|s| *s > 0)
            .ok_or_else(|| invalid("step", raw))?,
        None => default_step(end - start, width),
    };

    let spec = QuerySpec {
        query: query.to_string(),
        start,
        end,
        step_seconds,
    };

    let options = ChartOptions {
        title: params.get("title").filter(|t| !t.is_empty()).map(str::to_string),
        width_inches: width,
        height_inches: height,
        y_min: params.float("min")?,
        y_max: params.float("max")?,
        stacked: params.has("stacked"),
        legend_template: params
            .get("label")
            .filter(|l| !l.is_empty())
            .or_else(|| params.get("legend").filter(|l| !l.is_empty()))
            .map(str::to_string),
        output_format: format,
    };

    Ok((spec, options))
}

fn positive(params: &Params<'_>, name: &str) -> Result<Option<f64>> {
    match params.float(name)? {
        Some(v) if v <= 0.0 => Err(ChartError::Validation(format!(
            "parameter {} must be positive",
            name
        ))),
        other => Ok(other),
    }
}

/// About 25 samples per inch of chart width, never below one second.
pub fn default_step(window: Duration, width_inches: f64) -> i64 {
    let seconds = window.num_milliseconds() as f64 / 1000.0;
    ((seconds / (POINTS_PER_INCH * width_inches)).floor() as i64).max(1)
}

/// Parses durations such as `90s`, `1h30m`, `1.5h` or `-250ms`.
pub fn parse_duration(input: &str) -> std::result::Result<Duration, String> {
    let mut rest = input;
    let negative = match rest.as_bytes().first() {
        Some(b'-') => {
            rest = &rest[1..];
            true
        }
        Some(b'+') => {
            rest = &rest[1..];
            false
        }
        _ => false,
    };

    if rest == "0" {
        return Ok(Duration::zero());
    }
    if rest.is_empty() {
        return Err(format!("invalid duration {:?}", input));
    }

    let mut total_nanos = 0f64;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let number = &rest[..number_len];
        if number.is_empty() || number == "." {
            return Err(format!("invalid duration {:?}", input));
        }
        let value: f64 = number
            .parse()
            .map_err(|_| format!("invalid duration {:?}", input))?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let nanos_per_unit = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            "" => return Err(format!("missing unit in duration {:?}", input)),
            unit => return Err(format!("unknown unit {:?} in duration {:?}", unit, input)),
        };
        rest = &rest[unit_len..];
        total_nanos += value * nanos_per_unit;
    }

    if total_nanos > i64::MAX as f64 {
        return Err(format!("invalid duration {:?}", input));
    }
    let nanos = total_nanos.round() as i64;
    Ok(Duration::nanoseconds(if negative { -nanos } else { nanos }))
}
