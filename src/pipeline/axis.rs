//! Tick placement and labeling for the two chart axes.
//!
//! Positions always come from [`DefaultTicks`]; the time and value strategies
//! only rewrite the text of labeled (major) ticks.

use chrono::{DateTime, Duration, Utc};

/// A reference position on an axis. Minor ticks carry an empty label.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub value: f64,
    pub label: String,
}

impl Tick {
    pub fn major(value: f64, label: impl Into<String>) -> Self {
        Self { value, label: label.into() }
    }

    pub fn minor(value: f64) -> Self {
        Self { value, label: String::new() }
    }

    pub fn is_major(&self) -> bool {
        !self.label.is_empty()
    }
}

pub trait Ticker {
    fn ticks(&self, min: f64, max: f64) -> Vec<Tick>;
}

/// Evenly spaced "nice" positions aiming at three labeled ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DefaultTicks;

const SUGGESTED_TICKS: f64 = 3.0;
const MAX_TICKS: usize = 1_000;

impl Ticker for DefaultTicks {
    fn ticks(&self, min: f64, max: f64) -> Vec<Tick> {
        if !min.is_finite() {
            return Vec::new();
        }
        if !max.is_finite() || max <= min {
            return vec![Tick::major(min, plain_label(min))];
        }

        let span = max - min;
        let mut tens = 10f64.powf(span.log10().floor());
        let mut n = span / tens;
        while n < SUGGESTED_TICKS - 1.0 {
            tens /= 10.0;
            n = span / tens;
        }

        let major_mult = match (n / (SUGGESTED_TICKS - 1.0)) as i64 {
            7 => 6,
            9 => 8,
            m => m.max(1),
        };
        let major_delta = major_mult as f64 * tens;
        let decimals = (-major_delta.log10().floor()).max(0.0) as i32;

        let mut ticks: Vec<Tick> = multiples(min, max, major_delta, decimals)
            .map(|v| Tick::major(v, plain_label(v)))
            .collect();

        let minor_delta = match major_mult {
            3 | 6 => major_delta / 3.0,
            5 => major_delta / 5.0,
            _ => major_delta / 2.0,
        };
        let tolerance = minor_delta * 1e-6;
        let minors: Vec<Tick> = multiples(min, max, minor_delta, decimals + 2)
            .filter(|v| !ticks.iter().any(|t| (t.value - v).abs() <= tolerance))
            .map(Tick::minor)
            .collect();
        ticks.extend(minors);
        ticks
    }
}

/// Multiples of `delta` inside `[min, max]`, rounded to `decimals` places.
fn multiples(min: f64, max: f64, delta: f64, decimals: i32) -> impl Iterator<Item = f64> {
    let first = (min / delta).floor();
    (0..MAX_TICKS)
        .map(move |k| round_to((first + k as f64) * delta, decimals))
        .take_while(move |v| *v <= max)
        .filter(move |v| *v >= min)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let pow = 10f64.powi(decimals);
    let rounded = (value * pow).round() / pow;
    if rounded == 0.0 {
        0.0
    } else if rounded.is_finite() {
        rounded
    } else {
        value
    }
}

fn plain_label(value: f64) -> String {
    format!("{}", value)
}

/// Rewrites major labels as wall-clock times in UTC. Windows of a day or more
/// include the date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeTicks {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeTicks {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn pattern(&self) -> &'static str {
        if self.end - self.start >= Duration::hours(24) {
            "%b %-d %H:%M:%S"
        } else {
            "%H:%M:%S"
        }
    }
}

impl Ticker for TimeTicks {
    fn ticks(&self, min: f64, max: f64) -> Vec<Tick> {
        let pattern = self.pattern();
        relabel(DefaultTicks.ticks(min, max), |secs| {
            DateTime::from_timestamp(secs as i64, 0).map(|t| t.format(pattern).to_string())
        })
    }
}

/// Rewrites major labels with SI magnitude prefixes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ValueTicks;

impl Ticker for ValueTicks {
    fn ticks(&self, min: f64, max: f64) -> Vec<Tick> {
        relabel(DefaultTicks.ticks(min, max), |v| Some(si(v)))
    }
}

/// Applies `f` to every parsable major label; anything else passes through.
fn relabel(mut ticks: Vec<Tick>, f: impl Fn(f64) -> Option<String>) -> Vec<Tick> {
    for tick in ticks.iter_mut().filter(|t| t.is_major()) {
        if let Some(label) = tick.label.parse::<f64>().ok().and_then(&f) {
            tick.label = label;
        }
    }
    ticks
}

/// Tick strategy carried by a plot for one of its axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickFormatter {
    Time(TimeTicks),
    Value(ValueTicks),
}

impl Ticker for TickFormatter {
    fn ticks(&self, min: f64, max: f64) -> Vec<Tick> {
        match self {
            TickFormatter::Time(t) => t.ticks(min, max),
            TickFormatter::Value(v) => v.ticks(min, max),
        }
    }
}

const SI_PREFIXES: [&str; 17] = [
    "y", "z", "a", "f", "p", "n", "µ", "m", "", "k", "M", "G", "T", "P", "E", "Z", "Y",
];

/// Human-readable magnitude, e.g. `1_200_000.0` becomes `"1.2M"`.
pub fn si(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        return trim_float(value);
    }

    let magnitude = value.abs();
    let mut exponent = ((magnitude.log10().floor() / 3.0).floor() * 3.0) as i32;
    let mut mantissa = magnitude / 10f64.powi(exponent);
    // log10 can land one ulp short of a power of ten.
    if mantissa >= 1000.0 {
        exponent += 3;
        mantissa = magnitude / 10f64.powi(exponent);
    }

    let clamped = exponent.clamp(-24, 24);
    if clamped != exponent {
        mantissa = magnitude / 10f64.powi(clamped);
    }

    let prefix = SI_PREFIXES[((clamped + 24) / 3) as usize];
    format!("{}{}", trim_float(mantissa.copysign(value)), prefix)
}

/// Six decimals with trailing zeros removed.
fn trim_float(value: f64) -> String {
    let mut s = format!("{:.6}", value);
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    if s == "-0" {
        s = "0".to_string();
    }
    s
}
