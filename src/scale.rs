//! Scales mapping data values to pixels and colours.
//!
//! Summary helpers skip non-finite values, so a row with an unparseable
//! field never widens or poisons a domain.

use std::fmt;
use tracing::warn;

/// Linear map from a data domain onto a pixel range. The range may be
/// inverted, as it is for the vertical axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    pub fn apply(&self, value: f64) -> f64 {
        let t = normalize(self.domain.0, self.domain.1, value);
        self.range.0 + t * (self.range.1 - self.range.0)
    }

    /// Round tick values covering the domain, roughly `count` of them.
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        let (lo, hi) = if self.domain.0 <= self.domain.1 {
            self.domain
        } else {
            (self.domain.1, self.domain.0)
        };
        let Some((power, factor)) = tick_increment(lo, hi, count) else {
            return Vec::new();
        };

        if power >= 0 {
            let step = factor * 10f64.powi(power);
            let first = (lo / step).ceil() as i64;
            let last = (hi / step).floor() as i64;
            (first..=last).map(|i| i as f64 * step).collect()
        } else {
            // divide by the inverse step to keep decimal ticks exact
            let inv = 10f64.powi(-power) / factor;
            let first = (lo * inv).ceil() as i64;
            let last = (hi * inv).floor() as i64;
            (first..=last).map(|i| i as f64 / inv).collect()
        }
    }

    /// Formats a tick label with just enough decimals for the tick step.
    pub fn tick_format(&self, count: usize) -> impl Fn(f64) -> String {
        let (lo, hi) = self.domain;
        let decimals = tick_increment(lo.min(hi), lo.max(hi), count)
            .map(|(power, factor)| {
                let power = if factor >= 10.0 { power + 1 } else { power };
                (-power).max(0) as usize
            })
            .unwrap_or(0);
        move |value| format_grouped(value, decimals)
    }
}

fn normalize(a: f64, b: f64, value: f64) -> f64 {
    let span = b - a;
    if span == 0.0 {
        0.5
    } else {
        (value - a) / span
    }
}

// Step as factor * 10^power with factor in {1, 2, 5, 10}.
fn tick_increment(lo: f64, hi: f64, count: usize) -> Option<(i32, f64)> {
    if count == 0 || !lo.is_finite() || !hi.is_finite() || hi <= lo {
        return None;
    }
    let step = (hi - lo) / count as f64;
    let power = step.log10().floor();
    let error = step / 10f64.powf(power);
    let factor = if error >= 50f64.sqrt() {
        10.0
    } else if error >= 10f64.sqrt() {
        5.0
    } else if error >= 2f64.sqrt() {
        2.0
    } else {
        1.0
    };
    Some((power as i32, factor))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn from_hex(hex: &str) -> Self {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            warn!("Invalid colour '{}', falling back to black", hex);
            return Self::new(0, 0, 0);
        }
        let r = u8::from_str_radix(&hex[0..2], 16).unwrap_or(0);
        let g = u8::from_str_radix(&hex[2..4], 16).unwrap_or(0);
        let b = u8::from_str_radix(&hex[4..6], 16).unwrap_or(0);
        Self::new(r, g, b)
    }

    fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let channel = |a: u8, b: u8| {
            let v = f64::from(a) + t * (f64::from(b) - f64::from(a));
            v.round().clamp(0.0, 255.0) as u8
        };
        Rgb::new(
            channel(self.r, other.r),
            channel(self.g, other.g),
            channel(self.b, other.b),
        )
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

/// Piecewise-linear colour ramp over three stops (low, mid, high).
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    domain: [f64; 3],
    range: [Rgb; 3],
}

impl ColorScale {
    pub fn new(domain: [f64; 3], range: [Rgb; 3]) -> Self {
        Self { domain, range }
    }

    pub fn domain(&self) -> [f64; 3] {
        self.domain
    }

    /// Missing values (`NaN`) take the middle stop.
    pub fn apply(&self, value: f64) -> Rgb {
        if value.is_nan() {
            return self.range[1];
        }
        // values equal to the middle stop fall in the upper segment
        let i = if value < self.domain[1] { 0 } else { 1 };
        let t = normalize(self.domain[i], self.domain[i + 1], value);
        if t.is_nan() {
            return self.range[i];
        }
        self.range[i].lerp(self.range[i + 1], t)
    }
}

pub fn extent(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Fixed-point formatting with comma thousands separators.
pub fn format_grouped(value: f64, decimals: usize) -> String {
    let text = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3 + 2);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(frac) = frac_part {
        grouped.push('.');
        grouped.push_str(frac);
    }

    let is_zero = text.chars().all(|c| c == '0' || c == '.');
    if value.is_sign_negative() && !is_zero {
        grouped.insert(0, '-');
    }
    grouped
}
