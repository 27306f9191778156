//! Feed-line parsing.
//!
//! The upstream feed returns one assignment-like line per instrument:
//!
//! ```text
//! var hq_str_s_sh000001="上证指数,3266.72,71.84,2.25,4098106,55552292";
//! ```
//!
//! Each category uses a different comma-field layout, so the instrument
//! table decides which indices map to price/change/percent. Lines for codes
//! not present in the instrument table are dropped silently: the feed may
//! return extra or missing entries without that being an error.

use tracing::trace;

use crate::instruments::{Category, FormatGroup, InstrumentSet};

/// One parsed quote. Ephemeral: produced per cycle, consumed by the update
/// decision engine, discarded.
#[derive(Debug, Clone)]
pub struct Quote {
    pub code: String,
    pub category: Category,
    pub format_group: FormatGroup,
    /// The raw quoted payload, kept verbatim for payload-parity reads.
    pub raw: String,
    pub price: f64,
    pub change: f64,
    pub percent: f64,
}

impl Quote {
    /// Plausibility gate applied before the decision engine. Non-positive
    /// prices are corrupt; for equity indexes a price below 1 is taken as
    /// corrupt too.
    ///
    /// The index floor is a heuristic tied to current index levels; it will
    /// misclassify a rebased index. Revisit before adding categories.
    pub fn plausible(&self) -> bool {
        if self.price <= 0.0 {
            return false;
        }
        if self.category.is_index() && self.price < 1.0 {
            return false;
        }
        true
    }
}

/// Parses a full feed response into quotes for known instruments.
pub fn parse_feed(text: &str, instruments: &InstrumentSet) -> Vec<Quote> {
    let mut out = Vec::new();

    for line in text.lines().filter(|l| l.contains("hq_str_")) {
        let Some((code, raw)) = split_line(line) else {
            trace!(line, "malformed feed line skipped");
            continue;
        };

        let Some(instrument) = instruments.get(code) else {
            trace!(code, "unknown code dropped");
            continue;
        };

        let fields: Vec<&str> = raw.split(',').collect();
        let (price, change, percent) = parse_fields(&fields, instrument.category);

        out.push(Quote {
            code: code.to_string(),
            category: instrument.category,
            format_group: FormatGroup::from_code(code),
            raw: raw.to_string(),
            price,
            change,
            percent,
        });
    }

    out
}

/// Extracts `(code, payload)` from `var hq_str_<code>="<payload>";`.
fn split_line(line: &str) -> Option<(&str, &str)> {
    let rest = &line[line.find("hq_str_")? + "hq_str_".len()..];
    let eq = rest.find('=')?;
    let code = rest[..eq].trim();
    if code.is_empty() {
        return None;
    }

    let after_eq = &rest[eq + 1..];
    let open = after_eq.find('"')?;
    let close = after_eq[open + 1..].find('"')?;
    let raw = &after_eq[open + 1..open + 1 + close];

    Some((code, raw))
}

/// Field at `idx` as f64, defaulting to 0 when absent or unparsable.
fn num(fields: &[&str], idx: usize) -> f64 {
    fields
        .get(idx)
        .and_then(|s| s.trim().parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Maps raw fields to (price, change, percent) per category layout.
///
/// For layouts that only carry a reference price (previous close or open),
/// change and percent are computed; a zero denominator yields percent 0
/// rather than NaN/Inf.
fn parse_fields(fields: &[&str], category: Category) -> (f64, f64, f64) {
    if fields.is_empty() {
        return (0.0, 0.0, 0.0);
    }

    match category {
        Category::Us => (num(fields, 1), num(fields, 4), num(fields, 2)),
        Category::Hk => (num(fields, 2), num(fields, 7), num(fields, 8)),
        Category::Metal | Category::Energy => {
            // Continuous contracts carry their name in field 0 and use a
            // shifted layout.
            let (price, prev) = if fields[0].contains("连续") {
                (num(fields, 7), num(fields, 2))
            } else {
                (num(fields, 0), num(fields, 7))
            };
            derive_change(price, prev)
        }
        Category::Fx => {
            let price = num(fields, 1);
            derive_change(price, num(fields, 5))
        }
        Category::Crypto => {
            let price = num(fields, 8);
            let mut open = num(fields, 5);
            if open == 0.0 {
                open = price;
            }
            derive_change(price, open)
        }
        // cn/eu/asia share the default layout with direct change/percent.
        Category::Cn | Category::Eu | Category::Asia => {
            (num(fields, 1), num(fields, 2), num(fields, 3))
        }
    }
}

fn derive_change(price: f64, prev: f64) -> (f64, f64, f64) {
    let change = price - prev;
    let percent = if prev != 0.0 {
        change / prev * 100.0
    } else {
        0.0
    };
    (price, change, percent)
}
