//! Display formatting of KPI values.

const PERCENT_KEYS: [&str; 5] = [
    "fill_rate",
    "service_level",
    "on_time_rate",
    "capacity_util",
    "capacity_utilization",
];
const PERCENT_SUFFIXES: [&str; 4] = ["_rate", "_ratio", "_util", "_utilization"];

/// Whether a KPI named `key` holds a ratio that should display as a percent.
pub fn is_percent_key(key: &str) -> bool {
    let lowered = key.to_ascii_lowercase();
    PERCENT_KEYS.contains(&lowered.as_str()) || PERCENT_SUFFIXES.iter().any(|s| lowered.ends_with(s))
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn fixed(value: f64, decimals: usize, strip_trailing: bool) -> String {
    let text = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, f),
        None => (text.as_str(), ""),
    };
    let frac = if strip_trailing {
        frac_part.trim_end_matches('0')
    } else {
        frac_part
    };
    let mut out = String::new();
    let negative = value < 0.0 && (int_part.bytes().any(|b| b != b'0') || frac.bytes().any(|b| b != b'0'));
    if negative {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part));
    if !frac.is_empty() {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Grouped number with at most `decimals` fraction digits, trailing zeros
/// removed. Non-finite values render empty.
pub fn format_number(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return String::new();
    }
    fixed(value, decimals, true)
}

/// `value × 100` with exactly `decimals` fraction digits and a `%` sign.
pub fn format_percent(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return String::new();
    }
    format!("{}%", fixed(value * 100.0, decimals, false))
}

pub fn format_metric(key: &str, value: f64) -> String {
    if is_percent_key(key) {
        format_percent(value, 2)
    } else {
        format_number(value, 2)
    }
}
