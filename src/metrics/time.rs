//! Duration strings ↔ minutes.
//!
//! Parsing tries a fixed precedence of patterns and the first one that
//! matches wins: week ranges, weeks, day ranges, days, then an hours/minutes
//! combination. Ranges resolve to their midpoint. Day and week units follow
//! the configured working-time convention (8 h/day, 5 days/week by default).

use std::sync::OnceLock;

use regex::Regex;

use crate::config::TimeConfig;

const PLACEHOLDERS: [&str; 9] = [
    "", "unknown", "n/a", "na", "tbd", "tba", "-", "varies", "none",
];

const NUMBER: &str = r"(\d+(?:\.\d+)?)";
const RANGE_SEPARATOR: &str = r"\s*(?:-|–|—|to)\s*";

struct Grammar {
    week_range: Regex,
    week: Regex,
    day_range: Regex,
    day: Regex,
    hour_range: Regex,
    hour: Regex,
    minute_range: Regex,
    minute: Regex,
    bare: Regex,
}

fn unit_pattern(unit: &str, range: bool) -> Regex {
    let pattern = if range {
        format!(r"(?i){NUMBER}{RANGE_SEPARATOR}{NUMBER}\s*(?:{unit})(?:\b|\d)")
    } else {
        format!(r"(?i){NUMBER}\s*(?:{unit})(?:\b|\d)")
    };
    Regex::new(&pattern).expect("valid regex")
}

fn grammar() -> &'static Grammar {
    static GRAMMAR: OnceLock<Grammar> = OnceLock::new();
    GRAMMAR.get_or_init(|| {
        let week = "weeks?|wks?|w";
        let day = "days?|d";
        let hour = "hours?|hrs?|h";
        let minute = "minutes?|mins?|m";
        Grammar {
            week_range: unit_pattern(week, true),
            week: unit_pattern(week, false),
            day_range: unit_pattern(day, true),
            day: unit_pattern(day, false),
            hour_range: unit_pattern(hour, true),
            hour: unit_pattern(hour, false),
            minute_range: unit_pattern(minute, true),
            minute: unit_pattern(minute, false),
            bare: Regex::new(&format!(r"^{NUMBER}$")).expect("valid regex"),
        }
    })
}

/// Amount of one unit in `text`: a range's midpoint, else a single count.
fn amount(range: &Regex, single: &Regex, text: &str) -> Option<f64> {
    if let Some(caps) = range.captures(text) {
        let low: f64 = caps[1].parse().ok()?;
        let high: f64 = caps[2].parse().ok()?;
        return Some((low + high) / 2.0);
    }
    let caps = single.captures(text)?;
    caps[1].parse().ok()
}

/// Parse a duration into minutes. Placeholders and unparseable text yield
/// `None`, never zero.
pub fn parse_time_to_minutes(text: &str) -> Option<u32> {
    parse_time_to_minutes_with(text, &TimeConfig::default())
}

pub fn parse_time_to_minutes_with(text: &str, config: &TimeConfig) -> Option<u32> {
    let text = text.trim();
    if PLACEHOLDERS.contains(&text.to_lowercase().as_str()) {
        return None;
    }
    let g = grammar();

    let minutes = if let Some(weeks) = amount(&g.week_range, &g.week, text) {
        weeks * f64::from(config.minutes_per_week())
    } else if let Some(days) = amount(&g.day_range, &g.day, text) {
        days * f64::from(config.minutes_per_day())
    } else {
        let hours = amount(&g.hour_range, &g.hour, text);
        let minutes = amount(&g.minute_range, &g.minute, text);
        match (hours, minutes) {
            (None, None) => g.bare.captures(text)?[1].parse().ok()?,
            (h, m) => h.unwrap_or(0.0) * 60.0 + m.unwrap_or(0.0),
        }
    };

    Some(minutes.round() as u32)
}

/// Format minutes for display: working days above 24 hours, hours and
/// minutes from one hour up, bare minutes below that.
pub fn format_minutes_to_time(minutes: u32) -> String {
    format_minutes_to_time_with(minutes, &TimeConfig::default())
}

pub fn format_minutes_to_time_with(minutes: u32, config: &TimeConfig) -> String {
    if minutes > 24 * 60 {
        let per_day = config.minutes_per_day();
        let rest = minutes % per_day;
        let mut parts = vec![counted(minutes / per_day, "day")];
        if rest >= 60 {
            parts.push(counted(rest / 60, "hour"));
        }
        if rest % 60 > 0 {
            parts.push(counted(rest % 60, "minute"));
        }
        parts.join(" ")
    } else if minutes >= 60 {
        match minutes % 60 {
            0 => counted(minutes / 60, "hour"),
            rest => format!("{} {}", counted(minutes / 60, "hour"), counted(rest, "minute")),
        }
    } else {
        counted(minutes, "minute")
    }
}

fn counted(n: u32, unit: &str) -> String {
    if n == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", n, unit)
    }
}
