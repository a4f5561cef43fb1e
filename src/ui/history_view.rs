// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/deepguard-rs

//! Text rendering of the verdict history

use std::fmt::Write;
use chrono::{DateTime, Utc};

use crate::detection::Verdict;
use crate::history::HistoryLog;

pub fn verdict_title(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Authentic => "Verified Authentic",
        Verdict::Fake => "Deepfake Detected",
    }
}

pub fn verdict_badge(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Authentic => "SAFE",
        Verdict::Fake => "WARNING",
    }
}

pub fn verdict_summary(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Authentic => "No signs of manipulation detected",
        Verdict::Fake => "Potential manipulation identified",
    }
}

/// "1 scan", "4 scans"
pub fn count_label(count: usize) -> String {
    if count == 1 {
        "1 scan".to_string()
    } else {
        format!("{} scans", count)
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", n, unit)
    }
}

/// Human distance between `then` and `now`, e.g. "5 minutes ago" or "in about 2 hours"
pub fn relative_age(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    const MINUTES_IN_DAY: f64 = 1440.0;
    const MINUTES_IN_MONTH: f64 = 43200.0;
    const MINUTES_IN_YEAR: f64 = 525600.0;

    let seconds = (now - then).num_seconds();
    let past = seconds >= 0;
    let minutes_exact = seconds.unsigned_abs() as f64 / 60.0;
    let minutes = minutes_exact.round();

    let distance = if minutes < 1.0 {
        "less than a minute".to_string()
    } else if minutes < 45.0 {
        plural(minutes as i64, "minute")
    } else if minutes < 90.0 {
        "about 1 hour".to_string()
    } else if minutes < MINUTES_IN_DAY {
        format!("about {}", plural((minutes / 60.0).round() as i64, "hour"))
    } else if minutes < 2520.0 {
        "1 day".to_string()
    } else if minutes < MINUTES_IN_MONTH {
        plural((minutes / MINUTES_IN_DAY).round() as i64, "day")
    } else if minutes < 2.0 * MINUTES_IN_MONTH {
        format!("about {}", plural((minutes / MINUTES_IN_MONTH).round() as i64, "month"))
    } else if minutes < MINUTES_IN_YEAR {
        plural((minutes / MINUTES_IN_MONTH).round() as i64, "month")
    } else {
        format!("about {}", plural((minutes / MINUTES_IN_YEAR).floor() as i64, "year"))
    };

    if past {
        format!("{} ago", distance)
    } else {
        format!("in {}", distance)
    }
}

/// Full history listing, newest first
pub fn render_history(log: &HistoryLog, now: DateTime<Utc>) -> String {
    let mut out = String::new();

    if log.is_empty() {
        out.push_str("No Scans Yet\n");
        out.push_str("Your scan history will appear here once you start analyzing content\n");
        return out;
    }

    let _ = writeln!(out, "Scan History ({})", count_label(log.len()));
    for record in log {
        let verdict = record.status();
        let _ = writeln!(
            out,
            "  [{:<7}] {} - {} ({})",
            verdict_badge(verdict),
            verdict_title(verdict),
            verdict_summary(verdict),
            relative_age(record.timestamp(), now),
        );
    }
    out
}
