//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print table rows, or `raw` as JSON
pub fn print_rows<T: Tabled, R: Serialize>(rows: &[T], raw: &R, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if rows.is_empty() {
                println!("{}", "No resources found".yellow());
                return;
            }
            let table = Table::new(rows).with(Style::blank()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => match serde_json::to_string_pretty(raw) {
            Ok(json) => println!("{}", json),
            Err(e) => print_error(&format!("Failed to encode JSON: {}", e)),
        },
    }
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue().bold(), message);
}

/// Seconds in a window such as `30s`, `1m` or `2h`
pub fn parse_window_secs(window: &str) -> Option<u64> {
    let unit = window.chars().last()?;
    let amount: u64 = window[..window.len() - unit.len_utf8()].parse().ok()?;
    let scale = match unit {
        's' => 1,
        'm' => 60,
        'h' => 60 * 60,
        'd' => 24 * 60 * 60,
        'w' => 7 * 24 * 60 * 60,
        'y' => 365 * 24 * 60 * 60,
        _ => return None,
    };
    amount.checked_mul(scale)
}

/// Success percentage, `-` without traffic
pub fn format_success_rate(success: u64, failure: u64) -> String {
    match success_rate(success, failure) {
        Some(rate) => format!("{:.2}%", rate * 100.0),
        None => "-".to_string(),
    }
}

fn success_rate(success: u64, failure: u64) -> Option<f64> {
    if success.saturating_add(failure) == 0 {
        return None;
    }
    Some(success as f64 / (success as f64 + failure as f64))
}

pub fn color_success_rate(success: u64, failure: u64) -> String {
    let formatted = format_success_rate(success, failure);
    match success_rate(success, failure) {
        Some(rate) if rate >= 0.95 => formatted.green().to_string(),
        Some(rate) if rate >= 0.8 => formatted.yellow().to_string(),
        Some(_) => formatted.red().to_string(),
        None => formatted,
    }
}

/// Requests per second over the window, `-` without traffic
pub fn format_rps(requests: u64, window: &str) -> String {
    match parse_window_secs(window) {
        Some(secs) if secs > 0 && requests > 0 => {
            format!("{:.1}rps", requests as f64 / secs as f64)
        }
        _ => "-".to_string(),
    }
}

pub fn format_latency(ms: u64, has_traffic: bool) -> String {
    if has_traffic {
        format!("{}ms", ms)
    } else {
        "-".to_string()
    }
}

pub fn format_meshed(in_mesh: u64, total: u64) -> String {
    format!("{}/{}", in_mesh, total)
}

pub fn format_bool(value: bool) -> String {
    if value {
        "yes".green().to_string()
    } else {
        "no".to_string()
    }
}

/// Color a pod phase
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "running" | "succeeded" => status.green().to_string(),
        "pending" | "terminating" => status.yellow().to_string(),
        "failed" | "unknown" => status.red().to_string(),
        _ => status.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_window_secs() {
        assert_eq!(parse_window_secs("30s"), Some(30));
        assert_eq!(parse_window_secs("1m"), Some(60));
        assert_eq!(parse_window_secs("2h"), Some(7200));
        assert_eq!(parse_window_secs("1d"), Some(86400));
        assert_eq!(parse_window_secs("m"), None);
        assert_eq!(parse_window_secs("10x"), None);
        assert_eq!(parse_window_secs(""), None);
    }

    #[test]
    fn test_success_rate() {
        assert_eq!(format_success_rate(0, 0), "-");
        assert_eq!(format_success_rate(10, 0), "100.00%");
        assert_eq!(format_success_rate(10, 2), "83.33%");
        assert_eq!(format_success_rate(u64::MAX, u64::MAX), "50.00%");
    }

    #[test]
    fn test_rps() {
        assert_eq!(format_rps(120, "1m"), "2.0rps");
        assert_eq!(format_rps(0, "1m"), "-");
        assert_eq!(format_rps(5, "bogus"), "-");
    }

    #[test]
    fn test_latency_and_meshed() {
        assert_eq!(format_latency(20, true), "20ms");
        assert_eq!(format_latency(0, false), "-");
        assert_eq!(format_meshed(1, 3), "1/3");
    }
}
