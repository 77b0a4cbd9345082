//! Plain-text rendering of registry data for the command line

pub mod receipt;
pub mod table;

use chrono::{DateTime, Local};
use std::time::SystemTime;

pub use receipt::{render_quote, render_receipt, render_registered, render_stats};
pub use table::render_table;

/// Wall-clock time of day in the local timezone (HH:MM:SS)
pub fn format_entry_time(time: SystemTime) -> String {
    DateTime::<Local>::from(time).format("%H:%M:%S").to_string()
}

/// Amount prefixed by the currency symbol
pub fn format_money(currency: &str, amount: u64) -> String {
    format!("{}{}", currency, amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_money() {
        assert_eq!(format_money("₡", 150), "₡150");
        assert_eq!(format_money("", 0), "0");
    }

    #[test]
    fn test_format_entry_time_shape() {
        let text = format_entry_time(SystemTime::now());
        assert_eq!(text.len(), 8);
        assert_eq!(text.matches(':').count(), 2);
    }
}
