use unicode_width::UnicodeWidthStr;

use super::{format_entry_time, format_money};
use crate::models::ParkedVehicle;

const HEADERS: [&str; 9] = [
    "#", "ID", "Plate", "Brand", "Model", "Color", "Entry", "Elapsed", "Cost",
];

/// Pad `text` with spaces to `width` display columns
fn pad_right(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{}{}", text, " ".repeat(fill))
}

fn pad_left(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{}{}", " ".repeat(fill), text)
}

/// Render the live listing as an aligned plain-text table
pub fn render_table(rows: &[ParkedVehicle], currency: &str) -> String {
    if rows.is_empty() {
        return "(empty - no vehicles parked)\n".to_string();
    }

    let cells: Vec<[String; 9]> = rows
        .iter()
        .map(|row| {
            [
                row.position.to_string(),
                row.vehicle.id().to_string(),
                row.vehicle.plate().to_string(),
                row.vehicle.brand().to_string(),
                row.vehicle.model().to_string(),
                row.vehicle.color().to_string(),
                format_entry_time(row.vehicle.entry_time()),
                row.elapsed.to_string(),
                format_money(currency, row.cost),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(|h| h.width());
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.width());
        }
    }

    let render_line = |fields: [&str; 9]| -> String {
        let columns: Vec<String> = fields
            .iter()
            .zip(widths.iter())
            .enumerate()
            .map(|(i, (field, &width))| {
                // Numbers read better right-aligned
                if i == 0 || i == 8 {
                    pad_left(field, width)
                } else {
                    pad_right(field, width)
                }
            })
            .collect();
        columns.join("  ").trim_end().to_string()
    };

    let mut out = String::new();
    out.push_str(&render_line(HEADERS));
    out.push('\n');
    let rule_width = widths.iter().sum::<usize>() + 2 * (widths.len() - 1);
    out.push_str(&"=".repeat(rule_width));
    out.push('\n');

    for row in &cells {
        let fields: [&str; 9] = std::array::from_fn(|i| row[i].as_str());
        out.push_str(&render_line(fields));
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::Registry;
    use crate::storage::MemoryStore;
    use std::sync::Arc;
    use std::time::{Duration, SystemTime};

    fn listing() -> Vec<ParkedVehicle> {
        let clock = Arc::new(ManualClock::new(
            SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000),
        ));
        let mut registry = Registry::open(Arc::new(MemoryStore::new()), clock.clone());
        registry.register("ABC123", "Toyota", "Corolla", "Red").unwrap();
        clock.advance(Duration::from_secs(7));
        registry.register("ÑANDÚ-9", "Hyundai", "Accent", "Blanco").unwrap();
        clock.advance(Duration::from_secs(5));
        registry.list()
    }

    #[test]
    fn test_empty_table() {
        assert_eq!(render_table(&[], "₡"), "(empty - no vehicles parked)\n");
    }

    #[test]
    fn test_table_rows_and_alignment() {
        let table = render_table(&listing(), "₡");
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("#  ID"));
        assert!(lines[1].chars().all(|c| c == '='));
        assert!(lines[2].contains("ABC123"));
        assert!(lines[2].contains("0m 12s"));
        assert!(lines[2].ends_with("₡150"));
        assert!(lines[3].contains("ÑANDÚ-9"));
        assert!(lines[3].ends_with("₡50"));

        // Plate column starts at the same display column on every line
        let header_col = lines[0].find("Plate").unwrap();
        assert_eq!(lines[2][..lines[2].find("ABC123").unwrap()].width(), header_col);
        assert_eq!(lines[3][..lines[3].find("ÑANDÚ-9").unwrap()].width(), header_col);
    }

    #[test]
    fn test_padding_helpers() {
        assert_eq!(pad_right("ab", 4), "ab  ");
        assert_eq!(pad_left("ab", 4), "  ab");
        assert_eq!(pad_right("abcdef", 4), "abcdef");
    }
}
