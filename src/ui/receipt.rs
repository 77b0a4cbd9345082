use super::{format_entry_time, format_money};
use crate::models::{LotStats, Quote, Receipt, Vehicle};

fn vehicle_lines(vehicle: &Vehicle, out: &mut Vec<(&'static str, String)>) {
    out.push(("Plate", vehicle.plate().to_string()));
    out.push(("Brand", vehicle.brand().to_string()));
    out.push(("Model", vehicle.model().to_string()));
    out.push(("Color", vehicle.color().to_string()));
    out.push(("Entry time", format_entry_time(vehicle.entry_time())));
}

fn render_block(title: &str, lines: &[(&'static str, String)]) -> String {
    let label_width = lines.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    let mut out = format!("{}\n{}\n", title, "-".repeat(title.chars().count()));
    for (label, value) in lines {
        out.push_str(&format!("{:<width$}  {}\n", label, value, width = label_width + 1));
    }
    out
}

/// Confirmation of a new arrival
pub fn render_registered(vehicle: &Vehicle) -> String {
    let mut lines = vec![("Ticket", vehicle.id().to_string())];
    vehicle_lines(vehicle, &mut lines);
    render_block("Vehicle registered", &lines)
}

/// Preview of the amount due, shown before checkout
pub fn render_quote(quote: &Quote, currency: &str) -> String {
    let mut lines = vec![
        ("Ticket", quote.vehicle.id().to_string()),
        ("Position", quote.position.to_string()),
    ];
    vehicle_lines(&quote.vehicle, &mut lines);
    lines.push(("Total time", quote.elapsed.to_string()));
    lines.push(("Amount due", format_money(currency, quote.cost)));
    render_block("Current charge", &lines)
}

/// Final bill after checkout
pub fn render_receipt(receipt: &Receipt, currency: &str) -> String {
    let mut lines = vec![("Ticket", receipt.vehicle.id().to_string())];
    vehicle_lines(&receipt.vehicle, &mut lines);
    lines.push(("Exit time", format_entry_time(receipt.exit_time)));
    lines.push(("Total time", receipt.elapsed.to_string()));
    lines.push(("Total cost", format_money(currency, receipt.cost)));
    render_block("Receipt", &lines)
}

pub fn render_stats(stats: &LotStats, currency: &str) -> String {
    let lines = vec![
        ("Vehicles parked", stats.parked.to_string()),
        ("Accrued so far", format_money(currency, stats.accrued)),
    ];
    render_block("Parking Lot Statistics", &lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::Registry;
    use crate::storage::MemoryStore;
    use std::sync::Arc;
    use std::time::{Duration, SystemTime};

    fn registry() -> (Registry, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000),
        ));
        let registry = Registry::open(Arc::new(MemoryStore::new()), clock.clone());
        (registry, clock)
    }

    #[test]
    fn test_render_quote() {
        let (mut registry, clock) = registry();
        registry.register("ABC123", "Toyota", "Corolla", "Red").unwrap();
        clock.advance(Duration::from_secs(12));

        let text = render_quote(&registry.quote(0).unwrap(), "₡");
        assert!(text.starts_with("Current charge\n--------------\n"));
        assert!(text.contains("Plate"));
        assert!(text.contains("ABC123"));
        assert!(text.contains("0m 12s"));
        assert!(text.contains("₡150"));
    }

    #[test]
    fn test_render_receipt() {
        let (mut registry, clock) = registry();
        registry.register("ABC123", "Toyota", "Corolla", "Red").unwrap();
        clock.advance(Duration::from_secs(65));

        let text = render_receipt(&registry.remove(0).unwrap(), "$");
        assert!(text.contains("Receipt"));
        assert!(text.contains("1m 5s"));
        assert!(text.contains("$650"));
        assert!(text.contains("Exit time"));
    }

    #[test]
    fn test_render_registered_and_stats() {
        let (mut registry, _) = registry();
        let vehicle = registry.register("ABC123", "Toyota", "Corolla", "Red").unwrap();

        let text = render_registered(&vehicle);
        assert!(text.contains("#1"));
        assert!(text.contains("Corolla"));

        let text = render_stats(&registry.stats(), "₡");
        assert!(text.contains("Vehicles parked"));
        assert!(text.contains("₡0"));
    }
}
