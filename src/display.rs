//! Output formatting for the one-shot scan command.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, ContentArrangement, Table, TableComponent};

use crate::scanner::PortRecord;

/// Creates a table with clean styling: solid borders, no row separators.
fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    // Use solid vertical bars instead of dotted
    table.set_style(TableComponent::VerticalLines, '│');
    // Use single-line header separator instead of double
    table.set_style(TableComponent::MiddleHeaderIntersections, '┼');
    table.set_style(TableComponent::HeaderLines, '─');
    table.set_style(TableComponent::LeftHeaderIntersection, '├');
    table.set_style(TableComponent::RightHeaderIntersection, '┤');
    table
}

/// Displays scanned port records as a table.
pub fn display_records(records: &[PortRecord]) {
    if records.is_empty() {
        println!("No open TCP ports detected.");
        return;
    }

    let mut table = create_table();
    table.set_header(vec!["PORT", "PROCESS"]);

    for record in records {
        table.add_row(vec![Cell::new(record.port), Cell::new(&record.process)]);
    }

    println!("{table}");
}

/// Displays scanned port records as JSON.
pub fn display_records_json(records: &[PortRecord]) {
    let json = serde_json::to_string_pretty(records).expect("Failed to serialize to JSON");
    println!("{json}");
}
