pub mod merge;
pub mod prep;
pub mod run;
pub mod verify;

use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

/// Two-column table in the house style.
pub(crate) fn key_value_table(header: (&str, &str), rows: &[(&str, String)]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new(header.0).fg(Color::Cyan),
            Cell::new(header.1).fg(Color::Cyan),
        ]);
    for (key, value) in rows {
        table.add_row(vec![Cell::new(key), Cell::new(value)]);
    }
    table
}
