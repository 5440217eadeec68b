use comfy_table::presets::ASCII_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use geneforge::population::StatsRow;

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// One row per report interval, plus the final generation.
pub fn print_generation_summary(rows: &[StatsRow], every: u64) {
    let every = every.max(1);
    let mut table = new_table();
    table.set_header(vec![
        Cell::new("Gen").add_attribute(Attribute::Bold),
        Cell::new("Best").fg(Color::Green),
        Cell::new("Avg").fg(Color::Cyan),
        Cell::new("Worst").fg(Color::Red),
        Cell::new("Size"),
        Cell::new("Sel"),
        Cell::new("Cx"),
        Cell::new("Mut"),
    ]);

    let last = rows.last().map(|r| r.generation);
    for r in rows
        .iter()
        .filter(|r| r.generation % every == 0 || Some(r.generation) == last)
    {
        table.add_row(vec![
            Cell::new(r.generation),
            Cell::new(format!("{:.4}", r.best_fitness)),
            Cell::new(format!("{:.4}", r.avg_fitness)),
            Cell::new(format!("{:.4}", r.worst_fitness)),
            Cell::new(r.population_size),
            Cell::new(r.selections),
            Cell::new(r.crossovers),
            Cell::new(r.mutations),
        ]);
    }

    for i in 0..8 {
        if let Some(col) = table.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }

    println!("\n📊 === GENERATION SUMMARY === 📊");
    println!("{}", table);
}

pub fn print_operator_table(entries: &[(&'static str, String)]) {
    let mut table = new_table();
    table.set_header(vec![
        Cell::new("Kind").add_attribute(Attribute::Bold),
        Cell::new("Name").fg(Color::Cyan),
    ]);
    for (kind, name) in entries {
        table.add_row(vec![Cell::new(kind), Cell::new(name)]);
    }
    println!("{}", table);
}
