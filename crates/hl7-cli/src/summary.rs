use std::path::Path;

use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use hl7_core::{FileOutcome, MonitorSummary};
use hl7_transform::TransformReport;

use crate::types::{AppContext, ConfigSummary};

pub fn print_monitor_summary(summary: &MonitorSummary) {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Files"), header_cell("Count")]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    table.add_row(vec![Cell::new("Processed"), count_cell(summary.processed, Color::Green)]);
    table.add_row(vec![Cell::new("Failed"), count_cell(summary.failed, Color::Red)]);
    table.add_row(vec![Cell::new("Vanished before processing"), dim_cell(summary.vanished)]);
    table.add_row(vec![
        Cell::new("Left in input directory"),
        count_cell(summary.left_queued, Color::Yellow),
    ]);
    println!("{table}");
    print_report_table(&summary.report);

    if !summary.failures.is_empty() {
        let mut failures = Table::new();
        failures.set_header(vec![header_cell("File"), header_cell("Error")]);
        apply_table_style(&mut failures);
        for failure in &summary.failures {
            failures.add_row(vec![
                Cell::new(file_label(&failure.path)),
                Cell::new(&failure.message).fg(Color::Red),
            ]);
        }
        println!();
        println!("Failures:");
        println!("{failures}");
    }
}

pub fn print_file_outcome(outcome: &FileOutcome) {
    println!("Input: {}", outcome.input.display());
    println!("Output: {}", outcome.output.display());
    if let Some(backup) = &outcome.backup {
        println!("Backup: {}", backup.display());
    }
    println!("Segments: {}", outcome.segments);
    print_report_table(&outcome.report);
}

/// Dry-run counters go to stderr so stdout carries only the message.
pub fn print_apply_report(report: &TransformReport) {
    eprintln!(
        "rules applied: {}, rules skipped: {}, actions applied: {}, actions skipped: {}",
        report.rules_applied, report.rules_skipped, report.actions_applied, report.actions_skipped
    );
}

pub fn print_configs(ctx: &AppContext, configs: &[ConfigSummary]) {
    println!("Store: {}", ctx.store_path.display());
    if let Some(path) = &ctx.settings_path {
        println!("Settings: {}", path.display());
    }
    if let Some(active) = &ctx.settings.active_config {
        println!("Active: {active}");
    }
    if configs.is_empty() {
        println!("No configurations stored.");
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Name"),
        header_cell("Rules"),
        header_cell("Conditional"),
        header_cell("Actions"),
    ]);
    apply_table_style(&mut table);
    for column in 1..=3 {
        align_column(&mut table, column, CellAlignment::Right);
    }
    let active = ctx.settings.active_config.as_deref();
    for config in configs {
        let name = if active == Some(config.name.as_str()) {
            Cell::new(&config.name)
                .fg(Color::Green)
                .add_attribute(Attribute::Bold)
        } else {
            Cell::new(&config.name)
        };
        table.add_row(vec![
            name,
            Cell::new(config.rules),
            Cell::new(config.conditional),
            Cell::new(config.actions),
        ]);
    }
    println!("{table}");
}

fn print_report_table(report: &TransformReport) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Rules applied"),
        header_cell("Rules skipped"),
        header_cell("Actions applied"),
        header_cell("Actions skipped"),
    ]);
    apply_table_style(&mut table);
    for column in 0..4 {
        align_column(&mut table, column, CellAlignment::Right);
    }
    table.add_row(vec![
        count_cell(report.rules_applied, Color::Green),
        dim_cell(report.rules_skipped),
        count_cell(report.actions_applied, Color::Green),
        count_cell(report.actions_skipped, Color::Yellow),
    ]);
    println!("{table}");
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(80);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
