//! Common types and utilities shared across CLI commands.

use busopt::refresh::{RefreshCommand, RefreshMode};
use clap::ValueEnum;
use console::{measure_text_width, style};

/// Refresh command selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum RefreshCommandArg {
    /// All-bank refresh (REFab)
    Refab,
    /// Same-bank refresh (REFsb)
    Refsb,
}

impl From<RefreshCommandArg> for RefreshCommand {
    fn from(arg: RefreshCommandArg) -> Self {
        match arg {
            RefreshCommandArg::Refab => RefreshCommand::AllBank,
            RefreshCommandArg::Refsb => RefreshCommand::SameBank,
        }
    }
}

/// Refresh mode selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum RefreshModeArg {
    /// Normal refresh
    Normal,
    /// Fine granularity refresh
    Fgr,
}

impl From<RefreshModeArg> for RefreshMode {
    fn from(arg: RefreshModeArg) -> Self {
        match arg {
            RefreshModeArg::Normal => RefreshMode::Normal,
            RefreshModeArg::Fgr => RefreshMode::FineGranularity,
        }
    }
}

/// Print a section heading.
pub fn print_header(title: &str) {
    println!("{}", style(title).bold().cyan());
    println!("{}", "=".repeat(measure_text_width(title)));
}

/// Print a `label: value` metric line.
pub fn print_metric(label: &str, value: &str) {
    println!("  {:<22} {}", format!("{}:", label), style(value).bold());
}

/// Render rows as a left-aligned text table with a header rule.
///
/// Column widths use display width, so labels such as `R→W` line up.
pub fn format_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| measure_text_width(h)).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(measure_text_width(cell));
            }
        }
    }

    let mut lines = vec![render_row(headers.iter().copied(), &widths)];
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in rows {
        lines.push(render_row(row.iter().map(String::as_str), &widths));
    }
    lines.join("\n")
}

fn render_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, width)| {
            let padding = width.saturating_sub(measure_text_width(cell));
            format!("{}{}", cell, " ".repeat(padding))
        })
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}
