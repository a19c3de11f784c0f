use colored::Colorize;
use fhirmig_engine::{MigrationReport, ReasonGroup};
use tabled::builder::Builder;
use tabled::settings::Style;

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Renders the end-of-run summary: the counts table, failed chunks, and (on
/// request) the per-reason breakdowns. In quiet mode only errors, ignores
/// and failed chunks are shown.
pub fn print_report(report: &MigrationReport, details: bool, quiet: bool) {
    if !quiet {
        println!("\n{}", "Migration Summary".cyan().bold());

        let mut builder = Builder::default();
        builder.push_record(["Outcome", "Records"]);
        builder.push_record(["done", &report.totals.done.to_string()]);
        builder.push_record(["updated", &report.totals.updated.to_string()]);
        builder.push_record(["errors", &report.totals.error.to_string()]);
        builder.push_record(["ignored", &report.totals.ignored.to_string()]);
        builder.push_record(["already done", &report.totals.already_done.to_string()]);
        builder.push_record(["total", &report.totals.total().to_string()]);
        let table = builder.build().with(Style::rounded()).to_string();
        println!("{table}");

        println!(
            "Processed {} of {} submitted records across {} chunks",
            report.totals.total(),
            report.submitted,
            report.chunks_total
        );
    }

    if report.unaccounted() > 0 {
        print_error(&format!(
            "{} records were lost to failed chunks and remain unclassified",
            report.unaccounted()
        ));
    }

    if !report.chunk_failures.is_empty() {
        println!("\n{}", "Failed chunks".red().bold());
        for failure in &report.chunk_failures {
            println!("  chunk {}: {}", failure.chunk_index + 1, failure.message);
        }
    }

    if details || quiet {
        print_breakdown("Error Breakdown", &report.error_breakdown);
        print_breakdown("Ignore Breakdown", &report.ignore_breakdown);
    } else if !report.error_breakdown.is_empty() || !report.ignore_breakdown.is_empty() {
        println!(
            "\n{} error reason(s), {} ignore reason(s) — rerun with --details for the breakdown",
            report.error_breakdown.len(),
            report.ignore_breakdown.len()
        );
    }
}

/// Prints reason groups sorted by frequency, showing the first ten affected
/// ids and eliding the rest.
fn print_breakdown(title: &str, groups: &[ReasonGroup]) {
    if groups.is_empty() {
        return;
    }

    println!("\n{}", title.yellow().bold());
    for group in groups {
        println!("  {}x: {}", group.count, group.reason);
        let shown: Vec<&str> = group.record_ids.iter().take(10).map(String::as_str).collect();
        if group.count <= 10 {
            println!("      IDs: {}", shown.join(", "));
        } else {
            println!(
                "      IDs: {} and {} more",
                shown.join(", "),
                group.count - 10
            );
        }
    }
}

/// Renders the `report` subcommand's log counts.
pub fn print_log_counts(data_type: &str, done: usize, errors: usize, ignored: usize) {
    println!("{} {}", "Outcome logs for".cyan(), data_type.cyan().bold());

    let mut builder = Builder::default();
    builder.push_record(["Log", "Distinct records"]);
    builder.push_record(["done", &done.to_string()]);
    builder.push_record(["error", &errors.to_string()]);
    builder.push_record(["ignored", &ignored.to_string()]);
    let table = builder.build().with(Style::rounded()).to_string();
    println!("{table}");
}
