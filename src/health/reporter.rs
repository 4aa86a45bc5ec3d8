//! Formatting and reporting for health check results

use colored::Colorize;
use tabled::{
    builder::Builder,
    settings::{Alignment, Modify, Style, object::Rows},
};

use super::runner::HealthCheckReport;

/// Formats a health check report as a table followed by a summary
pub fn format_report(report: &HealthCheckReport) -> String {
    let mut builder = Builder::default();
    builder.push_record(["System", "Status", "Duration", "Message"]);

    for (name, result) in &report.results {
        builder.push_record([
            name.clone(),
            result.status.as_colored_str(),
            format!("{:.2?}", result.duration),
            result.message.clone(),
        ]);
    }

    let mut table = builder.build();
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));

    format!("{}\n{}", table, format_summary(report))
}

fn format_summary(report: &HealthCheckReport) -> String {
    let mut counts = vec![format!("{} {} passed", "✓".green(), report.passed)];
    if report.warned > 0 {
        counts.push(format!("{} {} warned", "⚠".yellow(), report.warned));
    }
    if report.failed > 0 {
        counts.push(format!("{} {} failed", "✗".red(), report.failed));
    }

    let overall = match (report.is_healthy(), report.has_warnings()) {
        (true, false) => "Overall: HEALTHY".green().bold(),
        (true, true) => "Overall: HEALTHY (with warnings)".yellow().bold(),
        (false, _) => "Overall: UNHEALTHY".red().bold(),
    };

    format!(
        "\n{}\n  {} checks: {}\n\n  {}\n",
        "Summary".bold().underline(),
        report.total,
        counts.join(", "),
        overall
    )
}

/// Formats the details every check attached, one block per check
pub fn format_details(report: &HealthCheckReport) -> String {
    report
        .results
        .iter()
        .filter_map(|(name, result)| {
            result
                .details
                .as_ref()
                .map(|details| format!("{} Details:\n{}", name.bold(), details))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Prints a health check report to stdout
pub fn print_report(report: &HealthCheckReport) {
    println!("{}", format_report(report));

    let details = format_details(report);
    if !details.is_empty() {
        println!("{}", details);
    }
}
