//! Diff command handler.

use tabled::Tabled;

use compsync_core::{Comparison, ComparisonRecord, DiffCounts, DiffReport, Outcome};

use crate::cli::DiffArgs;
use crate::config::Settings;
use crate::error::CliError;
use crate::output::{self, Tone};

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ComparisonRow {
    #[tabled(rename = "Name")]
    key: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Component")]
    device: String,
    #[tabled(rename = "Template")]
    template: String,
    #[tabled(rename = "Differences")]
    differences: String,
}

fn describe(record: Option<&ComparisonRecord>) -> String {
    record.map_or_else(
        || "-".to_owned(),
        |r| match &r.type_code {
            Some(code) => format!("#{} {} ({code})", r.id, r.name),
            None => format!("#{} {}", r.id, r.name),
        },
    )
}

fn differences(comparison: &Comparison) -> String {
    match &comparison.outcome {
        Outcome::BothPresent { field_diffs, .. } => field_diffs
            .iter()
            .map(|(field, diff)| format!("{field}: '{}' vs '{}'", diff.device, diff.template))
            .collect::<Vec<_>>()
            .join("\n"),
        Outcome::DeviceOnly { shadowed: true, .. } | Outcome::TemplateOnly { shadowed: true, .. } => {
            "duplicate name".into()
        }
        Outcome::DeviceOnly { .. } | Outcome::TemplateOnly { .. } => String::new(),
    }
}

impl From<&Comparison> for ComparisonRow {
    fn from(c: &Comparison) -> Self {
        Self {
            key: c.key.clone(),
            state: c.state().into(),
            device: describe(c.device()),
            template: describe(c.template()),
            differences: differences(c),
        }
    }
}

fn counts_line(counts: DiffCounts) -> String {
    format!(
        "{} synchronized, {} mismatched, {} to rename, {} device-only, {} template-only",
        counts.synchronized,
        counts.mismatched,
        counts.renames,
        counts.device_only,
        counts.template_only
    )
}

fn render_table(report: &DiffReport) -> String {
    let rows: Vec<ComparisonRow> = report.comparisons.iter().map(ComparisonRow::from).collect();
    if rows.is_empty() {
        return format!("No {} to show", report.label.to_lowercase());
    }
    output::render_table(&rows)
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: &DiffArgs, settings: &Settings) -> Result<(), CliError> {
    let session = util::open_session(
        &args.target.inventory,
        &settings.registry,
        settings.sync.clone(),
    )?;
    let device = util::resolve_device(&session.store, &args.target.device).await?;

    let mut report = session.reconciler.diff(device, &args.target.kind).await?;
    let counts = report.counts();
    let in_sync = report.is_synchronized();
    if args.changed_only {
        report.comparisons.retain(|c| !c.is_synchronized());
    }

    let out = output::render_single(settings.output, &report, render_table, |r| {
        r.comparisons
            .iter()
            .map(|c| format!("{}\t{}", c.state(), c.key))
            .collect::<Vec<_>>()
            .join("\n")
    });
    output::print_output(&out, settings.quiet);

    let color = output::should_color(settings.color);
    for skipped in &report.skipped {
        let side = if skipped.is_template { "template" } else { "component" };
        output::status(
            &format!("skipped {side} #{}: {}", skipped.id, skipped.reason),
            Tone::Bad,
            color,
            settings.quiet,
        );
    }
    if in_sync {
        output::status(
            &format!("{} are in sync ({})", report.label, counts_line(counts)),
            Tone::Good,
            color,
            settings.quiet,
        );
    } else {
        output::status(&counts_line(counts), Tone::Warn, color, settings.quiet);
    }
    Ok(())
}
