//! Sync command handler: plan, apply, optionally persist.

use compsync_core::{ObjectId, ReconciliationRequest, ReconciliationResult, SyncAction};

use crate::cli::SyncArgs;
use crate::config::Settings;
use crate::error::CliError;
use crate::output::{self, Tone};

use super::util;

fn actions(args: &SyncArgs) -> Vec<SyncAction> {
    if args.all {
        return vec![SyncAction::SyncAll];
    }
    [
        (args.add_missing, SyncAction::AddMissing),
        (args.repair, SyncAction::RepairNames),
        (args.remove_extra, SyncAction::RemoveExtra),
    ]
    .into_iter()
    .filter_map(|(wanted, action)| wanted.then_some(action))
    .collect()
}

fn detail(result: &ReconciliationResult, label: &str) -> String {
    let mut lines = vec![result.summary(label)];
    lines.extend(
        result
            .failures
            .iter()
            .map(|f| format!("  {} #{} failed: {}", f.action, f.id, f.reason)),
    );
    if result.skipped > 0 {
        lines.push(format!("  {} skipped", result.skipped));
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: &SyncArgs, settings: &Settings) -> Result<(), CliError> {
    let target = &args.target;
    let session =
        util::open_session(&target.inventory, &settings.registry, settings.sync.clone())?;
    let reconciler = &session.reconciler;
    let device = util::resolve_device(&session.store, &target.device).await?;
    let label = reconciler.registry().get(&target.kind)?.label.to_lowercase();
    let color = output::should_color(settings.color);

    let actions = actions(args);
    let mut request = if actions.is_empty() {
        ReconciliationRequest::new(device, target.kind.as_str())
    } else {
        reconciler.plan(device, &target.kind, &actions).await?.1
    };
    request.add.extend(args.add.iter().copied().map(ObjectId::new));
    request.remove.extend(args.remove.iter().copied().map(ObjectId::new));
    for (id, name) in &args.rename {
        request = request.rename(ObjectId::new(*id), name.clone());
    }

    if request.is_empty() {
        output::status(
            &format!("Nothing to do for {label}"),
            Tone::Good,
            color,
            settings.quiet,
        );
        return Ok(());
    }

    // Ctrl-C stops new items from starting; in-flight ones finish.
    let interrupt = {
        let reconciler = reconciler.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, finishing in-flight changes");
                reconciler.shutdown();
            }
        })
    };
    let result = reconciler.apply(&request).await;
    interrupt.abort();
    let result = result?;

    let out = output::render_single(
        settings.output,
        &result,
        |r| detail(r, &label),
        |r| r.summary(&label),
    );
    output::print_output(&out, settings.quiet);

    if result.changes() > 0 {
        if args.write {
            let path = &target.inventory;
            let prompt = format!("Write {} changes to {}?", result.changes(), path.display());
            if util::confirm_write(path, &prompt, settings.yes)? {
                util::write_inventory(path, &session.store.snapshot().await)?;
                output::status(
                    &format!("Saved {}", path.display()),
                    Tone::Good,
                    color,
                    settings.quiet,
                );
            }
        } else {
            output::status(
                "Dry run: pass --write to save these changes",
                Tone::Warn,
                color,
                settings.quiet,
            );
        }
    }

    if result.cancelled {
        return Err(CliError::Cancelled);
    }
    if !result.failures.is_empty() {
        return Err(CliError::PartialFailure {
            failed: result.failures.len(),
        });
    }
    Ok(())
}
