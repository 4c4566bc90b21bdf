use super::ui;
use crate::catalog;
use crate::engine::{AddOutcome, SyncEngine};
use crate::selection::DEFAULT_CURRENCIES;
use anyhow::{Result, bail};
use comfy_table::Cell;
use futures::future::join_all;

pub async fn add(engine: &SyncEngine, codes: &[String]) -> Result<()> {
    let adds = codes
        .iter()
        .map(|code| async move { (code.trim().to_uppercase(), engine.add(code).await) });
    let outcomes = join_all(adds).await;

    let mut rejected = 0;
    for (code, outcome) in outcomes {
        match outcome {
            AddOutcome::Added => println!("Added {code}"),
            AddOutcome::Resurfaced => println!("{code} is already on the dashboard"),
            AddOutcome::AlreadyPending | AddOutcome::Discarded => {}
            AddOutcome::Invalid => {
                rejected += 1;
                println!(
                    "{}",
                    ui::style_text(&format!("Invalid currency code: '{code}'"), ui::StyleType::Error)
                );
            }
            AddOutcome::NotFound => {
                rejected += 1;
                println!(
                    "{}",
                    ui::style_text(&format!("Unknown currency: {code}"), ui::StyleType::Error)
                );
            }
            AddOutcome::Failed(message) => println!(
                "{} {}",
                ui::style_text(&message, ui::StyleType::Warning),
                ui::style_text("(kept, retried on next refresh)", ui::StyleType::Subtle)
            ),
        }
    }

    if rejected > 0 && rejected == codes.len() {
        bail!("No currencies were added");
    }
    Ok(())
}

pub fn remove(engine: &SyncEngine, codes: &[String]) -> Result<()> {
    for code in codes {
        let code = code.trim().to_uppercase();
        if engine.remove(&code) {
            println!("Removed {code}");
        } else {
            println!("{code} is not on the dashboard");
        }
    }
    Ok(())
}

pub fn list(engine: &SyncEngine) -> Result<()> {
    let selection = engine.selection();
    if selection.is_empty() {
        println!("No currencies selected. Add some with `ratewatch add <CODE>`.");
        return Ok(());
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("#"),
        ui::header_cell("Code"),
        ui::header_cell("Currency"),
    ]);
    for (i, code) in selection.iter().enumerate() {
        let name = catalog::lookup(code).map_or("", |e| e.name);
        table.add_row(vec![Cell::new(i + 1), Cell::new(code), Cell::new(name)]);
    }
    println!("{table}");
    Ok(())
}

/// Lists catalog currencies matching `term` that are not selected yet.
pub fn search(engine: &SyncEngine, term: &str) -> Result<()> {
    let matches = catalog::search(term, &engine.selection());
    if matches.is_empty() {
        println!("No currencies match '{term}'");
        return Ok(());
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Code"), ui::header_cell("Currency")]);
    for entry in matches {
        table.add_row(vec![Cell::new(entry.code), Cell::new(entry.name)]);
    }
    println!("{table}");
    Ok(())
}

pub async fn reset(engine: &SyncEngine) -> Result<()> {
    let spinner = ui::new_spinner("Fetching rates...");
    let refreshed = engine.reset_selection().await;
    spinner.finish_and_clear();

    println!("Selection reset to {}", DEFAULT_CURRENCIES.join(", "));
    if let Err(e) = refreshed {
        println!(
            "{}",
            ui::style_text(&format!("Rates not refreshed: {e:#}"), ui::StyleType::Warning)
        );
    }
    Ok(())
}
