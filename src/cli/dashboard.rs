use super::ui;
use crate::assets::{AssetRef, AssetResolver};
use crate::catalog;
use crate::core::Currency;
use crate::core::config::AppConfig;
use crate::engine::{DashboardView, RowStatus, SyncEngine};
use anyhow::Result;
use chrono::{DateTime, Utc};
use comfy_table::{Cell, CellAlignment};
use console::{Key, Term};
use futures::future::join_all;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// All provider quotes are against this currency.
pub const BASE_CODE: &str = "RUB";

/// Builds the full dashboard text for one frame.
pub fn render(
    view: &DashboardView,
    amount: f64,
    flags: &HashMap<String, AssetRef>,
    now: DateTime<Utc>,
) -> String {
    let mut output = String::new();

    let mut title = ui::style_text("Exchange rates", ui::StyleType::Title);
    if !view.date.is_empty() {
        title.push_str(&format!(" for {}", view.date));
    }
    if let Some(updated_at) = view.updated_at {
        let since = format!("updated {}", ui::format_since(updated_at, now));
        title.push_str(&format!("  {}", ui::style_text(&since, ui::StyleType::Subtle)));
    }
    output.push_str(&title);
    output.push_str("\n\n");

    if let Some(error) = &view.bulk_error {
        output.push_str(&ui::style_text(error, ui::StyleType::Error));
        output.push_str(&ui::style_text(
            "  (showing last known rates)\n",
            ui::StyleType::Subtle,
        ));
    }
    for (_, message) in &view.add_errors {
        output.push_str(&ui::style_text(message, ui::StyleType::Warning));
        output.push('\n');
    }

    output.push_str(&rates_table(view, amount, flags).to_string());

    if !view.recently_searched.is_empty() {
        let recent = format!("Recent: {}", view.recently_searched.join(", "));
        output.push('\n');
        output.push_str(&ui::style_text(&recent, ui::StyleType::Subtle));
    }
    output
}

fn rates_table(
    view: &DashboardView,
    amount: f64,
    flags: &HashMap<String, AssetRef>,
) -> comfy_table::Table {
    let with_flags = !flags.is_empty();
    let mut table = ui::new_styled_table();

    let mut header = vec![
        ui::header_cell("Code"),
        ui::header_cell("Currency"),
        ui::header_cell(&format!("Rate ({BASE_CODE})")),
        ui::header_cell("Change"),
        ui::header_cell(""),
    ];
    if with_flags {
        header.push(ui::header_cell("Flag"));
    }
    table.set_header(header);

    let base_name = catalog::lookup(BASE_CODE).map_or(BASE_CODE, |e| e.name);
    let base = Currency::base(BASE_CODE, base_name, amount);
    let mut base_row = vec![
        Cell::new(&base.code),
        Cell::new(&base.name),
        ui::format_optional_cell(base.amount, |a| format!("{a:.2}")),
        Cell::new(""),
        Cell::new("base"),
    ];
    if with_flags {
        base_row.push(flag_cell(flags, BASE_CODE));
    }
    table.add_row(base_row);

    for row in &view.rows {
        let mut cells = match &row.currency {
            Some(currency) => vec![
                Cell::new(&currency.code),
                Cell::new(&currency.name),
                Cell::new(format!("{:.4}", currency.value)).set_alignment(CellAlignment::Right),
                ui::change_cell(currency),
            ],
            None => {
                let name = catalog::lookup(&row.code).map_or("", |e| e.name);
                vec![
                    Cell::new(&row.code),
                    Cell::new(name),
                    ui::na_cell(row.status == RowStatus::Missing),
                    ui::na_cell(false),
                ]
            }
        };
        cells.push(ui::status_cell(row.status));
        if with_flags {
            cells.push(flag_cell(flags, &row.code));
        }
        table.add_row(cells);
    }
    table
}

fn flag_cell(flags: &HashMap<String, AssetRef>, code: &str) -> Cell {
    flags
        .get(code)
        .map_or_else(|| ui::na_cell(false), |asset| Cell::new(&asset.url))
}

/// Resolves flags for the base row and every selected code concurrently.
pub async fn resolve_flags(
    assets: &AssetResolver,
    view: &DashboardView,
    size: &str,
) -> HashMap<String, AssetRef> {
    let codes = std::iter::once(BASE_CODE).chain(view.rows.iter().map(|r| r.code.as_str()));
    let lookups = codes.map(|code| async move { assets.resolve(code, size).await });
    join_all(lookups)
        .await
        .into_iter()
        .flatten()
        .map(|asset| (asset.code.clone(), asset))
        .collect()
}

/// One bulk refresh, then a single printed frame.
pub async fn show(
    engine: &SyncEngine,
    assets: Option<&AssetResolver>,
    config: &AppConfig,
    amount: f64,
) -> Result<()> {
    let spinner = ui::new_spinner("Fetching rates...");
    let refreshed = engine.refresh().await;
    spinner.finish_and_clear();
    if let Err(e) = refreshed {
        debug!(error = %e, "Showing dashboard without fresh rates");
    }

    let view = engine.view();
    let flags = match assets {
        Some(assets) => resolve_flags(assets, &view, &config.assets.size).await,
        None => HashMap::new(),
    };
    println!("{}", render(&view, amount, &flags, Utc::now()));
    Ok(())
}

/// Keyboard commands accepted by the live dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchAction {
    Refresh,
    Dismiss,
    Quit,
}

pub fn action_for(key: &Key) -> Option<WatchAction> {
    match key {
        Key::Char('r') | Key::Char('R') => Some(WatchAction::Refresh),
        Key::Char('d') | Key::Char('D') => Some(WatchAction::Dismiss),
        Key::Char('q') | Key::Char('Q') | Key::Escape | Key::CtrlC => Some(WatchAction::Quit),
        _ => None,
    }
}

/// Reads keys on a detached thread; `read_key` blocks and cannot be cancelled.
fn spawn_key_reader(term: Term) -> mpsc::UnboundedReceiver<Key> {
    let (keys, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        while let Ok(key) = term.read_key() {
            if keys.send(key).is_err() {
                break;
            }
        }
    });
    rx
}

async fn next_key(keys: &mut Option<mpsc::UnboundedReceiver<Key>>) -> Option<Key> {
    match keys {
        Some(keys) => keys.recv().await,
        None => std::future::pending().await,
    }
}

fn dismiss_all(engine: &SyncEngine) {
    engine.dismiss_error();
    for (code, _) in engine.view().add_errors {
        engine.dismiss_add_error(&code);
    }
}

/// Live dashboard: redraws on every engine change and once a second for the
/// elapsed-time label, until Ctrl-C or `q`.
///
/// `r` runs a manual refresh alongside the timer; `d` dismisses error notices.
pub async fn watch(engine: &SyncEngine, amount: f64) -> Result<()> {
    let term = Term::stdout();
    let mut keys = term.is_term().then(|| spawn_key_reader(term.clone()));
    let mut changes = engine.subscribe();
    let mut spinner = Some(ui::new_spinner("Fetching rates..."));
    let mut clock = tokio::time::interval(Duration::from_secs(1));
    let no_flags = HashMap::new();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    engine.start();
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            key = next_key(&mut keys) => {
                // A closed reader means the terminal went away
                match key.map_or(Some(WatchAction::Quit), |key| action_for(&key)) {
                    Some(WatchAction::Quit) => break,
                    Some(WatchAction::Refresh) => {
                        let engine = engine.clone();
                        tokio::spawn(async move {
                            if let Err(e) = engine.refresh().await {
                                debug!(error = %e, "Manual refresh failed");
                            }
                        });
                    }
                    Some(WatchAction::Dismiss) => dismiss_all(engine),
                    None => {}
                }
            }
            _ = clock.tick() => {}
        }

        let view = engine.view();
        if view.is_loading() {
            continue;
        }
        if let Some(spinner) = spinner.take() {
            spinner.finish_and_clear();
        }
        term.clear_screen()?;
        println!("{}", render(&view, amount, &no_flags, Utc::now()));
        println!(
            "\n{}",
            ui::style_text(
                "[r] refresh  [d] dismiss errors  [q] quit",
                ui::StyleType::Subtle
            )
        );
    }

    engine.shutdown();
    info!("Watch stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::ImageFormat;
    use crate::engine::{EngineState, Row};

    fn row(code: &str, currency: Option<Currency>, status: RowStatus) -> Row {
        Row {
            code: code.to_string(),
            currency,
            status,
        }
    }

    fn view(now: DateTime<Utc>) -> DashboardView {
        DashboardView {
            state: EngineState::Idle,
            date: "2026-10-16".to_string(),
            updated_at: Some(now - chrono::Duration::seconds(5)),
            synced: true,
            rows: vec![
                row(
                    "GBP",
                    Some(Currency::new("GBP", "Pound Sterling", 115.0, Some(114.0))),
                    RowStatus::Provisional,
                ),
                row(
                    "USD",
                    Some(Currency::new("USD", "US Dollar", 90.0, Some(89.0))),
                    RowStatus::Confirmed,
                ),
                row("JPY", None, RowStatus::Loading),
            ],
            recently_searched: vec!["GBP".to_string()],
            bulk_error: None,
            add_errors: Vec::new(),
        }
    }

    #[test]
    fn test_render_rows_and_header() {
        let now = Utc::now();
        let output = render(&view(now), 1000.0, &HashMap::new(), now);

        assert!(output.contains("for 2026-10-16"));
        assert!(output.contains("updated 5s ago"));
        assert!(output.contains("1000.00"));
        assert!(output.contains("90.0000"));
        assert!(output.contains("▲ +1.0000 (+1.12%)"));
        assert!(output.contains("unconfirmed"));
        assert!(output.contains("loading…"));
        assert!(output.contains("Recent: GBP"));
        assert!(!output.contains("Flag"));

        // Base row first, then selection order
        let rub = output.find("RUB").unwrap();
        let gbp = output.find("GBP").unwrap();
        let usd = output.find("USD").unwrap();
        assert!(rub < gbp && gbp < usd);
    }

    #[test]
    fn test_render_errors() {
        let now = Utc::now();
        let mut view = view(now);
        view.bulk_error = Some("Failed to load currency rates: offline".to_string());
        view.add_errors = vec![("ZZZ".to_string(), "Unknown currency: ZZZ".to_string())];

        let output = render(&view, 1.0, &HashMap::new(), now);
        assert!(output.contains("Failed to load currency rates: offline"));
        assert!(output.contains("showing last known rates"));
        assert!(output.contains("Unknown currency: ZZZ"));
    }

    #[test]
    fn test_watch_key_bindings() {
        assert_eq!(action_for(&Key::Char('r')), Some(WatchAction::Refresh));
        assert_eq!(action_for(&Key::Char('D')), Some(WatchAction::Dismiss));
        assert_eq!(action_for(&Key::Char('q')), Some(WatchAction::Quit));
        assert_eq!(action_for(&Key::CtrlC), Some(WatchAction::Quit));
        assert_eq!(action_for(&Key::Char('x')), None);
        assert_eq!(action_for(&Key::Enter), None);
    }

    #[test]
    fn test_render_flags_column() {
        let now = Utc::now();
        let flags = HashMap::from([(
            "USD".to_string(),
            AssetRef {
                code: "USD".to_string(),
                country: "us".to_string(),
                format: ImageFormat::Png,
                url: "https://cdn.test/w80/us.png".to_string(),
            },
        )]);
        let output = render(&view(now), 1.0, &flags, now);
        assert!(output.contains("Flag"));
        assert!(output.contains("https://cdn.test/w80/us.png"));
    }
}
