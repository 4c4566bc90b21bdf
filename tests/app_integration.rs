use ratewatch::core::cache::Store;
use ratewatch::core::config::AppConfig;
use ratewatch::engine::{EngineState, RowStatus};
use ratewatch::selection::SelectionStore;
use ratewatch::store::KeyValueStore;
use ratewatch::{AppCommand, SETTINGS_COLLECTION, build_engine, run_command};
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use tracing::info;

mod test_utils {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub const DAILY_JSON: &str = r#"{
        "Date": "2026-10-16T11:30:00+03:00",
        "Valute": {
            "USD": {"CharCode": "USD", "Nominal": 1, "Name": "Доллар США", "Value": 90.0, "Previous": 89.0},
            "EUR": {"CharCode": "EUR", "Nominal": 1, "Name": "Евро", "Value": 98.0, "Previous": 97.5},
            "GBP": {"CharCode": "GBP", "Nominal": 1, "Name": "Фунт стерлингов", "Value": 115.0, "Previous": 114.0},
            "JPY": {"CharCode": "JPY", "Nominal": 100, "Name": "Японских иен", "Value": 60.0, "Previous": 61.0}
        }
    }"#;

    pub async fn create_mock_server(status: u16, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/daily_json.js"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;
        mock_server
    }
}

fn write_config(dir: &Path, base_url: &str) -> String {
    let data_path = dir.join("data");
    let config_path = dir.join("config.yaml");
    let config_content = format!(
        r#"
provider:
  base_url: "{}"
  cache_ttl_secs: 30
fetch_timeout_secs: 5
data_path: "{}"
"#,
        base_url,
        data_path.display()
    );
    fs::write(&config_path, config_content).expect("Failed to write config file");
    config_path.to_str().expect("utf-8 temp path").to_string()
}

fn persisted_selection(config_path: &str) -> Vec<String> {
    let config = AppConfig::load_from_path(config_path).unwrap();
    let store = KeyValueStore::open(&config.default_data_path().unwrap());
    let selection = SelectionStore::load(store.get_collection(SETTINGS_COLLECTION));
    selection.codes().to_vec()
}

#[test_log::test(tokio::test)]
async fn test_show_with_mock() {
    let mock_server = test_utils::create_mock_server(200, test_utils::DAILY_JSON).await;
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(temp_dir.path(), &mock_server.uri());

    let result = run_command(
        AppCommand::Show {
            amount: 100.0,
            flags: false,
        },
        Some(&config_path),
    )
    .await;
    assert!(result.is_ok(), "Show failed with: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_show_survives_provider_outage() {
    let mock_server = test_utils::create_mock_server(500, "unavailable").await;
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(temp_dir.path(), &mock_server.uri());

    let result = run_command(
        AppCommand::Show {
            amount: 1.0,
            flags: false,
        },
        Some(&config_path),
    )
    .await;
    assert!(result.is_ok(), "Outage should not be fatal: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_selection_persists_across_runs() {
    let mock_server = test_utils::create_mock_server(200, test_utils::DAILY_JSON).await;
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(temp_dir.path(), &mock_server.uri());

    run_command(
        AppCommand::Add(vec!["gbp".to_string(), "JPY".to_string()]),
        Some(&config_path),
    )
    .await
    .unwrap();
    let selection = persisted_selection(&config_path);
    info!(?selection, "Selection after add");
    assert_eq!(selection.len(), 4);
    assert_eq!(&selection[2..], ["USD", "EUR"]);

    run_command(AppCommand::Remove(vec!["USD".to_string()]), Some(&config_path))
        .await
        .unwrap();
    assert!(!persisted_selection(&config_path).contains(&"USD".to_string()));

    run_command(AppCommand::Reset, Some(&config_path))
        .await
        .unwrap();
    assert_eq!(persisted_selection(&config_path), vec!["USD", "EUR"]);
}

#[test_log::test(tokio::test)]
async fn test_add_unknown_currency_is_rejected() {
    let mock_server = test_utils::create_mock_server(200, test_utils::DAILY_JSON).await;
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(temp_dir.path(), &mock_server.uri());

    let result = run_command(AppCommand::Add(vec!["ZZZ".to_string()]), Some(&config_path)).await;
    assert!(result.is_err());
    assert_eq!(persisted_selection(&config_path), vec!["USD", "EUR"]);
}

#[test_log::test(tokio::test)]
async fn test_list_and_search() {
    let mock_server = test_utils::create_mock_server(200, test_utils::DAILY_JSON).await;
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(temp_dir.path(), &mock_server.uri());

    run_command(AppCommand::List, Some(&config_path))
        .await
        .unwrap();
    run_command(AppCommand::Search("fr".to_string()), Some(&config_path))
        .await
        .unwrap();
    run_command(AppCommand::Search("nothing".to_string()), Some(&config_path))
        .await
        .unwrap();
}

#[test_log::test(tokio::test)]
async fn test_engine_against_feed() {
    let mock_server = test_utils::create_mock_server(200, test_utils::DAILY_JSON).await;
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(temp_dir.path(), &mock_server.uri());
    let config = AppConfig::load_from_path(&config_path).unwrap();
    let store = KeyValueStore::open(&config.default_data_path().unwrap());
    assert!(store.is_persistent());

    let engine = build_engine(&config, &store).unwrap();
    engine.refresh().await.unwrap();
    engine.add("JPY").await;
    engine.add("ZZZ").await;

    let view = engine.view();
    assert_eq!(view.state, EngineState::Idle);
    let codes: Vec<_> = view.rows.iter().map(|r| r.code.as_str()).collect();
    assert_eq!(codes, vec!["JPY", "USD", "EUR"]);
    assert_eq!(view.rows[0].status, RowStatus::Provisional);
    assert_eq!(view.add_errors[0].1, "Unknown currency: ZZZ");

    let usd = view.row("USD").unwrap().currency.clone().unwrap();
    assert_eq!(usd.name, "US Dollar");
    assert!((usd.change_percent().unwrap() - 1.12).abs() < 0.01);

    engine.refresh().await.unwrap();
    assert_eq!(engine.view().rows[0].status, RowStatus::Confirmed);
    engine.shutdown();
}
