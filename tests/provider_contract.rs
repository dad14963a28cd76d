mod support;

use std::sync::Arc;

use serde_json::json;
use time::macros::date;
use time::{Date, Weekday};
use vnmarket_core::domain::timestamp::local_midnight_millis;
use vnmarket_core::{
    DataWarning, Frequency, HistoryRequest, Interval, Language, Operation, PriceBoardRequest,
    SourceErrorKind, StatementRequest, StatementType, Symbol,
};

use support::{registry, ScriptedHttpClient};

fn vcb() -> Symbol {
    Symbol::parse("VCB").expect("valid symbol")
}

fn ssi_bar(day: Date, close: f64) -> serde_json::Value {
    json!({
        "tradingDate": local_midnight_millis(day),
        "priceOpen": close - 200.0,
        "priceHigh": close + 400.0,
        "priceLow": close - 600.0,
        "priceClose": close,
        "totalVolume": 1_000_000
    })
}

fn first_week_request(interval: Interval) -> HistoryRequest {
    HistoryRequest::new(vcb(), date!(2024 - 01 - 01), date!(2024 - 01 - 05), interval)
        .expect("valid range")
}

fn assert_history_contract(bars: &[vnmarket_core::PriceBar], start: Date, end: Date) {
    for pair in bars.windows(2) {
        assert!(pair[0].date < pair[1].date, "dates must strictly increase");
    }
    for bar in bars {
        assert!(bar.date >= start && bar.date <= end);
        assert!(bar.high >= bar.open && bar.high >= bar.close);
        assert!(bar.low <= bar.open && bar.low <= bar.close);
        assert!(bar.low >= 0.0);
    }
}

#[tokio::test]
async fn ssi_history_for_first_week_of_2024_has_only_trading_days() {
    let client = Arc::new(ScriptedHttpClient::new().json(
        "historical-quotes",
        json!({"data": [
            ssi_bar(date!(2024 - 01 - 05), 88_900.0),
            ssi_bar(date!(2024 - 01 - 04), 88_500.0),
            ssi_bar(date!(2024 - 01 - 03), 87_800.0),
            ssi_bar(date!(2024 - 01 - 02), 86_300.0),
        ]}),
    ));
    let registry = registry(client.clone());
    let ssi = registry.resolve("ssi").expect("ssi is registered");

    let batch = ssi
        .fetch_history(first_week_request(Interval::OneDay))
        .await
        .expect("history should load");

    assert!((3..=4).contains(&batch.len()));
    assert!(batch
        .iter()
        .all(|bar| !matches!(bar.date.weekday(), Weekday::Saturday | Weekday::Sunday)));
    assert_history_contract(&batch.items, date!(2024 - 01 - 01), date!(2024 - 01 - 05));
    assert!(batch.warnings.is_empty());
    assert_eq!(client.request_count(), 1);
}

#[tokio::test]
async fn vnd_history_for_first_week_of_2024_has_only_trading_days() {
    let client = Arc::new(ScriptedHttpClient::new().json(
        "stock_prices",
        json!({"data": [
            {"date": "2024-01-05", "open": 88.7, "high": 89.3, "low": 88.3, "close": 88.9, "nmVolume": 1_100_000},
            {"date": "2024-01-04", "open": 87.9, "high": 88.9, "low": 87.5, "close": 88.5, "nmVolume": 980_000},
            {"date": "2024-01-03", "open": 86.5, "high": 88.0, "low": 86.1, "close": 87.8, "nmVolume": 1_320_000}
        ]}),
    ));
    let registry = registry(client);
    let vnd = registry.resolve("VND").expect("vnd is registered");

    let batch = vnd
        .fetch_history(first_week_request(Interval::OneDay))
        .await
        .expect("history should load");

    assert_eq!(batch.len(), 3);
    assert_history_contract(&batch.items, date!(2024 - 01 - 01), date!(2024 - 01 - 05));
}

#[tokio::test]
async fn rows_outside_requested_range_are_truncated_with_warning() {
    let client = Arc::new(ScriptedHttpClient::new().json(
        "historical-quotes",
        json!({"data": [
            ssi_bar(date!(2023 - 12 - 29), 85_000.0),
            ssi_bar(date!(2024 - 01 - 02), 86_300.0),
            ssi_bar(date!(2024 - 01 - 08), 90_000.0),
        ]}),
    ));
    let registry = registry(client);
    let ssi = registry.resolve("ssi").expect("ssi is registered");

    let batch = ssi
        .fetch_history(first_week_request(Interval::OneDay))
        .await
        .expect("history should load");

    assert_eq!(batch.len(), 1);
    assert_eq!(batch.items[0].date, date!(2024 - 01 - 02));
    assert_eq!(batch.warnings, vec![DataWarning::RowsOutsideRange { dropped: 2 }]);
}

#[tokio::test]
async fn unsupported_interval_fails_before_any_network_call() {
    for source in ["ssi", "vnd"] {
        let client = Arc::new(ScriptedHttpClient::new());
        let registry = registry(client.clone());
        let adapter = registry.resolve(source).expect("source is registered");

        let err = adapter
            .fetch_history(first_week_request(Interval::OneMinute))
            .await
            .expect_err("1m bars are not served");

        assert_eq!(err.kind(), SourceErrorKind::UnsupportedInterval, "{source}");
        assert!(!err.retryable());
        assert_eq!(client.request_count(), 0, "{source}");
    }
}

#[tokio::test]
async fn every_adapter_declares_what_it_serves() {
    let client = Arc::new(ScriptedHttpClient::new());
    let registry = registry(client.clone());

    for (provider, capabilities) in registry.sources() {
        let adapter = registry
            .resolve(provider.as_str())
            .expect("listed sources resolve");
        for operation in Operation::ALL {
            assert_eq!(
                registry.supports(provider.as_str(), operation),
                capabilities.supports(operation)
            );
        }
        assert!(adapter.capabilities().supports(Operation::History));
        assert!(adapter.capabilities().supports_interval(Interval::OneDay));
    }

    let vnd = registry.resolve("vnd").expect("vnd is registered");
    let err = vnd
        .fetch_statement(StatementRequest::new(
            vcb(),
            StatementType::BalanceSheet,
            Frequency::Quarterly,
            Language::Vi,
        ))
        .await
        .expect_err("vnd has no statements");
    assert_eq!(err.kind(), SourceErrorKind::UnsupportedOperation);
    assert_eq!(client.request_count(), 0);
}

fn statement_workbook() -> serde_json::Value {
    json!([
        {"name": "Cover", "rows": [["Báo cáo tài chính"], ["Dữ liệu được cung cấp bởi FiinTrade"]]},
        {"name": "Sheet1", "rows": [
            ["Đơn vị: Tỷ VND"],
            ["Chỉ số", "Q3/2023", "Q4/2023", "Q1/2024"],
            ["TÀI SẢN NGẮN HẠN", 1_500_000.5, 1_620_000.0, 1_700_250.75],
            ["Tiền và tương đương tiền", "12,000", "13,500", "(250)"],
            ["Khác", 1.0, 2.0, 3.0],
            ["Khác", 4.0, null, 6.0],
            ["Dữ liệu được cung cấp bởi FiinTrade", null, null, null],
            ["https://fiintrade.vn/", null, null, null]
        ]}
    ])
}

#[tokio::test]
async fn statement_parsing_is_deterministic() {
    let client = Arc::new(
        ScriptedHttpClient::new().sheets("DownloadBalanceSheet", statement_workbook()),
    );
    let registry = registry(client);
    let ssi = registry.resolve("ssi").expect("ssi is registered");
    let request = StatementRequest::new(
        vcb(),
        StatementType::BalanceSheet,
        Frequency::Quarterly,
        Language::Vi,
    );

    let first = ssi
        .fetch_statement(request.clone())
        .await
        .expect("statement should load");
    let second = ssi
        .fetch_statement(request)
        .await
        .expect("statement should load");

    assert_eq!(first, second);
    assert_eq!(first.len(), 11);
    assert!(first.iter().all(|line| line.unit == "billion" && line.currency == "VND"));
    assert!(first
        .iter()
        .any(|line| line.line_item == "Khác (2)" && line.value == 6.0));
    assert!(first
        .iter()
        .any(|line| line.line_item == "Tiền và tương đương tiền" && line.value == -250.0));
    assert!(!first
        .iter()
        .any(|line| line.line_item.contains("FiinTrade") || line.line_item.contains("fiintrade")));

    let mut keys: Vec<String> = first
        .iter()
        .map(|line| format!("{}|{}|{}", line.period, line.statement, line.line_item))
        .collect();
    let total = keys.len();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), total, "(symbol, period, type, item) must be unique");
}

#[tokio::test]
async fn workbook_without_header_row_is_a_report_format_error() {
    let client = Arc::new(ScriptedHttpClient::new().sheets(
        "DownloadBalanceSheet",
        json!([{"name": "Sheet1", "rows": [
            ["Đơn vị: Tỷ VND"],
            ["Tổng tài sản", 1.0, 2.0]
        ]}]),
    ));
    let registry = registry(client);
    let ssi = registry.resolve("ssi").expect("ssi is registered");

    let err = ssi
        .fetch_statement(StatementRequest::new(
            vcb(),
            StatementType::BalanceSheet,
            Frequency::Quarterly,
            Language::Vi,
        ))
        .await
        .expect_err("no header means no table");

    assert_eq!(err.kind(), SourceErrorKind::ReportFormat);
    assert_eq!(err.code(), "source.report_format");
}

#[tokio::test]
async fn empty_price_board_is_an_empty_sequence() {
    let client = Arc::new(ScriptedHttpClient::new());
    let registry = registry(client.clone());
    let ssi = registry.resolve("ssi").expect("ssi is registered");

    let batch = ssi
        .fetch_price_board(PriceBoardRequest::new(Vec::<&str>::new()))
        .await
        .expect("empty board is not an error");

    assert!(batch.is_empty());
    assert_eq!(client.request_count(), 0);
}

#[tokio::test]
async fn price_board_with_one_invalid_symbol_returns_the_valid_row() {
    let client = Arc::new(ScriptedHttpClient::new().json(
        "price-board",
        json!({"data": [
            {"ss": "FPT", "mp": 132_000, "r": 130_000, "c": 139_100, "f": 120_900, "mtq": 2_450_000}
        ]}),
    ));
    let registry = registry(client.clone());
    let ssi = registry.resolve("ssi").expect("ssi is registered");

    let batch = ssi
        .fetch_price_board(PriceBoardRequest::new(["fpt", "FPT", "NOTREAL1"]))
        .await
        .expect("partial board is not an error");

    assert_eq!(batch.len(), 1);
    assert_eq!(batch.items[0].symbol.as_str(), "FPT");
    assert_eq!(batch.items[0].last_price, Some(132_000.0));
    assert_eq!(
        batch.warnings,
        vec![DataWarning::SymbolOmitted {
            symbol: String::from("NOTREAL1"),
            reason: String::from("not returned by provider"),
        }]
    );
    assert_eq!(
        client.requests()[0].query_value("symbols"),
        Some("fpt,notreal1")
    );
}
