//! 데이터셋 동기화 모듈.
//!
//! - `fetch_all`: 코드별 전체 데이터를 조회하여 저장 (테이블 최초 생성 시)
//! - `fetch_incremental`: 기준일 이후 데이터만 조회하여 저장 (기존 테이블)
//!
//! 모든 행은 기본 키 기준 개별 upsert로 저장합니다.

use chrono::NaiveDate;
use quandl_data::dataset::datatable_path;
use quandl_data::provider::DATE_FORMAT;
use quandl_data::{
    AttrValue, DataError, DataProvider, DatasetKind, DatasetSpec, DateRange, DestinationTable,
    Item, KeyValueStore, Payload, TableFilter,
};
use std::time::Instant;

use crate::config::{IncrementalConfig, TableWatermark};
use crate::{LoadStats, Result};

/// null 셀의 문자열 표현.
pub const NULL_TEXT: &str = "None";

/// 전체 적재.
pub async fn fetch_all(
    store: &dyn KeyValueStore,
    provider: &dyn DataProvider,
    spec: &DatasetSpec,
    codes: &[String],
) -> Result<LoadStats> {
    let start = Instant::now();
    let destination = spec.destination();
    let mut stats = LoadStats::new();

    tracing::info!(table = %destination.name, codes = codes.len(), "전체 적재 시작");

    for code in codes {
        let payload = match spec.kind() {
            DatasetKind::Table => provider.datatable(&table_path(code)?, None).await?,
            DatasetKind::TimeSeries => {
                provider
                    .dataset(spec.identifier(), code, &DateRange::all())
                    .await?
            }
        };

        write_payload(store, &destination, spec.kind(), code, &payload, &mut stats).await?;
    }

    stats.elapsed = start.elapsed();
    Ok(stats)
}

/// 증분 갱신.
pub async fn fetch_incremental(
    store: &dyn KeyValueStore,
    provider: &dyn DataProvider,
    spec: &DatasetSpec,
    codes: &[String],
    config: &IncrementalConfig,
) -> Result<LoadStats> {
    let start = Instant::now();
    let destination = spec.destination();
    let mut stats = LoadStats::new();

    tracing::info!(table = %destination.name, codes = codes.len(), "증분 갱신 시작");

    for code in codes {
        let payload = match spec.kind() {
            DatasetKind::Table => fetch_table_update(provider, code, config).await?,
            DatasetKind::TimeSeries => {
                let Some(range) =
                    time_series_range(store, provider, spec, &destination, code).await?
                else {
                    stats.skipped += 1;
                    continue;
                };
                tracing::debug!(code = %code, start = ?range.start, end = ?range.end, "조회 범위");
                provider.dataset(spec.identifier(), code, &range).await?
            }
        };

        write_payload(store, &destination, spec.kind(), code, &payload, &mut stats).await?;
    }

    stats.elapsed = start.elapsed();
    Ok(stats)
}

/// 데이터테이블 갱신분 조회.
async fn fetch_table_update(
    provider: &dyn DataProvider,
    code: &str,
    config: &IncrementalConfig,
) -> Result<Payload> {
    let path = table_path(code)?;

    match config.table_watermark {
        TableWatermark::Disabled => Ok(provider.datatable(&path, None).await?),
        TableWatermark::ProviderEndDate => {
            let latest = provider.datatable(&path, None).await?;
            match latest.end_date {
                Some(end_date) => {
                    let filter = TableFilter::new(
                        config.table_watermark_param.as_str(),
                        end_date.format(DATE_FORMAT).to_string(),
                    );
                    tracing::info!(path = %path, end_date = %end_date, "Provider 종료일 기준 재조회");
                    Ok(provider.datatable(&path, Some(&filter)).await?)
                }
                None => {
                    tracing::warn!(path = %path, "Provider 종료일 없음, 전체 데이터 저장");
                    Ok(latest)
                }
            }
        }
    }
}

/// 시계열 코드의 조회 범위 결정.
///
/// 저장된 가장 최근 일자(포함)부터 Provider의 최신 일자까지.
/// 저장된 데이터가 없거나 `YYYY-MM-DD` 형식이 아니면 Provider의 가장 오래된 일자부터.
/// Provider가 일자를 알려주지 않으면 `None` (해당 코드 건너뜀).
async fn time_series_range(
    store: &dyn KeyValueStore,
    provider: &dyn DataProvider,
    spec: &DatasetSpec,
    destination: &DestinationTable,
    code: &str,
) -> Result<Option<DateRange>> {
    let metadata = provider.dataset_metadata(spec.identifier(), code).await?;

    let Some(end) = metadata.end_date else {
        tracing::warn!(code = %code, "Provider 최신 일자 없음, 건너뜀");
        return Ok(None);
    };

    let stored = store
        .latest_range_value(&destination.name, &destination.key_schema, code)
        .await?;

    let start = match stored {
        Some(last) => match NaiveDate::parse_from_str(&last, DATE_FORMAT) {
            Ok(date) => Some(date),
            Err(_) => {
                tracing::warn!(code = %code, stored = %last, "저장된 일자 형식 불일치, 가장 오래된 일자부터 재조회");
                metadata.start_date
            }
        },
        None => metadata.start_date,
    };

    match start {
        Some(start) => Ok(Some(DateRange::between(start, end))),
        None => {
            tracing::warn!(code = %code, "Provider 시작 일자 없음, 건너뜀");
            Ok(None)
        }
    }
}

/// 데이터테이블 코드 → API 경로
fn table_path(code: &str) -> Result<String> {
    datatable_path(code).ok_or_else(|| {
        DataError::InvalidData(format!("datatable code without vendor prefix: {}", code)).into()
    })
}

/// Payload 행을 저장 (행마다 개별 put).
async fn write_payload(
    store: &dyn KeyValueStore,
    destination: &DestinationTable,
    kind: DatasetKind,
    code: &str,
    payload: &Payload,
    stats: &mut LoadStats,
) -> Result<()> {
    if payload.is_empty() {
        stats.empty += 1;
        tracing::debug!(code = %code, "데이터 없음");
        return Ok(());
    }

    let items = rows_to_items(destination, kind, code, payload);
    let count = items.len();
    for item in items {
        store.put_item(&destination.name, item).await?;
        stats.rows_written += 1;
    }

    tracing::info!(code = %code, rows = count, "저장 완료");
    Ok(())
}

/// Provider 행을 저장 항목으로 변환.
///
/// 시계열은 첫 컬럼 이름을 range key(`date`)로 바꾸고 hash key(`type`)에 코드를 넣습니다.
pub fn rows_to_items(
    destination: &DestinationTable,
    kind: DatasetKind,
    code: &str,
    payload: &Payload,
) -> Vec<Item> {
    let mut headers = payload.columns.clone();
    if kind == DatasetKind::TimeSeries {
        if let Some(first) = headers.first_mut() {
            *first = destination.key_schema.range_key.clone();
        }
    }

    payload
        .rows
        .iter()
        .map(|row| {
            let mut item: Item = headers
                .iter()
                .zip(row)
                .map(|(header, value)| (header.clone(), AttrValue::S(value_to_text(value))))
                .collect();

            if kind == DatasetKind::TimeSeries {
                item.insert(
                    destination.key_schema.hash_key.clone(),
                    AttrValue::from(code),
                );
            }
            item
        })
        .collect()
}

/// JSON 값을 문자열로 변환.
///
/// null은 `"None"`으로 씁니다. 키 컬럼이 null이어도 빈 문자열 키로 거부되지 않습니다.
fn value_to_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => NULL_TEXT.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(columns: &[&str], rows: Vec<Vec<serde_json::Value>>) -> Payload {
        Payload {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
            ..Default::default()
        }
    }

    #[test]
    fn test_time_series_rows() {
        let destination = DatasetSpec::parse("WIKI").unwrap().destination();
        let data = payload(
            &["Date", "Open", "Volume", "Note", "type"],
            vec![vec![
                json!("2018-03-27"),
                json!(173.68),
                json!(38962839),
                json!(null),
                json!("bogus"),
            ]],
        );

        let items = rows_to_items(&destination, DatasetKind::TimeSeries, "AAPL", &data);
        assert_eq!(items.len(), 1);

        let item = &items[0];
        assert_eq!(item["date"], AttrValue::from("2018-03-27"));
        assert_eq!(item["type"], AttrValue::from("AAPL"));
        assert_eq!(item["Open"], AttrValue::from("173.68"));
        assert_eq!(item["Volume"], AttrValue::from("38962839"));
        assert_eq!(item["Note"], AttrValue::from(NULL_TEXT));
        assert!(!item.contains_key("Date"));
    }

    #[test]
    fn test_table_rows_keep_headers() {
        let destination = DatasetSpec::parse("ZACKS_EE").unwrap().destination();
        let data = payload(
            &["ticker", "comp_name", "eps_mean_est", "active"],
            vec![
                vec![json!("AAPL"), json!("APPLE INC"), json!(2.5), json!(true)],
                vec![json!("MSFT"), json!("MICROSOFT CORP"), json!(1.1), json!(false)],
            ],
        );

        let items = rows_to_items(&destination, DatasetKind::Table, "ZACKS_EE", &data);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["ticker"], AttrValue::from("AAPL"));
        assert_eq!(items[1]["comp_name"], AttrValue::from("MICROSOFT CORP"));
        assert_eq!(items[0]["active"], AttrValue::from("true"));
        assert!(!items[0].contains_key("type"));
    }

    #[test]
    fn test_null_key_cell_is_not_empty() {
        let destination = DatasetSpec::parse("ZACKS_EE").unwrap().destination();
        let data = payload(
            &["ticker", "comp_name", "eps_mean_est"],
            vec![vec![json!("AAPL"), json!(null), json!(1.0)]],
        );

        let items = rows_to_items(&destination, DatasetKind::Table, "ZACKS_EE", &data);
        assert_eq!(items[0]["comp_name"], AttrValue::from("None"));
    }

    #[test]
    fn test_short_rows_skip_missing_cells() {
        let destination = DatasetSpec::parse("WIKI").unwrap().destination();
        let data = payload(&["Date", "Open", "Close"], vec![vec![json!("2018-03-27")]]);

        let items = rows_to_items(&destination, DatasetKind::TimeSeries, "AAPL", &data);
        assert_eq!(items[0].len(), 2);
        assert!(items[0].contains_key("date"));
        assert!(items[0].contains_key("type"));
    }

    #[test]
    fn test_table_path() {
        assert_eq!(table_path("ZACKS_EE").unwrap(), "ZACKS/EE");
        assert!(table_path("WIKI").is_err());
    }
}
