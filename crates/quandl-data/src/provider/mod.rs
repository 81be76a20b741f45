//! 데이터 Provider 모듈.
//!
//! 외부 소스에서 데이터셋을 가져오는 Provider를 정의합니다.
//!
//! ## Quandl API v3
//! - `QuandlClient`: Quandl REST 클라이언트 (API 키 필요)
//! - 시계열 데이터셋 (`/datasets/{db}/{code}/data.json`)
//! - 데이터테이블 (`/datatables/{vendor}/{table}.json`)
//! - 데이터베이스 코드 목록 zip 아카이브 (`/databases/{db}/codes`)

pub mod codes;
pub mod quandl;

pub use codes::parse_codes_archive;
pub use quandl::QuandlClient;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// 날짜 파라미터 형식 (Quandl 규격).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// 조회 기간 (양 끝 포함).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    /// 전체 기간
    pub fn all() -> Self {
        Self::default()
    }

    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// `start_date` / `end_date` 쿼리 파라미터.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(start) = self.start {
            params.push(("start_date", start.format(DATE_FORMAT).to_string()));
        }
        if let Some(end) = self.end {
            params.push(("end_date", end.format(DATE_FORMAT).to_string()));
        }
        params
    }
}

/// 데이터테이블 필터 (`{param}={value}`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFilter {
    pub param: String,
    pub value: String,
}

impl TableFilter {
    pub fn new(param: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            param: param.into(),
            value: value.into(),
        }
    }
}

/// 시계열 데이터셋 메타데이터.
///
/// 데이터가 없거나 프리미엄 데이터셋이면 일자가 `null`로 옵니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    /// 가장 오래된 데이터 일자
    pub start_date: Option<NaiveDate>,
    /// 가장 최근 데이터 일자
    pub end_date: Option<NaiveDate>,
}

/// Provider 응답 (컬럼 이름 + 행 목록).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
    /// 응답이 보고한 시작일 (있는 경우)
    pub start_date: Option<NaiveDate>,
    /// 응답이 보고한 종료일 (있는 경우)
    pub end_date: Option<NaiveDate>,
}

impl Payload {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// 데이터셋 Provider trait.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// 시계열 데이터베이스의 데이터셋 코드 목록 (`WIKI/AAPL` → `AAPL`).
    async fn database_codes(&self, database: &str) -> Result<Vec<String>>;

    /// 시계열 데이터셋의 사용 가능 기간.
    async fn dataset_metadata(&self, database: &str, code: &str) -> Result<DatasetMetadata>;

    /// 시계열 데이터셋 조회.
    async fn dataset(&self, database: &str, code: &str, range: &DateRange) -> Result<Payload>;

    /// 데이터테이블 조회 (`path` = `VENDOR/TABLE`).
    async fn datatable(&self, path: &str, filter: Option<&TableFilter>) -> Result<Payload>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_range_params() {
        let start = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
        let end = NaiveDate::from_ymd_opt(2020, 3, 31).unwrap();

        assert!(DateRange::all().query_params().is_empty());
        assert_eq!(
            DateRange::between(start, end).query_params(),
            vec![
                ("start_date", "2020-01-02".to_string()),
                ("end_date", "2020-03-31".to_string())
            ]
        );
    }
}
