//! Quandl API v3 클라이언트.
//!
//! 시계열 데이터셋과 데이터테이블을 JSON으로 조회하고, 데이터베이스 코드
//! 목록을 zip 아카이브로 내려받습니다.
//!
//! # API 키 관리
//!
//! API 키는 소스에 포함하지 않습니다. 설정 파일(`quandl_api_key`),
//! 환경변수(`QUANDL_API_KEY`) 또는 자격 증명 테이블에서 읽어 주입합니다.
//!
//! # 사용 예제
//!
//! ```rust,ignore
//! use quandl_data::provider::quandl::DEFAULT_BASE_URL;
//! use quandl_data::provider::{DataProvider, DateRange, QuandlClient};
//!
//! let client = QuandlClient::with_base_url(api_key, DEFAULT_BASE_URL, Duration::from_secs(30))?;
//! let codes = client.database_codes("WIKI").await?;
//! let payload = client.dataset("WIKI", &codes[0], &DateRange::all()).await?;
//! ```

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;

use super::{parse_codes_archive, DataProvider, DatasetMetadata, DateRange, Payload, TableFilter};
use crate::error::{DataError, Result};

/// 기본 API 주소.
pub const DEFAULT_BASE_URL: &str = "https://www.quandl.com/api/v3";

/// Quandl API v3 클라이언트.
#[derive(Clone)]
pub struct QuandlClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

/// `/datasets/{db}/{code}/data.json` 응답.
#[derive(Debug, Deserialize)]
struct DatasetDataResponse {
    dataset_data: DatasetData,
}

#[derive(Debug, Deserialize)]
struct DatasetData {
    column_names: Vec<String>,
    #[serde(default)]
    data: Vec<Vec<serde_json::Value>>,
    #[serde(default)]
    start_date: Option<NaiveDate>,
    #[serde(default)]
    end_date: Option<NaiveDate>,
}

/// `/datasets/{db}/{code}/metadata.json` 응답.
#[derive(Debug, Deserialize)]
struct DatasetMetadataResponse {
    dataset: DatasetMetadataBody,
}

#[derive(Debug, Deserialize)]
struct DatasetMetadataBody {
    #[serde(default)]
    oldest_available_date: Option<NaiveDate>,
    #[serde(default)]
    newest_available_date: Option<NaiveDate>,
}

/// `/datatables/{vendor}/{table}.json` 응답.
#[derive(Debug, Deserialize)]
struct DatatableResponse {
    datatable: Datatable,
    #[serde(default)]
    meta: DatatableMeta,
}

#[derive(Debug, Deserialize)]
struct Datatable {
    #[serde(default)]
    data: Vec<Vec<serde_json::Value>>,
    columns: Vec<DatatableColumn>,
}

#[derive(Debug, Deserialize)]
struct DatatableColumn {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct DatatableMeta {
    #[serde(default)]
    next_cursor_id: Option<String>,
    #[serde(default)]
    end_date: Option<NaiveDate>,
}

impl QuandlClient {
    /// 주소와 타임아웃을 지정하여 클라이언트 생성.
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DataError::FetchError(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// GET 요청 실행 (api_key는 쿼리 파라미터로 전달).
    async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<reqwest::Response> {
        let url = format!("{}/{}", self.base_url, path);

        tracing::debug!(url = %url, params = ?params, "Quandl API 요청");

        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DataError::FetchError(format!(
                "Quandl API 오류 [{}]: {} - {}",
                path, status, body
            )));
        }

        Ok(response)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let response = self.get(path, params).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl DataProvider for QuandlClient {
    async fn database_codes(&self, database: &str) -> Result<Vec<String>> {
        let response = self
            .get(&format!("databases/{}/codes", database), &[])
            .await?;
        let bytes = response.bytes().await?;

        let codes = parse_codes_archive(&bytes)?;
        tracing::info!(database, count = codes.len(), "코드 목록 조회 완료");
        Ok(codes)
    }

    async fn dataset_metadata(&self, database: &str, code: &str) -> Result<DatasetMetadata> {
        let response: DatasetMetadataResponse = self
            .get_json(&format!("datasets/{}/{}/metadata.json", database, code), &[])
            .await?;

        Ok(DatasetMetadata {
            start_date: response.dataset.oldest_available_date,
            end_date: response.dataset.newest_available_date,
        })
    }

    async fn dataset(&self, database: &str, code: &str, range: &DateRange) -> Result<Payload> {
        let response: DatasetDataResponse = self
            .get_json(
                &format!("datasets/{}/{}/data.json", database, code),
                &range.query_params(),
            )
            .await?;

        let data = response.dataset_data;
        tracing::debug!(
            database,
            code,
            rows = data.data.len(),
            "데이터셋 조회 완료"
        );

        Ok(Payload {
            columns: data.column_names,
            rows: data.data,
            start_date: data.start_date,
            end_date: data.end_date,
        })
    }

    async fn datatable(&self, path: &str, filter: Option<&TableFilter>) -> Result<Payload> {
        let params: Vec<(&str, String)> = filter
            .map(|f| vec![(f.param.as_str(), f.value.clone())])
            .unwrap_or_default();

        let response: DatatableResponse = self
            .get_json(&format!("datatables/{}.json", path), &params)
            .await?;

        if let Some(cursor) = &response.meta.next_cursor_id {
            tracing::warn!(path, cursor = %cursor, "추가 페이지는 조회하지 않습니다");
        }

        Ok(Payload {
            columns: response
                .datatable
                .columns
                .into_iter()
                .map(|c| c.name)
                .collect(),
            rows: response.datatable.data,
            start_date: None,
            end_date: response.meta.end_date,
        })
    }
}
