//! 데이터셋 명세 / 자격 증명 테이블 조회 모듈.
//!
//! 자격 증명 테이블 항목 형식:
//!
//! ```json
//! { "service_id": "quandl", "quandl_info": { "api_key": "..." } }
//! ```

use crate::config::LoaderConfig;
use crate::error::LoaderError;
use crate::Result;
use quandl_data::{AttrValue, DataError, Item, KeyValueStore};

/// API 키 환경변수 이름.
pub const API_KEY_ENV: &str = "QUANDL_API_KEY";

/// 자격 증명 테이블의 Quandl 서비스 ID.
pub const QUANDL_SERVICE_ID: &str = "quandl";

/// Quandl API 키 결정.
///
/// 우선순위: 설정 파일 `quandl_api_key` → 환경변수 `QUANDL_API_KEY` → 자격 증명 테이블.
pub async fn resolve_api_key(config: &LoaderConfig, store: &dyn KeyValueStore) -> Result<String> {
    let env_key = std::env::var(API_KEY_ENV).ok();
    resolve_api_key_from(config, env_key, store).await
}

async fn resolve_api_key_from(
    config: &LoaderConfig,
    env_key: Option<String>,
    store: &dyn KeyValueStore,
) -> Result<String> {
    if let Some(key) = &config.api_key {
        tracing::info!("Quandl API 키 로드: 설정 파일");
        return Ok(key.clone());
    }

    if let Some(key) = env_key.filter(|k| !k.trim().is_empty()) {
        tracing::info!("Quandl API 키 로드: 환경변수");
        return Ok(key);
    }

    match credentials_api_key(store, &config.credentials_table).await? {
        Some(key) => {
            tracing::info!(table = %config.credentials_table, "Quandl API 키 로드: 자격 증명 테이블");
            Ok(key)
        }
        None => Err(LoaderError::Config(format!(
            "no Quandl API key: set quandl_api_key, {} or add service_id={} to {}",
            API_KEY_ENV, QUANDL_SERVICE_ID, config.credentials_table
        ))),
    }
}

/// 자격 증명 테이블에서 API 키 조회.
pub async fn credentials_api_key(store: &dyn KeyValueStore, table: &str) -> Result<Option<String>> {
    let key = Item::from([(
        "service_id".to_string(),
        AttrValue::from(QUANDL_SERVICE_ID),
    )]);

    let item = store.get_item(table, &key).await?;

    Ok(item.and_then(|item| {
        item.get("quandl_info")
            .and_then(AttrValue::as_m)
            .and_then(|info| info.get("api_key"))
            .and_then(AttrValue::as_s)
            .map(str::to_string)
    }))
}

/// 데이터셋 명세 테이블에서 `ds_id` 항목 조회.
pub async fn fetch_dataset_spec(store: &dyn KeyValueStore, table: &str, ds_id: &str) -> Result<Item> {
    let key = Item::from([("ds_id".to_string(), AttrValue::from(ds_id))]);

    store
        .get_item(table, &key)
        .await?
        .ok_or_else(|| DataError::NotFound(format!("dataset {} in {}", ds_id, table)).into())
}
