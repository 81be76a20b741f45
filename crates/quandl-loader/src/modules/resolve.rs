//! 데이터셋 코드 결정 모듈.

use crate::Result;
use quandl_data::{DataProvider, DatasetKind, DatasetSpec};

/// 데이터셋에서 조회할 Provider 코드 목록.
///
/// - 데이터테이블: 식별자 그대로 (1:1)
/// - 시계열: 데이터베이스 코드 목록 아카이브에서 열거 (1:N)
pub async fn resolve_codes(provider: &dyn DataProvider, spec: &DatasetSpec) -> Result<Vec<String>> {
    let codes = match spec.kind() {
        DatasetKind::Table => vec![spec.identifier().to_string()],
        DatasetKind::TimeSeries => provider.database_codes(spec.identifier()).await?,
    };

    tracing::info!(dataset = spec.identifier(), count = codes.len(), "코드 목록 결정");
    Ok(codes)
}
