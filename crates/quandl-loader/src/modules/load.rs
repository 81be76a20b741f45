//! 데이터셋 적재 오케스트레이션 모듈.
//!
//! 데이터셋마다 순서대로 처리합니다:
//!
//! 1. 코드 목록 결정
//! 2. 대상 테이블이 카탈로그에 없으면 생성 후 전체 적재
//! 3. 있으면 증분 갱신 (테이블이 비어 있어도 동일)

use quandl_data::{CreateOutcome, DataProvider, DatasetSpec, KeyValueStore};
use std::collections::HashSet;
use std::time::Instant;
use tracing::Instrument;

use super::{ensure_table, fetch_all, fetch_incremental, resolve_codes};
use crate::{LoadStats, LoaderConfig, Result};

/// 알려진 테이블 목록.
///
/// 시작 시 한 번 조회한 목록에 이번 실행에서 생성한 테이블을 더해 유지합니다.
#[derive(Debug, Clone, Default)]
pub struct TableCatalog {
    known: HashSet<String>,
}

impl TableCatalog {
    /// 저장소에서 현재 테이블 목록을 조회.
    pub async fn capture(store: &dyn KeyValueStore) -> Result<Self> {
        let names = store.list_tables().await?;
        tracing::info!(count = names.len(), "테이블 목록 조회 완료");
        Ok(Self::from_names(names))
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, table: &str) -> bool {
        self.known.contains(table)
    }

    /// 생성한 테이블 기록
    pub fn insert(&mut self, table: &str) {
        self.known.insert(table.to_string());
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }
}

/// 데이터셋 적재기.
pub struct DatasetLoader<'a> {
    store: &'a dyn KeyValueStore,
    provider: &'a dyn DataProvider,
    config: &'a LoaderConfig,
    catalog: TableCatalog,
}

impl<'a> DatasetLoader<'a> {
    pub fn new(
        store: &'a dyn KeyValueStore,
        provider: &'a dyn DataProvider,
        config: &'a LoaderConfig,
        catalog: TableCatalog,
    ) -> Self {
        Self {
            store,
            provider,
            config,
            catalog,
        }
    }

    pub fn catalog(&self) -> &TableCatalog {
        &self.catalog
    }

    /// 데이터셋 목록을 순서대로 적재 (첫 에러에서 중단).
    pub async fn load_all(&mut self, specs: &[DatasetSpec]) -> Result<LoadStats> {
        let mut total = LoadStats::new();
        for spec in specs {
            let stats = self.load(spec).await?;
            total.merge(&stats);
        }
        Ok(total)
    }

    /// 데이터셋 하나 적재.
    pub async fn load(&mut self, spec: &DatasetSpec) -> Result<LoadStats> {
        let span = tracing::info_span!(
            "dataset",
            id = %spec.identifier(),
            kind = %spec.kind()
        );
        self.load_inner(spec).instrument(span).await
    }

    async fn load_inner(&mut self, spec: &DatasetSpec) -> Result<LoadStats> {
        let start = Instant::now();
        let destination = spec.destination();

        let codes = resolve_codes(self.provider, spec).await?;

        let mut stats = if self.catalog.contains(&destination.name) {
            tracing::info!(table = %destination.name, "기존 테이블, 증분 갱신");
            let mut stats = fetch_incremental(
                self.store,
                self.provider,
                spec,
                &codes,
                &self.config.incremental,
            )
            .await?;
            stats.incremental_loads = 1;
            stats
        } else {
            tracing::info!(table = %destination.name, "신규 테이블, 생성 후 전체 적재");
            let outcome = ensure_table(self.store, &destination, &self.config.provisioning).await?;
            self.catalog.insert(&destination.name);

            let mut stats = fetch_all(self.store, self.provider, spec, &codes).await?;
            if outcome == CreateOutcome::Created {
                stats.tables_created = 1;
            }
            stats.full_loads = 1;
            stats
        };

        stats.datasets = 1;
        stats.codes = codes.len();
        stats.elapsed = start.elapsed();
        stats.log_summary(spec.identifier());
        Ok(stats)
    }
}
