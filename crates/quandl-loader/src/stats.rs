//! 적재 통계 구조체.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 적재 작업 통계
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadStats {
    /// 처리한 데이터셋 수
    pub datasets: usize,
    /// 처리한 Provider 코드 수
    pub codes: usize,
    /// 저장된 총 행 수
    pub rows_written: usize,
    /// 새로 생성한 테이블 수
    pub tables_created: usize,
    /// 전체 적재 횟수
    pub full_loads: usize,
    /// 증분 갱신 횟수
    pub incremental_loads: usize,
    /// 데이터가 없던 코드 수
    pub empty: usize,
    /// 조회 기간을 정할 수 없어 건너뛴 코드 수
    pub skipped: usize,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl LoadStats {
    /// 새 통계 객체 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 다른 통계를 합산 (소요 시간 포함)
    pub fn merge(&mut self, other: &LoadStats) {
        self.datasets += other.datasets;
        self.codes += other.codes;
        self.rows_written += other.rows_written;
        self.tables_created += other.tables_created;
        self.full_loads += other.full_loads;
        self.incremental_loads += other.incremental_loads;
        self.empty += other.empty;
        self.skipped += other.skipped;
        self.elapsed += other.elapsed;
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            datasets = self.datasets,
            codes = self.codes,
            rows_written = self.rows_written,
            tables_created = self.tables_created,
            full_loads = self.full_loads,
            incremental_loads = self.incremental_loads,
            empty = self.empty,
            skipped = self.skipped,
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "적재 완료"
        );
    }
}
