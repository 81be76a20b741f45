//! Quandl 데이터 수집 및 저장.
//!
//! 이 crate는 다음을 제공합니다:
//! - 데이터셋 모델 (시계열/테이블 구분, 대상 테이블 키 스키마)
//! - Quandl API v3 클라이언트 (데이터셋, 데이터테이블, 코드 목록 아카이브)
//! - Key-value 저장소 추상화와 DynamoDB 구현

pub mod dataset;
pub mod error;
pub mod provider;
pub mod storage;

pub use error::{DataError, Result};

pub use dataset::{
    AttrValue, DatasetKind, DatasetSpec, DestinationTable, Item, KeySchema, INDEX_NAME,
};

// Provider 재내보내기
pub use provider::{DataProvider, DatasetMetadata, DateRange, Payload, QuandlClient, TableFilter};

// 저장소 재내보내기
pub use storage::{
    CreateOutcome, DynamoStore, KeyValueStore, MemoryStore, StoreConfig, TableDefinition,
    Throughput,
};
