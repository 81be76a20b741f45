//! Key-value 저장소.
//!
//! - `DynamoStore`: DynamoDB 구현 (AWS 프로필/엔드포인트 지정 가능)
//! - `MemoryStore`: 프로세스 내 구현 (테스트 및 로컬 실행용)

pub mod dynamo;
pub mod memory;

pub use dynamo::{DynamoStore, StoreConfig};
pub use memory::MemoryStore;

use async_trait::async_trait;
use std::time::Duration;

use crate::dataset::{DestinationTable, Item, KeySchema, INDEX_NAME};
use crate::error::Result;

/// 프로비저닝 처리량.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throughput {
    pub read_capacity: i64,
    pub write_capacity: i64,
}

impl Throughput {
    pub fn new(read_capacity: i64, write_capacity: i64) -> Self {
        Self {
            read_capacity,
            write_capacity,
        }
    }
}

/// 테이블 생성 정의.
///
/// 키 스키마 외에 hash key 단일 보조 인덱스(`GUIdx`, KEYS_ONLY)를 함께 만듭니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    pub name: String,
    pub key_schema: KeySchema,
    pub index_name: String,
    pub table_throughput: Throughput,
    pub index_throughput: Throughput,
}

impl TableDefinition {
    pub fn for_destination(
        destination: &DestinationTable,
        table_throughput: Throughput,
        index_throughput: Throughput,
    ) -> Self {
        Self {
            name: destination.name.clone(),
            key_schema: destination.key_schema.clone(),
            index_name: INDEX_NAME.to_string(),
            table_throughput,
            index_throughput,
        }
    }
}

/// 테이블 생성 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// 새로 생성됨
    Created,
    /// 이미 존재함 (정상 처리)
    AlreadyExists,
}

/// Key-value 저장소 trait.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// 전체 테이블 이름 목록.
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// 테이블 생성. 이미 존재하면 `CreateOutcome::AlreadyExists`.
    async fn create_table(&self, definition: &TableDefinition) -> Result<CreateOutcome>;

    /// 테이블이 ACTIVE 상태가 될 때까지 대기.
    async fn wait_until_active(
        &self,
        table: &str,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<()>;

    /// 기본 키로 항목 조회.
    async fn get_item(&self, table: &str, key: &Item) -> Result<Option<Item>>;

    /// 항목 저장 (upsert).
    async fn put_item(&self, table: &str, item: Item) -> Result<()>;

    /// `hash_key = hash_value`인 항목 중 가장 큰 range key 값.
    async fn latest_range_value(
        &self,
        table: &str,
        key_schema: &KeySchema,
        hash_value: &str,
    ) -> Result<Option<String>>;
}
