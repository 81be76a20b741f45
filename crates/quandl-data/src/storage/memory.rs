//! 메모리 기반 저장소.
//!
//! DynamoDB와 같은 규칙(기본 키 기준 upsert, 중복 테이블 생성 거부)을 따르며
//! 테스트에서 적재 흐름 전체를 검증하는 데 사용합니다.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;
use std::time::Duration;

use super::{CreateOutcome, KeyValueStore, TableDefinition};
use crate::dataset::{AttrValue, Item, KeySchema};
use crate::error::{DataError, Result};

/// 기본 키 (hash, range).
type PrimaryKey = (String, Option<String>);

#[derive(Debug)]
struct MemoryTable {
    hash_key: String,
    range_key: Option<String>,
    definition: Option<TableDefinition>,
    items: BTreeMap<PrimaryKey, Item>,
}

/// 메모리 기반 key-value 저장소.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, MemoryTable>>,
    put_count: RwLock<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 테이블의 모든 항목 (기본 키 순).
    pub fn items(&self, table: &str) -> Vec<Item> {
        let tables = self.tables.read().unwrap_or_else(|e| e.into_inner());
        tables
            .get(table)
            .map(|t| t.items.values().cloned().collect())
            .unwrap_or_default()
    }

    /// 생성된 테이블 정의.
    pub fn definition(&self, table: &str) -> Option<TableDefinition> {
        let tables = self.tables.read().unwrap_or_else(|e| e.into_inner());
        tables.get(table).and_then(|t| t.definition.clone())
    }

    /// hash key 하나로 조회하는 테이블 생성 (데이터셋/자격 증명 테이블 등).
    pub fn create_lookup_table(&self, table: &str, hash_key: &str) {
        let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
        tables.entry(table.to_string()).or_insert_with(|| MemoryTable {
            hash_key: hash_key.to_string(),
            range_key: None,
            definition: None,
            items: BTreeMap::new(),
        });
    }

    /// 지금까지 실행된 put 횟수.
    pub fn put_count(&self) -> usize {
        *self.put_count.read().unwrap_or_else(|e| e.into_inner())
    }
}

fn key_part(item: &Item, attribute: &str) -> Result<String> {
    match item.get(attribute) {
        Some(AttrValue::S(s)) if !s.is_empty() => Ok(s.clone()),
        Some(other) => Err(DataError::InvalidData(format!(
            "key attribute {} must be a non-empty string, got {:?}",
            attribute, other
        ))),
        None => Err(DataError::InvalidData(format!(
            "missing key attribute {}",
            attribute
        ))),
    }
}

fn primary_key(item: &Item, table: &MemoryTable) -> Result<PrimaryKey> {
    let range = match &table.range_key {
        Some(range_key) => Some(key_part(item, range_key)?),
        None => None,
    };
    Ok((key_part(item, &table.hash_key)?, range))
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn list_tables(&self) -> Result<Vec<String>> {
        let tables = self.tables.read().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<String> = tables.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn create_table(&self, definition: &TableDefinition) -> Result<CreateOutcome> {
        let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
        if tables.contains_key(&definition.name) {
            return Ok(CreateOutcome::AlreadyExists);
        }

        tables.insert(
            definition.name.clone(),
            MemoryTable {
                hash_key: definition.key_schema.hash_key.clone(),
                range_key: Some(definition.key_schema.range_key.clone()),
                definition: Some(definition.clone()),
                items: BTreeMap::new(),
            },
        );
        Ok(CreateOutcome::Created)
    }

    async fn wait_until_active(
        &self,
        table: &str,
        _poll_interval: Duration,
        _timeout: Duration,
    ) -> Result<()> {
        let tables = self.tables.read().unwrap_or_else(|e| e.into_inner());
        if tables.contains_key(table) {
            Ok(())
        } else {
            Err(DataError::NotFound(format!("table {}", table)))
        }
    }

    async fn get_item(&self, table: &str, key: &Item) -> Result<Option<Item>> {
        let tables = self.tables.read().unwrap_or_else(|e| e.into_inner());
        let table = tables
            .get(table)
            .ok_or_else(|| DataError::NotFound(format!("table {}", table)))?;

        let key = primary_key(key, table)?;
        Ok(table.items.get(&key).cloned())
    }

    async fn put_item(&self, table: &str, item: Item) -> Result<()> {
        let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
        let table = tables
            .get_mut(table)
            .ok_or_else(|| DataError::NotFound(format!("table {}", table)))?;

        let key = primary_key(&item, table)?;
        table.items.insert(key, item);
        drop(tables);

        *self.put_count.write().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(())
    }

    async fn latest_range_value(
        &self,
        table: &str,
        key_schema: &KeySchema,
        hash_value: &str,
    ) -> Result<Option<String>> {
        let tables = self.tables.read().unwrap_or_else(|e| e.into_inner());
        let table = tables
            .get(table)
            .ok_or_else(|| DataError::NotFound(format!("table {}", table)))?;

        Ok(table
            .items
            .values()
            .filter(|item| {
                item.get(&key_schema.hash_key).and_then(AttrValue::as_s) == Some(hash_value)
            })
            .filter_map(|item| item.get(&key_schema.range_key).and_then(AttrValue::as_s))
            .max()
            .map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{DatasetSpec, INDEX_NAME};
    use crate::storage::Throughput;

    fn definition(id: &str) -> TableDefinition {
        TableDefinition::for_destination(
            &DatasetSpec::parse(id).unwrap().destination(),
            Throughput::new(5, 10),
            Throughput::new(1, 1),
        )
    }

    fn row(kind: &str, date: &str, close: &str) -> Item {
        let mut item = Item::new();
        item.insert("type".to_string(), AttrValue::from(kind));
        item.insert("date".to_string(), AttrValue::from(date));
        item.insert("Close".to_string(), AttrValue::from(close));
        item
    }

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let store = MemoryStore::new();
        let def = definition("WIKI");

        assert_eq!(store.create_table(&def).await.unwrap(), CreateOutcome::Created);
        assert_eq!(
            store.create_table(&def).await.unwrap(),
            CreateOutcome::AlreadyExists
        );
        assert_eq!(store.list_tables().await.unwrap(), vec!["WIKI"]);
        assert_eq!(store.definition("WIKI").unwrap().index_name, INDEX_NAME);
    }

    #[tokio::test]
    async fn test_put_upserts_by_primary_key() {
        let store = MemoryStore::new();
        store.create_table(&definition("WIKI")).await.unwrap();

        store.put_item("WIKI", row("AAPL", "2018-03-26", "172.77")).await.unwrap();
        store.put_item("WIKI", row("AAPL", "2018-03-26", "172.80")).await.unwrap();

        let items = store.items("WIKI");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["Close"], AttrValue::from("172.80"));
        assert_eq!(store.put_count(), 2);
    }

    #[tokio::test]
    async fn test_latest_range_value_is_maximum() {
        let store = MemoryStore::new();
        store.create_table(&definition("WIKI")).await.unwrap();
        let schema = KeySchema::new("type", "date");

        assert_eq!(
            store.latest_range_value("WIKI", &schema, "AAPL").await.unwrap(),
            None
        );

        for date in ["2018-03-20", "2018-03-27", "2018-03-01"] {
            store.put_item("WIKI", row("AAPL", date, "1")).await.unwrap();
        }
        store.put_item("WIKI", row("MSFT", "2019-01-01", "1")).await.unwrap();

        assert_eq!(
            store.latest_range_value("WIKI", &schema, "AAPL").await.unwrap(),
            Some("2018-03-27".to_string())
        );
    }

    #[tokio::test]
    async fn test_put_missing_key_rejected() {
        let store = MemoryStore::new();
        store.create_table(&definition("ZACKS_EE")).await.unwrap();

        let mut item = Item::new();
        item.insert("ticker".to_string(), AttrValue::from("AAPL"));
        assert!(matches!(
            store.put_item("ZACKS_EE", item).await,
            Err(DataError::InvalidData(_))
        ));
    }

    #[tokio::test]
    async fn test_lookup_table_get_item() {
        let store = MemoryStore::new();
        store.create_lookup_table("datasets", "ds_id");

        let mut item = Item::new();
        item.insert("ds_id".to_string(), AttrValue::from("WIKI"));
        item.insert("source".to_string(), AttrValue::from("quandl"));
        store.put_item("datasets", item.clone()).await.unwrap();

        let mut key = Item::new();
        key.insert("ds_id".to_string(), AttrValue::from("WIKI"));
        assert_eq!(store.get_item("datasets", &key).await.unwrap(), Some(item));

        key.insert("ds_id".to_string(), AttrValue::from("FRED"));
        assert_eq!(store.get_item("datasets", &key).await.unwrap(), None);
        // 조회용 테이블은 목록에 포함되지만 정의는 없음
        assert!(store.definition("datasets").is_none());
    }
}
