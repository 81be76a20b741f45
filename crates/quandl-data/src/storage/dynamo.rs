//! DynamoDB 저장소 구현.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue, GlobalSecondaryIndex, KeySchemaElement, KeyType,
    Projection, ProjectionType, ProvisionedThroughput, ScalarAttributeType, TableStatus,
};
use aws_sdk_dynamodb::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, instrument};

use super::{CreateOutcome, KeyValueStore, TableDefinition, Throughput};
use crate::dataset::{AttrValue, Item, KeySchema};
use crate::error::{DataError, Result};

/// DynamoDB 세션 설정.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// AWS 리전
    pub region: String,
    /// AWS 프로필 이름 (없으면 기본 자격 증명 체인)
    #[serde(default)]
    pub profile_name: Option<String>,
    /// 엔드포인트 재정의 (로컬 DynamoDB 등)
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

/// DynamoDB 세션 래퍼.
#[derive(Clone)]
pub struct DynamoStore {
    client: Client,
}

impl DynamoStore {
    /// 설정으로 DynamoDB 세션 생성.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));

        match &config.profile_name {
            Some(profile) => {
                info!(profile = %profile, "AWS 프로필 사용");
                loader = loader.profile_name(profile);
            }
            None => info!("기본 AWS 프로필 사용"),
        }

        // 자격 증명은 지연 로드되므로 첫 요청(테이블 목록 조회)에서 실패가 드러남
        let sdk_config = loader.load().await;

        let mut builder = aws_sdk_dynamodb::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &config.endpoint_url {
            info!(endpoint = %endpoint, "DynamoDB 엔드포인트 재정의");
            builder = builder.endpoint_url(endpoint);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
        })
    }
}

/// SDK 오류를 원인 체인과 함께 문자열로 변환.
fn store_error<E: std::error::Error>(operation: &str, err: E) -> DataError {
    DataError::StoreError(format!("{}: {}", operation, DisplayErrorContext(&err)))
}

fn provisioned(throughput: Throughput) -> Result<ProvisionedThroughput> {
    ProvisionedThroughput::builder()
        .read_capacity_units(throughput.read_capacity)
        .write_capacity_units(throughput.write_capacity)
        .build()
        .map_err(|e| store_error("CreateTable", e))
}

fn key_element(name: &str, key_type: KeyType) -> Result<KeySchemaElement> {
    KeySchemaElement::builder()
        .attribute_name(name)
        .key_type(key_type)
        .build()
        .map_err(|e| store_error("CreateTable", e))
}

fn string_attribute(name: &str) -> Result<AttributeDefinition> {
    AttributeDefinition::builder()
        .attribute_name(name)
        .attribute_type(ScalarAttributeType::S)
        .build()
        .map_err(|e| store_error("CreateTable", e))
}

fn to_attribute(value: AttrValue) -> AttributeValue {
    match value {
        AttrValue::S(s) => AttributeValue::S(s),
        AttrValue::N(n) => AttributeValue::N(n),
        AttrValue::Bool(b) => AttributeValue::Bool(b),
        AttrValue::Null => AttributeValue::Null(true),
        AttrValue::L(list) => AttributeValue::L(list.into_iter().map(to_attribute).collect()),
        AttrValue::M(map) => AttributeValue::M(to_attribute_map(map)),
    }
}

fn to_attribute_map(item: Item) -> HashMap<String, AttributeValue> {
    item.into_iter().map(|(k, v)| (k, to_attribute(v))).collect()
}

fn from_attribute(value: &AttributeValue) -> AttrValue {
    match value {
        AttributeValue::S(s) => AttrValue::S(s.clone()),
        AttributeValue::N(n) => AttrValue::N(n.clone()),
        AttributeValue::Bool(b) => AttrValue::Bool(*b),
        AttributeValue::L(list) => AttrValue::L(list.iter().map(from_attribute).collect()),
        AttributeValue::M(map) => AttrValue::M(from_attribute_map(map)),
        AttributeValue::Ss(set) => AttrValue::L(set.iter().cloned().map(AttrValue::S).collect()),
        AttributeValue::Ns(set) => AttrValue::L(set.iter().cloned().map(AttrValue::N).collect()),
        // 바이너리 타입은 사용하지 않음
        _ => AttrValue::Null,
    }
}

fn from_attribute_map(map: &HashMap<String, AttributeValue>) -> Item {
    map.iter()
        .map(|(k, v)| (k.clone(), from_attribute(v)))
        .collect()
}

#[async_trait]
impl KeyValueStore for DynamoStore {
    async fn list_tables(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut start: Option<String> = None;

        loop {
            let output = self
                .client
                .list_tables()
                .set_exclusive_start_table_name(start.take())
                .send()
                .await
                .map_err(|e| store_error("ListTables", e))?;

            names.extend(output.table_names().iter().cloned());

            match output.last_evaluated_table_name() {
                Some(last) => start = Some(last.to_string()),
                None => break,
            }
        }

        debug!(count = names.len(), "테이블 목록 조회 완료");
        Ok(names)
    }

    #[instrument(skip(self, definition), fields(table = %definition.name))]
    async fn create_table(&self, definition: &TableDefinition) -> Result<CreateOutcome> {
        let keys = &definition.key_schema;

        let index = GlobalSecondaryIndex::builder()
            .index_name(&definition.index_name)
            .key_schema(key_element(&keys.hash_key, KeyType::Hash)?)
            .projection(
                Projection::builder()
                    .projection_type(ProjectionType::KeysOnly)
                    .build(),
            )
            .provisioned_throughput(provisioned(definition.index_throughput)?)
            .build()
            .map_err(|e| store_error("CreateTable", e))?;

        let result = self
            .client
            .create_table()
            .table_name(&definition.name)
            .key_schema(key_element(&keys.hash_key, KeyType::Hash)?)
            .key_schema(key_element(&keys.range_key, KeyType::Range)?)
            .attribute_definitions(string_attribute(&keys.hash_key)?)
            .attribute_definitions(string_attribute(&keys.range_key)?)
            .global_secondary_indexes(index)
            .provisioned_throughput(provisioned(definition.table_throughput)?)
            .send()
            .await;

        match result {
            Ok(_) => {
                info!(
                    hash_key = %keys.hash_key,
                    range_key = %keys.range_key,
                    "테이블 생성 요청 완료"
                );
                Ok(CreateOutcome::Created)
            }
            Err(err)
                if err
                    .as_service_error()
                    .map(|e| e.is_resource_in_use_exception())
                    .unwrap_or(false) =>
            {
                Ok(CreateOutcome::AlreadyExists)
            }
            Err(err) => Err(store_error("CreateTable", err)),
        }
    }

    async fn wait_until_active(
        &self,
        table: &str,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let output = self
                .client
                .describe_table()
                .table_name(table)
                .send()
                .await
                .map_err(|e| store_error("DescribeTable", e))?;

            let status = output.table().and_then(|t| t.table_status()).cloned();
            if status == Some(TableStatus::Active) {
                debug!(table, "테이블 ACTIVE");
                return Ok(());
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(DataError::Timeout(format!(
                    "table {} not active after {:?} (status: {:?})",
                    table, timeout, status
                )));
            }

            debug!(table, status = ?status, "테이블 활성화 대기");
            tokio::time::sleep(poll_interval).await;
        }
    }

    async fn get_item(&self, table: &str, key: &Item) -> Result<Option<Item>> {
        let output = self
            .client
            .get_item()
            .table_name(table)
            .set_key(Some(to_attribute_map(key.clone())))
            .send()
            .await
            .map_err(|e| store_error("GetItem", e))?;

        Ok(output.item().map(from_attribute_map))
    }

    async fn put_item(&self, table: &str, item: Item) -> Result<()> {
        let output = self
            .client
            .put_item()
            .table_name(table)
            .set_item(Some(to_attribute_map(item)))
            .send()
            .await
            .map_err(|e| store_error("PutItem", e))?;

        debug!(table, consumed = ?output.consumed_capacity(), "put_item 완료");
        Ok(())
    }

    async fn latest_range_value(
        &self,
        table: &str,
        key_schema: &KeySchema,
        hash_value: &str,
    ) -> Result<Option<String>> {
        // type, date는 DynamoDB 예약어이므로 이름 치환 필요
        let output = self
            .client
            .query()
            .table_name(table)
            .key_condition_expression("#h = :h")
            .expression_attribute_names("#h", &key_schema.hash_key)
            .expression_attribute_names("#r", &key_schema.range_key)
            .expression_attribute_values(":h", AttributeValue::S(hash_value.to_string()))
            .projection_expression("#r")
            .scan_index_forward(false)
            .limit(1)
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| store_error("Query", e))?;

        Ok(output
            .items()
            .first()
            .and_then(|item| item.get(&key_schema.range_key))
            .and_then(|value| value.as_s().ok())
            .cloned())
    }
}
