//! 대상 테이블 생성 모듈.

use crate::config::ProvisionConfig;
use crate::error::LoaderError;
use crate::Result;
use quandl_data::{CreateOutcome, DestinationTable, KeyValueStore, TableDefinition};

/// 대상 테이블이 존재하도록 보장.
///
/// 이미 존재하는 테이블은 정상으로 처리합니다. 그 외 생성 실패와 ACTIVE 대기
/// 시간 초과는 `LoaderError::Provision`으로 반환합니다.
pub async fn ensure_table(
    store: &dyn KeyValueStore,
    destination: &DestinationTable,
    config: &ProvisionConfig,
) -> Result<CreateOutcome> {
    let definition = TableDefinition::for_destination(
        destination,
        config.table_throughput,
        config.index_throughput,
    );

    let outcome = store
        .create_table(&definition)
        .await
        .map_err(|source| LoaderError::Provision {
            table: destination.name.clone(),
            source,
        })?;

    match outcome {
        CreateOutcome::Created => tracing::info!(table = %destination.name, "테이블 생성"),
        CreateOutcome::AlreadyExists => {
            tracing::info!(table = %destination.name, "테이블이 이미 존재합니다")
        }
    }

    // 생성 직후에는 CREATING 상태이므로 쓰기 전에 ACTIVE까지 대기
    store
        .wait_until_active(&destination.name, config.poll_interval(), config.ready_timeout())
        .await
        .map_err(|source| LoaderError::Provision {
            table: destination.name.clone(),
            source,
        })?;

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quandl_data::{DatasetSpec, MemoryStore, Throughput, INDEX_NAME};

    fn provision_config() -> ProvisionConfig {
        ProvisionConfig {
            table_throughput: Throughput::new(5, 10),
            index_throughput: Throughput::new(1, 1),
            ready_timeout_secs: 1,
            ready_poll_ms: 10,
        }
    }

    #[tokio::test]
    async fn test_ensure_table_twice() {
        let store = MemoryStore::new();
        let destination = DatasetSpec::parse("ZACKS_EE").unwrap().destination();

        let first = ensure_table(&store, &destination, &provision_config())
            .await
            .unwrap();
        let second = ensure_table(&store, &destination, &provision_config())
            .await
            .unwrap();

        assert_eq!(first, CreateOutcome::Created);
        assert_eq!(second, CreateOutcome::AlreadyExists);

        let definition = store.definition("ZACKS_EE").unwrap();
        assert_eq!(definition.key_schema.hash_key, "ticker");
        assert_eq!(definition.key_schema.range_key, "comp_name");
        assert_eq!(definition.index_name, INDEX_NAME);
        assert_eq!(definition.table_throughput, Throughput::new(5, 10));
    }
}
