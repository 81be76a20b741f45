//! 설정 파일 기반 설정 모듈.
//!
//! INI 형식 설정 파일에서 환경 이름(`dev`, `prod` 등)에 해당하는 섹션을 읽습니다.
//! `QLOADER_{ENV}__{KEY}` 환경변수로 개별 키를 덮어쓸 수 있습니다.
//!
//! ```ini
//! [dev]
//! db_datasets_table = datasets
//! db_credentials_table = credentials
//! db_region_name = us-east-1
//! db_endpoint_url = http://localhost:8000
//! quandl_datasets = WIKI,ZACKS_EE
//! ```

use crate::error::LoaderError;
use crate::Result;
use quandl_data::{DatasetSpec, StoreConfig, Throughput};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// 설정 파일 로더.
pub struct ConfigFile;

impl ConfigFile {
    /// 설정 파일에서 `env` 섹션을 문자열 맵으로 로드.
    pub fn load(path: &Path, env: &str) -> Result<HashMap<String, String>> {
        tracing::debug!(path = %path.display(), env, "설정 파일 로드");

        if !path.is_file() {
            return Err(LoaderError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }

        let settings = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Ini))
            .add_source(
                config::Environment::with_prefix("QLOADER")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let section = settings.get_table(env).map_err(|_| {
            LoaderError::Config(format!(
                "section [{}] not found in {}",
                env,
                path.display()
            ))
        })?;

        section
            .into_iter()
            .map(|(key, value)| {
                value
                    .into_string()
                    .map(|v| (key, v))
                    .map_err(LoaderError::from)
            })
            .collect()
    }
}

/// 데이터테이블 증분 갱신 기준.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableWatermark {
    /// Provider가 보고한 종료일부터 다시 조회
    ProviderEndDate,
    /// 기준 없이 전체 재조회 (upsert로 덮어씀)
    Disabled,
}

impl FromStr for TableWatermark {
    type Err = LoaderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "provider_end_date" => Ok(Self::ProviderEndDate),
            "none" => Ok(Self::Disabled),
            other => Err(LoaderError::Config(format!(
                "table_watermark must be provider_end_date or none, got {}",
                other
            ))),
        }
    }
}

/// Loader 전체 설정
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// 데이터셋 명세 테이블
    pub datasets_table: String,
    /// 자격 증명 테이블
    pub credentials_table: String,
    /// DynamoDB 세션 설정
    pub store: StoreConfig,
    /// 적재 대상 데이터셋
    pub datasets: Vec<DatasetSpec>,
    /// Quandl API 키 (없으면 환경변수/자격 증명 테이블 사용)
    pub api_key: Option<String>,
    /// Provider 설정
    pub provider: ProviderConfig,
    /// 테이블 생성 설정
    pub provisioning: ProvisionConfig,
    /// 증분 갱신 설정
    pub incremental: IncrementalConfig,
}

/// Provider 설정
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// API 주소
    pub base_url: String,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
}

/// 테이블 생성 설정
#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    /// 테이블 처리량
    pub table_throughput: Throughput,
    /// 보조 인덱스 처리량
    pub index_throughput: Throughput,
    /// ACTIVE 대기 최대 시간 (초)
    pub ready_timeout_secs: u64,
    /// 상태 조회 간격 (밀리초)
    pub ready_poll_ms: u64,
}

/// 증분 갱신 설정
#[derive(Debug, Clone)]
pub struct IncrementalConfig {
    /// 데이터테이블 갱신 기준
    pub table_watermark: TableWatermark,
    /// 데이터테이블 기준일 필터 파라미터 이름
    pub table_watermark_param: String,
}

impl LoaderConfig {
    /// 설정 섹션에서 로드
    pub fn from_section(section: &HashMap<String, String>) -> Result<Self> {
        let datasets = match section.get("quandl_datasets") {
            Some(list) => DatasetSpec::parse_list(list)
                .map_err(|e| LoaderError::Config(format!("quandl_datasets: {}", e)))?,
            None => Vec::new(),
        };

        Ok(Self {
            datasets_table: required(section, "db_datasets_table")?,
            credentials_table: required(section, "db_credentials_table")?,
            store: StoreConfig {
                region: required(section, "db_region_name")?,
                profile_name: optional(section, "aws_profile_name"),
                endpoint_url: optional(section, "db_endpoint_url"),
            },
            datasets,
            api_key: optional(section, "quandl_api_key"),
            provider: ProviderConfig {
                base_url: optional(section, "quandl_base_url").unwrap_or_else(|| {
                    quandl_data::provider::quandl::DEFAULT_BASE_URL.to_string()
                }),
                timeout_secs: parse_or(section, "http_timeout_secs", 30)?,
            },
            provisioning: ProvisionConfig {
                table_throughput: Throughput::new(
                    parse_or(section, "table_read_capacity", 5)?,
                    parse_or(section, "table_write_capacity", 10)?,
                ),
                index_throughput: Throughput::new(
                    parse_or(section, "index_read_capacity", 1)?,
                    parse_or(section, "index_write_capacity", 1)?,
                ),
                ready_timeout_secs: parse_or(section, "table_ready_timeout_secs", 60)?,
                ready_poll_ms: parse_or(section, "table_ready_poll_ms", 1000)?,
            },
            incremental: IncrementalConfig {
                table_watermark: parse_or(
                    section,
                    "table_watermark",
                    TableWatermark::ProviderEndDate,
                )?,
                table_watermark_param: optional(section, "table_watermark_param")
                    .unwrap_or_else(|| "start_date".to_string()),
            },
        })
    }

    /// 명령행 `--datasets` 값으로 데이터셋 목록 교체.
    pub fn override_datasets(&mut self, list: &str) -> Result<()> {
        self.datasets = DatasetSpec::parse_list(list)
            .map_err(|e| LoaderError::Config(format!("--datasets: {}", e)))?;
        Ok(())
    }

    /// 적재할 데이터셋이 있는지 확인.
    pub fn require_datasets(&self) -> Result<()> {
        if self.datasets.is_empty() {
            return Err(LoaderError::Config(
                "no datasets configured (quandl_datasets)".to_string(),
            ));
        }
        Ok(())
    }
}

impl ProviderConfig {
    /// 요청 타임아웃을 Duration으로 반환
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ProvisionConfig {
    /// ACTIVE 대기 최대 시간을 Duration으로 반환
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }

    /// 상태 조회 간격을 Duration으로 반환
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.ready_poll_ms)
    }
}

/// 필수 키 (빈 값은 누락으로 처리)
fn required(section: &HashMap<String, String>, key: &str) -> Result<String> {
    optional(section, key)
        .ok_or_else(|| LoaderError::Config(format!("missing required key: {}", key)))
}

/// 선택 키 (빈 값은 `None`)
fn optional(section: &HashMap<String, String>, key: &str) -> Option<String> {
    section
        .get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// 값을 파싱 (없으면 기본값, 잘못된 값은 에러)
fn parse_or<T>(section: &HashMap<String, String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional(section, key) {
        Some(v) => v
            .parse()
            .map_err(|e| LoaderError::Config(format!("invalid value for {}: {} ({})", key, v, e))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quandl_data::DatasetKind;

    fn section(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn base() -> Vec<(&'static str, &'static str)> {
        vec![
            ("db_datasets_table", "datasets"),
            ("db_credentials_table", "credentials"),
            ("db_region_name", "us-east-1"),
            ("quandl_datasets", "WIKI,ZACKS_EE"),
        ]
    }

    #[test]
    fn test_defaults() {
        let config = LoaderConfig::from_section(&section(&base())).unwrap();

        assert_eq!(config.store.region, "us-east-1");
        assert_eq!(config.store.profile_name, None);
        assert_eq!(config.datasets.len(), 2);
        assert_eq!(config.datasets[1].kind(), DatasetKind::Table);
        assert_eq!(config.provisioning.table_throughput, Throughput::new(5, 10));
        assert_eq!(config.provisioning.index_throughput, Throughput::new(1, 1));
        assert_eq!(config.provisioning.poll_interval(), Duration::from_secs(1));
        assert_eq!(
            config.incremental.table_watermark,
            TableWatermark::ProviderEndDate
        );
        assert_eq!(config.incremental.table_watermark_param, "start_date");
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_missing_required_key() {
        let mut pairs = base();
        pairs.retain(|(k, _)| *k != "db_region_name");

        let err = LoaderConfig::from_section(&section(&pairs)).unwrap_err();
        assert!(matches!(err, LoaderError::Config(msg) if msg.contains("db_region_name")));
    }

    #[test]
    fn test_invalid_number_is_error() {
        let mut pairs = base();
        pairs.push(("table_read_capacity", "lots"));
        assert!(LoaderConfig::from_section(&section(&pairs)).is_err());
    }

    #[test]
    fn test_watermark_setting() {
        let mut pairs = base();
        pairs.push(("table_watermark", "none"));
        pairs.push(("table_watermark_param", "date.gte"));

        let config = LoaderConfig::from_section(&section(&pairs)).unwrap();
        assert_eq!(config.incremental.table_watermark, TableWatermark::Disabled);
        assert_eq!(config.incremental.table_watermark_param, "date.gte");

        assert!("sometimes".parse::<TableWatermark>().is_err());
    }

    #[test]
    fn test_override_datasets() {
        let mut config = LoaderConfig::from_section(&section(&base())).unwrap();
        config.override_datasets("FB").unwrap();
        assert_eq!(config.datasets.len(), 1);
        assert_eq!(config.datasets[0].destination().name, "FBB");

        config.override_datasets(" , ").unwrap();
        assert!(config.require_datasets().is_err());
    }

    #[test]
    fn test_load_ini_section() {
        let path = std::env::temp_dir().join(format!("qloader-config-{}.cfg", std::process::id()));
        std::fs::write(
            &path,
            "[dev]\n\
             db_datasets_table = datasets\n\
             db_credentials_table = credentials\n\
             db_region_name = us-west-2\n\
             aws_profile_name = research\n\
             quandl_datasets = WIKI,FB\n\
             \n\
             [prod]\n\
             db_region_name = us-east-1\n",
        )
        .unwrap();

        let section = ConfigFile::load(&path, "dev").unwrap();
        assert_eq!(section.get("db_region_name").map(String::as_str), Some("us-west-2"));

        let config = LoaderConfig::from_section(&section).unwrap();
        assert_eq!(config.store.profile_name.as_deref(), Some("research"));
        assert_eq!(config.datasets.len(), 2);

        assert!(matches!(
            ConfigFile::load(&path, "staging"),
            Err(LoaderError::Config(_))
        ));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_env_variable_overrides_file() {
        // 다른 테스트와 겹치지 않는 섹션 이름 사용
        let path = std::env::temp_dir().join(format!("qloader-env-{}.cfg", std::process::id()));
        std::fs::write(
            &path,
            "[envtest]\n\
             db_datasets_table = datasets\n\
             db_credentials_table = credentials\n\
             db_region_name = us-west-2\n",
        )
        .unwrap();
        std::env::set_var("QLOADER_ENVTEST__DB_REGION_NAME", "eu-central-1");

        let section = ConfigFile::load(&path, "envtest").unwrap();
        std::env::remove_var("QLOADER_ENVTEST__DB_REGION_NAME");
        std::fs::remove_file(&path).ok();

        assert_eq!(
            section.get("db_region_name").map(String::as_str),
            Some("eu-central-1")
        );
        assert_eq!(
            section.get("db_datasets_table").map(String::as_str),
            Some("datasets")
        );
    }

    #[test]
    fn test_missing_file() {
        let path = Path::new("/nonexistent/qloader.cfg");
        assert!(matches!(
            ConfigFile::load(path, "dev"),
            Err(LoaderError::Config(_))
        ));
    }
}
