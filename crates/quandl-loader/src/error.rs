//! 에러 타입 정의.

use quandl_data::DataError;
use std::fmt;

/// Loader 에러 타입
#[derive(Debug)]
pub enum LoaderError {
    /// 설정 에러 (파일 누락, 섹션/키 누락, 잘못된 값)
    Config(String),
    /// 저장소 세션/자격 증명 에러
    Session(String),
    /// 테이블 생성 에러 (이미 존재하는 경우 제외)
    Provision { table: String, source: DataError },
    /// 데이터 소스 및 저장소 에러
    Data(DataError),
    /// 일반 에러
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for LoaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
            Self::Session(msg) => write!(f, "Session error: {}", msg),
            Self::Provision { table, source } => {
                write!(f, "Provisioning error for table {}: {}", table, source)
            }
            Self::Data(e) => write!(f, "Data error: {}", e),
            Self::Other(e) => write!(f, "Error: {}", e),
        }
    }
}

impl std::error::Error for LoaderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Provision { source, .. } => Some(source),
            Self::Data(e) => Some(e),
            Self::Other(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<DataError> for LoaderError {
    fn from(err: DataError) -> Self {
        Self::Data(err)
    }
}

impl From<config::ConfigError> for LoaderError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<serde_json::Error> for LoaderError {
    fn from(err: serde_json::Error) -> Self {
        Self::Other(Box::new(err))
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, LoaderError>;
