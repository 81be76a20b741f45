//! Quandl → DynamoDB dataset loader.
//!
//! 이 crate는 설정에 나열된 Quandl 데이터셋을 DynamoDB로 적재하는 바이너리를 제공합니다:
//! - 시계열 데이터베이스: 코드 목록을 내려받아 데이터셋별로 적재
//! - 데이터테이블: 단일 테이블 적재
//! - 대상 테이블이 없으면 생성 후 전체 적재, 있으면 증분 갱신

pub mod config;
pub mod error;
pub mod modules;
pub mod stats;

pub use config::{ConfigFile, LoaderConfig, TableWatermark};
pub use error::{LoaderError, Result};
pub use stats::LoadStats;
