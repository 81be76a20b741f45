//! 데이터셋 모델.
//!
//! 설정에 나열된 Quandl 식별자로부터 데이터셋 종류와 DynamoDB 대상 테이블을
//! 결정합니다.
//!
//! - 식별자에 `_`가 포함되면 데이터테이블 (`ZACKS_EE` → `ZACKS/EE`)
//! - 그 외는 시계열 데이터베이스 (`WIKI` → `WIKI/{code}` 데이터셋 다수)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{DataError, Result};

/// 테이블 식별자 구분 문자.
pub const TABLE_SEPARATOR: char = '_';

/// DynamoDB 테이블 이름 최소 길이.
pub const MIN_TABLE_NAME_LEN: usize = 3;

/// 대상 테이블에 생성되는 보조 인덱스 이름.
pub const INDEX_NAME: &str = "GUIdx";

/// 저장소 항목 (속성 이름 → 값).
pub type Item = BTreeMap<String, AttrValue>;

/// 데이터셋 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    /// 시계열 데이터베이스 (코드 목록으로 여러 데이터셋 열거)
    TimeSeries,
    /// 데이터테이블 (단일 테이블)
    Table,
}

impl DatasetKind {
    /// 식별자로부터 종류 추론.
    pub fn infer(identifier: &str) -> Self {
        if identifier.contains(TABLE_SEPARATOR) {
            Self::Table
        } else {
            Self::TimeSeries
        }
    }

    /// 종류별 키 스키마.
    pub fn key_schema(&self) -> KeySchema {
        match self {
            Self::TimeSeries => KeySchema::new("type", "date"),
            Self::Table => KeySchema::new("ticker", "comp_name"),
        }
    }

    /// 문자열로 변환
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TimeSeries => "time_series",
            Self::Table => "table",
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 적재 대상 데이터셋.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSpec {
    identifier: String,
    kind: DatasetKind,
}

impl DatasetSpec {
    /// 식별자로부터 데이터셋 생성 (앞뒤 공백 제거).
    pub fn parse(identifier: &str) -> Result<Self> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(DataError::InvalidData(
                "empty dataset identifier".to_string(),
            ));
        }

        Ok(Self {
            identifier: identifier.to_string(),
            kind: DatasetKind::infer(identifier),
        })
    }

    /// 쉼표로 구분된 목록 파싱 (빈 항목은 무시).
    pub fn parse_list(list: &str) -> Result<Vec<Self>> {
        list.split(',')
            .filter(|s| !s.trim().is_empty())
            .map(Self::parse)
            .collect()
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn kind(&self) -> DatasetKind {
        self.kind
    }

    /// 적재 대상 테이블.
    pub fn destination(&self) -> DestinationTable {
        DestinationTable {
            name: padded_table_name(&self.identifier),
            key_schema: self.kind.key_schema(),
        }
    }
}

impl fmt::Display for DatasetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.identifier, self.kind)
    }
}

/// Hash/Range 키 스키마.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySchema {
    pub hash_key: String,
    pub range_key: String,
}

impl KeySchema {
    pub fn new(hash_key: impl Into<String>, range_key: impl Into<String>) -> Self {
        Self {
            hash_key: hash_key.into(),
            range_key: range_key.into(),
        }
    }
}

/// 적재 대상 DynamoDB 테이블.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationTable {
    pub name: String,
    pub key_schema: KeySchema,
}

/// 데이터테이블 식별자를 API 경로로 변환 (`ZACKS_EE` → `ZACKS/EE`).
///
/// 첫 번째 구분 문자만 `/`로 바꿉니다. 구분 문자가 없으면 `None`.
pub fn datatable_path(identifier: &str) -> Option<String> {
    identifier
        .split_once(TABLE_SEPARATOR)
        .map(|(vendor, table)| format!("{}/{}", vendor, table))
}

/// 최소 길이(3자)를 만족하도록 마지막 문자를 반복해 테이블 이름 생성.
///
/// `"FB"` → `"FBB"`, `"A"` → `"AAA"`.
pub fn padded_table_name(identifier: &str) -> String {
    let mut name = identifier.to_string();
    if let Some(last) = identifier.chars().last() {
        while name.chars().count() < MIN_TABLE_NAME_LEN {
            name.push(last);
        }
    }
    name
}

/// 저장소 속성 값.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// 문자열
    S(String),
    /// 숫자 (문자열 표현 그대로 보관)
    N(String),
    Bool(bool),
    Null,
    /// 리스트
    L(Vec<AttrValue>),
    /// 맵
    M(BTreeMap<String, AttrValue>),
}

impl AttrValue {
    /// 문자열 값이면 참조 반환.
    pub fn as_s(&self) -> Option<&str> {
        match self {
            Self::S(s) => Some(s),
            _ => None,
        }
    }

    /// 맵 값이면 참조 반환.
    pub fn as_m(&self) -> Option<&BTreeMap<String, AttrValue>> {
        match self {
            Self::M(m) => Some(m),
            _ => None,
        }
    }

    /// JSON 값으로 변환 (출력용).
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::S(s) => serde_json::Value::String(s.clone()),
            Self::N(n) => n
                .parse::<serde_json::Number>()
                .map(serde_json::Value::Number)
                .unwrap_or_else(|_| serde_json::Value::String(n.clone())),
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Null => serde_json::Value::Null,
            Self::L(list) => serde_json::Value::Array(list.iter().map(Self::to_json).collect()),
            Self::M(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        Self::S(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        Self::S(s)
    }
}

/// 항목 전체를 JSON 객체로 변환.
pub fn item_to_json(item: &Item) -> serde_json::Value {
    serde_json::Value::Object(item.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_inference() {
        assert_eq!(DatasetKind::infer("ZACKS_EE"), DatasetKind::Table);
        assert_eq!(DatasetKind::infer("WIKI"), DatasetKind::TimeSeries);
        assert_eq!(DatasetKind::infer("FRED"), DatasetKind::TimeSeries);
    }

    #[test]
    fn test_key_schema_by_kind() {
        assert_eq!(
            DatasetKind::Table.key_schema(),
            KeySchema::new("ticker", "comp_name")
        );
        assert_eq!(
            DatasetKind::TimeSeries.key_schema(),
            KeySchema::new("type", "date")
        );
    }

    #[test]
    fn test_padded_table_name() {
        assert_eq!(padded_table_name("FB"), "FBB");
        assert_eq!(padded_table_name("A"), "AAA");
        assert_eq!(padded_table_name("WIKI"), "WIKI");
        assert_eq!(padded_table_name("ZACKS_EE"), "ZACKS_EE");

        for id in ["X", "ED", "EDX", "LONGER"] {
            assert!(padded_table_name(id).len() >= MIN_TABLE_NAME_LEN);
        }
    }

    #[test]
    fn test_two_char_identifier_appends_last_char() {
        let spec = DatasetSpec::parse("ED").unwrap();
        let dest = spec.destination();
        assert_eq!(dest.name, "EDD");
        assert_eq!(dest.key_schema.hash_key, "type");
        assert_eq!(dest.key_schema.range_key, "date");
    }

    #[test]
    fn test_parse_list() {
        let specs = DatasetSpec::parse_list("WIKI, ZACKS_EE,,FB ").unwrap();
        let ids: Vec<&str> = specs.iter().map(|s| s.identifier()).collect();
        assert_eq!(ids, vec!["WIKI", "ZACKS_EE", "FB"]);
        assert_eq!(specs[1].kind(), DatasetKind::Table);
    }

    #[test]
    fn test_empty_identifier_rejected() {
        assert!(DatasetSpec::parse("  ").is_err());
    }

    #[test]
    fn test_datatable_path() {
        assert_eq!(datatable_path("ZACKS_EE").as_deref(), Some("ZACKS/EE"));
        assert_eq!(datatable_path("ZACKS_EE_V2").as_deref(), Some("ZACKS/EE_V2"));
        assert_eq!(datatable_path("WIKI"), None);
    }

    #[test]
    fn test_item_to_json() {
        let mut inner = BTreeMap::new();
        inner.insert("api_key".to_string(), AttrValue::from("secret"));
        let mut item = Item::new();
        item.insert("service_id".to_string(), AttrValue::from("quandl"));
        item.insert("quandl_info".to_string(), AttrValue::M(inner));
        item.insert("limit".to_string(), AttrValue::N("50".to_string()));

        let json = item_to_json(&item);
        assert_eq!(json["service_id"], "quandl");
        assert_eq!(json["quandl_info"]["api_key"], "secret");
        assert_eq!(json["limit"], 50);
    }
}
