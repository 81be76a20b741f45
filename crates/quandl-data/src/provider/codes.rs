//! 데이터베이스 코드 목록 아카이브 파서.
//!
//! Quandl `/databases/{db}/codes` 응답은 CSV 한 개가 담긴 zip 파일입니다.
//! 각 줄은 `DB/CODE,설명` 형식이며, `/` 뒤의 데이터셋 코드만 추출합니다.

use std::io::{Cursor, Read};
use zip::ZipArchive;

use crate::error::{DataError, Result};

/// zip 아카이브의 모든 항목에서 데이터셋 코드 추출.
pub fn parse_codes_archive(bytes: &[u8]) -> Result<Vec<String>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut codes = Vec::new();

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }

        let name = file.name().to_string();
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let before = codes.len();
        for line in contents.lines() {
            if let Some(code) = parse_code_line(line)? {
                codes.push(code);
            }
        }
        tracing::debug!(entry = %name, count = codes.len() - before, "코드 목록 항목 파싱");
    }

    Ok(codes)
}

/// `DB/CODE,설명` 한 줄에서 `CODE` 추출 (빈 줄은 `None`).
fn parse_code_line(line: &str) -> Result<Option<String>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let full_code = line.split(',').next().unwrap_or(line);
    match full_code.split('/').nth(1) {
        Some(code) => Ok(Some(code.trim().to_string())),
        None => Err(DataError::ParseError(format!(
            "code list line without database prefix: {}",
            line
        ))),
    }
}
