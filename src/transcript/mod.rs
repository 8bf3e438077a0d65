//! Tolerant parser for KakaoTalk conversation exports.
//!
//! Exports are inconsistent plain text: two message layouts, date separator
//! lines, banner lines, multi-line messages, and a handful of legacy
//! encodings. The parser is a small state machine over lines and never
//! fails: anything unreadable yields an empty turn list.

use crate::model::Turn;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::warn;

/// `---------------- 2024년 3월 1일 금요일 ----------------`
static DATE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-+\s+(?P<date>\d{4}년\s+\d{1,2}월\s+\d{1,2}일)\s+.+\s+-+$").unwrap()
});

/// `[장나영] [오전 10:16] 안녕하세요`
static BRACKET_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(?P<speaker>.+?)\]\s+\[(?P<ampm>오전|오후)\s+(?P<time>\d{1,2}:\d{2})\]\s+(?P<text>.*)$")
        .unwrap()
});

/// `2024. 3. 1 오전 10:16, 장나영 : 안녕하세요`
static COMMA_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<date>\d{4}[./년 ]\s?\d{1,2}[./월 ]\s?\d{1,2}일?)\s+(?P<ampm>오전|오후)\s+(?P<time>\d{1,2}:\d{2}),\s*(?P<speaker>[^:]+?)\s*:\s*(?P<text>.*)$",
    )
    .unwrap()
});

/// Parse raw export bytes into appearance-ordered turns.
///
/// Undecodable or empty input yields an empty list, never an error.
pub fn parse_bytes(raw: &[u8]) -> Vec<Turn> {
    match decode(raw) {
        Some(text) => parse_text(&text),
        None => {
            warn!("transcript could not be decoded with any known encoding");
            Vec::new()
        }
    }
}

/// Parse an export file. An unreadable path yields an empty list.
pub fn parse_file(path: &Path) -> Vec<Turn> {
    match std::fs::read(path) {
        Ok(raw) => parse_bytes(&raw),
        Err(e) => {
            warn!(path = %path.display(), "cannot read transcript: {e}");
            Vec::new()
        }
    }
}

/// Sorted unique speaker names.
pub fn speakers(turns: &[Turn]) -> Vec<String> {
    let mut names: Vec<String> = turns.iter().map(|t| t.speaker.clone()).collect();
    names.sort();
    names.dedup();
    names
}

/// Try the export's known encodings in order: UTF-8 (BOM tolerated), then
/// EUC-KR (encoding_rs's EUC-KR decoder is Windows-949, covering CP949).
fn decode(raw: &[u8]) -> Option<String> {
    let stripped = raw.strip_prefix(b"\xef\xbb\xbf").unwrap_or(raw);
    if let Ok(text) = std::str::from_utf8(stripped) {
        return Some(text.to_string());
    }
    encoding_rs::EUC_KR
        .decode_without_bom_handling_and_without_replacement(raw)
        .map(|cow| cow.into_owned())
}

fn parse_text(text: &str) -> Vec<Turn> {
    let mut turns: Vec<Turn> = Vec::new();
    let mut current: Option<Turn> = None;
    let mut current_date: Option<String> = None;

    for (line_no, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        // Export header/footer banners carry no message content.
        if line.ends_with("카카오톡 대화") || line.starts_with("저장한 날짜") {
            continue;
        }

        if let Some(caps) = DATE_HEADER.captures(line) {
            current_date = Some(caps["date"].to_string());
            continue;
        }

        if let Some(caps) = BRACKET_LINE.captures(line) {
            if let Some(turn) = current.take() {
                turns.push(turn);
            }
            current = Some(Turn {
                timestamp: build_timestamp(current_date.as_deref(), &caps["ampm"], &caps["time"]),
                speaker: caps["speaker"].to_string(),
                text: caps["text"].to_string(),
                source_line: line_no,
            });
            continue;
        }

        if let Some(caps) = COMMA_LINE.captures(line) {
            if let Some(turn) = current.take() {
                turns.push(turn);
            }
            current = Some(Turn {
                timestamp: build_timestamp(Some(&caps["date"]), &caps["ampm"], &caps["time"]),
                speaker: caps["speaker"].to_string(),
                text: caps["text"].to_string(),
                source_line: line_no,
            });
            continue;
        }

        // Continuation of a multi-line message. Orphans (no open turn) are
        // dropped silently.
        if let Some(ref mut turn) = current {
            turn.text.push('\n');
            turn.text.push_str(line);
        }
    }

    if let Some(turn) = current {
        turns.push(turn);
    }

    turns
}

fn build_timestamp(date: Option<&str>, ampm: &str, time: &str) -> String {
    match date {
        Some(date) => format!("{date} {ampm} {time}"),
        None => format!("{ampm} {time}"),
    }
}
