use lasttalk::model::{HonorificLevel, ResponseLength, Turn};
use lasttalk::persona;
use serde_json::json;

fn turn(speaker: &str, text: &str) -> Turn {
    Turn {
        timestamp: "2024년 3월 1일 오전 10:16".to_string(),
        speaker: speaker.to_string(),
        text: text.to_string(),
        source_line: 0,
    }
}

fn sample_turns() -> Vec<Turn> {
    vec![
        turn("나영", "오늘 카페 갔다왔어"),
        turn("나영", "카페 라떼 진짜 맛있더라"),
        turn("나영", "다음엔 같이 가자"),
    ]
}

#[test]
fn normalize_accepts_well_formed_payload() {
    let raw = json!({
        "summary": "다정하고 장난기 많은 말투.",
        "profile": {
            "nickname_rules": ["철수야"],
            "speech_style": {
                "endings": ["~어", "~지"],
                "honorific_level": "informal",
                "emoji_usage": "low",
                "punctuation": "short"
            },
            "favorite_topics": ["카페"],
            "taboo_topics": [],
            "response_length": "short",
            "typical_patterns": ["진짜"],
            "few_shot_examples": [{"user": "뭐해", "persona": "그냥 있어"}]
        }
    });

    let report = persona::normalize_report(raw, &sample_turns());
    assert_eq!(report.summary, "다정하고 장난기 많은 말투.");
    assert_eq!(report.profile.speech_style.honorific_level, HonorificLevel::Informal);
    assert_eq!(report.profile.response_length, ResponseLength::Short);
    assert_eq!(report.profile.few_shot_examples.len(), 1);
}

#[test]
fn normalize_repairs_malformed_fields_to_defaults() {
    let raw = json!({
        "summary": 42,
        "profile": {
            "nickname_rules": "언니",
            "speech_style": {
                "endings": [null, "~요", 7],
                "honorific_level": "SUPER_POLITE",
            },
            "favorite_topics": {"not": "a list"},
            "response_length": 3,
            "few_shot_examples": [{"user": "뭐해"}, "broken", {"user": "a", "persona": "b"}]
        }
    });

    let report = persona::normalize_report(raw, &sample_turns());
    assert_eq!(report.summary, "42");
    assert_eq!(report.profile.nickname_rules, vec!["언니".to_string()]);
    assert_eq!(report.profile.speech_style.endings, vec!["~요".to_string(), "7".to_string()]);
    assert_eq!(report.profile.speech_style.honorific_level, HonorificLevel::Mixed);
    assert_eq!(report.profile.response_length, ResponseLength::Medium);
    assert_eq!(report.profile.few_shot_examples.len(), 1);
    assert_eq!(report.profile.few_shot_examples[0].persona, "b");
}

#[test]
fn normalize_of_empty_object_yields_typed_defaults() {
    let report = persona::normalize_report(json!({}), &[]);

    let profile = &report.profile;
    assert!(profile.nickname_rules.is_empty());
    assert!(profile.speech_style.endings.is_empty());
    assert!(profile.favorite_topics.is_empty());
    assert!(profile.taboo_topics.is_empty());
    assert!(profile.typical_patterns.is_empty());
    assert!(profile.few_shot_examples.is_empty());
    assert_eq!(profile.speech_style.honorific_level, HonorificLevel::Mixed);
    assert_eq!(profile.response_length, ResponseLength::Medium);
    assert!(!report.summary.is_empty());
}

#[test]
fn normalize_unwraps_schema_name_wrapper() {
    let raw = json!({
        "PersonaReport": {
            "summary": "요약",
            "profile": {}
        }
    });
    let report = persona::normalize_report(raw, &sample_turns());
    assert_eq!(report.summary, "요약");
}

#[test]
fn normalize_is_idempotent() {
    let raw = json!({
        "summary": "",
        "profile": {
            "favorite_topics": ["영화", "영화", "여행"],
            "typical_patterns": "그니까"
        }
    });
    let turns = sample_turns();

    let once = persona::normalize_report(raw, &turns);
    let twice = persona::normalize_report(serde_json::to_value(&once).unwrap(), &turns);
    assert_eq!(once, twice);
}

#[test]
fn empty_summary_gets_local_fallback() {
    let report = persona::normalize_report(json!({"summary": "  ", "profile": {}}), &sample_turns());
    assert!(report.summary.contains("3건"), "got: {}", report.summary);
    assert!(report.summary.contains("1명"), "got: {}", report.summary);
}

#[test]
fn fallback_summary_handles_empty_transcript() {
    let summary = persona::fallback_summary(&[]);
    assert_eq!(summary, "대화 로그가 비어 있어 요약할 수 없습니다.");
}

#[tokio::test]
async fn build_report_without_provider_requires_or_falls_back() {
    let turns = sample_turns();

    let err = persona::build_report(None, &turns, true).await.unwrap_err();
    assert!(matches!(err, lasttalk::error::Error::ProviderUnavailable));

    let report = persona::build_report(None, &turns, false).await.unwrap();
    assert!(report.summary.ends_with("(로컬 요약)"), "got: {}", report.summary);
}
