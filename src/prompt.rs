//! System prompt templates.
//!
//! The templates are Korean because the persona rules (honorifics, endings,
//! nicknames) only make sense in the transcript's language. Structure, not
//! wording, is what the rest of the crate depends on.

use crate::model::{FewShotExample, HonorificLevel, PersonaReport, StyleSignature};

const NONE_MARKER: &str = "없음";

/// Persona-neutral conversational ground rules.
pub fn base_system_prompt() -> &'static str {
    "너는 사용자가 선택한 화자의 말투와 습관을 그대로 모사한다.\n\
     AI/시스템/모델/정책/도움말 언급 금지.\n\
     이모지는 사용하지 않는다. 이모티콘은 맥락에 맞게 과하지 않게 사용한다.\n\
     정보 제공/해설/조언보다 관계 유지와 감정 반응을 우선한다.\n\
     대답은 짧고 자연스럽게, 필요하면 짧은 질문 1개만 덧붙인다.\n\
     과도한 공손함이나 상담사 톤을 피하고, 실제 대화처럼 답한다.\n"
}

/// Behavioral rule keyed by honorific level.
fn honorific_rule(level: HonorificLevel) -> &'static str {
    match level {
        HonorificLevel::Informal => "말투는 반말이다. 존댓말은 사용하지 않는다.",
        HonorificLevel::Polite => "항상 존댓말로 말한다. 반말은 사용하지 않는다.",
        HonorificLevel::Mixed => {
            "친근하되 존댓말을 기본으로 하고, 반말은 아주 제한적으로 사용한다."
        }
    }
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        NONE_MARKER.to_string()
    } else {
        items.join(", ")
    }
}

fn bullets_or_none(items: &[String]) -> String {
    if items.is_empty() {
        return NONE_MARKER.to_string();
    }
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn pairs_or_none(examples: &[FewShotExample]) -> String {
    if examples.is_empty() {
        return NONE_MARKER.to_string();
    }
    examples
        .iter()
        .map(|ex| format!("- 사용자: {}\n  페르소나: {}", ex.user, ex.persona))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Compose the full persona instruction block.
///
/// Field order is fixed: summary, style indicators, honorific rule, endings,
/// nickname rules, topics, patterns, signature, real examples, synthetic
/// few-shot examples (capped at 3). Empty sections render the literal
/// "없음" marker so the model sees every slot.
pub fn build_persona_prompt(
    report: &PersonaReport,
    speaker_name: &str,
    style_examples: &[String],
    dialog_examples: &[FewShotExample],
    signature: &StyleSignature,
) -> String {
    let profile = &report.profile;
    let speech = &profile.speech_style;

    let honorific = serde_plain(&speech.honorific_level);
    let punctuation = serde_plain(&speech.punctuation);
    let response_length = serde_plain(&profile.response_length);

    let few_shot: Vec<FewShotExample> =
        profile.few_shot_examples.iter().take(3).cloned().collect();

    format!(
        "{base}이름은 '{speaker_name}'이며, 이름을 묻는 질문에는 반드시 '{speaker_name}'이라고 답한다.\n\
         요약: {summary}\n\
         말투 지표: 존댓말={honorific}, 구두점={punctuation}, 길이={response_length}\n\
         말투 규칙: {rule}\n\
         어미: {endings}\n\
         호칭 규칙: {nicknames}\n\
         관심 주제: {topics}\n\
         금기 주제: {taboos}\n\
         자주 쓰는 표현: {patterns}\n\
         문장 길이 평균: {avg_len}자 내외\n\
         자주 쓰는 어미/끝맺음: {ending_hint}\n\
         자주 쓰는 단어: {token_hint}\n\
         실제 발화 예시:\n{style_text}\n\
         실제 대화 예시:\n{dialog_text}\n\
         예시 대화(합성):\n{few_shot_text}\n\
         위 지표를 따르되, 실제 발화 예시의 분위기와 리듬을 최우선으로 반영한다.",
        base = base_system_prompt(),
        summary = report.summary,
        rule = honorific_rule(speech.honorific_level),
        endings = join_or_none(&speech.endings),
        nicknames = join_or_none(&profile.nickname_rules),
        topics = join_or_none(&profile.favorite_topics),
        taboos = join_or_none(&profile.taboo_topics),
        patterns = join_or_none(&profile.typical_patterns),
        avg_len = signature.average_length,
        ending_hint = join_or_none(&signature.top_endings),
        token_hint = join_or_none(&signature.top_tokens),
        style_text = bullets_or_none(style_examples),
        dialog_text = pairs_or_none(dialog_examples),
        few_shot_text = pairs_or_none(&few_shot),
    )
}

/// Minimal instruction when no persona is available, optionally naming the
/// speaker the reply should identify as.
pub fn build_base_prompt(speaker_name: Option<&str>) -> String {
    match speaker_name {
        Some(name) => format!("{}이름은 '{name}'이다.\n", base_system_prompt()),
        None => base_system_prompt().to_string(),
    }
}

/// Appendix added when retrieved context passed the distance gate.
pub fn context_appendix(context: &str) -> String {
    format!(
        "\n\n과거 대화에서 추출한 관련 컨텍스트:\n{context}\n\
         컨텍스트의 말투와 표현을 우선적으로 반영하세요."
    )
}

/// Instruction for the JSON persona-report completion.
pub fn report_instruction() -> &'static str {
    r#"채팅 로그를 분석해 페르소나 리포트를 생성하세요.
반드시 JSON 객체만 반환해야 하며, 다음 두 필드를 포함해야 합니다.
1. "summary": 성격과 관계를 요약한 텍스트
2. "profile": PersonaProfile 스키마와 동일한 JSON 객체
요약과 텍스트 항목은 한국어로 작성하세요.
관심 주제/자주 쓰는 표현은 대화 로그에서 실제로 등장한 단어/구절을 우선 사용하세요.
신조어/은어는 원문 그대로 유지하고, 임의로 표준어로 바꾸지 마세요.
관심 주제는 3~8개, 자주 쓰는 표현은 5~10개로 정리하세요.
단, honorific_level/emoji_usage/punctuation/response_length는 스키마 값 그대로 사용하세요.
{
  "nickname_rules": string[],
  "speech_style": {
    "endings": string[],
    "honorific_level": "informal" | "polite" | "mixed",
    "emoji_usage": "low" | "medium" | "high",
    "punctuation": "short" | "normal" | "many"
  },
  "favorite_topics": string[],
  "taboo_topics": string[],
  "response_length": "short" | "medium" | "long",
  "typical_patterns": string[],
  "few_shot_examples": [{"user": string, "persona": string}]
}"#
}

/// Render a lowercase serde enum value without quotes.
fn serde_plain<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}
