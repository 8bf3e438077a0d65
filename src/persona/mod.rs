//! Persona report construction and repair.
//!
//! The generation provider returns a loosely-structured JSON object. Nothing
//! about it is trusted: [`normalize_report`] is a total repair pass over that
//! tagged tree that always yields a well-formed [`PersonaReport`], merging in
//! the locally extracted keywords/phrases and substituting a local summary
//! when the model's is empty. Re-normalizing a normalized report is a no-op.

use crate::error::{Error, Result};
use crate::model::{FewShotExample, PersonaProfile, PersonaReport, SpeechStyle, Turn};
use crate::prompt;
use crate::providers::{ChatMessage, GenerationProvider};
use crate::style;
use serde_json::Value;
use tracing::error;

/// Cap on favorite_topics after merging.
pub const MAX_TOPICS: usize = 8;
/// Cap on typical_patterns after merging.
pub const MAX_PATTERNS: usize = 10;
/// Only the tail of long transcripts is sent to the provider.
const REPORT_SAMPLE_TURNS: usize = 200;

/// Repair an arbitrary provider payload into a well-formed report.
///
/// Never fails: missing or malformed fields are replaced by typed defaults.
/// Idempotent for a fixed turn list.
pub fn normalize_report(raw: Value, turns: &[Turn]) -> PersonaReport {
    let data = unwrap_report(raw);

    let mut summary = match data.get("summary") {
        None | Some(Value::Null) => String::new(),
        Some(v) => stringify(v),
    };

    // The model sometimes nests the profile under a schema-name key.
    let profile_value = ["profile", "PersonaProfile", "persona_profile"]
        .iter()
        .find_map(|key| data.get(*key))
        .cloned()
        .unwrap_or(Value::Null);
    let mut profile = normalize_profile(&profile_value);

    merge_auto_extraction(&mut profile, turns);

    if summary.trim().is_empty() {
        summary = fallback_summary(turns);
    }

    PersonaReport { summary, profile }
}

/// Unwrap a `{"PersonaReport": {...}}` response wrapper if present.
fn unwrap_report(raw: Value) -> Value {
    match raw {
        Value::Object(mut map) => match map.remove("PersonaReport") {
            Some(inner @ Value::Object(_)) => inner,
            Some(other) => {
                map.insert("PersonaReport".to_string(), other);
                Value::Object(map)
            }
            None => Value::Object(map),
        },
        other => other,
    }
}

fn normalize_profile(value: &Value) -> PersonaProfile {
    let speech = value.get("speech_style");
    PersonaProfile {
        nickname_rules: normalize_list(value.get("nickname_rules")),
        speech_style: SpeechStyle {
            endings: normalize_list(speech.and_then(|s| s.get("endings"))),
            honorific_level: normalize_enum(speech.and_then(|s| s.get("honorific_level"))),
            emoji_usage: normalize_enum(speech.and_then(|s| s.get("emoji_usage"))),
            punctuation: normalize_enum(speech.and_then(|s| s.get("punctuation"))),
        },
        favorite_topics: normalize_list(value.get("favorite_topics")),
        taboo_topics: normalize_list(value.get("taboo_topics")),
        response_length: normalize_enum(value.get("response_length")),
        typical_patterns: normalize_list(value.get("typical_patterns")),
        few_shot_examples: normalize_few_shot(value.get("few_shot_examples")),
    }
}

/// Coerce a value to a list of strings: a bare string becomes a one-element
/// list, null entries are dropped, scalar entries are stringified, anything
/// else becomes empty.
fn normalize_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter(|item| !item.is_null())
            .map(stringify)
            .collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// Validate an enum field against its allowed set, falling back to the
/// documented default on anything out of set.
fn normalize_enum<T>(value: Option<&Value>) -> T
where
    T: serde::de::DeserializeOwned + Default,
{
    value
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default()
}

/// Keep only record-like entries carrying both `user` and `persona`.
fn normalize_few_shot(value: Option<&Value>) -> Vec<FewShotExample> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            let user = obj.get("user")?;
            let persona = obj.get("persona")?;
            Some(FewShotExample {
                user: stringify(user),
                persona: stringify(persona),
            })
        })
        .collect()
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Overlay automatically extracted keywords/phrases onto the profile.
///
/// When extraction found anything, it fully replaces the model-provided
/// topics/patterns; otherwise the model's values are deduplicated and capped.
pub fn merge_auto_extraction(profile: &mut PersonaProfile, turns: &[Turn]) {
    let auto_topics = style::auto_keywords(turns, MAX_TOPICS);
    if auto_topics.is_empty() {
        profile.favorite_topics = merge_keywords(&profile.favorite_topics, &auto_topics, MAX_TOPICS);
    } else {
        profile.favorite_topics = auto_topics;
    }

    let auto_patterns = style::auto_phrases(turns, MAX_PATTERNS);
    if auto_patterns.is_empty() {
        profile.typical_patterns =
            merge_keywords(&profile.typical_patterns, &auto_patterns, MAX_PATTERNS);
    } else {
        profile.typical_patterns = auto_patterns;
    }
}

/// Merge keyword candidates without duplicates, normalized and capped.
fn merge_keywords(primary: &[String], fallback: &[String], limit: usize) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    for item in primary.iter().chain(fallback) {
        let token = item.trim().to_lowercase();
        if token.chars().count() < 2 || token.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        if !merged.contains(&token) {
            merged.push(token);
        }
        if merged.len() >= limit {
            break;
        }
    }
    merged
}

/// Locally computed summary used when the provider gives none: turn count,
/// dominant speaker, mean length, last message preview.
pub fn fallback_summary(turns: &[Turn]) -> String {
    if turns.is_empty() {
        return "대화 로그가 비어 있어 요약할 수 없습니다.".to_string();
    }

    let mut speaker_counts: Vec<(String, usize)> = Vec::new();
    for turn in turns {
        match speaker_counts.iter_mut().find(|(name, _)| *name == turn.speaker) {
            Some((_, count)) => *count += 1,
            None => speaker_counts.push((turn.speaker.clone(), 1)),
        }
    }
    let (top_speaker, top_count) = speaker_counts
        .iter()
        .max_by_key(|(_, count)| *count)
        .map(|(name, count)| (name.clone(), *count))
        .unwrap_or_else(|| ("알 수 없음".to_string(), 0));

    let total = turns.len();
    let unique_speakers = speaker_counts.len();
    let avg_len = turns.iter().map(|t| t.text.chars().count()).sum::<usize>() / total.max(1);

    let last_text = turns[turns.len() - 1].text.trim();
    let last_preview = if last_text.chars().count() > 40 {
        let cut: String = last_text.chars().take(40).collect();
        format!("{cut}...")
    } else {
        last_text.to_string()
    };

    format!(
        "총 {total}건의 메시지와 {unique_speakers}명의 참여자가 확인되었습니다. \
         가장 많이 말한 사람은 {top_speaker}({top_count}건)이며 평균 메시지 길이는 약 {avg_len}자입니다. \
         마지막 메시지는 \"{last_preview}\" 입니다."
    )
}

/// Generate a persona report for the given turns.
///
/// The provider is asked for a JSON object and its answer is repaired with
/// [`normalize_report`]. Without a provider (or on provider failure) this
/// returns a local fallback report, unless `require_provider` is set, in
/// which case the failure propagates so the caller can fail the job.
pub async fn build_report(
    provider: Option<&dyn GenerationProvider>,
    turns: &[Turn],
    require_provider: bool,
) -> Result<PersonaReport> {
    let Some(provider) = provider else {
        if require_provider {
            return Err(Error::ProviderUnavailable);
        }
        return Ok(local_fallback_report(turns));
    };

    let sample_start = turns.len().saturating_sub(REPORT_SAMPLE_TURNS);
    let transcript: Vec<String> = turns[sample_start..]
        .iter()
        .map(|t| format!("{} {}: {}", t.timestamp, t.speaker, t.text))
        .collect();

    let messages = vec![
        ChatMessage::system(prompt::report_instruction()),
        ChatMessage::user(format!("대화 로그:\n{}", transcript.join("\n"))),
    ];

    match provider.complete_json(&messages).await {
        Ok(raw) => Ok(normalize_report(raw, turns)),
        Err(e) => {
            error!("persona report generation failed: {e}");
            if require_provider {
                Err(e)
            } else {
                Ok(local_fallback_report(turns))
            }
        }
    }
}

fn local_fallback_report(turns: &[Turn]) -> PersonaReport {
    PersonaReport {
        summary: format!("{} (로컬 요약)", fallback_summary(turns)),
        profile: PersonaProfile::default(),
    }
}
