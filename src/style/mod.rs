//! Unsupervised style extraction over parsed turns.
//!
//! Everything here is a pure function of the turn list: a style signature
//! (length, endings, frequent tokens), automatic keywords and phrases, and
//! real example utterances/exchanges used to ground the persona prompt.
//!
//! All extraction strips emoji code points first. ASCII emoticons (";;",
//! "^^", "ㅠㅠ") survive because they sit outside the pictograph ranges.

use crate::model::{FewShotExample, StyleSignature, Turn};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Unicode pictograph/symbol ranges. Deliberately narrow: Hangul jamo
/// emoticons and ASCII faces must survive.
static EMOJI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\u{1F300}-\u{1FAFF}\u{2700}-\u{27BF}\u{2600}-\u{26FF}]+").unwrap()
});

/// Script-aware token pattern: Hangul syllables/jamo, Latin, digits.
static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[가-힣ㄱ-ㅎㅏ-ㅣA-Za-z0-9]+").unwrap());

static TRAILING_QUOTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[\\s\"'\u{201C}\u{201D}\u{2018}\u{2019}]+$").unwrap());

static TRAILING_PUNCT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?…]+$").unwrap());

/// Strip emoji code points, keeping emoticons intact.
pub fn sanitize_no_emoji(text: &str) -> String {
    EMOJI.replace_all(text, "").into_owned()
}

/// Frequency counter that ranks by descending count with ties broken by
/// first-seen order, so identical input always yields identical output.
#[derive(Default)]
struct FreqCounter {
    entries: HashMap<String, (usize, usize)>,
    inserted: usize,
}

impl FreqCounter {
    fn add(&mut self, key: String) {
        let next = self.inserted;
        let entry = self.entries.entry(key).or_insert_with(|| {
            (0, next)
        });
        entry.0 += 1;
        if entry.1 == next {
            self.inserted += 1;
        }
    }

    fn count(&self, key: &str) -> usize {
        self.entries.get(key).map(|(c, _)| *c).unwrap_or(0)
    }

    /// All keys with counts, most frequent first, stable on ties.
    fn ranked(&self) -> Vec<(String, usize)> {
        let mut items: Vec<(&String, usize, usize)> = self
            .entries
            .iter()
            .map(|(k, &(count, first))| (k, count, first))
            .collect();
        items.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
        items
            .into_iter()
            .map(|(k, count, _)| (k.clone(), count))
            .collect()
    }
}

fn clean_text(turn: &Turn) -> Option<String> {
    let text = sanitize_no_emoji(&turn.text);
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn normalize_token(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn is_valid_keyword(token: &str) -> bool {
    char_len(token) >= 2 && !token.chars().all(|c| c.is_ascii_digit())
}

// ---------------------------------------------------------------------------
// Style signature
// ---------------------------------------------------------------------------

/// Compute the speaker's style signature: integer mean message length,
/// top-5 sentence endings, top-6 tokens.
pub fn style_signature(turns: &[Turn]) -> StyleSignature {
    let mut lengths: Vec<usize> = Vec::new();
    let mut endings = FreqCounter::default();
    let mut tokens = FreqCounter::default();

    for turn in turns {
        let Some(text) = clean_text(turn) else {
            continue;
        };
        lengths.push(char_len(&text));

        // Endings: strip trailing quote/space runs, then punctuation runs,
        // then take the last 1-2 characters.
        let trimmed = TRAILING_QUOTES.replace(&text, "");
        let trimmed = TRAILING_PUNCT.replace(&trimmed, "");
        if !trimmed.is_empty() {
            let chars: Vec<char> = trimmed.chars().collect();
            let start = chars.len().saturating_sub(2);
            endings.add(chars[start..].iter().collect());
        }

        for m in TOKEN.find_iter(&text) {
            if char_len(m.as_str()) >= 2 {
                tokens.add(m.as_str().to_string());
            }
        }
    }

    let average_length = if lengths.is_empty() {
        0
    } else {
        lengths.iter().sum::<usize>() / lengths.len()
    };

    StyleSignature {
        average_length,
        top_endings: top_n(&endings, 5),
        top_tokens: top_n(&tokens, 6),
    }
}

fn top_n(counter: &FreqCounter, n: usize) -> Vec<String> {
    counter.ranked().into_iter().take(n).map(|(k, _)| k).collect()
}

// ---------------------------------------------------------------------------
// Keywords and phrases
// ---------------------------------------------------------------------------

/// Extract topical keywords from the corpus.
///
/// Each turn counts as one document. Once the corpus reaches 10 documents,
/// any token appearing in >= 70% of them is treated as a filler word and
/// dropped. Tokens must occur at least twice overall.
pub fn auto_keywords(turns: &[Turn], max_terms: usize) -> Vec<String> {
    let mut counts = FreqCounter::default();
    let mut docs = FreqCounter::default();
    let mut total_docs = 0usize;

    for turn in turns {
        let Some(text) = clean_text(turn) else {
            continue;
        };
        total_docs += 1;

        let mut seen_here: Vec<String> = Vec::new();
        for m in TOKEN.find_iter(&text) {
            let token = normalize_token(m.as_str());
            if !is_valid_keyword(&token) {
                continue;
            }
            if !seen_here.contains(&token) {
                seen_here.push(token.clone());
            }
            counts.add(token);
        }
        for token in seen_here {
            docs.add(token);
        }
    }

    if total_docs == 0 {
        return Vec::new();
    }

    let mut keywords = Vec::new();
    for (token, count) in counts.ranked() {
        let doc_ratio = docs.count(&token) as f64 / total_docs as f64;
        if total_docs >= 10 && doc_ratio >= 0.7 {
            continue;
        }
        if count < 2 {
            continue;
        }
        keywords.push(token);
        if keywords.len() >= max_terms {
            break;
        }
    }
    keywords
}

/// Extract recurring short phrases: contiguous 2-/3-gram windows over the
/// filtered token sequence, plus whole short messages (2..=40 chars).
pub fn auto_phrases(turns: &[Turn], max_items: usize) -> Vec<String> {
    let mut counter = FreqCounter::default();

    for turn in turns {
        let Some(text) = clean_text(turn) else {
            continue;
        };
        let tokens: Vec<String> = TOKEN
            .find_iter(&text)
            .map(|m| normalize_token(m.as_str()))
            .filter(|t| is_valid_keyword(t))
            .collect();
        if tokens.len() >= 2 {
            for size in [2usize, 3] {
                if tokens.len() < size {
                    continue;
                }
                for window in tokens.windows(size) {
                    counter.add(window.join(" "));
                }
            }
        }
        let len = char_len(&text);
        if (2..=40).contains(&len) {
            counter.add(text.clone());
        }
    }

    counter
        .ranked()
        .into_iter()
        .take(max_items)
        .map(|(phrase, _)| phrase)
        .collect()
}

// ---------------------------------------------------------------------------
// Examples
// ---------------------------------------------------------------------------

/// Real utterances worth quoting in the prompt: 2..=160 characters,
/// de-duplicated, longest first (stable).
pub fn style_examples(turns: &[Turn], count: usize) -> Vec<String> {
    let mut texts: Vec<String> = Vec::new();
    for turn in turns {
        let Some(text) = clean_text(turn) else {
            continue;
        };
        if (2..=160).contains(&char_len(&text)) && !texts.contains(&text) {
            texts.push(text);
        }
    }
    texts.sort_by_key(|t| std::cmp::Reverse(char_len(t)));
    texts.truncate(count);
    texts
}

/// Real (prompt, reply) exchanges: adjacent turn pairs where the reply is
/// by `target_speaker` and the prompt is by someone else. De-duplicated by
/// exact text pair.
pub fn dialog_examples(turns: &[Turn], target_speaker: &str, count: usize) -> Vec<FewShotExample> {
    let mut examples: Vec<FewShotExample> = Vec::new();

    for pair in turns.windows(2) {
        let (prev, msg) = (&pair[0], &pair[1]);
        if msg.speaker != target_speaker || prev.speaker == target_speaker {
            continue;
        }
        let user = sanitize_no_emoji(&prev.text).trim().to_string();
        let persona = sanitize_no_emoji(&msg.text).trim().to_string();
        if user.is_empty() || persona.is_empty() {
            continue;
        }
        let example = FewShotExample { user, persona };
        if examples.contains(&example) {
            continue;
        }
        examples.push(example);
        if examples.len() >= count {
            break;
        }
    }
    examples
}
