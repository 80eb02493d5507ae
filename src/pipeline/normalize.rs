//! Response normalization: untrusted provider text → validated [`QuestionSet`].
//!
//! Providers are told to answer with bare JSON, but replies routinely arrive
//! wrapped in markdown fences or framed by a sentence of commentary. The
//! normalizer recovers the payload in explicit stages, each a small function
//! tested on its own:
//!
//! ```text
//! raw ──► strip_fences ──► locate_payload ──► parse_payload ──► validate
//!                                                                 │
//!               resolve_topic + filter_map(validate_mcq / validate_short)
//! ```
//!
//! ## Salvage policy
//!
//! Individual question entries that lack required fields are dropped and
//! logged; the call still succeeds with whatever remains. A payload that
//! cannot be parsed, or a salvage that leaves both lists empty, is a hard
//! failure. There is no partial-success return path.

use crate::error::QuizError;
use crate::model::{Difficulty, Mcq, QuestionSet, ShortQuestion, DEFAULT_TOPIC};
use serde_json::{Map, Value};
use tracing::{debug, warn};

const FENCE: &str = "```";

/// Field name the prompt asks for.
const EXPECTED_POINTS: &str = "expected_points";
/// Alias some models emit instead of [`EXPECTED_POINTS`].
const EXPECTED_POINTS_ALIAS: &str = "expected_answer_points";

/// Normalize a raw provider reply into a [`QuestionSet`].
///
/// `topic_override`, when present and non-blank, wins over the topic the
/// provider detected.
pub fn normalize(raw: &str, topic_override: Option<&str>) -> Result<QuestionSet, QuizError> {
    let unfenced = strip_fences(raw);
    let candidate = locate_payload(unfenced)
        .ok_or_else(|| QuizError::malformed("no JSON object found in response", raw))?;
    let payload = parse_payload(candidate, raw)?;

    let topic = resolve_topic(topic_override, &payload);

    let mcqs: Vec<Mcq> = entries(&payload, "mcqs")
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let mcq = validate_mcq(entry);
            if mcq.is_none() {
                warn!(index, "Dropping MCQ entry without a question or options");
            }
            mcq
        })
        .collect();

    let short_questions: Vec<ShortQuestion> = entries(&payload, "short_questions")
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let short = validate_short(entry);
            if short.is_none() {
                warn!(index, "Dropping short-answer entry without a question");
            }
            short
        })
        .collect();

    if mcqs.is_empty() && short_questions.is_empty() {
        return Err(QuizError::NoQuestionsGenerated);
    }

    debug!(
        topic = %topic,
        mcqs = mcqs.len(),
        short_questions = short_questions.len(),
        "Normalized provider response"
    );

    Ok(QuestionSet {
        topic,
        mcqs,
        short_questions,
    })
}

// ── Stage 1: strip markdown fences ───────────────────────────────────────────

/// Trim the reply and remove a surrounding fenced code block, if any.
///
/// The opening fence line is dropped whatever language tag it carries. The
/// last line is dropped only when it is a bare closing fence.
pub fn strip_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if !text.starts_with(FENCE) {
        return text;
    }

    text = match text.split_once('\n') {
        Some((_, rest)) => rest,
        // Single-line block: "```{...}```"
        None => text.trim_start_matches('`'),
    };

    if let Some((body, last)) = text.rsplit_once('\n') {
        if last.trim() == FENCE {
            text = body;
        }
    } else if text.trim() == FENCE {
        text = "";
    }

    text.trim()
}

// ── Stage 2: locate the payload ──────────────────────────────────────────────

/// Greedy span from the first `{` to the last `}`.
pub fn locate_payload(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

// ── Stage 3: parse ───────────────────────────────────────────────────────────

/// Parse the candidate as a JSON object.
///
/// `raw` is the untouched reply; a prefix of it goes into the error for
/// diagnostics.
pub fn parse_payload(candidate: &str, raw: &str) -> Result<Map<String, Value>, QuizError> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(QuizError::malformed("response payload is not a JSON object", raw)),
        Err(e) => Err(QuizError::malformed(format!("invalid JSON: {e}"), raw)),
    }
}

// ── Stage 4: validate ────────────────────────────────────────────────────────

/// Override if non-blank, else the parsed `topic`, else [`DEFAULT_TOPIC`].
pub fn resolve_topic(topic_override: Option<&str>, payload: &Map<String, Value>) -> String {
    if let Some(t) = topic_override.map(str::trim).filter(|t| !t.is_empty()) {
        return t.to_string();
    }
    payload
        .get("topic")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_TOPIC)
        .to_string()
}

/// Keep an MCQ entry only if it is an object with a `question` and an
/// `options` field.
pub fn validate_mcq(entry: &Value) -> Option<Mcq> {
    let obj = entry.as_object()?;
    let question = question_text(obj)?;
    let options = obj.get("options")?;

    Some(Mcq {
        question,
        options: string_list(options),
        correct_answer: text_field(obj, "correct_answer"),
        explanation: text_field(obj, "explanation"),
    })
}

/// Keep a short-answer entry only if it is an object with a `question`.
pub fn validate_short(entry: &Value) -> Option<ShortQuestion> {
    let obj = entry.as_object()?;
    let question = question_text(obj)?;

    let expected_points = obj
        .get(EXPECTED_POINTS)
        .or_else(|| obj.get(EXPECTED_POINTS_ALIAS))
        .map(string_list)
        .unwrap_or_default();

    let difficulty = obj
        .get("difficulty")
        .and_then(Value::as_str)
        .and_then(Difficulty::parse)
        .unwrap_or_default();

    Some(ShortQuestion {
        question,
        expected_points,
        difficulty,
    })
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn entries<'a>(payload: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    match payload.get(key) {
        Some(Value::Array(items)) => items,
        Some(Value::Null) | None => &[],
        Some(_) => {
            warn!(field = key, "Expected a list of questions, ignoring field");
            &[]
        }
    }
}

fn question_text(obj: &Map<String, Value>) -> Option<String> {
    obj.get("question")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_string)
}

fn text_field(obj: &Map<String, Value>, key: &str) -> String {
    match obj.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn string_list(value: &Value) -> Vec<String> {
    let Value::Array(items) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        })
        .collect()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const VALID: &str = r#"{
        "topic": "Photosynthesis",
        "mcqs": [
            {
                "question": "Where does photosynthesis occur?",
                "options": ["A) Mitochondria", "B) Chloroplast", "C) Nucleus", "D) Ribosome"],
                "correct_answer": "B",
                "explanation": "Chloroplasts contain chlorophyll."
            }
        ],
        "short_questions": [
            {
                "question": "Name the two stages of photosynthesis.",
                "expected_points": ["Light reactions", "Calvin cycle"],
                "difficulty": "easy"
            }
        ]
    }"#;

    // ── strip_fences ──

    #[test]
    fn test_strip_fences_with_language_tag() {
        assert_eq!(strip_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn test_strip_fences_without_tag() {
        assert_eq!(strip_fences("  ```\n{}\n```  "), "{}");
    }

    #[test]
    fn test_strip_fences_leaves_plain_text() {
        assert_eq!(strip_fences("  {\"a\":1}\n"), "{\"a\":1}");
    }

    #[test]
    fn test_strip_fences_missing_closing_fence() {
        assert_eq!(strip_fences("```json\n{\"a\":1}"), "{\"a\":1}");
    }

    // ── locate_payload ──

    #[test]
    fn test_locate_payload_ignores_commentary() {
        let text = "Sure! Here you go:\n{\"a\": {\"b\": 1}}\nHope this helps.";
        assert_eq!(locate_payload(text), Some("{\"a\": {\"b\": 1}}"));
    }

    #[test]
    fn test_locate_payload_none_without_braces() {
        assert_eq!(locate_payload("no json here"), None);
        assert_eq!(locate_payload("} backwards {"), None);
    }

    // ── parse_payload ──

    #[test]
    fn test_parse_payload_rejects_invalid_json() {
        let err = parse_payload("{not json}", "raw reply").unwrap_err();
        match err {
            QuizError::MalformedResponse { excerpt, .. } => assert_eq!(excerpt, "raw reply"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_parse_payload_rejects_non_object() {
        assert!(matches!(
            parse_payload("[1, 2]", "[1, 2]"),
            Err(QuizError::MalformedResponse { .. })
        ));
    }

    // ── resolve_topic ──

    #[test]
    fn test_resolve_topic_precedence() {
        let payload = json!({"topic": "Biology"});
        let map = payload.as_object().unwrap();
        assert_eq!(resolve_topic(Some("Chemistry"), map), "Chemistry");
        assert_eq!(resolve_topic(Some("   "), map), "Biology");
        assert_eq!(resolve_topic(None, map), "Biology");
        assert_eq!(resolve_topic(None, &Map::new()), DEFAULT_TOPIC);
        let blank = json!({"topic": ""});
        assert_eq!(resolve_topic(None, blank.as_object().unwrap()), DEFAULT_TOPIC);
    }

    // ── validate_mcq / validate_short ──

    #[test]
    fn test_validate_mcq_requires_question_and_options() {
        assert!(validate_mcq(&json!({"options": ["x"]})).is_none());
        assert!(validate_mcq(&json!({"question": "Q?"})).is_none());
        assert!(validate_mcq(&json!({"question": "", "options": []})).is_none());
        assert!(validate_mcq(&json!("just a string")).is_none());
    }

    #[test]
    fn test_validate_mcq_coerces_fields() {
        let mcq = validate_mcq(&json!({
            "question": "Pick one",
            "options": ["a", 2, null, true],
            "correct_answer": 2,
        }))
        .unwrap();
        assert_eq!(mcq.options, vec!["a", "2", "true"]);
        assert_eq!(mcq.correct_answer, "2");
        assert_eq!(mcq.explanation, "");
    }

    #[test]
    fn test_validate_mcq_non_array_options_become_empty() {
        let mcq = validate_mcq(&json!({"question": "Q?", "options": "A, B"})).unwrap();
        assert!(mcq.options.is_empty());
    }

    #[test]
    fn test_validate_short_alias_and_difficulty() {
        let short = validate_short(&json!({
            "question": "Explain osmosis.",
            "expected_answer_points": ["water", "membrane"],
            "difficulty": "HARD"
        }))
        .unwrap();
        assert_eq!(short.expected_points, vec!["water", "membrane"]);
        assert_eq!(short.difficulty, Difficulty::Hard);

        let short = validate_short(&json!({"question": "Q?", "difficulty": "brutal"})).unwrap();
        assert_eq!(short.difficulty, Difficulty::Medium);
        assert!(short.expected_points.is_empty());
    }

    #[test]
    fn test_validate_short_prefers_primary_field() {
        let short = validate_short(&json!({
            "question": "Q?",
            "expected_points": ["primary"],
            "expected_answer_points": ["alias"]
        }))
        .unwrap();
        assert_eq!(short.expected_points, vec!["primary"]);
    }

    // ── normalize ──

    #[test]
    fn test_normalize_valid_payload() {
        let set = normalize(VALID, None).unwrap();
        assert_eq!(set.topic, "Photosynthesis");
        assert_eq!(set.mcqs.len(), 1);
        assert_eq!(set.mcqs[0].correct_answer, "B");
        assert_eq!(set.short_questions[0].difficulty, Difficulty::Easy);
    }

    #[test]
    fn test_fenced_payload_equals_unwrapped() {
        let fenced = format!("```json\n{VALID}\n```");
        assert_eq!(normalize(&fenced, None).unwrap(), normalize(VALID, None).unwrap());
    }

    #[test]
    fn test_commentary_around_payload_is_tolerated() {
        let framed = format!("Here are your questions:\n\n{VALID}\n\nGood luck!");
        assert_eq!(normalize(&framed, None).unwrap(), normalize(VALID, None).unwrap());
    }

    #[test]
    fn test_missing_optional_fields_get_defaults() {
        let raw = r#"{"topic":"Math","mcqs":[{"question":"2+2?","options":["3","4"]}],"short_questions":[]}"#;
        let set = normalize(raw, None).unwrap();
        assert_eq!(set.topic, "Math");
        assert_eq!(set.mcqs.len(), 1);
        assert_eq!(set.mcqs[0].correct_answer, "");
        assert_eq!(set.mcqs[0].explanation, "");
        assert!(set.short_questions.is_empty());
    }

    #[test]
    fn test_all_entries_dropped_is_no_questions() {
        let raw = r#"{"mcqs":[{"options":["x"]}],"short_questions":[]}"#;
        assert!(matches!(normalize(raw, None), Err(QuizError::NoQuestionsGenerated)));
    }

    #[test]
    fn test_partial_salvage_keeps_valid_entries() {
        let raw = r#"{
            "mcqs": [
                {"question": "Good?", "options": ["y", "n"]},
                {"options": ["orphan"]},
                42
            ],
            "short_questions": [{"difficulty": "easy"}, {"question": "Why?"}]
        }"#;
        let set = normalize(raw, None).unwrap();
        assert_eq!(set.mcqs.len(), 1);
        assert_eq!(set.short_questions.len(), 1);
        assert_eq!(set.short_questions[0].question, "Why?");
        assert_eq!(set.topic, DEFAULT_TOPIC);
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(
            normalize("I'm sorry, I can't help with that.", None),
            Err(QuizError::MalformedResponse { .. })
        ));
        assert!(matches!(
            normalize("{ this is : not json }", None),
            Err(QuizError::MalformedResponse { .. })
        ));
        assert!(matches!(normalize("", None), Err(QuizError::MalformedResponse { .. })));
    }

    #[test]
    fn test_topic_override_wins() {
        let set = normalize(VALID, Some("Plant Biology")).unwrap();
        assert_eq!(set.topic, "Plant Biology");
    }

    #[test]
    fn test_non_list_sections_are_treated_as_empty() {
        let raw = r#"{"mcqs": "none", "short_questions": [{"question": "Q?"}]}"#;
        let set = normalize(raw, None).unwrap();
        assert!(set.mcqs.is_empty());
        assert_eq!(set.short_questions.len(), 1);
    }
}
