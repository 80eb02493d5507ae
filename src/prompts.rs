//! Prompt text for question generation.
//!
//! Every string the provider sees lives here, so changing the output schema
//! or the tone of the instructions means editing one file. The builder in
//! [`crate::pipeline::prompt`] only substitutes values into the template.

/// Appended to source text cut at the character budget.
///
/// Part of the prompt only; never stored with the document.
pub const TRUNCATION_NOTICE: &str = "\n\n[Text truncated due to length...]";

/// Placeholders substituted by the prompt builder.
pub const MCQ_COUNT_SLOT: &str = "{mcq_count}";
pub const SHORT_COUNT_SLOT: &str = "{short_count}";
pub const SOURCE_TEXT_SLOT: &str = "{source_text}";

/// Question-generation prompt.
///
/// The JSON block is the boundary contract enforced by
/// [`crate::pipeline::normalize`]: field names and nesting must stay in sync
/// with it.
pub const GENERATION_PROMPT: &str = r#"You are an expert exam question generator for educational purposes.

Analyze the following study notes and write high-quality exam questions.

REQUIREMENTS:
1. Generate exactly {mcq_count} Multiple Choice Questions (MCQs)
2. Generate exactly {short_count} Short Answer Questions
3. Questions must test understanding, not just memorization
4. Every MCQ has exactly 4 options labelled A) to D)
5. Identify the main topic of the notes

OUTPUT FORMAT:
Respond ONLY with valid JSON matching this schema exactly:
{
    "topic": "Main Topic Name",
    "mcqs": [
        {
            "question": "The question text?",
            "options": ["A) First option", "B) Second option", "C) Third option", "D) Fourth option"],
            "correct_answer": "A",
            "explanation": "Brief explanation of why this is correct"
        }
    ],
    "short_questions": [
        {
            "question": "The short answer question?",
            "expected_points": ["Key point 1", "Key point 2"],
            "difficulty": "easy | medium | hard"
        }
    ]
}

STUDY NOTES:
{source_text}

Output ONLY the JSON object. Do NOT wrap it in markdown fences and do NOT add any text before or after it."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_has_every_slot_once() {
        for slot in [MCQ_COUNT_SLOT, SHORT_COUNT_SLOT, SOURCE_TEXT_SLOT] {
            assert_eq!(GENERATION_PROMPT.matches(slot).count(), 1, "{slot}");
        }
    }

    #[test]
    fn template_names_every_schema_field() {
        for field in [
            "\"topic\"",
            "\"mcqs\"",
            "\"options\"",
            "\"correct_answer\"",
            "\"explanation\"",
            "\"short_questions\"",
            "\"expected_points\"",
            "\"difficulty\"",
        ] {
            assert!(GENERATION_PROMPT.contains(field), "missing {field}");
        }
    }
}
