use serde::{Deserialize, Serialize};

use super::{ChatMessage, CompletionClient, CompletionError};

/// Question count for a quiz generated straight from a course/video link.
const COURSE_QUIZ_SIZE: usize = 10;
/// Question count for a quiz generated from a fetched transcript.
const TRANSCRIPT_QUIZ_SIZE: usize = 5;
/// Transcripts are clipped before prompting to keep the request bounded.
const TRANSCRIPT_CLIP_BYTES: usize = 6000;

const QUIZ_TEMPERATURE: f32 = 0.3;

/// One generated question: exactly four options, one of which is the
/// correct answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

#[derive(Deserialize)]
struct QuizPayload {
    #[serde(default)]
    questions: Vec<RawQuestion>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuestion {
    #[serde(default)]
    question: String,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default)]
    correct_answer: String,
}

/// Generate a quiz directly from a course or video link.
pub async fn generate_course_quiz(
    client: &CompletionClient,
    course_url: &str,
) -> Result<Vec<QuizQuestion>, CompletionError> {
    let prompt = build_course_prompt(course_url);
    let content = client
        .chat_structured(&[ChatMessage::user(prompt)], QUIZ_TEMPERATURE)
        .await?;
    parse_quiz_response(&content, COURSE_QUIZ_SIZE)
}

/// Generate a quiz from a fetched video transcript.
pub async fn generate_transcript_quiz(
    client: &CompletionClient,
    transcript: &str,
) -> Result<Vec<QuizQuestion>, CompletionError> {
    let excerpt = clip_to_char_boundary(transcript, TRANSCRIPT_CLIP_BYTES);
    let prompt = build_transcript_prompt(excerpt);
    let content = client
        .chat_structured(&[ChatMessage::user(prompt)], QUIZ_TEMPERATURE)
        .await?;
    parse_quiz_response(&content, TRANSCRIPT_QUIZ_SIZE)
}

fn build_course_prompt(course_url: &str) -> String {
    format!(
        "Generate a {COURSE_QUIZ_SIZE}-question quiz based on this course/video: {course_url}.\n\
         Requirements:\n\
         1. Questions should cover key concepts\n\
         2. Each question must have 4 options\n\
         3. Clearly mark the correct answer\n\
         4. Format as valid JSON\n\n\
         You MUST return valid JSON with this exact structure:\n\
         {{\n  \"questions\": [\n    {{\n      \"question\": \"What is...?\",\n      \
         \"options\": [\"A\", \"B\", \"C\", \"D\"],\n      \"correctAnswer\": \"A\"\n    }}\n  ]\n}}\n\n\
         Return ONLY the JSON object, without markdown or code fences."
    )
}

fn build_transcript_prompt(excerpt: &str) -> String {
    format!(
        "Generate a {TRANSCRIPT_QUIZ_SIZE}-question quiz in JSON format based on this video \
         transcript:\n{excerpt}\n\n\
         You MUST return valid JSON with this exact structure:\n\
         {{\n  \"questions\": [\n    {{\n      \"question\": \"What is...?\",\n      \
         \"options\": [\"A\", \"B\", \"C\", \"D\"],\n      \"correctAnswer\": \"A\"\n    }}\n  ]\n}}\n\n\
         Important requirements:\n\
         - Return ONLY the JSON object\n\
         - Don't include markdown or code fences\n\
         - Each question must have exactly 4 options\n\
         - Mark the correct answer clearly"
    )
}

/// Parse a structured quiz response. The service is asked for bare JSON but
/// models still wrap it in code fences now and then, so those are stripped
/// first. Questions failing validation are discarded; an entirely unusable
/// response is an error, never a partial result.
fn parse_quiz_response(content: &str, limit: usize) -> Result<Vec<QuizQuestion>, CompletionError> {
    let cleaned = strip_format_markers(content);

    let payload: QuizPayload = serde_json::from_str(cleaned)
        .map_err(|err| CompletionError::Malformed(err.to_string()))?;

    let questions: Vec<QuizQuestion> = payload
        .questions
        .into_iter()
        .filter_map(normalize_question)
        .take(limit)
        .collect();

    if questions.is_empty() {
        return Err(CompletionError::Malformed(
            "response contained no usable questions".into(),
        ));
    }

    Ok(questions)
}

fn normalize_question(raw: RawQuestion) -> Option<QuizQuestion> {
    let question = raw.question.trim().to_string();
    let correct_answer = raw.correct_answer.trim().to_string();
    let options: Vec<String> = raw
        .options
        .iter()
        .map(|option| option.trim().to_string())
        .collect();

    if question.is_empty() || correct_answer.is_empty() {
        return None;
    }
    if options.len() != 4 || options.iter().any(String::is_empty) {
        return None;
    }
    if !options.contains(&correct_answer) {
        return None;
    }

    Some(QuizQuestion {
        question,
        options,
        correct_answer,
    })
}

/// Strip leading/trailing code fences (with or without a language tag).
fn strip_format_markers(content: &str) -> &str {
    let mut trimmed = content.trim();

    if let Some(rest) = trimmed.strip_prefix("```") {
        // Drop the fence line, language tag included.
        trimmed = match rest.split_once('\n') {
            Some((_, body)) => body,
            None => rest,
        };
        trimmed = trimmed.trim_end();
        if let Some(body) = trimmed.strip_suffix("```") {
            trimmed = body;
        }
    }

    trimmed.trim()
}

fn clip_to_char_boundary(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut cut = max_bytes;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    &text[..cut]
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_RESPONSE: &str = r#"{
        "questions": [
            {
                "question": " What is Rust? ",
                "options": ["A language", "A fungus", "Both", "Neither "],
                "correctAnswer": "Both"
            },
            {
                "question": "What is cargo?",
                "options": ["A ship", "A build tool", "A crate", "A test"],
                "correctAnswer": "A build tool"
            }
        ]
    }"#;

    #[test]
    fn parses_and_trims_valid_questions() {
        let questions = parse_quiz_response(VALID_RESPONSE, 10).expect("valid quiz");
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].question, "What is Rust?");
        assert_eq!(questions[0].options[3], "Neither");
        assert_eq!(questions[1].correct_answer, "A build tool");
    }

    #[test]
    fn strips_code_fences_before_parsing() {
        let fenced = format!("```json\n{VALID_RESPONSE}\n```");
        let questions = parse_quiz_response(&fenced, 10).expect("fenced quiz");
        assert_eq!(questions.len(), 2);

        let bare_fence = format!("```\n{VALID_RESPONSE}\n```");
        assert!(parse_quiz_response(&bare_fence, 10).is_ok());
    }

    #[test]
    fn discards_invalid_questions() {
        let mixed = r#"{
            "questions": [
                {"question": "Too few options?", "options": ["A", "B"], "correctAnswer": "A"},
                {"question": "", "options": ["A", "B", "C", "D"], "correctAnswer": "A"},
                {"question": "Answer missing?", "options": ["A", "B", "C", "D"], "correctAnswer": "E"},
                {"question": "Fine?", "options": ["A", "B", "C", "D"], "correctAnswer": "D"}
            ]
        }"#;

        let questions = parse_quiz_response(mixed, 10).expect("one survivor");
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].question, "Fine?");
    }

    #[test]
    fn rejects_unparseable_or_empty_responses() {
        assert!(matches!(
            parse_quiz_response("not json at all", 10),
            Err(CompletionError::Malformed(_))
        ));
        assert!(matches!(
            parse_quiz_response(r#"{"questions": []}"#, 10),
            Err(CompletionError::Malformed(_))
        ));
        assert!(matches!(
            parse_quiz_response(r#"{"unexpected": true}"#, 10),
            Err(CompletionError::Malformed(_))
        ));
    }

    #[test]
    fn truncates_to_the_requested_count() {
        let questions = parse_quiz_response(VALID_RESPONSE, 1).expect("truncated quiz");
        assert_eq!(questions.len(), 1);
    }

    #[test]
    fn clips_transcripts_on_char_boundaries() {
        let text = "é".repeat(10);
        let clipped = clip_to_char_boundary(&text, 5);
        assert_eq!(clipped, "éé");
        assert_eq!(clip_to_char_boundary("short", 100), "short");
    }
}
