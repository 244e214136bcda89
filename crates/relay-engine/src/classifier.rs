//! Decide which worker events a human should see, and render them.
//!
//! Only two kinds of event are ever surfaced: interactive follow-up questions
//! and completion results. Everything else the worker streams (reasoning,
//! tool output, API bookkeeping) is noise for the chat.

use std::borrow::Cow;

use serde::Deserialize;
use serde_json::Value;

use relay_protocol::names::{ASK_FOLLOWUP, SAY_COMPLETION_RESULT};
use relay_protocol::WorkerEvent;

/// `say` categories that never reach the chat.
const NOISE: [&str; 6] = [
    "user_feedback",
    "reasoning",
    "api_req_started",
    "api_req_finished",
    "command_output",
    "text",
];

/// Case-sensitive substrings that mark provider rate-limit chatter.
const RATE_LIMIT_MARKERS: [&str; 2] = ["rate limiting", "rate limit"];

const QUESTION_MARKER: &str = "\u{2753} **Question:**"; // ❓
const RAW_QUESTION_MARKER: &str = "\u{2754} **Question:**"; // ❔
const COMPLETION_MARKER: &str = "\u{2705}"; // ✅
const CHOICES_HEADER: &str = "**Please choose an option:**";

/// A worker event rendered for the chat.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMessage {
    pub text: String,
    pub is_question: bool,
    pub suggestions: Vec<Suggestion>,
}

/// One suggested answer to a follow-up question.
///
/// The worker normally sends a bare string or a `{label, answer}` object;
/// any other JSON value is shown as written.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Suggestion {
    Plain(String),
    Labeled {
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        answer: Option<String>,
    },
    Other(Value),
}

impl Suggestion {
    /// Text shown to the user: the label, falling back to the answer.
    pub fn display(&self) -> Cow<'_, str> {
        match self {
            Suggestion::Plain(s) => Cow::Borrowed(s),
            Suggestion::Labeled { label, answer } => Cow::Borrowed(
                non_empty(label)
                    .or_else(|| non_empty(answer))
                    .unwrap_or(""),
            ),
            Suggestion::Other(value) => scalar_text(value),
        }
    }
}

/// Render a loosely typed JSON value as plain text; `null` renders empty.
fn scalar_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::Null => Cow::Borrowed(""),
        Value::String(s) => Cow::Borrowed(s),
        other => Cow::Owned(other.to_string()),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Why an event was not surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suppression {
    /// Not an `event` frame named `message`.
    NotAMessage,
    EmptyMessage,
    Noise,
    RateLimited,
    /// A message, but neither a follow-up nor a completion result.
    Unsurfaced,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Suppressed(Suppression),
    Surface(NormalizedMessage),
}

/// Body of a follow-up question: `{"question": "...", "suggest": [...]}`.
#[derive(Debug, Deserialize)]
struct Followup {
    #[serde(default)]
    question: Option<Value>,
    #[serde(default)]
    suggest: Option<Vec<Suggestion>>,
}

/// Classify one worker event. Pure; rules are applied in order.
pub fn classify(event: &WorkerEvent) -> Classification {
    use Classification::Suppressed;

    if !event.is_message() {
        return Suppressed(Suppression::NotAMessage);
    }

    let Some(msg) = event.message().filter(|m| !m.is_empty()) else {
        return Suppressed(Suppression::EmptyMessage);
    };

    if msg.say.as_deref().is_some_and(|say| NOISE.contains(&say)) {
        return Suppressed(Suppression::Noise);
    }

    let text = msg.text();
    if RATE_LIMIT_MARKERS.iter().any(|m| text.contains(m)) {
        return Suppressed(Suppression::RateLimited);
    }

    if msg.ask.as_deref() == Some(ASK_FOLLOWUP) {
        // An absent body is treated as an empty question, not a parse failure.
        let body = msg.text.as_deref().unwrap_or("{}");
        return Classification::Surface(render_followup(body));
    }

    if msg.say.as_deref() == Some(SAY_COMPLETION_RESULT) && !text.trim().is_empty() {
        return Classification::Surface(NormalizedMessage {
            text: format!("{} {}", COMPLETION_MARKER, text),
            is_question: false,
            suggestions: Vec::new(),
        });
    }

    Suppressed(Suppression::Unsurfaced)
}

fn render_followup(body: &str) -> NormalizedMessage {
    let followup = match serde_json::from_str::<Followup>(body) {
        Ok(f) => f,
        Err(e) => {
            tracing::debug!(error = %e, "follow-up body is not structured, rendering raw");
            return NormalizedMessage {
                text: format!("{}\n{}", RAW_QUESTION_MARKER, body),
                is_question: true,
                suggestions: Vec::new(),
            };
        }
    };

    let suggestions = followup.suggest.unwrap_or_default();
    let question = followup.question.as_ref().map(scalar_text).unwrap_or_default();
    let mut text = format!("{}\n{}", QUESTION_MARKER, question);
    if !suggestions.is_empty() {
        text.push_str("\n\n");
        text.push_str(CHOICES_HEADER);
        for (i, choice) in suggestions.iter().enumerate() {
            text.push_str(&format!("\n\n{}. {}", i + 1, choice.display()));
        }
    }

    NormalizedMessage {
        text,
        is_question: true,
        suggestions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(message: serde_json::Value) -> WorkerEvent {
        serde_json::from_value(json!({
            "type": "event",
            "eventName": "message",
            "channelId": "1",
            "data": { "taskId": "t", "message": message }
        }))
        .unwrap()
    }

    fn surfaced(ev: &WorkerEvent) -> NormalizedMessage {
        match classify(ev) {
            Classification::Surface(m) => m,
            other => panic!("expected surfaced message, got {other:?}"),
        }
    }

    #[test]
    fn non_message_events_are_suppressed() {
        let ev: WorkerEvent = serde_json::from_value(json!({
            "type": "event", "eventName": "taskStarted", "data": { "taskId": "t" }
        }))
        .unwrap();
        assert_eq!(classify(&ev), Classification::Suppressed(Suppression::NotAMessage));

        let ev: WorkerEvent = serde_json::from_value(json!({
            "type": "connection", "eventName": "message"
        }))
        .unwrap();
        assert_eq!(classify(&ev), Classification::Suppressed(Suppression::NotAMessage));
    }

    #[test]
    fn missing_or_empty_message_is_suppressed() {
        assert_eq!(
            classify(&event(json!({}))),
            Classification::Suppressed(Suppression::EmptyMessage)
        );
        let ev: WorkerEvent = serde_json::from_value(json!({
            "type": "event", "eventName": "message", "data": {}
        }))
        .unwrap();
        assert_eq!(classify(&ev), Classification::Suppressed(Suppression::EmptyMessage));
    }

    #[test]
    fn noise_categories_are_suppressed() {
        for say in NOISE {
            let ev = event(json!({ "say": say, "text": "something" }));
            assert_eq!(
                classify(&ev),
                Classification::Suppressed(Suppression::Noise),
                "{say} should be noise"
            );
        }
    }

    #[test]
    fn rate_limit_text_is_suppressed_even_for_completions() {
        let ev = event(json!({ "say": "completion_result", "text": "hit the rate limit, waiting" }));
        assert_eq!(classify(&ev), Classification::Suppressed(Suppression::RateLimited));

        let ev = event(json!({ "say": "error", "text": "rate limiting in effect" }));
        assert_eq!(classify(&ev), Classification::Suppressed(Suppression::RateLimited));
    }

    #[test]
    fn rate_limit_match_is_case_sensitive() {
        let ev = event(json!({ "say": "completion_result", "text": "Rate Limit docs updated" }));
        assert_eq!(surfaced(&ev).text, "\u{2705} Rate Limit docs updated");
    }

    #[test]
    fn completion_result_gets_marker() {
        let msg = surfaced(&event(json!({ "say": "completion_result", "text": "All done." })));
        assert_eq!(msg.text, "\u{2705} All done.");
        assert!(!msg.is_question);
    }

    #[test]
    fn blank_completion_is_suppressed() {
        let ev = event(json!({ "say": "completion_result", "text": "  \n " }));
        assert_eq!(classify(&ev), Classification::Suppressed(Suppression::Unsurfaced));
    }

    #[test]
    fn other_categories_are_unsurfaced() {
        let ev = event(json!({ "say": "tool", "text": "{\"tool\":\"readFile\"}" }));
        assert_eq!(classify(&ev), Classification::Suppressed(Suppression::Unsurfaced));
        let ev = event(json!({ "ask": "command", "text": "npm test" }));
        assert_eq!(classify(&ev), Classification::Suppressed(Suppression::Unsurfaced));
    }

    #[test]
    fn followup_with_mixed_suggestions() {
        let body = json!({
            "question": "Which database?",
            "suggest": [
                "Postgres",
                { "label": "SQLite", "answer": "use sqlite" },
                { "answer": "MySQL please" }
            ]
        })
        .to_string();
        let msg = surfaced(&event(json!({ "ask": "followup", "text": body })));

        assert!(msg.is_question);
        assert_eq!(
            msg.text,
            "\u{2753} **Question:**\nWhich database?\n\n**Please choose an option:**\
             \n\n1. Postgres\n\n2. SQLite\n\n3. MySQL please"
        );
        assert_eq!(msg.suggestions.len(), 3);
        assert_eq!(
            msg.suggestions[1],
            Suggestion::Labeled {
                label: Some("SQLite".into()),
                answer: Some("use sqlite".into()),
            }
        );
        assert_eq!(msg.suggestions[2].display(), "MySQL please");
    }

    #[test]
    fn followup_without_suggestions_has_no_choice_list() {
        let body = json!({ "question": "Continue?" }).to_string();
        let msg = surfaced(&event(json!({ "ask": "followup", "text": body })));
        assert_eq!(msg.text, "\u{2753} **Question:**\nContinue?");
        assert!(msg.suggestions.is_empty());
    }

    #[test]
    fn loosely_typed_followup_still_renders_as_question() {
        let body = json!({ "question": "Pick", "suggest": [1, 2.5, true] }).to_string();
        let msg = surfaced(&event(json!({ "ask": "followup", "text": body })));
        assert_eq!(
            msg.text,
            "\u{2753} **Question:**\nPick\n\n**Please choose an option:**\
             \n\n1. 1\n\n2. 2.5\n\n3. true"
        );

        let body = json!({ "question": null, "suggest": null }).to_string();
        let msg = surfaced(&event(json!({ "ask": "followup", "text": body })));
        assert_eq!(msg.text, "\u{2753} **Question:**\n");
        assert!(msg.suggestions.is_empty());
    }

    #[test]
    fn malformed_followup_falls_back_to_raw_text() {
        let msg = surfaced(&event(json!({ "ask": "followup", "text": "{not json" })));
        assert_eq!(msg.text, "\u{2754} **Question:**\n{not json");
        assert!(msg.is_question);
    }

    #[test]
    fn non_object_followup_falls_back_to_raw_text() {
        let msg = surfaced(&event(json!({ "ask": "followup", "text": "\"just a string\"" })));
        assert!(msg.text.starts_with("\u{2754} **Question:**"));
    }
}
