//! Turn payload contract between the narrator and the model.
//!
//! The model is told to answer with a single JSON object carrying `plot`, `choices` and
//! `hidden`. Decoding checks shape only; the content of the plot and choices is the
//! model's business.

use crate::error::{malformed, SessionResult};
use crate::model::Turn;

/// Suffix appended to the configured base prompt.
pub const JSON_CONTRACT: &str = ". You MUST ALWAYS and ONLY respond with JSON. \
Your JSON object contains exactly the keys 'plot', 'choices', and 'hidden'. \
'plot' is a string of the story so far. \
'choices' is a list of strings, the choices the user can make next. \
'hidden' is a string of extra information to keep in mind when story telling \
that won't be displayed to the user.";

/// Returns the base prompt with the JSON reply contract appended.
pub fn build_system_prompt(base_prompt: &str) -> String {
    format!("{base_prompt}{JSON_CONTRACT}")
}

/// Parses a raw model reply into a [`Turn`].
pub fn decode(raw: &str) -> SessionResult<Turn> {
    serde_json::from_str(raw).map_err(malformed)
}

/// Serializes a turn back into the reply format the model is asked to produce.
pub fn encode(turn: &Turn) -> SessionResult<String> {
    serde_json::to_string(turn).map_err(malformed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NarratorError;

    #[test]
    fn decodes_knight_reply() {
        let raw = r#"{"plot": "You are a brave knight on a quest to rescue the captured princess from the dragon's castle.","choices": ["Approach the castle quietly", "Challenge the dragon to a duel"],"hidden": "Remember to stay focused and use your courage and cleverness to succeed in your quest."}"#;
        let turn = decode(raw).expect("decode");
        assert_eq!(turn.choices.len(), 2);
        assert_eq!(turn.choices[0], "Approach the castle quietly");
        assert_eq!(turn.choices[1], "Challenge the dragon to a duel");
        assert!(turn.hidden.starts_with("Remember to stay focused"));
    }

    #[test]
    fn rejects_prose() {
        let err = decode("Once upon a time...").expect_err("not json");
        assert!(matches!(err, NarratorError::MalformedTurn(_)));
    }

    #[test]
    fn rejects_wrong_types() {
        let err = decode(r#"{"plot":"X","choices":"A","hidden":"Y"}"#).expect_err("choices");
        assert!(matches!(err, NarratorError::MalformedTurn(_)));
    }

    #[test]
    fn system_prompt_keeps_base() {
        let prompt = build_system_prompt("Begin the story. Make it super short");
        assert!(prompt.starts_with("Begin the story. Make it super short. You MUST"));
        assert!(prompt.contains("'plot'"));
        assert!(prompt.contains("'choices'"));
        assert!(prompt.contains("'hidden'"));
    }
}
