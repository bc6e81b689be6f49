use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::{Serialize, Serializer};

use crate::transform::{TargetFormat, TransformResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionChoice {
    RemoveBackground,
    ConvertFormat,
}

impl ActionChoice {
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "remove-background" => Some(Self::RemoveBackground),
            "convert-format" => Some(Self::ConvertFormat),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::RemoveBackground => "remove-background",
            Self::ConvertFormat => "convert-format",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    Action,
    Format,
}

/// What the renderer is asked to display, in emission order. Result bytes are
/// base64 so the event stream stays plain JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PresentationEvent {
    Message {
        text: String,
    },
    TypingIndicator,
    ActionPrompt {
        prompt: PromptKind,
        choices: Vec<String>,
    },
    TransformReady {
        file_name: String,
        mime_type: String,
        #[serde(serialize_with = "as_base64")]
        bytes: Vec<u8>,
    },
}

impl PresentationEvent {
    pub fn message(text: impl Into<String>) -> Self {
        Self::Message { text: text.into() }
    }

    pub fn action_prompt() -> Self {
        Self::ActionPrompt {
            prompt: PromptKind::Action,
            choices: vec![
                String::from(ActionChoice::RemoveBackground.as_str()),
                String::from(ActionChoice::ConvertFormat.as_str()),
            ],
        }
    }

    pub fn format_prompt() -> Self {
        Self::ActionPrompt {
            prompt: PromptKind::Format,
            choices: TargetFormat::PROMPT_CHOICES
                .iter()
                .map(|format| String::from(format.token()))
                .collect(),
        }
    }

    pub fn transform_ready(result: TransformResult) -> Self {
        Self::TransformReady {
            file_name: result.file_name,
            mime_type: result.mime_type,
            bytes: result.bytes,
        }
    }
}

fn as_base64<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(BASE64_STANDARD.encode(bytes).as_str())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn action_choice_round_trips_through_its_token() {
        assert_eq!(
            ActionChoice::parse("remove-background"),
            Some(ActionChoice::RemoveBackground)
        );
        assert_eq!(
            ActionChoice::parse(" Convert-Format "),
            Some(ActionChoice::ConvertFormat)
        );
        assert_eq!(ActionChoice::parse("upscale"), None);
    }

    #[test]
    fn prompts_list_the_offered_choices_in_order() {
        let action = serde_json::to_value(PresentationEvent::action_prompt())
            .expect("event should serialize");
        assert_eq!(action["type"], json!("action_prompt"));
        assert_eq!(action["prompt"], json!("action"));
        assert_eq!(
            action["choices"],
            json!(["remove-background", "convert-format"])
        );

        let format = serde_json::to_value(PresentationEvent::format_prompt())
            .expect("event should serialize");
        assert_eq!(format["prompt"], json!("format"));
        assert_eq!(format["choices"], json!(["png", "jpg", "webp", "gif"]));
    }

    #[test]
    fn transform_ready_serializes_bytes_as_base64() {
        let event = PresentationEvent::transform_ready(TransformResult {
            bytes: vec![1, 2, 3],
            mime_type: String::from("image/png"),
            file_name: String::from("photo_nobg.png"),
        });
        let value = serde_json::to_value(event).expect("event should serialize");
        assert_eq!(value["type"], json!("transform_ready"));
        assert_eq!(value["file_name"], json!("photo_nobg.png"));
        assert_eq!(value["mime_type"], json!("image/png"));
        assert_eq!(value["bytes"], json!("AQID"));
    }
}
