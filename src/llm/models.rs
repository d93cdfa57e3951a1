//! Request and structured response types for chat completions

use super::LlmError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Named JSON schema the model must answer with
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseFormat {
    pub name: String,
    pub schema: Value,
}

/// One system + user exchange sent to the model
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub temperature: Option<f32>,
    pub max_completion_tokens: Option<u32>,
    pub response_format: Option<ResponseFormat>,
}

impl ChatRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature: None,
            max_completion_tokens: None,
            response_format: None,
        }
    }

    /// Ask for a response shaped like `T`
    pub fn expecting<T: StructuredOutput>(mut self) -> Self {
        self.response_format = Some(ResponseFormat {
            name: T::NAME.to_string(),
            schema: T::schema(),
        });
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_completion_tokens(mut self, max_tokens: u32) -> Self {
        self.max_completion_tokens = Some(max_tokens);
        self
    }
}

/// A typed model answer with a JSON schema
pub trait StructuredOutput: DeserializeOwned {
    const NAME: &'static str;

    fn schema() -> Value;

    fn parse(content: &str) -> Result<Self, LlmError> {
        serde_json::from_str(content).map_err(|e| LlmError::Parse {
            expected: Self::NAME,
            message: e.to_string(),
        })
    }
}

fn object_schema(field: &str, field_schema: Value) -> Value {
    json!({
        "type": "object",
        "properties": { field: field_schema },
        "required": [field],
        "additionalProperties": false,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summarization {
    pub summary: String,
}

impl StructuredOutput for Summarization {
    const NAME: &'static str = "summarization";

    fn schema() -> Value {
        object_schema("summary", json!({ "type": "string" }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordExtraction {
    pub keywords: Vec<String>,
}

impl StructuredOutput for KeywordExtraction {
    const NAME: &'static str = "keyword_extraction";

    fn schema() -> Value {
        object_schema(
            "keywords",
            json!({ "type": "array", "items": { "type": "string" } }),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationsAndDates {
    pub locations_dates: Vec<String>,
}

impl StructuredOutput for LocationsAndDates {
    const NAME: &'static str = "locations_and_dates";

    fn schema() -> Value {
        object_schema(
            "locations_dates",
            json!({ "type": "array", "items": { "type": "string" } }),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainTopic {
    pub main_topic: String,
}

impl StructuredOutput for MainTopic {
    const NAME: &'static str = "main_topic";

    fn schema() -> Value {
        object_schema("main_topic", json!({ "type": "string" }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub country: String,
}

impl StructuredOutput for Country {
    const NAME: &'static str = "country";

    fn schema() -> Value {
        object_schema("country", json!({ "type": "string" }))
    }
}

// OpenAI-compatible wire types
#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<WireResponseFormat<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct WireResponseFormat<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub json_schema: WireJsonSchema<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct WireJsonSchema<'a> {
    pub name: &'a str,
    pub strict: bool,
    pub schema: &'a Value,
}

impl<'a> ChatCompletionRequest<'a> {
    pub fn from_request(model: &'a str, request: &'a ChatRequest) -> Self {
        Self {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            max_completion_tokens: request.max_completion_tokens,
            temperature: request.temperature,
            response_format: request.response_format.as_ref().map(|format| {
                WireResponseFormat {
                    kind: "json_schema",
                    json_schema: WireJsonSchema {
                        name: &format.name,
                        strict: true,
                        schema: &format.schema,
                    },
                }
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub refusal: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_summarization() {
        let parsed = Summarization::parse(r#"{"summary":"three events"}"#).unwrap();
        assert_eq!(parsed.summary, "three events");
    }

    #[test]
    fn test_parse_failure_names_expected_shape() {
        let err = KeywordExtraction::parse(r#"{"summary":"wrong shape"}"#).unwrap_err();
        match err {
            LlmError::Parse { expected, .. } => assert_eq!(expected, "keyword_extraction"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_schema_is_strict_object() {
        let schema = LocationsAndDates::schema();
        assert_eq!(schema["additionalProperties"], json!(false));
        assert_eq!(schema["required"], json!(["locations_dates"]));
    }

    #[test]
    fn test_wire_request_shape() {
        let request = ChatRequest::new("sys", "user")
            .expecting::<Country>()
            .with_temperature(0.5);
        let wire = ChatCompletionRequest::from_request("gpt-4o-mini", &request);
        let body = serde_json::to_value(&wire).unwrap();
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "user");
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["name"], "country");
        assert!(body.get("max_completion_tokens").is_none());
    }
}
