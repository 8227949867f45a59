use async_trait::async_trait;
use bytes::Bytes;
use futures::{future, stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::llm::{ResponseFormat, ToolCall, ToolDefinition};
use crate::domain::{
    DomainError, FinishReason, LlmProvider, LlmRequest, LlmResponse, LlmStream, Message,
    MessageRole, StreamChunk, Usage,
};
use crate::infrastructure::http_client::HttpClientTrait;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

/// OpenAI-compatible chat completion provider
#[derive(Debug)]
pub struct OpenAiProvider<C: HttpClientTrait> {
    client: C,
    auth_header: String,
    base_url: String,
}

impl<C: HttpClientTrait> OpenAiProvider<C> {
    pub fn new(client: C, api_key: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, DEFAULT_OPENAI_BASE_URL)
    }

    pub fn with_base_url(
        client: C,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let auth_header = format!("Bearer {}", api_key.into());
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            client,
            auth_header,
            base_url,
        }
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn build_request(&self, model: &str, request: &LlmRequest) -> Value {
        let messages: Vec<OpenAiMessage> =
            request.messages.iter().map(OpenAiMessage::from_domain).collect();

        let mut body = serde_json::json!({
            "model": model,
            "messages": messages,
            "stream": request.stream,
        });

        if let Some(temp) = request.temperature {
            body["temperature"] = serde_json::json!(temp);
        }

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if request.has_tools() {
            let tools: Vec<OpenAiTool> = request.tools.iter().map(OpenAiTool::from_domain).collect();
            body["tools"] = serde_json::json!(tools);
        }

        if let Some(ref response_format) = request.response_format {
            body["response_format"] = match response_format {
                ResponseFormat::Text => serde_json::json!({"type": "text"}),
                ResponseFormat::JsonObject => serde_json::json!({"type": "json_object"}),
                ResponseFormat::JsonSchema { json_schema } => serde_json::json!({
                    "type": "json_schema",
                    "json_schema": {
                        "name": json_schema.name,
                        "strict": json_schema.strict,
                        "schema": json_schema.schema
                    }
                }),
            };
        }

        body
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("Authorization", self.auth_header.as_str()),
            ("Content-Type", "application/json"),
        ]
    }

    fn parse_response(&self, json: Value) -> Result<LlmResponse, DomainError> {
        let response: OpenAiResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::provider("openai", format!("Failed to parse response: {}", e))
        })?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::provider("openai", "No choices in response"))?;

        let content = choice.message.content.unwrap_or_default();
        let tool_calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .into_iter()
            .map(OpenAiToolCall::into_domain)
            .collect();

        let message = if tool_calls.is_empty() {
            Message::assistant(content)
        } else {
            Message::assistant_tool_calls(content, tool_calls)
        };

        let mut llm_response = LlmResponse::new(response.id, response.model, message);

        if let Some(reason) = choice.finish_reason {
            llm_response = llm_response.with_finish_reason(FinishReason::parse(&reason));
        }

        if let Some(usage) = response.usage {
            llm_response =
                llm_response.with_usage(Usage::new(usage.prompt_tokens, usage.completion_tokens));
        }

        Ok(llm_response)
    }
}

#[async_trait]
impl<C: HttpClientTrait> LlmProvider for OpenAiProvider<C> {
    async fn chat(&self, model: &str, request: LlmRequest) -> Result<LlmResponse, DomainError> {
        let mut req = request;
        req.stream = false;

        let url = self.chat_completions_url();
        let body = self.build_request(model, &req);
        let response = self.client.post_json(&url, self.headers(), &body).await?;

        self.parse_response(response)
    }

    async fn chat_stream(
        &self,
        model: &str,
        request: LlmRequest,
    ) -> Result<LlmStream, DomainError> {
        let mut req = request;
        req.stream = true;

        let url = self.chat_completions_url();
        let body = self.build_request(model, &req);
        let byte_stream = self
            .client
            .post_json_stream(&url, self.headers(), &body)
            .await?;

        let model = model.to_string();
        let chunks = byte_stream
            .scan(SseDecoder::default(), move |decoder, result: Result<Bytes, DomainError>| {
                let items: Vec<Result<StreamChunk, DomainError>> = match result {
                    Ok(bytes) => decoder
                        .push(&bytes)
                        .into_iter()
                        .filter_map(|data| parse_sse_data(&data, &model))
                        .collect(),
                    Err(e) => vec![Err(e)],
                };
                future::ready(Some(stream::iter(items)))
            })
            .flatten();

        Ok(Box::pin(chunks))
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

/// Reassembles server-sent event lines that may be split across network
/// chunks and yields the payload of each complete `data:` line.
#[derive(Debug, Default)]
struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\r', '\n']);

            if let Some(data) = line.strip_prefix("data:") {
                payloads.push(data.trim_start().to_string());
            }
        }

        payloads
    }
}

fn parse_sse_data(data: &str, model: &str) -> Option<Result<StreamChunk, DomainError>> {
    if data.trim() == "[DONE]" {
        return Some(Ok(
            StreamChunk::new("", model).with_finish_reason(FinishReason::Stop)
        ));
    }

    let chunk = match serde_json::from_str::<OpenAiStreamChunk>(data) {
        Ok(chunk) => chunk,
        Err(e) => {
            return Some(Err(DomainError::provider(
                "openai",
                format!("Failed to parse stream chunk: {}", e),
            )));
        }
    };

    let choice = chunk.choices.into_iter().next()?;
    let mut stream_chunk = StreamChunk::new(chunk.id, chunk.model.unwrap_or_default());

    if let Some(delta) = choice.delta.content {
        stream_chunk = stream_chunk.with_delta(delta);
    }

    if let Some(reason) = choice.finish_reason {
        stream_chunk = stream_chunk.with_finish_reason(FinishReason::parse(&reason));
    }

    Some(Ok(stream_chunk))
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<OpenAiToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl OpenAiMessage {
    fn from_domain(message: &Message) -> Self {
        let role = match message.role {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
        };

        let content = if message.has_tool_calls() && message.content.is_empty() {
            None
        } else {
            Some(message.content.clone())
        };

        Self {
            role,
            content,
            tool_calls: message
                .tool_calls
                .iter()
                .map(OpenAiToolCall::from_domain)
                .collect(),
            tool_call_id: message.tool_call_id.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct OpenAiTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: OpenAiFunctionDef,
}

#[derive(Debug, Serialize)]
struct OpenAiFunctionDef {
    name: String,
    description: String,
    parameters: Value,
}

impl OpenAiTool {
    fn from_domain(tool: &ToolDefinition) -> Self {
        Self {
            kind: "function",
            function: OpenAiFunctionDef {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.parameters.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: OpenAiFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiFunctionCall {
    name: String,
    /// JSON-encoded arguments object
    #[serde(default)]
    arguments: String,
}

fn function_kind() -> String {
    "function".to_string()
}

impl OpenAiToolCall {
    fn from_domain(call: &ToolCall) -> Self {
        Self {
            id: call.id.clone(),
            kind: function_kind(),
            function: OpenAiFunctionCall {
                name: call.name.clone(),
                arguments: call.arguments.to_string(),
            },
        }
    }

    fn into_domain(self) -> ToolCall {
        let arguments = if self.function.arguments.trim().is_empty() {
            serde_json::json!({})
        } else {
            serde_json::from_str(&self.function.arguments)
                .unwrap_or(Value::String(self.function.arguments))
        };

        ToolCall::new(self.id, self.function.name, arguments)
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    id: String,
    model: String,
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<OpenAiToolCall>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChunk {
    #[serde(default)]
    id: String,
    model: Option<String>,
    choices: Vec<OpenAiStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChoice {
    delta: OpenAiDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiDelta {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::ToolDefinition;
    use crate::infrastructure::http_client::mock::MockHttpClient;

    const TEST_URL: &str = "https://api.openai.com/v1/chat/completions";

    #[tokio::test]
    async fn test_openai_chat() {
        let mock_response = serde_json::json!({
            "id": "chatcmpl-123",
            "model": "gpt-4o-mini",
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "RAG"
                },
                "finish_reason": "stop"
            }],
            "usage": {
                "prompt_tokens": 10,
                "completion_tokens": 1,
                "total_tokens": 11
            }
        });

        let client = MockHttpClient::new().with_response(TEST_URL, mock_response);
        let provider = OpenAiProvider::new(client, "test-api-key");

        let request = LlmRequest::builder().user("How does auth work?").build();
        let response = provider.chat("gpt-4o-mini", request).await.unwrap();

        assert_eq!(response.id, "chatcmpl-123");
        assert_eq!(response.content(), "RAG");
        assert_eq!(response.finish_reason, Some(FinishReason::Stop));
        assert!(response.tool_calls().is_empty());

        let usage = response.usage.unwrap();
        assert_eq!(usage.total_tokens, 11);
    }

    #[tokio::test]
    async fn test_openai_tool_call_round_trip() {
        let mock_response = serde_json::json!({
            "id": "chatcmpl-tool",
            "model": "gpt-4o-mini",
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {"name": "list_documents", "arguments": "{}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        });

        let client = MockHttpClient::new().with_response(TEST_URL, mock_response);
        let provider = OpenAiProvider::new(client, "test-api-key");

        let request = LlmRequest::builder()
            .system("route")
            .user("What documents do you have?")
            .temperature(0.0)
            .tool(ToolDefinition::new("list_documents", "List docs"))
            .build();
        let response = provider.chat("gpt-4o-mini", request).await.unwrap();

        assert_eq!(response.finish_reason, Some(FinishReason::ToolCalls));
        assert_eq!(response.tool_calls().len(), 1);
        assert_eq!(response.tool_calls()[0].id, "call_abc");
        assert_eq!(response.tool_calls()[0].arguments, serde_json::json!({}));

        let body = provider.client.requests()[0].body.clone().unwrap();
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "list_documents");
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["stream"], false);
    }

    #[test]
    fn test_tool_messages_serialize_to_wire_format() {
        let client = MockHttpClient::new();
        let provider = OpenAiProvider::new(client, "k");
        let call = ToolCall::new("call_1", "list_documents", serde_json::json!({}));
        let request = LlmRequest::builder()
            .message(Message::assistant_tool_calls("", vec![call]))
            .message(Message::tool("call_1", "**Available NovaPay Documentation:**\n"))
            .build();

        let body = provider.build_request("gpt-4o-mini", &request);
        let assistant = &body["messages"][0];
        assert!(assistant["content"].is_null());
        assert_eq!(assistant["tool_calls"][0]["function"]["arguments"], "{}");

        let tool = &body["messages"][1];
        assert_eq!(tool["role"], "tool");
        assert_eq!(tool["tool_call_id"], "call_1");
    }

    #[test]
    fn test_json_schema_response_format() {
        let provider = OpenAiProvider::new(MockHttpClient::new(), "k");
        let request = LlmRequest::builder()
            .user("q")
            .json_schema("AnswerOutput", serde_json::json!({"type": "object"}))
            .build();

        let body = provider.build_request("gpt-4o-mini", &request);
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["name"], "AnswerOutput");
        assert_eq!(body["response_format"]["json_schema"]["strict"], true);
    }

    #[tokio::test]
    async fn test_openai_stream_handles_split_lines() {
        let chunks = vec![
            Bytes::from("data: {\"id\":\"c1\",\"model\":\"gpt-4o-mini\",\"choices\":[{\"delta\":{\"content\":\"Hel\"},\"finish_reason\":null}]}\n\ndata: {\"id\":\"c1\",\"model\":\"gpt-4o-mini\",\"choi"),
            Bytes::from("ces\":[{\"delta\":{\"content\":\"lo\"},\"finish_reason\":null}]}\n\n"),
            Bytes::from("data: {\"id\":\"c1\",\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\ndata: [DONE]\n\n"),
        ];
        let client = MockHttpClient::new().with_stream_response(TEST_URL, chunks);
        let provider = OpenAiProvider::new(client, "test-api-key");

        let stream = provider
            .chat_stream("gpt-4o-mini", LlmRequest::builder().user("Hi").build())
            .await
            .unwrap();
        let chunks: Vec<StreamChunk> = stream.map(|c| c.unwrap()).collect().await;

        let text: String = chunks.iter().filter_map(|c| c.delta.clone()).collect();
        assert_eq!(text, "Hello");
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[2].finish_reason, Some(FinishReason::Stop));
    }

    #[test]
    fn test_sse_decoder_handles_multibyte_split() {
        let mut decoder = SseDecoder::default();
        let line = "data: café\n".as_bytes();
        let (a, b) = line.split_at(10);

        assert!(decoder.push(a).is_empty());
        assert_eq!(decoder.push(b), vec!["café".to_string()]);
    }

    #[tokio::test]
    async fn test_openai_error_handling() {
        let client = MockHttpClient::new().with_status(TEST_URL, 429, "Rate limit");
        let provider = OpenAiProvider::new(client, "invalid-key");

        let request = LlmRequest::builder().user("Hello!").build();
        let result = provider.chat("gpt-4o-mini", request).await;

        assert!(result.unwrap_err().is_rate_limited());
    }

    #[tokio::test]
    async fn test_openai_custom_base_url() {
        let custom_url = "http://localhost:8080/v1/chat/completions";
        let mock_response = serde_json::json!({
            "id": "chatcmpl-custom",
            "model": "gpt-4o-mini",
            "choices": [{
                "message": { "role": "assistant", "content": "Custom response" },
                "finish_reason": "stop"
            }]
        });

        let client = MockHttpClient::new().with_response(custom_url, mock_response);
        let provider = OpenAiProvider::with_base_url(client, "test-key", "http://localhost:8080/");

        let request = LlmRequest::builder().user("Test").build();
        let response = provider.chat("gpt-4o-mini", request).await.unwrap();

        assert_eq!(response.id, "chatcmpl-custom");
    }
}
