//! Chat bridge against a mock OpenAI-compatible server.

use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use vocalis_core::{
    AnalysisBackend, AnalysisRequest, ChatBridge, GenerationBackend, GenerationRequest,
    PlaceholderKnowledge, SimError, SimulatorConfig,
};
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn completion(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    }))
}

fn request(knowledge_url: Option<&str>) -> GenerationRequest {
    GenerationRequest {
        sales_prompt: "You are Alex, a sales rep at Cleverly.".to_string(),
        consumer_prompt: "You are Sarah Lee, a busy founder.".to_string(),
        knowledge_url: knowledge_url.map(str::to_string),
        query: "Start the conversation. The Sales Agent speaks first.".to_string(),
    }
}

#[tokio::test]
async fn generation_parses_json_answer() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer or-key"))
        .and(body_partial_json(json!({
            "model": "openai/gpt-4o-mini",
            "response_format": { "type": "json_object" },
        })))
        .and(body_string_contains("You are Alex, a sales rep at Cleverly."))
        .respond_with(completion(
            "```json\n{\"salesAgentResponse\": \"*confident* Hi, got a minute?\", \"consumerAgentResponse\": \"\"}\n```",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let bridge = ChatBridge::new(server.uri(), "or-key").unwrap().with_model("openai/gpt-4o-mini");
    let response = bridge.generate(&request(None)).await.unwrap();

    assert_eq!(response.sales_line(), Some("*confident* Hi, got a minute?"));
    assert_eq!(response.consumer_line(), None);
}

#[tokio::test]
async fn knowledge_snippet_is_included_when_url_is_set() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("PLACEHOLDER: Relevant knowledge for"))
        .and(body_string_contains("https://cleverly.example/pricing"))
        .respond_with(completion("{\"salesAgentResponse\": \"Our plans start small.\"}"))
        .expect(1)
        .mount(&server)
        .await;

    let bridge = ChatBridge::new(server.uri(), "k").unwrap().with_knowledge(Arc::new(PlaceholderKnowledge));
    let response = bridge
        .generate(&request(Some("https://cleverly.example/pricing")))
        .await
        .unwrap();
    assert_eq!(response.sales_agent_response, "Our plans start small.");
    assert_eq!(response.consumer_agent_response, "");
}

#[tokio::test]
async fn generation_errors_map_to_generation_variant() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let bridge = ChatBridge::new(server.uri(), "k").unwrap();
    match bridge.generate(&request(None)).await {
        Err(SimError::Generation(msg)) => assert!(msg.contains("429"), "{}", msg),
        other => panic!("expected generation error, got {:?}", other),
    }
}

#[tokio::test]
async fn non_json_answer_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(completion("Sure! Here is the next line: hello."))
        .mount(&server)
        .await;

    let bridge = ChatBridge::new(server.uri(), "k").unwrap();
    assert!(matches!(
        bridge.generate(&request(None)).await,
        Err(SimError::Generation(_))
    ));
}

#[tokio::test]
async fn analysis_score_is_clamped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("Sales Agent (Human): Hello"))
        .respond_with(completion(
            "{\"overallScore\": 140, \"feedback\": \"**Great** energy.\", \"strengths\": [\"Tone\"], \"areasForImprovement\": [\"Discovery\"]}",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let bridge = ChatBridge::new(server.uri(), "k").unwrap();
    let result = bridge
        .analyze(&AnalysisRequest {
            transcript: "Sales Agent (Human): Hello\nConsumer AI: Who is this?".to_string(),
            sales_prompt: "You are Alex, a sales rep at Cleverly.".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(result.overall_score, 100.0);
    assert_eq!(result.strengths, vec!["Tone".to_string()]);
    assert_eq!(result.areas_for_improvement, vec!["Discovery".to_string()]);
}

#[tokio::test]
async fn analysis_errors_map_to_analysis_variant() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let bridge = ChatBridge::new(server.uri(), "k").unwrap();
    let err = bridge
        .analyze(&AnalysisRequest {
            transcript: "x".to_string(),
            sales_prompt: "y".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SimError::Analysis(_)));
}

#[tokio::test]
async fn configured_request_timeout_is_applied() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(completion(r#"{"salesAgentResponse": "late"}"#).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let config = SimulatorConfig {
        llm_api_url: server.uri(),
        llm_api_key: Some("k".to_string()),
        request_timeout_secs: 1,
        ..SimulatorConfig::default()
    };
    let bridge = ChatBridge::from_config(&config).unwrap().expect("key is configured");

    let started = Instant::now();
    let result = bridge.generate(&request(None)).await;
    assert!(matches!(result, Err(SimError::Generation(_))), "{:?}", result);
    assert!(started.elapsed() < Duration::from_secs(4));
}
