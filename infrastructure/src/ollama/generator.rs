use super::client::OllamaClient;
use super::prompts::{self, EMPTY_DOCUMENT_REPLY, PODCAST_SAMPLING, SIDE_SCRIPT_SAMPLING};
use crate::config::FileGeneratorConfig;
use crate::document::{Document, DocumentError, DocumentLibrary};
use async_trait::async_trait;
use duet_application::{
    GenerationError, PayloadKind, RouteRequest, TurnGenerator, TurnRequest, TurnResponse,
};
use duet_domain::{AgentId, RouteDecision, heuristic_confidence, parse_route_decision};
use std::sync::Arc;
use tracing::{debug, info};

/// [`TurnGenerator`] backed by an Ollama server
pub struct OllamaTurnGenerator {
    client: OllamaClient,
    documents: Arc<DocumentLibrary>,
    document_char_limit: usize,
    router_char_limit: usize,
}

impl OllamaTurnGenerator {
    pub fn new(client: OllamaClient, documents: Arc<DocumentLibrary>) -> Self {
        let defaults = FileGeneratorConfig::default();
        Self {
            client,
            documents,
            document_char_limit: defaults.document_char_limit,
            router_char_limit: defaults.router_char_limit,
        }
    }

    pub fn from_config(
        config: &FileGeneratorConfig,
        documents: Arc<DocumentLibrary>,
    ) -> Result<Self, GenerationError> {
        let client = OllamaClient::new(
            config.base_url.clone(),
            config.model.clone(),
            config.request_timeout(),
        )?;
        Ok(Self::new(client, documents)
            .with_char_limits(config.document_char_limit, config.router_char_limit))
    }

    pub fn with_char_limits(mut self, document: usize, router: usize) -> Self {
        self.document_char_limit = document;
        self.router_char_limit = router;
        self
    }

    fn document(&self, id: &str) -> Result<Arc<Document>, GenerationError> {
        self.documents.get(id).map_err(|e| match e {
            DocumentError::NotFound(id) => GenerationError::DocumentNotFound(id),
            other => GenerationError::Other(other.to_string()),
        })
    }
}

#[async_trait]
impl TurnGenerator for OllamaTurnGenerator {
    async fn route(&self, request: &RouteRequest) -> Result<RouteDecision, GenerationError> {
        let fallback = request.agents.first().copied().unwrap_or(AgentId::FIRST);
        let document = self.document(&request.document_id)?;
        // Nothing to route when only one agent can answer or there is nothing to read
        if request.agents.len() < 2 || document.is_empty() {
            return Ok(RouteDecision::direct(fallback, request.prompt.clone()));
        }

        let messages = prompts::router(&request.prompt, document.excerpt(self.router_char_limit));
        let reply = self.client.chat(&messages, None).await?;
        debug!(reply = %reply, "Router reply");
        let decision = parse_route_decision(&reply, &request.prompt)?;
        info!(
            discussion = decision.discussion_required,
            initiator = ?decision.initiator,
            "Prompt routed"
        );
        Ok(decision)
    }

    async fn generate(&self, request: &TurnRequest) -> Result<TurnResponse, GenerationError> {
        let document = self.document(&request.document_id)?;
        if document.is_empty() {
            if request.is_podcast_mode {
                return Err(GenerationError::Other(EMPTY_DOCUMENT_REPLY.to_string()));
            }
            return Ok(TurnResponse::turn(EMPTY_DOCUMENT_REPLY, Some(0.0)));
        }
        let excerpt = document.excerpt(self.document_char_limit);

        let (messages, options, payload) = if request.is_podcast_mode {
            match &request.podcast_interrupt {
                Some(interrupt) => (
                    prompts::side_script(&request.instruction, interrupt, excerpt),
                    SIDE_SCRIPT_SAMPLING,
                    PayloadKind::SideScript,
                ),
                None => (
                    prompts::podcast_script(&request.instruction, excerpt),
                    PODCAST_SAMPLING,
                    PayloadKind::PodcastScript,
                ),
            }
        } else if request.is_final_summary && !request.is_single_agent {
            (
                prompts::summary(request, excerpt),
                request.model_kind.sampling(),
                PayloadKind::Turn,
            )
        } else {
            (
                prompts::agent_turn(request, excerpt),
                request.model_kind.sampling(),
                PayloadKind::Turn,
            )
        };

        debug!(agent = %request.speaker, payload = ?payload, "Generating");
        let text = self.client.chat(&messages, Some(options)).await?;
        Ok(TurnResponse {
            confidence: Some(heuristic_confidence(&text)),
            text,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duet_application::PodcastInterrupt;
    use duet_domain::{ModelKind, RevisedPrompt};
    use serde_json::{Value, json};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// One-shot HTTP server answering each connection with the next canned
    /// response and recording the JSON request bodies.
    struct FakeOllama {
        base_url: String,
        bodies: Arc<Mutex<Vec<Value>>>,
    }

    impl FakeOllama {
        async fn start(responses: Vec<(u16, String)>) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let base_url = format!("http://{}/api", listener.local_addr().unwrap());
            let bodies = Arc::new(Mutex::new(Vec::new()));
            let recorded = bodies.clone();
            tokio::spawn(async move {
                for (status, body) in responses {
                    let (mut stream, _) = listener.accept().await.unwrap();
                    let request = read_body(&mut stream).await;
                    recorded.lock().unwrap().push(serde_json::from_slice(&request).unwrap());
                    let response = format!(
                        "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    stream.write_all(response.as_bytes()).await.unwrap();
                    stream.shutdown().await.unwrap();
                }
            });
            Self { base_url, bodies }
        }

        fn bodies(&self) -> Vec<Value> {
            self.bodies.lock().unwrap().clone()
        }
    }

    async fn read_body(stream: &mut TcpStream) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..pos]).to_lowercase();
                let length: usize = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .map(|v| v.trim().parse().unwrap())
                    .unwrap_or(0);
                let start = pos + 4;
                while buf.len() < start + length {
                    let n = stream.read(&mut chunk).await.unwrap();
                    buf.extend_from_slice(&chunk[..n]);
                }
                return buf[start..start + length].to_vec();
            }
        }
    }

    fn reply(content: &str) -> (u16, String) {
        (200, json!({ "message": { "role": "assistant", "content": content } }).to_string())
    }

    fn generator(base_url: &str, text: &str) -> OllamaTurnGenerator {
        let documents = Arc::new(DocumentLibrary::new());
        documents.insert(Document::new("doc.txt", text));
        let client = OllamaClient::new(base_url, "llama3", Duration::from_secs(5)).unwrap();
        OllamaTurnGenerator::new(client, documents)
    }

    fn route_request(agents: Vec<AgentId>) -> RouteRequest {
        RouteRequest {
            document_id: "doc.txt".to_string(),
            prompt: "Agent 1 list pros and Agent 2 list cons".to_string(),
            agents,
        }
    }

    #[tokio::test]
    async fn test_route_parses_router_json() {
        let server = FakeOllama::start(vec![reply(
            r#"Sure! {"discussion_required": false, "initiator_agent_id": 1, "responding_agent_ids": [1, 2], "revised_prompt": {"1": "List pros", "2": "List cons"}}"#,
        )])
        .await;
        let generator = generator(&server.base_url, "A plan to build a bridge.");

        let decision = generator
            .route(&route_request(vec![AgentId::FIRST, AgentId::SECOND]))
            .await
            .unwrap();
        assert!(!decision.discussion_required);
        assert_eq!(decision.responding_agents, vec![AgentId::FIRST, AgentId::SECOND]);
        assert!(matches!(decision.revised_prompt, RevisedPrompt::PerAgent(_)));

        let body = &server.bodies()[0];
        assert_eq!(body["model"], "llama3");
        assert!(body.get("options").is_none());
        assert!(
            body["messages"][1]["content"]
                .as_str()
                .unwrap()
                .starts_with("Document: A plan to build a bridge.\nPrompt: Agent 1 list pros")
        );
    }

    #[tokio::test]
    async fn test_route_rejects_reply_without_json() {
        let server = FakeOllama::start(vec![reply("I think agent one should answer.")]).await;
        let generator = generator(&server.base_url, "text");
        let result = generator
            .route(&route_request(vec![AgentId::FIRST, AgentId::SECOND]))
            .await;
        assert!(matches!(result, Err(GenerationError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_single_agent_skips_router() {
        // No server: a request would fail to connect
        let generator = generator("http://127.0.0.1:9/api", "text");
        let decision = generator
            .route(&route_request(vec![AgentId::FIRST]))
            .await
            .unwrap();
        assert_eq!(decision, RouteDecision::direct(AgentId::FIRST, "Agent 1 list pros and Agent 2 list cons"));
    }

    #[tokio::test]
    async fn test_turn_uses_persona_sampling_and_excerpt() {
        let server = FakeOllama::start(vec![reply("  The bridge is **sound**.  ")]).await;
        let generator = generator(&server.base_url, "0123456789").with_char_limits(4, 2);

        let request = TurnRequest::new("doc.txt", "Is it safe?", AgentId::FIRST, ModelKind::Critical)
            .single_agent(true);
        let response = generator.generate(&request).await.unwrap();
        assert_eq!(response.text, "The bridge is **sound**.");
        assert_eq!(response.payload, PayloadKind::Turn);
        assert!(response.confidence.unwrap() > 0.0);

        let body = &server.bodies()[0];
        assert_eq!(body["messages"][2]["content"], "Document Content:\n0123");
        let temperature = body["options"]["temperature"].as_f64().unwrap();
        assert!((temperature - 0.4).abs() < 1e-6);
        assert_eq!(body["options"]["num_predict"], 512);
    }

    #[tokio::test]
    async fn test_podcast_and_side_script_payloads() {
        let server = FakeOllama::start(vec![
            reply("Agent 1: Welcome.\nAgent 2: Thanks."),
            reply("Agent 2: Good question.\nAgent 1: Back to it."),
        ])
        .await;
        let generator = generator(&server.base_url, "Solar panels");

        let request = TurnRequest::new("doc.txt", "Solar", AgentId::FIRST, ModelKind::Critical)
            .podcast(None);
        let response = generator.generate(&request).await.unwrap();
        assert_eq!(response.payload, PayloadKind::PodcastScript);

        let request = TurnRequest::new("doc.txt", "Cost?", AgentId::FIRST, ModelKind::Critical)
            .podcast(Some(PodcastInterrupt {
                main_script: response.text,
                resume_index: 1,
            }));
        let response = generator.generate(&request).await.unwrap();
        assert_eq!(response.payload, PayloadKind::SideScript);

        let bodies = server.bodies();
        assert_eq!(bodies[0]["options"]["top_k"], 60);
        assert_eq!(bodies[1]["options"]["num_predict"], 384);
    }

    #[tokio::test]
    async fn test_empty_document_gets_canned_reply() {
        let generator = generator("http://127.0.0.1:9/api", "   ");
        let request = TurnRequest::new("doc.txt", "Summarise", AgentId::FIRST, ModelKind::Practical);
        let response = generator.generate(&request).await.unwrap();
        assert_eq!(response.text, EMPTY_DOCUMENT_REPLY);
        assert_eq!(response.confidence, Some(0.0));

        let decision = generator
            .route(&route_request(vec![AgentId::FIRST, AgentId::SECOND]))
            .await
            .unwrap();
        assert!(!decision.discussion_required);

        let podcast = generator.generate(&request.clone().podcast(None)).await;
        assert_eq!(podcast, Err(GenerationError::Other(EMPTY_DOCUMENT_REPLY.to_string())));
    }

    #[tokio::test]
    async fn test_backend_errors_are_mapped() {
        let server = FakeOllama::start(vec![(500, "model not loaded".to_string())]).await;
        let generator = generator(&server.base_url, "text");
        let request = TurnRequest::new("doc.txt", "x", AgentId::FIRST, ModelKind::Critical);
        assert_eq!(
            generator.generate(&request).await,
            Err(GenerationError::Status {
                status: 500,
                body: "model not loaded".to_string()
            })
        );

        let missing = TurnRequest::new("other.txt", "x", AgentId::FIRST, ModelKind::Critical);
        assert_eq!(
            generator.generate(&missing).await,
            Err(GenerationError::DocumentNotFound("other.txt".to_string()))
        );
    }
}
