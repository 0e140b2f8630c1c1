//! Response gateway - obtains NPC replies from the conversational agent.
//!
//! The gateway owns a single response slot. A request clears the slot, then
//! runs the backend call (which fills the slot) alongside a waiter that polls
//! the slot every `poll_interval`. The whole exchange is bounded by `timeout`
//! and, because it is a plain future, is cancelled by dropping it.

use std::fmt::Write as _;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use babel_domain::Npc;

use crate::infrastructure::ports::{
    ChatMessage, LlmError, LlmPort, LlmRequest, LlmResponse, TokenUsage,
};
use crate::infrastructure::settings::DialogueSettings;

const REPLY_TEMPERATURE: f32 = 0.7;

/// Gateway failures. None of these end the session.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayError {
    #[error("Agent backend failed: {0}")]
    Backend(#[from] LlmError),
    #[error("Agent returned an empty reply")]
    EmptyReply,
    #[error("No reply within {0:?}")]
    Timeout(Duration),
}

/// A usable reply from the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub content: String,
    pub usage: Option<TokenUsage>,
}

type Outcome = Result<LlmResponse, LlmError>;

/// The shared "pending response" field. Unset until the backend call lands.
#[derive(Debug, Clone, Default)]
pub struct ResponseSlot {
    inner: Arc<Mutex<Option<Outcome>>>,
}

impl ResponseSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&self) {
        *self.lock() = None;
    }

    pub fn is_set(&self) -> bool {
        self.lock().is_some()
    }

    fn fill(&self, outcome: Outcome) {
        *self.lock() = Some(outcome);
    }

    fn take(&self) -> Option<Outcome> {
        self.lock().take()
    }

    async fn wait(&self, poll_interval: Duration) -> Outcome {
        loop {
            if let Some(outcome) = self.take() {
                return outcome;
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Outcome>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct ResponseGateway {
    llm: Arc<dyn LlmPort>,
    slot: ResponseSlot,
    poll_interval: Duration,
    timeout: Duration,
    context_messages: usize,
}

impl ResponseGateway {
    pub fn new(llm: Arc<dyn LlmPort>, settings: &DialogueSettings) -> Self {
        Self {
            llm,
            slot: ResponseSlot::new(),
            poll_interval: settings.response_poll(),
            timeout: settings.gateway_timeout(),
            context_messages: settings.context_messages,
        }
    }

    /// Ask the agent to reply to `input` as `npc`.
    pub async fn request_reply(&self, npc: &Npc, input: &str) -> Result<Reply, GatewayError> {
        let request = self.build_request(npc, input);
        self.exchange(request).await
    }

    /// Persona prompt, the most recent history and the new player line.
    pub fn build_request(&self, npc: &Npc, input: &str) -> LlmRequest {
        let mut messages: Vec<ChatMessage> = npc
            .recent_messages(self.context_messages)
            .iter()
            .map(ChatMessage::from)
            .collect();
        messages.push(ChatMessage::user(input));

        LlmRequest::new(messages)
            .with_system_prompt(persona_prompt(npc))
            .with_temperature(REPLY_TEMPERATURE)
    }

    /// Send a prepared request and wait for the slot to fill.
    pub async fn exchange(&self, request: LlmRequest) -> Result<Reply, GatewayError> {
        self.slot.clear();

        let call = async {
            let outcome = self.llm.generate(request).await;
            self.slot.fill(outcome);
        };
        let waiter = self.slot.wait(self.poll_interval);

        let outcome = match tokio::time::timeout(self.timeout, async {
            let ((), outcome) = tokio::join!(call, waiter);
            outcome
        })
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => {
                self.slot.clear();
                return Err(GatewayError::Timeout(self.timeout));
            }
        };

        let response = outcome?;
        let content = response.content.trim();
        if content.is_empty() {
            return Err(GatewayError::EmptyReply);
        }

        Ok(Reply {
            content: content.to_string(),
            usage: response.usage,
        })
    }
}

/// System prompt describing who the agent is playing.
pub fn persona_prompt(npc: &Npc) -> String {
    let mut prompt = format!(
        "You are {}, a {} living in the town of Babel. Stay in character and answer in one or two short sentences.",
        npc.name(),
        npc.job()
    );

    if !npc.description().is_empty() {
        let _ = write!(prompt, "\n\nAbout you: {}", npc.description());
    }
    if !npc.personality().is_empty() {
        let _ = write!(prompt, "\nPersonality: {}", npc.personality().join(", "));
    }
    if !npc.current_location().is_empty() {
        let _ = write!(prompt, "\nYou are currently at: {}", npc.current_location());
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::{FinishReason, MockLlmPort};
    use babel_domain::{Message, MessageRole, NpcId};

    fn settings() -> DialogueSettings {
        DialogueSettings {
            context_messages: 2,
            ..DialogueSettings::default()
        }
    }

    fn teddy() -> Npc {
        Npc::new(NpcId::new(8), "Teddy", "Cat")
            .expect("valid npc")
            .with_description("A grumpy cat who runs the restaurant.")
            .with_personality(["Grumpy", "Lazy"])
    }

    fn response(content: &str) -> LlmResponse {
        LlmResponse {
            content: content.to_string(),
            finish_reason: FinishReason::Stop,
            usage: None,
        }
    }

    #[test]
    fn persona_prompt_names_the_character() {
        let prompt = persona_prompt(&teddy().with_location("Restaurant", Default::default()));
        assert!(prompt.starts_with("You are Teddy, a Cat"));
        assert!(prompt.contains("Grumpy, Lazy"));
        assert!(prompt.contains("Restaurant"));
    }

    #[test]
    fn request_carries_recent_history_then_input() {
        let mut npc = teddy();
        npc.append_message(Message::user("first"));
        npc.append_message(Message::assistant("go away"));
        npc.append_message(Message::user("please"));

        let gateway = ResponseGateway::new(Arc::new(MockLlmPort::new()), &settings());
        let request = gateway.build_request(&npc, "hello");

        let contents: Vec<&str> = request.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["go away", "please", "hello"]);
        assert_eq!(request.messages[0].role, MessageRole::Assistant);
        assert!(request.system_prompt.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn successful_reply_is_trimmed() {
        let mut llm = MockLlmPort::new();
        llm.expect_generate()
            .times(1)
            .returning(|_| Ok(response("  Make it quick.\n")));

        let gateway = ResponseGateway::new(Arc::new(llm), &settings());
        let reply = gateway.request_reply(&teddy(), "hello").await.expect("reply");

        assert_eq!(reply.content, "Make it quick.");
        assert!(!gateway.slot.is_set());
    }

    #[tokio::test(start_paused = true)]
    async fn blank_reply_is_an_error() {
        let mut llm = MockLlmPort::new();
        llm.expect_generate().returning(|_| Ok(response("   ")));

        let gateway = ResponseGateway::new(Arc::new(llm), &settings());
        let err = gateway.request_reply(&teddy(), "hello").await.unwrap_err();
        assert_eq!(err, GatewayError::EmptyReply);
    }

    #[tokio::test(start_paused = true)]
    async fn backend_failure_is_surfaced() {
        let mut llm = MockLlmPort::new();
        llm.expect_generate()
            .returning(|_| Err(LlmError::RequestFailed("connection refused".into())));

        let gateway = ResponseGateway::new(Arc::new(llm), &settings());
        let err = gateway.request_reply(&teddy(), "hello").await.unwrap_err();
        assert!(matches!(err, GatewayError::Backend(LlmError::RequestFailed(_))));
    }

    struct SilentLlm;

    #[async_trait::async_trait]
    impl LlmPort for SilentLlm {
        async fn generate(&self, _request: LlmRequest) -> Result<LlmResponse, LlmError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn silent_backend_times_out() {
        let settings = DialogueSettings {
            gateway_timeout_secs: 5,
            ..settings()
        };
        let gateway = ResponseGateway::new(Arc::new(SilentLlm), &settings);

        let started = tokio::time::Instant::now();
        let err = gateway.request_reply(&teddy(), "hello").await.unwrap_err();

        assert_eq!(err, GatewayError::Timeout(Duration::from_secs(5)));
        assert_eq!(started.elapsed(), Duration::from_secs(5));
    }
}
