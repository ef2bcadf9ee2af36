//! Chat Session Module
//!
//! Per-conversation state: the rendered message list, the renderer holding
//! the conversation's knowledge base, and the in-flight flag that keeps one
//! turn running at a time.

mod guard;
mod turn;

pub use guard::TurnGuard;
pub use turn::AnswerTurn;

use crate::client::{AnswerRequest, ChatBackend};
use crate::config::StreamOptions;
use crate::error::RagError;
use crate::render::MessageRenderer;
use crate::streaming::{AnswerAccumulator, AnswerObserver, TurnOutcome, content_deltas};
use crate::types::{ConversationMessage, ConversationPayload};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub struct ChatSession<B: ChatBackend> {
    backend: B,
    conversation_id: String,
    messages: Vec<ConversationMessage>,
    renderer: MessageRenderer,
    options: StreamOptions,
    in_flight: Arc<AtomicBool>,
}

impl<B: ChatBackend> std::fmt::Debug for ChatSession<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("conversation_id", &self.conversation_id)
            .field("messages", &self.messages.len())
            .field("in_flight", &self.is_turn_in_flight())
            .finish()
    }
}

impl<B: ChatBackend> ChatSession<B> {
    pub fn new(backend: B, conversation_id: impl Into<String>) -> Self {
        Self {
            backend,
            conversation_id: conversation_id.into(),
            messages: Vec::new(),
            renderer: MessageRenderer::default(),
            options: StreamOptions::default(),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_renderer(mut self, renderer: MessageRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_stream_options(mut self, options: StreamOptions) -> Self {
        self.options = options;
        self
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn renderer(&self) -> &MessageRenderer {
        &self.renderer
    }

    pub fn is_turn_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Replace the message list with the stored conversation.
    pub async fn load_history(&mut self) -> Result<&[ConversationMessage], RagError> {
        let _guard = TurnGuard::acquire(&self.in_flight, &self.conversation_id)?;
        let payload = self.backend.load_conversation(&self.conversation_id).await?;
        let knowledge_base = payload.knowledge_base();
        if knowledge_base.id.is_some() {
            self.renderer.set_knowledge_base(knowledge_base);
        }
        self.messages = self.renderer.render_history(&payload)?;
        tracing::debug!(
            target: "ragstream::citation",
            conversation_id = %self.conversation_id,
            messages = self.messages.len(),
            "history loaded"
        );
        Ok(&self.messages)
    }

    /// Start streaming an answer. Fails with `TurnInFlight` while another
    /// turn of this session is alive.
    pub async fn stream_answer(&self, question: &str) -> Result<AnswerTurn, RagError> {
        self.start_turn(
            AnswerRequest::chat(question, self.conversation_id.clone()),
            AnswerAccumulator::new(),
        )
        .await
    }

    /// Like [`Self::stream_answer`], calling `observer` with the full answer
    /// after every change.
    pub async fn stream_answer_with_observer(
        &self,
        question: &str,
        observer: AnswerObserver,
    ) -> Result<AnswerTurn, RagError> {
        self.start_turn(
            AnswerRequest::chat(question, self.conversation_id.clone()),
            AnswerAccumulator::new().with_observer(observer),
        )
        .await
    }

    /// Stream a knowledge search summary. Shares the in-flight flag with chat
    /// turns; the result is not added to the conversation.
    pub async fn stream_search(&self, query: &str) -> Result<AnswerTurn, RagError> {
        self.start_turn(AnswerRequest::search(query), AnswerAccumulator::new())
            .await
    }

    async fn start_turn(
        &self,
        request: AnswerRequest,
        accumulator: AnswerAccumulator,
    ) -> Result<AnswerTurn, RagError> {
        let guard = TurnGuard::acquire(&self.in_flight, &self.conversation_id)?;
        tracing::debug!(
            target: "ragstream::stream",
            conversation_id = %self.conversation_id,
            "starting turn"
        );
        let bytes = self.backend.open_answer_stream(&request).await?;
        let deltas = content_deltas(bytes, self.options.clone());
        Ok(AnswerTurn::new(deltas, accumulator, guard))
    }

    /// Append the question and the rendered answer of a finished turn.
    pub fn complete_turn(
        &mut self,
        question: &str,
        outcome: TurnOutcome,
    ) -> Result<&ConversationMessage, RagError> {
        let user = ConversationMessage::user(new_message_id(), question);
        let assistant =
            self.renderer
                .render_streamed(new_message_id(), &outcome.answer, &outcome.references)?;
        self.messages.push(user);
        Ok(self.push(assistant))
    }

    /// Stream, finish and record a turn.
    pub async fn ask(&mut self, question: &str) -> Result<&ConversationMessage, RagError> {
        let turn = self.stream_answer(question).await?;
        let outcome = turn.finish().await?;
        self.complete_turn(question, outcome)
    }

    /// Record the reply of a non-streaming turn.
    pub fn apply_reply(
        &mut self,
        payload: &ConversationPayload,
    ) -> Result<Option<&ConversationMessage>, RagError> {
        match self.renderer.render_reply(payload)? {
            Some(message) => Ok(Some(self.push(message))),
            None => Ok(None),
        }
    }

    fn push(&mut self, message: ConversationMessage) -> &ConversationMessage {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }
}

fn new_message_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
