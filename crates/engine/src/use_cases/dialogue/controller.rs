//! Dialogue controller - the session state machine.
//!
//! One controller serves the whole game and holds at most one session. Each
//! session phase (revealing lines, waiting on the gateway) runs as a single
//! spawned task owned by the controller. Operations serialise on the task
//! lock and cancel-then-await the current task before starting the next, so
//! two phases never write the text sink at once.
//!
//! Locking: the task lock is only taken by public operations, never by the
//! tasks themselves. The session lock is a plain mutex held for short
//! synchronous sections. An NPC lock is never awaited while the session lock
//! is held.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use babel_domain::{Message, NpcId, SessionId};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::gateway::ResponseGateway;
use super::typewriter::{Cancelled, SkipSignal, Typewriter};
use super::{DialogueError, DialogueSource, DialogueState, PlayerInput};
use crate::infrastructure::ports::{DialoguePanel, LlmPort, TextSink};
use crate::infrastructure::settings::{DialogueMode, DialogueSettings, ReentryPolicy};
use crate::stores::{NpcRegistry, SharedNpc};

struct Session {
    id: SessionId,
    npc_id: NpcId,
    npc: SharedNpc,
    sentences: VecDeque<String>,
    state: DialogueState,
}

struct SessionTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

struct Inner {
    registry: Arc<NpcRegistry>,
    gateway: ResponseGateway,
    typewriter: Typewriter,
    sink: Arc<dyn TextSink>,
    panel: Arc<dyn DialoguePanel>,
    skip: SkipSignal,
    mode: DialogueMode,
    reentry_policy: ReentryPolicy,
    talking: AtomicBool,
    session: Mutex<Option<Session>>,
    task: tokio::sync::Mutex<Option<SessionTask>>,
}

/// Cheap, cloneable handle to the dialogue state machine.
#[derive(Clone)]
pub struct DialogueController {
    inner: Arc<Inner>,
}

impl DialogueController {
    pub fn new(
        registry: Arc<NpcRegistry>,
        llm: Arc<dyn LlmPort>,
        sink: Arc<dyn TextSink>,
        panel: Arc<dyn DialoguePanel>,
        settings: &DialogueSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                gateway: ResponseGateway::new(llm, settings),
                typewriter: Typewriter::from_settings(settings),
                sink,
                panel,
                skip: SkipSignal::new(),
                mode: settings.mode,
                reentry_policy: settings.reentry_policy,
                talking: AtomicBool::new(false),
                session: Mutex::new(None),
                task: tokio::sync::Mutex::new(None),
            }),
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Whether a session is active. Readable from any system without awaiting.
    pub fn is_talking(&self) -> bool {
        self.inner.talking.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> DialogueState {
        self.session()
            .as_ref()
            .map_or(DialogueState::Idle, |session| session.state)
    }

    pub fn active_npc(&self) -> Option<NpcId> {
        self.session().as_ref().map(|session| session.npc_id)
    }

    /// Lines still waiting to be revealed, front first.
    pub fn queued_sentences(&self) -> Vec<String> {
        self.session()
            .as_ref()
            .map(|session| session.sentences.iter().cloned().collect())
            .unwrap_or_default()
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Open a session with `npc_id`, seeded from the NPC's greeting.
    pub async fn start_dialogue(&self, npc_id: NpcId) -> Result<SessionId, DialogueError> {
        self.start_dialogue_with(npc_id, DialogueSource::Greeting).await
    }

    /// Open a session with `npc_id`, seeded from `source`.
    ///
    /// If a session is already active the reentry policy decides: `Reject`
    /// returns [`DialogueError::AlreadyTalking`], `ForceClose` stops the
    /// active session first.
    pub async fn start_dialogue_with(
        &self,
        npc_id: NpcId,
        source: DialogueSource,
    ) -> Result<SessionId, DialogueError> {
        let npc = self.inner.registry.find(npc_id)?;
        let mut task = self.inner.task.lock().await;

        if let Some(active) = self.active_npc() {
            match self.inner.reentry_policy {
                ReentryPolicy::Reject => {
                    tracing::warn!(
                        npc_id = %npc_id,
                        active_npc_id = %active,
                        "Rejected dialogue start while another session is active"
                    );
                    return Err(DialogueError::AlreadyTalking { active });
                }
                ReentryPolicy::ForceClose => {
                    tracing::info!(
                        npc_id = %npc_id,
                        active_npc_id = %active,
                        "Force-closing active session for new dialogue"
                    );
                    Self::cancel_task(&mut task).await;
                    self.teardown().await;
                }
            }
        }

        let lines = {
            let mut guard = npc.write().await;
            guard.begin_dialogue();
            tracing::debug!(npc_id = %npc_id, "NPC summary:\n{}", *guard);
            source.into_lines(&guard)
        };

        self.inner.skip.reset();
        self.inner.panel.show();
        self.inner.panel.clear_choices();
        self.inner.panel.set_input_visible(false);

        let session_id = SessionId::new();
        *self.session() = Some(Session {
            id: session_id,
            npc_id,
            npc,
            sentences: lines.into(),
            state: DialogueState::Displaying,
        });
        self.inner.talking.store(true, Ordering::SeqCst);

        tracing::info!(session_id = %session_id, npc_id = %npc_id, "Dialogue started");

        match self.pop_sentence() {
            Some(first) => *task = Some(self.spawn_reveal(first)),
            None => self.finish_queue().await,
        }

        Ok(session_id)
    }

    /// Cut the current line short and reveal the next queued one.
    ///
    /// Returns `Ok(false)` without touching the current line when nothing is
    /// queued.
    pub async fn display_next_sentence(&self) -> Result<bool, DialogueError> {
        let mut task = self.inner.task.lock().await;

        let queued = self
            .session()
            .as_ref()
            .map(|session| session.sentences.len())
            .ok_or(DialogueError::NotTalking)?;
        if queued == 0 {
            return Ok(false);
        }

        Self::cancel_task(&mut task).await;
        match self.pop_sentence() {
            Some(sentence) => *task = Some(self.spawn_reveal(sentence)),
            None => self.finish_queue().await,
        }
        Ok(true)
    }

    /// Forward player text to the gateway and reveal the reply.
    ///
    /// Returns once the request is issued. On success the exchange is
    /// appended to the NPC's history and the reply joins the queue. On
    /// failure nothing is recorded and the session goes back to
    /// `AwaitingInput`, offline mode included.
    pub async fn send_data(&self, input: &str) -> Result<(), DialogueError> {
        let mut task = self.inner.task.lock().await;

        let npc = self
            .session()
            .as_ref()
            .map(|session| Arc::clone(&session.npc))
            .ok_or(DialogueError::NotTalking)?;

        let input = input.trim();
        if input.is_empty() {
            return Err(DialogueError::EmptyInput);
        }

        Self::cancel_task(&mut task).await;
        self.set_state(DialogueState::AwaitingResponse);
        self.inner.panel.set_input_visible(false);

        let request = {
            let npc = npc.read().await;
            self.inner.gateway.build_request(&npc, input)
        };

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let this = self.clone();
        let input = input.to_string();

        let handle = tokio::spawn(async move {
            let reply = tokio::select! {
                biased;
                _ = token.cancelled() => return,
                reply = this.inner.gateway.exchange(request) => reply,
            };

            match reply {
                Ok(reply) => {
                    {
                        let mut npc = tokio::select! {
                            biased;
                            _ = token.cancelled() => return,
                            guard = npc.write() => guard,
                        };
                        npc.append_message(Message::user(input));
                        npc.append_message(Message::assistant(reply.content.as_str()));
                        tracing::debug!(
                            npc_id = %npc.id(),
                            history_len = npc.messages().len(),
                            "Reply appended to history"
                        );
                    }
                    this.enqueue(reply.content);
                    if this.reveal_queue(None, &token).await.is_ok() && !token.is_cancelled() {
                        this.finish_queue().await;
                    }
                }
                Err(e) => {
                    // The session survives a failed reply in either mode
                    tracing::warn!(error = %e, "Agent failed to respond");
                    this.await_input();
                }
            }
        });

        *task = Some(SessionTask { cancel, handle });
        Ok(())
    }

    /// Skip the current reveal, or release a held line. No-op while idle.
    pub fn skip_sentence(&self) {
        if self.is_talking() {
            self.inner.skip.raise();
        }
    }

    /// Close the active session. Returns whether there was one.
    pub async fn stop_dialogue(&self) -> bool {
        let mut task = self.inner.task.lock().await;
        Self::cancel_task(&mut task).await;
        self.teardown().await
    }

    /// Route one player input event.
    pub async fn handle_input(&self, input: PlayerInput) -> Result<(), DialogueError> {
        match input {
            PlayerInput::Submit(text) => self.send_data(&text).await,
            PlayerInput::Skip => {
                self.skip_sentence();
                Ok(())
            }
            PlayerInput::Stop => {
                self.stop_dialogue().await;
                Ok(())
            }
        }
    }

    // =========================================================================
    // Session phases
    // =========================================================================

    fn spawn_reveal(&self, first: String) -> SessionTask {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let this = self.clone();

        let handle = tokio::spawn(async move {
            if this.reveal_queue(Some(first), &token).await.is_ok() && !token.is_cancelled() {
                this.finish_queue().await;
            }
        });

        SessionTask { cancel, handle }
    }

    /// Reveal and hold each queued line until the queue is empty.
    async fn reveal_queue(
        &self,
        first: Option<String>,
        cancel: &CancellationToken,
    ) -> Result<(), Cancelled> {
        let typewriter = self.inner.typewriter;
        let sink = self.inner.sink.as_ref();
        let skip = &self.inner.skip;

        let mut next = first;
        while let Some(sentence) = next.take().or_else(|| self.pop_sentence()) {
            typewriter.type_out(&sentence, sink, skip, cancel).await?;
            self.set_state(DialogueState::HeldForAdvance);
            typewriter.hold(skip, cancel).await?;
        }
        Ok(())
    }

    /// The queue drained: open input (online) or end the session (offline).
    async fn finish_queue(&self) {
        match self.inner.mode {
            DialogueMode::Online => self.await_input(),
            DialogueMode::Offline => {
                self.teardown().await;
            }
        }
    }

    fn await_input(&self) {
        if self.set_state(DialogueState::AwaitingInput) {
            self.inner.panel.set_input_visible(true);
        }
    }

    /// Clear every trace of the active session. Does not touch the task.
    async fn teardown(&self) -> bool {
        let session = self.session().take();
        let Some(session) = session else {
            return false;
        };

        self.inner.skip.reset();
        self.inner.sink.clear();
        self.inner.panel.set_input_visible(false);
        self.inner.panel.hide();
        session.npc.write().await.end_dialogue();
        self.inner.talking.store(false, Ordering::SeqCst);

        tracing::info!(
            session_id = %session.id,
            npc_id = %session.npc_id,
            dropped_sentences = session.sentences.len(),
            "Dialogue stopped"
        );
        true
    }

    async fn cancel_task(task: &mut Option<SessionTask>) {
        if let Some(SessionTask { cancel, handle }) = task.take() {
            cancel.cancel();
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Dialogue task failed");
            }
        }
    }

    // =========================================================================
    // Session state helpers
    // =========================================================================

    fn session(&self) -> MutexGuard<'_, Option<Session>> {
        self.inner
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: DialogueState) -> bool {
        match self.session().as_mut() {
            Some(session) => {
                session.state = state;
                true
            }
            None => false,
        }
    }

    /// Pop the front line and mark the session as displaying it.
    fn pop_sentence(&self) -> Option<String> {
        let mut guard = self.session();
        let session = guard.as_mut()?;
        let sentence = session.sentences.pop_front()?;
        session.state = DialogueState::Displaying;
        Some(sentence)
    }

    fn enqueue(&self, sentence: String) {
        if let Some(session) = self.session().as_mut() {
            session.sentences.push_back(sentence);
        }
    }
}

impl std::fmt::Debug for DialogueController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogueController")
            .field("state", &self.state())
            .field("active_npc", &self.active_npc())
            .field("is_talking", &self.is_talking())
            .finish()
    }
}
