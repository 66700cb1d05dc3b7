//! Conversation state and the commands the chat widget runs against it.
//!
//! Between resets the log only grows: a send echoes the user's text right
//! away and later appends exactly one assistant message, either the backend's
//! reply or the fixed apology. A failed request never removes the echo. A
//! reply to a request sent before the last reset is dropped.

use crate::api::{ChatBackend, ChatReply};
use crate::dialog::Dialog;
use crate::error::ApiError;
use crate::state::{iso, Message, Metadata};
use crate::store::Store;
use chrono::{DateTime, Utc};
use leptos::logging::{error, log, warn};

pub const WELCOME: &str = "Hello! I'm the MediBook Clinic assistant.\n\
I can help you book an appointment, check your existing appointments or cancel one.\n\
Tell me your name, phone number and when you would like to come in.";

pub const CLEARED: &str = "Conversation cleared. How can I help you today?";

pub const APOLOGY: &str = "Sorry, I'm having trouble connecting right now. \
Please try again in a moment, or call the clinic directly at +213 21 00 00 00.";

pub const CONFIRM_CLEAR: &str = "Clear the whole conversation?";

/// How a request settled, as the log sees it.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Ok {
        content: String,
        timestamp: String,
        metadata: Option<Metadata>,
    },
    Err {
        display_text: String,
    },
}

impl Reply {
    /// Every failure class collapses to the same apology; only the log keeps
    /// the detail.
    pub fn from_result(result: Result<ChatReply, ApiError>, now: DateTime<Utc>) -> Self {
        match result {
            Ok(reply) => Reply::Ok {
                content: reply.message,
                timestamp: reply.timestamp.unwrap_or_else(|| iso(now)),
                metadata: reply.metadata,
            },
            Err(err) => {
                match &err {
                    ApiError::Transport(e) => error!("Chat request failed to reach backend: {e}"),
                    ApiError::Status { .. } => error!("Chat request failed: {err}"),
                    ApiError::Rejected(e) => warn!("Chat request rejected: {e}"),
                    ApiError::Malformed(e) => error!("Chat response malformed: {e}"),
                    ApiError::Url(e) => error!("Chat endpoint invalid: {e}"),
                }
                Reply::Err {
                    display_text: APOLOGY.to_string(),
                }
            }
        }
    }

    fn into_message(self, now: DateTime<Utc>) -> Message {
        match self {
            Reply::Ok {
                content,
                timestamp,
                metadata,
            } => Message::assistant(content, timestamp, metadata),
            Reply::Err { display_text } => Message::failure(display_text, now),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversationState {
    pub messages: Vec<Message>,
    /// At most one chat request is in flight while this is set.
    pub pending: bool,
    pub draft: String,
    /// Bumped by every reset; replies to requests from an older generation
    /// are dropped.
    pub generation: u64,
}

impl ConversationState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            messages: vec![Message::assistant(WELCOME.to_string(), iso(now), None)],
            pending: false,
            draft: String::new(),
            generation: 0,
        }
    }

    /// Echoes the draft into the log and marks the request pending.
    ///
    /// Returns the text to send with the generation it belongs to, or `None`
    /// when the draft is blank or a request is already in flight.
    pub fn begin_send(&mut self, now: DateTime<Utc>) -> Option<(String, u64)> {
        if self.pending || self.draft.trim().is_empty() {
            return None;
        }
        let text = std::mem::take(&mut self.draft);
        self.messages.push(Message::user(text.clone(), now));
        self.pending = true;
        Some((text, self.generation))
    }

    /// Appends the reply unless the log was reset since the request left.
    /// Releases the pending flag either way.
    pub fn settle(&mut self, generation: u64, reply: Reply, now: DateTime<Utc>) {
        if generation == self.generation {
            self.messages.push(reply.into_message(now));
        }
        self.pending = false;
    }

    /// Leaves `pending` alone: a request still in flight keeps the gate.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.messages = vec![Message::assistant(CLEARED.to_string(), iso(now), None)];
        self.generation += 1;
    }
}

/// Releases the pending flag however the send exits.
struct PendingGuard<'a, S: Store<ConversationState>> {
    store: &'a S,
}

impl<S: Store<ConversationState>> Drop for PendingGuard<'_, S> {
    fn drop(&mut self) {
        self.store.write(|state| state.pending = false);
    }
}

pub struct ConversationManager<B, S> {
    backend: B,
    store: S,
    session_id: String,
}

impl<B, S> ConversationManager<B, S>
where
    B: ChatBackend,
    S: Store<ConversationState>,
{
    pub fn new(backend: B, store: S, session_id: String) -> Self {
        Self {
            backend,
            store,
            session_id,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn set_draft(&self, text: String) {
        self.store.write(|state| state.draft = text);
    }

    /// Sends the current draft. Returns whether a request was issued.
    pub async fn send_message(&self) -> bool {
        let Some((text, generation)) = self.store.write(|state| state.begin_send(Utc::now())).flatten()
        else {
            return false;
        };
        let _pending = PendingGuard { store: &self.store };
        log!("Sending {} chars for {}", text.len(), self.session_id);
        let result = self.backend.chat(&text, &self.session_id).await;
        let now = Utc::now();
        let reply = Reply::from_result(result, now);
        self.store.write(|state| state.settle(generation, reply, now));
        true
    }

    /// Asks for confirmation, resets the local log, then asks the backend to
    /// drop its history. The reset never waits on the backend.
    pub async fn clear_conversation(&self, dialog: &impl Dialog) -> bool {
        if !dialog.confirm(CONFIRM_CLEAR) {
            return false;
        }
        self.store.write(|state| state.reset(Utc::now()));
        if let Err(err) = self.backend.clear_conversation(&self.session_id).await {
            warn!("Could not clear server history for {}: {err}", self.session_id);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Role;
    use futures::channel::oneshot;
    use futures::executor::block_on;
    use futures::FutureExt;
    use reqwest::StatusCode;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::rc::Rc;

    const DRAFT: &str = "Book an appointment for tomorrow at 3pm";

    type Shared = Rc<RefCell<ConversationState>>;

    /// Replays canned results and records what the log looked like while
    /// each request was in flight.
    struct Scripted {
        state: Shared,
        results: RefCell<VecDeque<Result<ChatReply, ApiError>>>,
        sent: RefCell<Vec<(String, String)>>,
        seen: RefCell<Vec<(bool, usize)>>,
        clear_fails: bool,
        cleared: Cell<usize>,
    }

    impl Scripted {
        fn new(state: &Shared, results: Vec<Result<ChatReply, ApiError>>) -> Self {
            Self {
                state: state.clone(),
                results: RefCell::new(results.into()),
                sent: RefCell::new(vec![]),
                seen: RefCell::new(vec![]),
                clear_fails: false,
                cleared: Cell::new(0),
            }
        }
    }

    impl ChatBackend for &Scripted {
        async fn chat(&self, message: &str, session_id: &str) -> Result<ChatReply, ApiError> {
            let state = self.state.borrow();
            self.seen.borrow_mut().push((state.pending, state.messages.len()));
            self.sent
                .borrow_mut()
                .push((message.to_string(), session_id.to_string()));
            self.results
                .borrow_mut()
                .pop_front()
                .expect("unexpected request")
        }

        async fn clear_conversation(&self, _session_id: &str) -> Result<(), ApiError> {
            self.cleared.set(self.cleared.get() + 1);
            if self.clear_fails {
                Err(ApiError::Status {
                    status: StatusCode::NOT_FOUND,
                    message: Some("Session not found".into()),
                })
            } else {
                Ok(())
            }
        }
    }

    /// Holds the request open until the test answers it.
    struct Gated {
        rx: RefCell<Option<oneshot::Receiver<Result<ChatReply, ApiError>>>>,
    }

    impl ChatBackend for &Gated {
        async fn chat(&self, _message: &str, _session_id: &str) -> Result<ChatReply, ApiError> {
            let rx = self.rx.borrow_mut().take().expect("single request");
            rx.await.expect("answered")
        }

        async fn clear_conversation(&self, _session_id: &str) -> Result<(), ApiError> {
            Ok(())
        }
    }

    /// Server-side delete that never answers.
    struct Stalled;

    impl ChatBackend for &Stalled {
        async fn chat(&self, _message: &str, _session_id: &str) -> Result<ChatReply, ApiError> {
            Ok(confirmed())
        }

        async fn clear_conversation(&self, _session_id: &str) -> Result<(), ApiError> {
            futures::future::pending().await
        }
    }

    struct Panicking;

    impl ChatBackend for &Panicking {
        async fn chat(&self, _message: &str, _session_id: &str) -> Result<ChatReply, ApiError> {
            panic!("transport blew up")
        }

        async fn clear_conversation(&self, _session_id: &str) -> Result<(), ApiError> {
            panic!("transport blew up")
        }
    }

    struct Answer(bool);

    impl Dialog for Answer {
        fn confirm(&self, _prompt: &str) -> bool {
            self.0
        }

        fn alert(&self, _message: &str) {}
    }

    fn shared() -> Shared {
        Rc::new(RefCell::new(ConversationState::new(Utc::now())))
    }

    fn confirmed() -> ChatReply {
        ChatReply {
            message: "Sure, confirming 3pm tomorrow.".into(),
            timestamp: Some("2024-01-01T15:00:00Z".into()),
            metadata: None,
        }
    }

    fn malformed() -> ApiError {
        ApiError::Malformed(serde_json::from_str::<ChatReplyShape>("{").unwrap_err())
    }

    #[derive(Debug, serde::Deserialize)]
    struct ChatReplyShape {}

    #[test]
    fn starts_with_welcome() {
        let state = ConversationState::new(Utc::now());
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.messages[0].role, Role::Assistant);
        assert_eq!(state.messages[0].content, WELCOME);
        assert!(!state.pending);
    }

    #[test]
    fn successful_send() {
        let state = shared();
        let backend = Scripted::new(&state, vec![Ok(confirmed())]);
        let manager = ConversationManager::new(&backend, state.clone(), "session_1".into());
        manager.set_draft(DRAFT.into());

        assert!(block_on(manager.send_message()));

        let state = state.borrow();
        assert!(!state.pending);
        assert!(state.draft.is_empty());
        assert_eq!(state.messages.len(), 3);
        let user = &state.messages[1];
        assert_eq!(user.role, Role::User);
        assert_eq!(user.content, DRAFT);
        let assistant = &state.messages[2];
        assert_eq!(assistant.role, Role::Assistant);
        assert_eq!(assistant.content, "Sure, confirming 3pm tomorrow.");
        assert_eq!(assistant.timestamp, "2024-01-01T15:00:00Z");
        assert!(!assistant.is_error);
        assert_eq!(
            *backend.sent.borrow(),
            vec![(DRAFT.to_string(), "session_1".to_string())]
        );
    }

    #[test]
    fn echo_and_pending_precede_the_request() {
        let state = shared();
        let backend = Scripted::new(&state, vec![Ok(confirmed())]);
        let manager = ConversationManager::new(&backend, state.clone(), "s".into());
        manager.set_draft(DRAFT.into());
        block_on(manager.send_message());
        // Welcome plus the echo were in the log, and pending was set.
        assert_eq!(*backend.seen.borrow(), vec![(true, 2)]);
    }

    #[test]
    fn server_error_appends_apology() {
        let state = shared();
        let backend = Scripted::new(
            &state,
            vec![Err(ApiError::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: None,
            })],
        );
        let manager = ConversationManager::new(&backend, state.clone(), "s".into());
        manager.set_draft(DRAFT.into());

        assert!(block_on(manager.send_message()));

        let state = state.borrow();
        assert!(!state.pending);
        let tail = &state.messages[state.messages.len() - 2..];
        assert_eq!(tail[0].role, Role::User);
        assert_eq!(tail[0].content, DRAFT);
        assert_eq!(tail[1].role, Role::Assistant);
        assert_eq!(tail[1].content, APOLOGY);
        assert!(tail[1].is_error);
    }

    #[test]
    fn every_outcome_grows_log_by_two() {
        let state = shared();
        let backend = Scripted::new(
            &state,
            vec![
                Ok(confirmed()),
                Err(ApiError::Rejected("RATE_LIMIT_EXCEEDED".into())),
                Err(malformed()),
                Err(ApiError::Status {
                    status: StatusCode::BAD_GATEWAY,
                    message: None,
                }),
            ],
        );
        let manager = ConversationManager::new(&backend, state.clone(), "s".into());
        for round in 1..=4 {
            manager.set_draft(format!("message {round}"));
            assert!(block_on(manager.send_message()));
            let state = state.borrow();
            assert_eq!(state.messages.len(), 1 + 2 * round);
            assert!(!state.pending);
        }
        let errors = state
            .borrow()
            .messages
            .iter()
            .filter(|message| message.is_error)
            .count();
        assert_eq!(errors, 3);
    }

    #[test]
    fn blank_drafts_are_ignored() {
        let state = shared();
        let backend = Scripted::new(&state, vec![]);
        let manager = ConversationManager::new(&backend, state.clone(), "s".into());
        for draft in ["", "   ", "\n\t "] {
            manager.set_draft(draft.into());
            assert!(!block_on(manager.send_message()));
        }
        assert_eq!(state.borrow().messages.len(), 1);
        assert!(!state.borrow().pending);
        assert!(backend.sent.borrow().is_empty());
    }

    #[test]
    fn draft_is_sent_untrimmed() {
        let state = shared();
        let backend = Scripted::new(&state, vec![Ok(confirmed())]);
        let manager = ConversationManager::new(&backend, state.clone(), "s".into());
        manager.set_draft("  hello  ".into());
        block_on(manager.send_message());
        assert_eq!(backend.sent.borrow()[0].0, "  hello  ");
        assert_eq!(state.borrow().messages[1].content, "  hello  ");
    }

    #[test]
    fn second_send_while_pending_is_ignored() {
        let state = shared();
        let (tx, rx) = oneshot::channel();
        let backend = Gated {
            rx: RefCell::new(Some(rx)),
        };
        let manager = ConversationManager::new(&backend, state.clone(), "s".into());
        manager.set_draft(DRAFT.into());

        let first = manager.send_message();
        let second = async {
            assert!(state.borrow().pending);
            assert_eq!(state.borrow().messages.len(), 2);

            manager.set_draft("again".into());
            assert!(!manager.send_message().await);
            assert_eq!(state.borrow().messages.len(), 2);
            assert!(state.borrow().pending);

            tx.send(Ok(confirmed())).unwrap();
        };
        let (issued, ()) = block_on(async { futures::join!(first, second) });

        assert!(issued);
        let state = state.borrow();
        assert!(!state.pending);
        assert_eq!(state.messages.len(), 3);
        // The rejected draft is still in the input.
        assert_eq!(state.draft, "again");
    }

    #[test]
    fn dropped_request_releases_pending() {
        let state = shared();
        let (_tx, rx) = oneshot::channel();
        let backend = Gated {
            rx: RefCell::new(Some(rx)),
        };
        let manager = ConversationManager::new(&backend, state.clone(), "s".into());
        manager.set_draft(DRAFT.into());

        let mut send = Box::pin(manager.send_message());
        assert!((&mut send).now_or_never().is_none());
        assert!(state.borrow().pending);
        drop(send);

        assert!(!state.borrow().pending);
        assert_eq!(state.borrow().messages.len(), 2);
    }

    #[test]
    fn panic_in_request_releases_pending() {
        let state = shared();
        let manager = ConversationManager::new(&Panicking, state.clone(), "s".into());
        manager.set_draft(DRAFT.into());

        let outcome = catch_unwind(AssertUnwindSafe(|| block_on(manager.send_message())));

        assert!(outcome.is_err());
        assert!(!state.borrow().pending);
    }

    #[test]
    fn clear_requires_confirmation() {
        let state = shared();
        let backend = Scripted::new(&state, vec![Ok(confirmed())]);
        let manager = ConversationManager::new(&backend, state.clone(), "s".into());
        manager.set_draft(DRAFT.into());
        block_on(manager.send_message());

        assert!(!block_on(manager.clear_conversation(&Answer(false))));
        assert_eq!(state.borrow().messages.len(), 3);
        assert_eq!(backend.cleared.get(), 0);
    }

    #[test]
    fn clear_resets_log_even_when_backend_fails() {
        for clear_fails in [false, true] {
            let state = shared();
            let mut backend = Scripted::new(&state, vec![Ok(confirmed())]);
            backend.clear_fails = clear_fails;
            let manager = ConversationManager::new(&backend, state.clone(), "s".into());
            manager.set_draft(DRAFT.into());
            block_on(manager.send_message());

            assert!(block_on(manager.clear_conversation(&Answer(true))));

            let state = state.borrow();
            assert_eq!(state.messages.len(), 1);
            assert_eq!(state.messages[0].role, Role::Assistant);
            assert_eq!(state.messages[0].content, CLEARED);
            assert_eq!(backend.cleared.get(), 1);
            assert_eq!(manager.session_id(), "s");
        }
    }

    #[test]
    fn clear_does_not_wait_for_backend() {
        let state = shared();
        let manager = ConversationManager::new(&Stalled, state.clone(), "s".into());
        manager.set_draft(DRAFT.into());
        block_on(manager.send_message());
        assert_eq!(state.borrow().messages.len(), 3);

        let mut clear = Box::pin(manager.clear_conversation(&Answer(true)));
        assert!((&mut clear).now_or_never().is_none());

        let state = state.borrow();
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.messages[0].content, CLEARED);
    }

    #[test]
    fn reply_to_a_cleared_conversation_is_dropped() {
        let state = shared();
        let (tx, rx) = oneshot::channel();
        let backend = Gated {
            rx: RefCell::new(Some(rx)),
        };
        let manager = ConversationManager::new(&backend, state.clone(), "s".into());
        manager.set_draft(DRAFT.into());

        let send = manager.send_message();
        let clear = async {
            assert!(manager.clear_conversation(&Answer(true)).await);
            // The gate still holds until the old request settles.
            assert!(state.borrow().pending);
            manager.set_draft("again".into());
            assert!(!manager.send_message().await);
            tx.send(Ok(confirmed())).unwrap();
        };
        let (issued, ()) = block_on(async { futures::join!(send, clear) });

        assert!(issued);
        let state = state.borrow();
        assert!(!state.pending);
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.messages[0].content, CLEARED);
        assert_eq!(state.generation, 1);
    }

    #[test]
    fn missing_server_timestamp_uses_local_time() {
        let now = Utc::now();
        let reply = Reply::from_result(
            Ok(ChatReply {
                message: "hi".into(),
                timestamp: None,
                metadata: None,
            }),
            now,
        );
        assert_eq!(
            reply,
            Reply::Ok {
                content: "hi".into(),
                timestamp: iso(now),
                metadata: None
            }
        );
    }
}
