//! Async chat entry point for ChatSession.

use std::sync::Arc;

use tracing::warn;

use crate::{AiError, Message, Role};

use super::manager::{ChatSession, ClientState};

/// Shown when the model provider reports quota exhaustion.
const QUOTA_MESSAGE: &str = "Looks like you have reached your limit. Please, return later.";
/// Shown on any other completion failure.
const FAILURE_MESSAGE: &str = "Looks like something is wrong. Please, try again later.";

/// Map a completion error to the user-facing fallback line.
pub fn fallback_message(err: &AiError) -> &'static str {
    match err {
        AiError::RateLimited => QUOTA_MESSAGE,
        _ => FAILURE_MESSAGE,
    }
}

impl ChatSession {
    /// Record the user message and get the assistant's reply.
    ///
    /// Failures never propagate: the return value is either the model's text
    /// or a fallback line. The user turn stays in history either way; the
    /// assistant turn is appended only on success, so the transcript records
    /// exactly what was sent and answered. No retries.
    pub async fn get_response(&mut self, user_message: impl Into<String>) -> String {
        self.ensure_ready();

        self.history.push(Message {
            role: Role::User,
            content: user_message.into(),
        });

        let ClientState::Ready {
            client,
            system_prompt,
        } = &self.state
        else {
            unreachable!("ensure_ready binds the client");
        };

        let mut messages = Vec::with_capacity(self.history.len() + 1);
        messages.push(Message {
            role: Role::System,
            content: system_prompt.clone(),
        });
        messages.extend(self.history.iter().cloned());

        let client = Arc::clone(client);
        match client.send_message(&messages).await {
            Ok(reply) => {
                self.history.push(Message {
                    role: Role::Assistant,
                    content: reply.clone(),
                });
                reply
            }
            Err(err) => {
                warn!(%err, "completion failed");
                fallback_message(&err).to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::prompt::Profile;
    use crate::AiClient;

    use super::*;

    /// Scripted backend: pops one outcome per call, records every message
    /// list it was invoked with.
    #[derive(Default)]
    struct StubClient {
        replies: Mutex<VecDeque<Result<String, AiError>>>,
        calls: Mutex<Vec<Vec<Message>>>,
    }

    impl StubClient {
        fn scripted(replies: Vec<Result<String, AiError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<Vec<Message>> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AiClient for StubClient {
        async fn send_message(&self, messages: &[Message]) -> Result<String, AiError> {
            self.calls.lock().unwrap().push(messages.to_vec());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("ok".into()))
        }
    }

    fn character() -> Profile {
        Profile {
            id: 1,
            name: "Sunday".into(),
            prompt: "calm and wise".into(),
        }
    }

    fn persona() -> Profile {
        Profile {
            id: 2,
            name: "Trailblazer".into(),
            prompt: "curious explorer".into(),
        }
    }

    /// Session wired to a stub backend plus a counter of factory invocations.
    fn stub_session(
        stub: Arc<StubClient>,
        builds: Arc<AtomicUsize>,
    ) -> ChatSession {
        ChatSession::with_client_factory(
            "test-key",
            Some(character()),
            Some(persona()),
            Box::new(move |_key| -> Arc<dyn AiClient> {
                builds.fetch_add(1, Ordering::SeqCst);
                stub.clone()
            }),
        )
    }

    #[tokio::test]
    async fn reply_is_returned_and_recorded() {
        let stub = StubClient::scripted(vec![Ok("Hi there".into())]);
        let mut session = stub_session(stub.clone(), Arc::default());

        let reply = session.get_response("Hello").await;

        assert_eq!(reply, "Hi there");
        assert_eq!(
            session.history(),
            &[
                Message {
                    role: Role::User,
                    content: "Hello".into()
                },
                Message {
                    role: Role::Assistant,
                    content: "Hi there".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn quota_failure_keeps_user_turn_only() {
        let stub = StubClient::scripted(vec![Err(AiError::RateLimited)]);
        let mut session = stub_session(stub.clone(), Arc::default());

        let reply = session.get_response("Hello").await;

        assert_eq!(
            reply,
            "Looks like you have reached your limit. Please, return later."
        );
        assert_eq!(
            session.history(),
            &[Message {
                role: Role::User,
                content: "Hello".into()
            }]
        );
    }

    #[tokio::test]
    async fn other_failure_maps_to_generic_line() {
        let stub = StubClient::scripted(vec![Err(AiError::NetworkError(
            "connection reset".into(),
        ))]);
        let mut session = stub_session(stub.clone(), Arc::default());

        let reply = session.get_response("Hello").await;

        assert_eq!(
            reply,
            "Looks like something is wrong. Please, try again later."
        );
        assert_eq!(session.history().len(), 1);
    }

    #[tokio::test]
    async fn history_grows_two_turns_per_successful_call() {
        let stub = StubClient::scripted(vec![Ok("first".into()), Ok("second".into())]);
        let mut session = stub_session(stub.clone(), Arc::default());

        session.get_response("one").await;
        session.get_response("two").await;

        let contents: Vec<_> = session
            .history()
            .iter()
            .map(|m| (m.role, m.content.as_str()))
            .collect();
        assert_eq!(
            contents,
            vec![
                (Role::User, "one"),
                (Role::Assistant, "first"),
                (Role::User, "two"),
                (Role::Assistant, "second"),
            ]
        );
    }

    #[tokio::test]
    async fn invocation_carries_system_prompt_then_transcript() {
        let stub = StubClient::scripted(vec![Ok("first".into()), Ok("second".into())]);
        let mut session = stub_session(stub.clone(), Arc::default());

        session.get_response("one").await;
        session.get_response("two").await;

        let calls = stub.calls();
        assert_eq!(calls.len(), 2);

        let second = &calls[1];
        assert_eq!(second[0].role, Role::System);
        assert!(second[0].content.contains("You are character: Sunday."));
        assert!(second[0].content.contains("User is persona: Trailblazer."));
        // Prior transcript in order, newest user message last.
        assert_eq!(second[1].content, "one");
        assert_eq!(second[2].content, "first");
        assert_eq!(second[3].content, "two");
        assert_eq!(second.len(), 4);
    }

    #[tokio::test]
    async fn client_is_built_once_until_profiles_change() {
        let stub = StubClient::scripted(vec![Ok("a".into()), Ok("b".into()), Ok("c".into())]);
        let builds = Arc::new(AtomicUsize::new(0));
        let mut session = stub_session(stub.clone(), builds.clone());

        session.get_response("one").await;
        session.get_response("two").await;
        assert_eq!(builds.load(Ordering::SeqCst), 1);

        session.update_persona(Profile {
            id: 3,
            name: "March 7th".into(),
            prompt: "cheerful photographer".into(),
        });
        session.get_response("three").await;
        assert_eq!(builds.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn profile_update_rebinds_prompt_and_keeps_history() {
        let stub = StubClient::scripted(vec![Ok("a".into()), Ok("b".into())]);
        let mut session = stub_session(stub.clone(), Arc::default());

        session.get_response("one").await;
        session.update_character(Profile {
            id: 9,
            name: "Robin".into(),
            prompt: "gentle singer".into(),
        });
        session.get_response("two").await;

        let calls = stub.calls();
        assert!(calls[0][0].content.contains("You are character: Sunday."));
        assert!(calls[1][0].content.contains("You are character: Robin."));
        assert_ne!(calls[0][0].content, calls[1][0].content);
        // Pre-change history survives the profile swap.
        assert_eq!(session.history()[0].content, "one");
        assert_eq!(session.history()[1].content, "a");
    }

    #[tokio::test]
    async fn clear_history_empties_the_prior_transcript() {
        let stub = StubClient::scripted(vec![Ok("a".into()), Ok("b".into())]);
        let mut session = stub_session(stub.clone(), Arc::default());

        session.get_response("one").await;
        session.clear_history();
        session.get_response("two").await;

        let calls = stub.calls();
        // System prompt plus the new user message only.
        assert_eq!(calls[1].len(), 2);
        assert_eq!(calls[1][1].content, "two");
    }

    #[tokio::test]
    async fn add_to_history_feeds_the_next_invocation() {
        let stub = StubClient::scripted(vec![Ok("a".into())]);
        let mut session = stub_session(stub.clone(), Arc::default());

        session.add_to_history(Role::User, "earlier question");
        session.add_to_history(Role::Assistant, "earlier answer");
        session.get_response("now").await;

        let call = &stub.calls()[0];
        assert_eq!(call[1].content, "earlier question");
        assert_eq!(call[2].content, "earlier answer");
        assert_eq!(call[3].content, "now");
    }

    #[test]
    fn fallback_mapping_is_keyed_on_rate_limiting_only() {
        assert_eq!(
            fallback_message(&AiError::RateLimited),
            "Looks like you have reached your limit. Please, return later."
        );
        for err in [
            AiError::ApiError("HTTP 500".into()),
            AiError::NetworkError("dns failure".into()),
            AiError::ParseError("no candidates".into()),
        ] {
            assert_eq!(
                fallback_message(&err),
                "Looks like something is wrong. Please, try again later."
            );
        }
    }
}
