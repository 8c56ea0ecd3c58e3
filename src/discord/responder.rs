//! Answering an interaction through the HTTP request it arrived with.

use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

use tokio::sync::oneshot;

use crate::discord::models::InteractionResponse;

/// One-shot channel back to the HTTP request an interaction was delivered on.
///
/// Discord expects the first answer to an interaction as the body of the HTTP
/// response. The interactions endpoint keeps the request open while the event is
/// processed and waits on the receiving half; whoever answers first takes the sender.
///
/// A default responder is already closed: every answer falls back to the REST
/// callback endpoint.
#[derive(Clone, Default)]
pub struct InteractionResponder {
    sender: Arc<Mutex<Option<oneshot::Sender<InteractionResponse>>>>,
}

impl InteractionResponder {
    /// Creates an open responder and the receiver the HTTP handler waits on.
    pub fn channel() -> (Self, oneshot::Receiver<InteractionResponse>) {
        let (sender, receiver) = oneshot::channel();
        let responder = InteractionResponder {
            sender: Arc::new(Mutex::new(Some(sender))),
        };

        (responder, receiver)
    }

    /// Sends the response as the HTTP answer.
    ///
    /// # Errors
    ///
    /// Gives the response back if the request was already answered or is no longer
    /// waiting, in which case it has to go through the REST callback endpoint.
    pub fn respond(&self, response: InteractionResponse) -> Result<(), InteractionResponse> {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match sender {
            Some(sender) => sender.send(response),
            None => Err(response),
        }
    }

    /// Returns `true` while the HTTP request can still be answered.
    pub fn is_open(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|sender| !sender.is_closed())
    }
}

impl fmt::Debug for InteractionResponder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractionResponder")
            .field("open", &self.is_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_respond_once() {
        let (responder, receiver) = InteractionResponder::channel();
        assert!(responder.is_open());

        assert!(responder.respond(InteractionResponse::pong()).is_ok());
        assert!(!responder.is_open());
        assert_eq!(receiver.await.unwrap(), InteractionResponse::pong());

        // Second answer is handed back
        assert_eq!(
            responder.respond(InteractionResponse::pong()),
            Err(InteractionResponse::pong())
        );
    }

    #[tokio::test]
    async fn test_clones_share_the_channel() {
        let (responder, _receiver) = InteractionResponder::channel();
        let clone = responder.clone();

        assert!(clone.respond(InteractionResponse::pong()).is_ok());
        assert!(responder.respond(InteractionResponse::pong()).is_err());
    }

    #[test]
    fn test_respond_after_receiver_dropped() {
        let (responder, receiver) = InteractionResponder::channel();
        drop(receiver);

        assert!(!responder.is_open());
        assert!(responder.respond(InteractionResponse::pong()).is_err());
    }

    #[test]
    fn test_default_is_closed() {
        let responder = InteractionResponder::default();
        assert!(!responder.is_open());
        assert!(responder.respond(InteractionResponse::pong()).is_err());
    }
}
