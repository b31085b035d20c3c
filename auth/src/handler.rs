use std::future::Future;
use std::pin::Pin;

use tdlink_client::Client;
use tdlink_types::AuthorizationState;

use crate::error::AuthError;

pub type HandlerFut<'a> = Pin<Box<dyn Future<Output = Result<(), AuthError>> + Send + 'a>>;

/// One login flow: supplies whatever a given authorization state asks for.
///
/// The state machine calls [`handle`](Self::handle) for every non-terminal
/// state it observes and [`close`](Self::close) exactly once when it exits.
pub trait AuthorizationHandler: Send {
    fn handle<'a>(&'a mut self, client: &'a Client, state: &'a AuthorizationState)
    -> HandlerFut<'a>;

    /// Release prompt channels and other resources.
    fn close(&mut self);
}

impl<H: AuthorizationHandler + ?Sized> AuthorizationHandler for Box<H> {
    fn handle<'a>(
        &'a mut self,
        client: &'a Client,
        state: &'a AuthorizationState,
    ) -> HandlerFut<'a> {
        (**self).handle(client, state)
    }

    fn close(&mut self) {
        (**self).close();
    }
}

/// Closes the handler when dropped, so every exit path closes it once.
pub(crate) struct CloseOnExit<'h, H: AuthorizationHandler + ?Sized> {
    handler: &'h mut H,
}

impl<'h, H: AuthorizationHandler + ?Sized> CloseOnExit<'h, H> {
    pub fn new(handler: &'h mut H) -> Self {
        Self { handler }
    }

    pub fn handler(&mut self) -> &mut H {
        self.handler
    }
}

impl<H: AuthorizationHandler + ?Sized> Drop for CloseOnExit<'_, H> {
    fn drop(&mut self) {
        self.handler.close();
    }
}
