//! Authorization handshake for tdlink connections.
//!
//! The engine decides which credential it wants next and announces it as an
//! authorization-state event. [`authorize`] feeds each state to a pluggable
//! [`AuthorizationHandler`] until the connection is ready or closed. Three
//! handlers cover the usual flows: [`InteractiveAuthorizer`] (phone number and
//! code typed by a person), [`TokenAuthorizer`] (long-lived token), and
//! [`LinkAuthorizer`] (confirmation on another device).

mod credentials;
mod error;
mod handler;
mod interactive;
mod link;
mod machine;
mod terminal;
mod token;

pub use credentials::{CredentialKind, CredentialPrompts, CredentialRequest};
pub use error::AuthError;
pub use handler::{AuthorizationHandler, HandlerFut};
pub use interactive::InteractiveAuthorizer;
pub use link::{LinkAuthorizer, LinkCallback};
pub use machine::{AuthorizeOptions, authorize};
pub use terminal::{run_prompts, run_terminal_prompts};
pub use token::TokenAuthorizer;

use tdlink_client::{Client, ClientOptions, Router};

/// Open a connection on `router` and authorize it with `handler`.
///
/// On failure the connection has been asked to close and the handler has
/// been closed.
pub async fn new_client<H>(
    router: &Router,
    handler: &mut H,
    options: ClientOptions,
    authorize_options: &AuthorizeOptions,
) -> Result<Client, AuthError>
where
    H: AuthorizationHandler + ?Sized,
{
    let client = router.open(options)?;
    authorize(&client, handler, authorize_options).await?;
    Ok(client)
}
