//! Abstraction over one authenticated duplex connection.
//!
//! A [`Player`] exclusively owns its transport: no other component may read
//! or write it directly. `read`/`write` may be called concurrently with each
//! other from distinct tasks (the driver writes, a dedicated reader task
//! reads) but neither method is required to be re-entrant with itself.

use async_trait::async_trait;
use protocol::Message;
use tokio_util::sync::CancellationToken;

use crate::errors::{EngineError, PlayerError};

/// One authenticated, duplex, framed connection bound to a game instance.
#[async_trait]
pub trait Player: Send + Sync {
    /// The id supplied by the auth provider. Unique per live connection.
    fn id(&self) -> &str;

    /// This player's cancellation token, a child of its instance's token.
    /// Cancelling it unblocks both a pending `read` and a pending `write`.
    fn ctx(&self) -> &CancellationToken;

    /// Blocks until a frame arrives, the token is cancelled, or the
    /// transport fails.
    async fn read(&self) -> Result<Message, PlayerError>;

    /// Serializes one frame. On error the implementation MUST close the
    /// underlying connection before returning `BadMessage`.
    async fn write(&self, msg: Message) -> Result<(), PlayerError>;

    /// Cancels this player's token and closes the connection with a
    /// normal-close code.
    async fn close(&self);

    /// Cancels this player's token and closes the connection with an
    /// abnormal-close code, carrying `err`'s message as the close reason.
    async fn close_with_error(&self, err: &EngineError);
}
