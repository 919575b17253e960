//! User confirmation step of the delete workflow

use async_trait::async_trait;

/// Asks the user whether an image should really be deleted
#[async_trait]
pub trait DeleteConfirmation: Send + Sync {
    /// Resolves once the user has decided, `true` to proceed
    async fn confirm(&self, key: &str) -> bool;
}

/// A decision the user already made before the request reached the
/// controller, e.g. in a browser confirm dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserDecision(pub bool);

#[async_trait]
impl DeleteConfirmation for UserDecision {
    async fn confirm(&self, _key: &str) -> bool {
        self.0
    }
}
