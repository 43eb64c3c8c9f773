use anyhow::Result;
use async_trait::async_trait;
use storage::Storage;
use tokio::sync::RwLock;

pub const TOKEN_CREDENTIAL: &str = "momentum_token";

/// Durable home of the bearer token attached to every API call.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load_token(&self) -> Result<Option<String>>;
    async fn save_token(&self, token: &str) -> Result<()>;
    async fn clear_token(&self) -> Result<()>;
}

#[async_trait]
impl CredentialStore for Storage {
    async fn load_token(&self) -> Result<Option<String>> {
        Ok(self
            .load_credential(TOKEN_CREDENTIAL)
            .await?
            .map(|credential| credential.value))
    }

    async fn save_token(&self, token: &str) -> Result<()> {
        self.save_credential(TOKEN_CREDENTIAL, token).await
    }

    async fn clear_token(&self) -> Result<()> {
        self.delete_credential(TOKEN_CREDENTIAL).await?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryCredentialStore {
    token: RwLock<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load_token(&self) -> Result<Option<String>> {
        Ok(self.token.read().await.clone())
    }

    async fn save_token(&self, token: &str) -> Result<()> {
        *self.token.write().await = Some(token.to_string());
        Ok(())
    }

    async fn clear_token(&self) -> Result<()> {
        self.token.write().await.take();
        Ok(())
    }
}
