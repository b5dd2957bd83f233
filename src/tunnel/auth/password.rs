//! Password login, also used with an empty secret when a profile has nothing else.

use async_trait::async_trait;
use russh::client;

use crate::tunnel::session::SshClientHandler;

use super::traits::AuthStrategy;

pub struct PasswordAuth {
    password: String,
}

impl PasswordAuth {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.password.is_empty()
    }
}

#[async_trait]
impl AuthStrategy for PasswordAuth {
    async fn authenticate(
        &self,
        handle: &mut client::Handle<SshClientHandler>,
        username: &str,
    ) -> Result<bool, String> {
        handle
            .authenticate_password(username, self.password.as_str())
            .await
            .map(|result| result.success())
            .map_err(|e| format!("password exchange with server failed: {}", e))
    }

    fn name(&self) -> &'static str {
        "password"
    }
}
