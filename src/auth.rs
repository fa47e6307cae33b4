use std::time::UNIX_EPOCH;

use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    transport::{AppKey, Transport},
    UploadError,
};

/// Tokens expiring within this many seconds are refreshed before use.
pub const REFRESH_WINDOW_SECS: u64 = 5 * 60;

/// Source of the current time in unix seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        // a clock before the epoch only makes tokens look expired
        UNIX_EPOCH.elapsed().map(|d| d.as_secs()).unwrap_or(0)
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> u64 {
        (**self).now()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Unix seconds. Unknown expiry disables proactive refresh.
    #[serde(default)]
    pub expires_at: Option<u64>,
}

/// Owns the credentials of one upload session and keeps the access token
/// fresh.
pub struct CredentialManager<C = SystemClock> {
    app: AppKey,
    credentials: Credentials,
    clock: C,
}

impl CredentialManager<SystemClock> {
    pub fn new(app: AppKey, credentials: Credentials) -> Self {
        Self::with_clock(app, credentials, SystemClock)
    }
}

impl<C: Clock> CredentialManager<C> {
    pub fn with_clock(app: AppKey, credentials: Credentials, clock: C) -> Self {
        Self {
            app,
            credentials,
            clock,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.credentials.access_token
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn can_refresh(&self) -> bool {
        self.credentials.refresh_token.is_some()
    }

    pub fn expires_soon(&self) -> bool {
        match (&self.credentials.refresh_token, self.credentials.expires_at) {
            (Some(_), Some(exp)) => exp <= self.clock.now() + REFRESH_WINDOW_SECS,
            _ => false,
        }
    }

    pub async fn ensure_valid_token<T>(&mut self, transport: &T) -> Result<(), UploadError>
    where
        T: Transport + ?Sized,
    {
        if self.expires_soon() {
            self.refresh(transport).await?;
        }

        Ok(())
    }

    pub async fn refresh<T>(&mut self, transport: &T) -> Result<(), UploadError>
    where
        T: Transport + ?Sized,
    {
        let refresh_token = self
            .credentials
            .refresh_token
            .clone()
            .ok_or(UploadError::NoRefreshToken)?;

        let token = transport
            .refresh_token(self.app.clone(), refresh_token)
            .await
            .map_err(|e| {
                warn!(error = %e, "access token refresh failed");
                match e {
                    e @ UploadError::AuthRefresh(_) => e,
                    e => UploadError::AuthRefresh(e.to_string()),
                }
            })?;

        let expires_at = self.clock.now() + token.expires_in;
        self.credentials.access_token = token.access_token;
        self.credentials.expires_at = Some(expires_at);

        info!(expires_at, "access token refreshed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testing::{app_key, FakeClock, FakeTransport};

    fn manager(
        refresh_token: Option<&str>,
        expires_at: Option<u64>,
        clock: Arc<FakeClock>,
    ) -> CredentialManager<Arc<FakeClock>> {
        CredentialManager::with_clock(
            app_key(),
            Credentials {
                access_token: "initial".into(),
                refresh_token: refresh_token.map(String::from),
                expires_at,
            },
            clock,
        )
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_once() -> anyhow::Result<()> {
        let clock = Arc::new(FakeClock::new(1_000));
        let transport = FakeTransport::new();
        let mut m = manager(Some("r"), Some(1_000), clock.clone());

        m.ensure_valid_token(&transport).await?;
        m.ensure_valid_token(&transport).await?;

        assert_eq!(transport.refresh_count(), 1);
        assert_eq!(m.access_token(), "token-1");
        assert_eq!(m.credentials().expires_at, Some(1_000 + 14_400));
        Ok(())
    }

    #[tokio::test]
    async fn far_expiry_does_not_refresh() -> anyhow::Result<()> {
        let clock = Arc::new(FakeClock::new(1_000));
        let transport = FakeTransport::new();
        let mut m = manager(Some("r"), Some(1_000 + 3_600), clock.clone());

        m.ensure_valid_token(&transport).await?;
        assert_eq!(transport.refresh_count(), 0);

        // inside the safety window
        clock.set(1_000 + 3_600 - REFRESH_WINDOW_SECS);
        m.ensure_valid_token(&transport).await?;
        assert_eq!(transport.refresh_count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_expiry_or_missing_refresh_token_is_noop() -> anyhow::Result<()> {
        let clock = Arc::new(FakeClock::new(1_000));
        let transport = FakeTransport::new();

        manager(Some("r"), None, clock.clone())
            .ensure_valid_token(&transport)
            .await?;
        manager(None, Some(0), clock.clone())
            .ensure_valid_token(&transport)
            .await?;

        assert_eq!(transport.refresh_count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn refresh_without_refresh_token() {
        let transport = FakeTransport::new();
        let mut m = manager(None, None, Arc::new(FakeClock::new(0)));

        let r = m.refresh(&transport).await;
        assert!(matches!(r, Err(UploadError::NoRefreshToken)));
        assert_eq!(transport.refresh_count(), 0);
    }

    #[tokio::test]
    async fn failed_refresh_can_be_retried() -> anyhow::Result<()> {
        let transport = FakeTransport::new();
        let mut m = manager(Some("r"), Some(0), Arc::new(FakeClock::new(0)));

        transport.fail_refresh(true);
        let r = m.refresh(&transport).await;
        assert!(matches!(r, Err(UploadError::AuthRefresh(_))));
        assert_eq!(m.access_token(), "initial");

        transport.fail_refresh(false);
        m.refresh(&transport).await?;
        assert_eq!(m.access_token(), "token-2");
        Ok(())
    }
}
