//! CredentialManager: access-token lifecycle
//!
//! Fetches the first token when the host is ready, then renews it blindly at
//! half of the advertised lifetime, forever. Failed grants are retried after a
//! fixed delay with no attempt limit.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time;

use crate::error::TuyaError;
use crate::tuya::client::TuyaClient;
use crate::tuya::models::{ApiResponse, TokenResult};

pub const TOKEN_PATH: &str = "/v1.0/token";
const GRANT_TYPE: &str = "1";
const MIN_RENEWAL_DELAY: Duration = Duration::from_secs(1);

/// Current token. Empty until the first successful grant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: String,
    pub expire_seconds: u64,
}

impl Credentials {
    pub fn is_empty(&self) -> bool {
        self.access_token.is_empty()
    }
}

impl From<TokenResult> for Credentials {
    fn from(result: TokenResult) -> Self {
        Self {
            access_token: result.access_token,
            expire_seconds: result.expire_time,
        }
    }
}

/// Delay before the next unconditional refresh: half the token lifetime
pub fn renewal_delay(expire_seconds: u64) -> Duration {
    Duration::from_millis(expire_seconds.saturating_mul(500)).max(MIN_RENEWAL_DELAY)
}

fn mask_token(token: &str) -> String {
    let prefix: String = token.chars().take(4).collect();
    format!("{}****", prefix)
}

pub struct CredentialManager {
    client: Arc<TuyaClient>,
    credentials: RwLock<Credentials>,
    retry_delay: Duration,
}

impl CredentialManager {
    pub fn new(client: Arc<TuyaClient>, retry_delay: Duration) -> Self {
        Self {
            client,
            credentials: RwLock::new(Credentials::default()),
            retry_delay,
        }
    }

    /// Token to sign the next request with ("" while none is held)
    pub async fn current_token(&self) -> String {
        self.credentials.read().await.access_token.clone()
    }

    pub async fn credentials(&self) -> Credentials {
        self.credentials.read().await.clone()
    }

    /// Signed GET using whatever token is held at call time.
    ///
    /// Not retried here; a token replaced mid-flight simply fails this call.
    pub async fn get(
        &self,
        path: &str,
        params: &[(&str, &str)],
        body: &str,
    ) -> Result<ApiResponse, TuyaError> {
        let token = self.current_token().await;
        self.client.get(path, params, body, &token).await
    }

    /// One grant attempt. The held token is cleared first so the call is
    /// signed with the bootstrap secret, and stays cleared on failure.
    async fn fetch_token(&self) -> Result<Credentials, TuyaError> {
        *self.credentials.write().await = Credentials::default();

        tracing::debug!("[Credentials] API access point: {}", self.client.base_url());
        let response = self
            .client
            .get(TOKEN_PATH, &[("grant_type", GRANT_TYPE)], "", "")
            .await?;
        let credentials = Credentials::from(response.into_result::<TokenResult>()?);

        *self.credentials.write().await = credentials.clone();
        Ok(credentials)
    }

    /// Obtain a fresh token, retrying after the fixed delay until one is granted.
    ///
    /// `retry` only marks whether this call follows an earlier failure.
    pub async fn refresh(&self, retry: bool) -> Credentials {
        let mut retry = retry;
        loop {
            if retry {
                tracing::info!("[Credentials] Retrying authentication after previous error");
            }

            match self.fetch_token().await {
                Ok(credentials) => {
                    tracing::info!(
                        "[Credentials] Retrieved an access token {} (expires in {} sec)",
                        mask_token(&credentials.access_token),
                        credentials.expire_seconds
                    );
                    return credentials;
                }
                Err(e) => {
                    tracing::error!(
                        "[Credentials] Error retrieving the access token: {} (retrying in {:?})",
                        e,
                        self.retry_delay
                    );
                    time::sleep(self.retry_delay).await;
                    retry = true;
                }
            }
        }
    }

    /// Refresh loop: fetch, notify, sleep half the lifetime, repeat.
    ///
    /// Never returns; stop it by aborting the task it runs on.
    pub async fn run<F, Fut>(self: Arc<Self>, mut on_refreshed: F)
    where
        F: FnMut(Credentials) -> Fut,
        Fut: Future<Output = ()>,
    {
        loop {
            let credentials = self.refresh(false).await;
            let delay = renewal_delay(credentials.expire_seconds);

            on_refreshed(credentials).await;

            tracing::debug!("[Credentials] Next token refresh in {:?}", delay);
            time::sleep(delay).await;
        }
    }

    #[cfg(test)]
    pub(crate) async fn set_credentials(&self, credentials: Credentials) {
        *self.credentials.write().await = credentials;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use mockito::{Matcher, Server};
    use std::time::Instant;
    use tokio::sync::mpsc;

    const TOKEN_BODY: &str =
        r#"{"success":true,"result":{"access_token":"T1","expire_time":7200,"uid":"u1"}}"#;

    fn manager(url: &str, retry_delay: Duration) -> Arc<CredentialManager> {
        let client = Arc::new(TuyaClient::new(&test_config(url, &[])).unwrap());
        Arc::new(CredentialManager::new(client, retry_delay))
    }

    async fn refresh_within(manager: &CredentialManager, limit: Duration) -> Credentials {
        time::timeout(limit, manager.refresh(false))
            .await
            .expect("refresh did not complete in time")
    }

    #[test]
    fn test_renewal_delay_is_half_lifetime() {
        assert_eq!(renewal_delay(7200), Duration::from_secs(3600));
        assert_eq!(renewal_delay(7201), Duration::from_millis(3_600_500));
        assert_eq!(renewal_delay(0), MIN_RENEWAL_DELAY);
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("abcdef123"), "abcd****");
        assert_eq!(mask_token("ab"), "ab****");
    }

    #[tokio::test]
    async fn test_refresh_stores_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", TOKEN_PATH)
            .match_query(Matcher::UrlEncoded("grant_type".into(), "1".into()))
            .with_body(TOKEN_BODY)
            .create_async()
            .await;

        let manager = manager(&server.url(), Duration::from_millis(10));
        assert!(manager.credentials().await.is_empty());

        let credentials = refresh_within(&manager, Duration::from_secs(5)).await;

        assert_eq!(credentials.access_token, "T1");
        assert_eq!(credentials.expire_seconds, 7200);
        assert_eq!(manager.current_token().await, "T1");
        assert_eq!(manager.credentials().await, credentials);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_refresh_clears_held_token_and_uses_secret() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", TOKEN_PATH)
            .match_query(Matcher::UrlEncoded("grant_type".into(), "1".into()))
            .match_header("secret", "bootstrap-secret")
            .match_header("access_token", Matcher::Missing)
            .with_body(TOKEN_BODY)
            .expect(1)
            .create_async()
            .await;

        let manager = manager(&server.url(), Duration::from_millis(10));
        manager
            .set_credentials(Credentials {
                access_token: "OLD".to_string(),
                expire_seconds: 10,
            })
            .await;

        let credentials = refresh_within(&manager, Duration::from_secs(5)).await;

        assert_eq!(credentials.access_token, "T1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_refresh_retries_after_fixed_delay() {
        let mut server = Server::new_async().await;
        let failure = server
            .mock("GET", TOKEN_PATH)
            .match_query(Matcher::UrlEncoded("grant_type".into(), "1".into()))
            .with_status(500)
            .expect(1)
            .create_async()
            .await;
        let success = server
            .mock("GET", TOKEN_PATH)
            .match_query(Matcher::UrlEncoded("grant_type".into(), "1".into()))
            .match_header("secret", "bootstrap-secret")
            .match_header("access_token", Matcher::Missing)
            .with_body(TOKEN_BODY)
            .expect(1)
            .create_async()
            .await;

        let retry_delay = Duration::from_millis(200);
        let manager = manager(&server.url(), retry_delay);

        let started = Instant::now();
        let credentials = refresh_within(&manager, Duration::from_secs(5)).await;

        assert!(started.elapsed() >= retry_delay);
        assert_eq!(credentials.access_token, "T1");
        failure.assert_async().await;
        success.assert_async().await;
    }

    #[tokio::test]
    async fn test_malformed_token_body_is_retried() {
        let mut server = Server::new_async().await;
        let malformed = server
            .mock("GET", TOKEN_PATH)
            .match_query(Matcher::UrlEncoded("grant_type".into(), "1".into()))
            .with_body(r#"{"success":true,"result":{"expire_time":7200}}"#)
            .expect(1)
            .create_async()
            .await;
        let success = server
            .mock("GET", TOKEN_PATH)
            .match_query(Matcher::UrlEncoded("grant_type".into(), "1".into()))
            .with_body(TOKEN_BODY)
            .expect(1)
            .create_async()
            .await;

        let manager = manager(&server.url(), Duration::from_millis(10));
        let credentials = refresh_within(&manager, Duration::from_secs(5)).await;

        assert_eq!(credentials.access_token, "T1");
        malformed.assert_async().await;
        success.assert_async().await;
    }

    #[tokio::test]
    async fn test_token_stays_cleared_while_failing() {
        let mut server = Server::new_async().await;
        let _failure = server
            .mock("GET", TOKEN_PATH)
            .match_query(Matcher::UrlEncoded("grant_type".into(), "1".into()))
            .with_status(500)
            .expect_at_least(1)
            .create_async()
            .await;

        let manager = manager(&server.url(), Duration::from_millis(50));
        manager
            .set_credentials(Credentials {
                access_token: "OLD".to_string(),
                expire_seconds: 10,
            })
            .await;

        let refreshing = Arc::clone(&manager);
        let handle = tokio::spawn(async move { refreshing.refresh(false).await });

        time::sleep(Duration::from_millis(120)).await;
        assert_eq!(manager.current_token().await, "");
        assert!(!handle.is_finished());
        handle.abort();
    }

    #[tokio::test]
    async fn test_get_uses_current_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v1.0/devices/dev1/status")
            .match_header("access_token", "T1")
            .match_header("secret", Matcher::Missing)
            .with_body(r#"{"success":true,"result":[]}"#)
            .create_async()
            .await;

        let manager = manager(&server.url(), Duration::from_millis(10));
        manager
            .set_credentials(Credentials {
                access_token: "T1".to_string(),
                expire_seconds: 7200,
            })
            .await;

        let resp = manager
            .get("/v1.0/devices/dev1/status", &[], "")
            .await
            .unwrap();
        assert!(resp.status.is_success());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_run_renews_and_notifies() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", TOKEN_PATH)
            .match_query(Matcher::UrlEncoded("grant_type".into(), "1".into()))
            .with_body(r#"{"success":true,"result":{"access_token":"T1","expire_time":0}}"#)
            .expect_at_least(2)
            .create_async()
            .await;

        let manager = manager(&server.url(), Duration::from_millis(10));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(Arc::clone(&manager).run(move |credentials| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(credentials);
            }
        }));

        for _ in 0..2 {
            let credentials = time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(credentials.access_token, "T1");
        }

        handle.abort();
        mock.assert_async().await;
    }
}
