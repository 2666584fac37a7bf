//! Browser session fixture
//!
//! Owns at most one remote automation session per process and decides, per
//! test method, whether to reuse it, recreate it or only wipe its cookies.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::dispatcher::FixtureObserver;
use crate::event::TestMethod;
use crate::webdriver::WebDriverClient;
use fixturekit_common::{CaseType, FixtureError, FixtureResult, WebDriverConfig};

/// Remote automation endpoint operations
#[async_trait]
pub trait RemoteEndpoint: Send + Sync {
    /// Open a new session and return its id
    async fn open_session(&self, options: &SessionOptions) -> FixtureResult<String>;

    async fn quit_session(&self, session_id: &str) -> FixtureResult<()>;

    async fn list_cookies(&self, session_id: &str) -> FixtureResult<Vec<Cookie>>;

    async fn delete_all_cookies(&self, session_id: &str) -> FixtureResult<()>;
}

/// Options for opening a session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub capabilities: serde_json::Value,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&WebDriverConfig::default())
    }
}

impl From<&WebDriverConfig> for SessionOptions {
    fn from(config: &WebDriverConfig) -> Self {
        Self {
            capabilities: config.capabilities.clone(),
            connect_timeout: config.connect_timeout(),
            request_timeout: config.request_timeout(),
        }
    }
}

/// Browser cookie as reported by the endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<u64>,
}

/// A remote session: its id plus the command channel used to drive it.
///
/// The wrapper outlives an out-of-band quit; only the channel disappears.
/// Liveness therefore means "wrapper present and channel present".
pub struct BrowserSession {
    id: String,
    channel: Mutex<Option<Arc<dyn RemoteEndpoint>>>,
}

impl BrowserSession {
    pub fn new(id: impl Into<String>, channel: Arc<dyn RemoteEndpoint>) -> Self {
        Self {
            id: id.into(),
            channel: Mutex::new(Some(channel)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn has_channel(&self) -> bool {
        self.channel.lock().is_some()
    }

    fn channel(&self) -> FixtureResult<Arc<dyn RemoteEndpoint>> {
        self.channel
            .lock()
            .clone()
            .ok_or_else(|| FixtureError::invalid_state(format!("session {} is closed", self.id)))
    }

    /// Quit the remote session.
    ///
    /// The channel is dropped before the quit command is sent, so the session
    /// reads as closed even when the endpoint rejects the command.
    pub async fn quit(&self) -> FixtureResult<()> {
        let channel = self.channel.lock().take();
        match channel {
            Some(channel) => channel.quit_session(&self.id).await,
            None => Ok(()),
        }
    }

    /// Drop the command channel without talking to the endpoint
    pub fn detach(&self) {
        self.channel.lock().take();
    }

    pub async fn cookies(&self) -> FixtureResult<Vec<Cookie>> {
        self.channel()?.list_cookies(&self.id).await
    }

    pub async fn delete_all_cookies(&self) -> FixtureResult<()> {
        self.channel()?.delete_all_cookies(&self.id).await
    }
}

impl std::fmt::Debug for BrowserSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserSession")
            .field("id", &self.id)
            .field("has_channel", &self.has_channel())
            .finish()
    }
}

/// Fixture manager for the remote browser session
pub struct BrowserSessionFixtureManager {
    endpoint: Arc<dyn RemoteEndpoint>,
    options: SessionOptions,
    session: Option<Arc<BrowserSession>>,

    /// Set only while the running case declares it needs a browser
    driver_required: bool,
    share_driver: bool,
    share_cookies: bool,
}

impl BrowserSessionFixtureManager {
    pub fn new(endpoint: Arc<dyn RemoteEndpoint>, options: SessionOptions) -> Self {
        Self {
            endpoint,
            options,
            session: None,
            driver_required: false,
            share_driver: false,
            share_cookies: false,
        }
    }

    /// Manager talking to a WebDriver endpoint described by configuration
    pub fn from_config(config: &WebDriverConfig) -> FixtureResult<Self> {
        let client = WebDriverClient::new(&config.url)?;
        Ok(Self::new(Arc::new(client), SessionOptions::from(config)))
    }

    pub fn is_ready(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.has_channel())
    }

    pub fn session(&self) -> Option<Arc<BrowserSession>> {
        self.session.clone()
    }

    pub fn driver_required(&self) -> bool {
        self.driver_required
    }

    pub async fn create_session(&mut self) -> FixtureResult<Arc<BrowserSession>> {
        if self.is_ready() {
            return Err(FixtureError::invalid_state(
                "a browser session is already live; destroy it first",
            ));
        }

        let id = self.endpoint.open_session(&self.options).await?;
        info!("Opened browser session {}", id);

        let session = Arc::new(BrowserSession::new(id, self.endpoint.clone()));
        self.session = Some(session.clone());
        Ok(session)
    }

    /// Quit the session and forget it. The local wrapper is cleared even if
    /// the quit command fails; that failure is still returned.
    pub async fn destroy_session(&mut self) -> FixtureResult<()> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };

        debug!("Quitting browser session {}", session.id());
        session.quit().await.map_err(|e| {
            warn!("Failed to quit browser session {}: {}", session.id(), e);
            e
        })
    }

    fn reset(&mut self) {
        self.driver_required = false;
        self.share_driver = false;
        self.share_cookies = false;
    }
}

#[async_trait]
impl FixtureObserver for BrowserSessionFixtureManager {
    fn name(&self) -> &str {
        "browser"
    }

    async fn on_before_class(&mut self, case: &CaseType) -> FixtureResult<()> {
        // A case torn down without EndOfCase can leave its session behind
        if self.is_ready() {
            warn!("Browser session left over from a previous case, quitting it");
            self.destroy_session().await?;
        }
        self.session = None;
        self.reset();

        if !case.requires_browser {
            return Ok(());
        }

        self.driver_required = true;
        self.share_driver = case.policy.share_browser_session;
        self.share_cookies = case.policy.share_cookies;
        debug!(
            case = %case,
            share_driver = self.share_driver,
            share_cookies = self.share_cookies,
            "Browser required"
        );
        Ok(())
    }

    async fn on_before_test(&mut self, test: &TestMethod) -> FixtureResult<()> {
        if !self.driver_required {
            return Ok(());
        }

        if !self.is_ready() {
            // A stale wrapper left by an out-of-band quit is simply replaced
            self.session = None;
            self.create_session().await?;
        } else if !self.share_driver {
            self.destroy_session().await?;
            self.create_session().await?;
        } else if !self.share_cookies {
            if let Some(session) = &self.session {
                debug!("Clearing cookies on session {}", session.id());
                session.delete_all_cookies().await?;
            }
        }

        if let Some(session) = &self.session {
            test.attach_browser(session.clone());
        }
        Ok(())
    }

    async fn on_end_of_case(&mut self, _case: &CaseType) -> FixtureResult<()> {
        let result = if self.driver_required && self.is_ready() {
            self.destroy_session().await
        } else {
            Ok(())
        };
        self.reset();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixturekit_common::SharingPolicy;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeEndpoint {
        opened: AtomicUsize,
        quit: AtomicUsize,
        cookie_clears: AtomicUsize,
        fail_open: bool,
        fail_quit: bool,
    }

    #[async_trait]
    impl RemoteEndpoint for FakeEndpoint {
        async fn open_session(&self, _options: &SessionOptions) -> FixtureResult<String> {
            let n = self.opened.fetch_add(1, Ordering::SeqCst);
            if self.fail_open {
                return Err(FixtureError::transport("connection refused"));
            }
            Ok(format!("session-{}", n + 1))
        }

        async fn quit_session(&self, _session_id: &str) -> FixtureResult<()> {
            self.quit.fetch_add(1, Ordering::SeqCst);
            if self.fail_quit {
                return Err(FixtureError::transport("connection reset"));
            }
            Ok(())
        }

        async fn list_cookies(&self, _session_id: &str) -> FixtureResult<Vec<Cookie>> {
            Ok(Vec::new())
        }

        async fn delete_all_cookies(&self, _session_id: &str) -> FixtureResult<()> {
            self.cookie_clears.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn manager(endpoint: &Arc<FakeEndpoint>) -> BrowserSessionFixtureManager {
        BrowserSessionFixtureManager::new(endpoint.clone(), SessionOptions::default())
    }

    fn browser_case(share_browser_session: bool, share_cookies: bool) -> CaseType {
        CaseType::browser("BrowserCest").with_policy(SharingPolicy {
            share_browser_session,
            share_cookies,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_not_ready_after_destroy() {
        let endpoint = Arc::new(FakeEndpoint::default());
        let mut manager = manager(&endpoint);
        assert!(!manager.is_ready());

        manager.create_session().await.unwrap();
        assert!(manager.is_ready());

        manager.destroy_session().await.unwrap();
        assert!(!manager.is_ready());
        assert_eq!(endpoint.quit.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_not_ready_after_out_of_band_quit() {
        let endpoint = Arc::new(FakeEndpoint::default());
        let mut manager = manager(&endpoint);
        let session = manager.create_session().await.unwrap();

        session.detach();

        assert!(manager.session().is_some());
        assert!(!manager.is_ready());
    }

    #[tokio::test]
    async fn test_create_while_live_is_rejected() {
        let endpoint = Arc::new(FakeEndpoint::default());
        let mut manager = manager(&endpoint);
        manager.create_session().await.unwrap();

        let err = manager.create_session().await.unwrap_err();
        assert!(matches!(err, FixtureError::InvalidState(_)));
        assert_eq!(endpoint.opened.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_quit_still_clears_wrapper() {
        let endpoint = Arc::new(FakeEndpoint {
            fail_quit: true,
            ..Default::default()
        });
        let mut manager = manager(&endpoint);
        manager.create_session().await.unwrap();

        let err = manager.destroy_session().await.unwrap_err();
        assert!(err.is_transport());
        assert!(manager.session().is_none());
        assert!(!manager.is_ready());
    }

    #[tokio::test]
    async fn test_shared_session_clears_cookies_between_methods() {
        let endpoint = Arc::new(FakeEndpoint::default());
        let mut manager = manager(&endpoint);
        let case = browser_case(true, false);

        manager.on_before_class(&case).await.unwrap();
        for name in ["testOne", "testTwo"] {
            let test = TestMethod::new(&case, name);
            manager.on_before_test(&test).await.unwrap();
            assert_eq!(test.browser().unwrap().id(), "session-1");
            manager.on_after_test(&test).await.unwrap();
        }

        assert_eq!(endpoint.opened.load(Ordering::SeqCst), 1);
        assert_eq!(endpoint.cookie_clears.load(Ordering::SeqCst), 1);
        assert_eq!(endpoint.quit.load(Ordering::SeqCst), 0);

        manager.on_end_of_case(&case).await.unwrap();
        assert_eq!(endpoint.quit.load(Ordering::SeqCst), 1);
        assert!(!manager.driver_required());
    }

    #[tokio::test]
    async fn test_shared_session_and_cookies_takes_no_action() {
        let endpoint = Arc::new(FakeEndpoint::default());
        let mut manager = manager(&endpoint);
        let case = browser_case(true, true);

        manager.on_before_class(&case).await.unwrap();
        for name in ["a", "b", "c"] {
            manager.on_before_test(&TestMethod::new(&case, name)).await.unwrap();
        }

        assert_eq!(endpoint.opened.load(Ordering::SeqCst), 1);
        assert_eq!(endpoint.cookie_clears.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unshared_session_recreated_per_method() {
        let endpoint = Arc::new(FakeEndpoint::default());
        let mut manager = manager(&endpoint);
        let case = browser_case(false, false);

        manager.on_before_class(&case).await.unwrap();
        let first = TestMethod::new(&case, "first");
        let second = TestMethod::new(&case, "second");
        manager.on_before_test(&first).await.unwrap();
        manager.on_before_test(&second).await.unwrap();

        assert_eq!(endpoint.opened.load(Ordering::SeqCst), 2);
        assert_eq!(endpoint.quit.load(Ordering::SeqCst), 1);
        assert!(!first.browser().unwrap().has_channel());
        assert_eq!(second.browser().unwrap().id(), "session-2");
    }

    #[tokio::test]
    async fn test_stale_session_is_replaced() {
        let endpoint = Arc::new(FakeEndpoint::default());
        let mut manager = manager(&endpoint);
        let case = browser_case(true, true);

        manager.on_before_class(&case).await.unwrap();
        let first = TestMethod::new(&case, "first");
        manager.on_before_test(&first).await.unwrap();

        // The test quits the browser itself
        first.browser().unwrap().quit().await.unwrap();

        let second = TestMethod::new(&case, "second");
        manager.on_before_test(&second).await.unwrap();
        assert!(manager.is_ready());
        assert_eq!(second.browser().unwrap().id(), "session-2");
    }

    #[tokio::test]
    async fn test_plain_case_is_ignored() {
        let endpoint = Arc::new(FakeEndpoint::default());
        let mut manager = manager(&endpoint);
        let case = CaseType::new("PlainTest");

        manager.on_before_class(&case).await.unwrap();
        let test = TestMethod::new(&case, "testMath");
        manager.on_before_test(&test).await.unwrap();
        manager.on_end_of_case(&case).await.unwrap();

        assert!(test.browser().is_none());
        assert_eq!(endpoint.opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_open_is_not_retried() {
        let endpoint = Arc::new(FakeEndpoint {
            fail_open: true,
            ..Default::default()
        });
        let mut manager = manager(&endpoint);
        let case = browser_case(true, true);

        manager.on_before_class(&case).await.unwrap();
        let test = TestMethod::new(&case, "testUnreachable");
        let err = manager.on_before_test(&test).await.unwrap_err();

        assert!(err.is_transport());
        assert_eq!(endpoint.opened.load(Ordering::SeqCst), 1);
        assert!(!manager.is_ready());
        assert!(test.browser().is_none());
    }

    #[tokio::test]
    async fn test_session_left_by_unfinished_case_is_quit() {
        let endpoint = Arc::new(FakeEndpoint::default());
        let mut manager = manager(&endpoint);

        let first = browser_case(true, true);
        manager.on_before_class(&first).await.unwrap();
        manager.on_before_test(&TestMethod::new(&first, "a")).await.unwrap();
        // No EndOfCase for the first case

        let second = browser_case(true, true);
        manager.on_before_class(&second).await.unwrap();
        assert_eq!(endpoint.quit.load(Ordering::SeqCst), 1);
        assert!(!manager.is_ready());

        let test = TestMethod::new(&second, "b");
        manager.on_before_test(&test).await.unwrap();
        assert_eq!(test.browser().unwrap().id(), "session-2");
    }

    #[tokio::test]
    async fn test_leftover_session_quit_before_plain_case() {
        let endpoint = Arc::new(FakeEndpoint::default());
        let mut manager = manager(&endpoint);

        let browser = browser_case(false, false);
        manager.on_before_class(&browser).await.unwrap();
        manager.on_before_test(&TestMethod::new(&browser, "a")).await.unwrap();

        manager.on_before_class(&CaseType::new("PlainTest")).await.unwrap();
        assert_eq!(endpoint.quit.load(Ordering::SeqCst), 1);
        assert!(manager.session().is_none());
        assert!(!manager.driver_required());
    }
}
