use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use tracing::info;

/// The browser capability consumed by actions and the retriever.
///
/// One implementor wraps a live Chrome tab; tests substitute fakes. Every
/// method may fail with an operation-specific error that callers are
/// expected to catch and convert rather than propagate.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Full HTML content of the current page.
    async fn content(&self) -> Result<String>;

    async fn navigate(&self, url: &str) -> Result<()>;

    async fn click(&self, selector: &str) -> Result<()>;

    async fn fill(&self, selector: &str, text: &str) -> Result<()>;

    async fn set_input_files(&self, selector: &str, file_path: &str) -> Result<()>;
}

/// A browser process owned by one agent run.
pub struct ChromeSession {
    browser: Browser,
}

impl ChromeSession {
    /// Launch Chrome. Runs on the blocking pool because headless_chrome
    /// does synchronous I/O during startup.
    pub async fn launch(headless: bool) -> Result<Self> {
        info!("Launching Chrome...");
        let browser = tokio::task::spawn_blocking(move || {
            let options = LaunchOptions {
                headless,
                args: vec![
                    OsStr::new("--no-first-run"),
                    OsStr::new("--no-default-browser-check"),
                ],
                // Cycles spend most of their time in model calls; keep the
                // browser from timing itself out between actions.
                idle_browser_timeout: Duration::from_secs(300),
                ..Default::default()
            };
            Browser::new(options)
        })
        .await
        .map_err(|e| anyhow!("Browser launch panicked: {e}"))??;
        info!("Chrome launched successfully.");

        Ok(Self { browser })
    }

    pub fn new_page(&self) -> Result<ChromePage> {
        let tab = self.browser.new_tab()?;
        Ok(ChromePage { tab })
    }

    /// Tear the browser down. Dropping the handle kills the Chrome process.
    pub async fn close(self) {
        let _ = tokio::task::spawn_blocking(move || drop(self.browser)).await;
        info!("Browser session closed.");
    }
}

/// Live page handle implementing [`PageDriver`] over a Chrome tab.
///
/// headless_chrome is synchronous, so every operation hops to the blocking
/// pool, the same bridging the launch path uses.
pub struct ChromePage {
    tab: Arc<Tab>,
}

impl ChromePage {
    async fn blocking<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(Arc<Tab>) -> Result<T> + Send + 'static,
    {
        let tab = self.tab.clone();
        tokio::task::spawn_blocking(move || op(tab))
            .await
            .map_err(|e| anyhow!("browser task panicked: {e}"))?
    }
}

#[async_trait]
impl PageDriver for ChromePage {
    async fn content(&self) -> Result<String> {
        self.blocking(|tab| Ok(tab.get_content()?)).await
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        let url = url.to_string();
        self.blocking(move |tab| {
            tab.navigate_to(&url)?;
            tab.wait_for_element("body")?;
            Ok(())
        })
        .await
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let selector = selector.to_string();
        self.blocking(move |tab| {
            let element = tab.find_element(&selector)?;
            element.click()?;
            // Give the page a moment to react before the next observation.
            std::thread::sleep(Duration::from_millis(500));
            Ok(())
        })
        .await
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<()> {
        let selector = selector.to_string();
        let text = text.to_string();
        self.blocking(move |tab| {
            let element = tab.find_element(&selector)?;
            element.click()?;
            let js_sel = selector.replace('\'', "\\'");
            tab.evaluate(
                &format!("document.querySelector('{js_sel}').value = ''"),
                false,
            )?;
            tab.type_str(&text)?;
            Ok(())
        })
        .await
    }

    async fn set_input_files(&self, selector: &str, file_path: &str) -> Result<()> {
        let selector = selector.to_string();
        let file_path = file_path.to_string();
        self.blocking(move |tab| {
            let element = tab.find_element(&selector)?;
            element.set_input_files(&[file_path.as_str()])?;
            Ok(())
        })
        .await
    }
}
