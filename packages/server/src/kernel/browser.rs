//! Headless Chromium sessions over the DevTools protocol.
//!
//! Chromium is launched the way a container host needs it: headless, no
//! sandbox, no GPU, no /dev/shm, fixed 1920x1080 window. The CDP handler is
//! driven on its own task for the lifetime of the session.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::{BrowserError, BrowserSession, Marker, PageElement, SessionProvider};

/// Launch options for the browser.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub window_width: u32,
    pub window_height: u32,
    /// Explicit browser binary; auto-detected when `None`.
    pub executable: Option<PathBuf>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            window_width: 1920,
            window_height: 1080,
            executable: None,
        }
    }
}

impl SessionOptions {
    pub fn with_executable(mut self, executable: Option<PathBuf>) -> Self {
        self.executable = executable;
        self
    }

    /// Extra Chromium switches on top of headless mode and `--no-sandbox`.
    pub fn args(&self) -> Vec<&'static str> {
        vec![
            "--disable-dev-shm-usage",
            "--disable-gpu",
            "--disable-extensions",
            "--disable-infobars",
        ]
    }

    fn browser_config(&self) -> Result<BrowserConfig, BrowserError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(self.window_width, self.window_height)
            .args(self.args());

        if let Some(executable) = &self.executable {
            builder = builder.chrome_executable(executable);
        }

        builder.build().map_err(BrowserError::SessionStart)
    }
}

/// Launches one Chromium process per session.
pub struct ChromeProvider {
    options: SessionOptions,
}

impl ChromeProvider {
    pub fn new(options: SessionOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl SessionProvider for ChromeProvider {
    async fn start(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let config = self.options.browser_config()?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::SessionStart(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                // The process is up but unusable; take it down before failing.
                let _ = browser.close().await;
                let _ = browser.wait().await;
                handler_task.abort();
                return Err(BrowserError::SessionStart(e.to_string()));
            }
        };

        info!(
            width = self.options.window_width,
            height = self.options.window_height,
            "Headless browser session started"
        );

        Ok(Box::new(ChromeSession {
            browser: Mutex::new(Some(browser)),
            page,
            handler_task,
        }))
    }
}

pub struct ChromeSession {
    browser: Mutex<Option<Browser>>,
    page: Page,
    handler_task: JoinHandle<()>,
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        debug!(url, "Navigating");
        self.page
            .goto(url)
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })
    }

    async fn find_all(&self, marker: Marker) -> Result<Vec<Box<dyn PageElement>>, BrowserError> {
        let selector = marker.css();
        let elements = self
            .page
            .find_elements(selector.as_str())
            .await
            .map_err(|e| BrowserError::Query {
                selector,
                message: e.to_string(),
            })?;

        Ok(elements
            .into_iter()
            .map(|element| Box::new(ChromeElement { element }) as Box<dyn PageElement>)
            .collect())
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        let Some(mut browser) = self.browser.get_mut().take() else {
            return Ok(());
        };

        let closed = browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::Shutdown(e.to_string()));
        let waited = browser
            .wait()
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::Shutdown(e.to_string()));
        self.handler_task.abort();

        closed.and(waited)
    }
}

struct ChromeElement {
    element: Element,
}

#[async_trait]
impl PageElement for ChromeElement {
    async fn find_one(&self, marker: Marker) -> Result<Option<Box<dyn PageElement>>, BrowserError> {
        let selector = marker.css();
        let mut found = self
            .element
            .find_elements(selector.as_str())
            .await
            .map_err(|e| BrowserError::Query {
                selector,
                message: e.to_string(),
            })?;

        if found.is_empty() {
            return Ok(None);
        }
        Ok(Some(Box::new(ChromeElement {
            element: found.remove(0),
        })))
    }

    async fn text(&self) -> Result<String, BrowserError> {
        let text = self
            .element
            .inner_text()
            .await
            .map_err(|e| BrowserError::Query {
                selector: "innerText".to_string(),
                message: e.to_string(),
            })?;

        Ok(text.unwrap_or_default().trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_use_fixed_viewport() {
        let options = SessionOptions::default();
        assert_eq!((options.window_width, options.window_height), (1920, 1080));
        assert!(options.executable.is_none());
    }

    #[test]
    fn container_switches_are_passed() {
        let args = SessionOptions::default().args();
        assert!(args.contains(&"--disable-gpu"));
        assert!(args.contains(&"--disable-dev-shm-usage"));
    }
}
