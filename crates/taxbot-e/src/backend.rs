use crate::webdriver::{self, WebDriverClient};
use async_trait::async_trait;
use fantoccini::Locator as WdLocator;
use fantoccini::elements::Element;
use fantoccini::error::{CmdError, ErrorStatus};
use std::collections::HashMap;
use std::time::Duration;
use taxbot_engine::backend::{Backend, BackendError, NavigationResult};
use taxbot_engine::config::schema::BrowserConfig;
use taxbot_engine::locator::{ElementRef, Locator};
use tracing::{debug, info};

/// Browser capability backed by a WebDriver server (chromedriver).
pub struct WebDriverBackend {
    client: Option<WebDriverClient>,
    config: BrowserConfig,
    elements: HashMap<u32, Element>,
    next_element: u32,
}

impl WebDriverBackend {
    pub fn new(config: BrowserConfig) -> Self {
        Self {
            client: None,
            config,
            elements: HashMap::new(),
            next_element: 1,
        }
    }

    /// Connect to the WebDriver server at `url` with default browser settings.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self::new(BrowserConfig {
            webdriver_url: url.into(),
            ..BrowserConfig::default()
        })
    }

    fn client(&self) -> Result<&WebDriverClient, BackendError> {
        self.client.as_ref().ok_or(BackendError::NotReady)
    }

    fn element(&self, element: &ElementRef) -> Result<&Element, BackendError> {
        self.elements
            .get(&element.id())
            .ok_or(BackendError::UnknownElement(element.id()))
    }

    fn register(&mut self, element: Element) -> ElementRef {
        let id = self.next_element;
        self.next_element += 1;
        self.elements.insert(id, element);
        ElementRef(id)
    }

    async fn get_navigation_result(
        client: &WebDriverClient,
    ) -> Result<NavigationResult, BackendError> {
        let title = client.client.title().await.unwrap_or_default();
        let url = client
            .client
            .current_url()
            .await
            .map(|u| u.to_string())
            .unwrap_or_default();

        Ok(NavigationResult { url, title })
    }
}

/// WebDriver has no name or class-name strategy; both become CSS.
///
/// A class value must name a single class, as with the class-name strategy
/// of other drivers.
fn css_for(locator: &Locator) -> Result<Option<String>, BackendError> {
    match locator {
        Locator::ClassName(class) => {
            let class = class.trim();
            if class.is_empty() || class.chars().any(char::is_whitespace) {
                return Err(BackendError::SelectorInvalid {
                    selector: class.to_string(),
                });
            }
            Ok(Some(format!(".{}", css_escape_ident(class))))
        }
        Locator::Name(name) => Ok(Some(format!(
            "[name=\"{}\"]",
            name.replace('\\', "\\\\").replace('"', "\\\"")
        ))),
        _ => Ok(None),
    }
}

/// Escape a CSS identifier: metacharacters get a backslash, a leading digit
/// becomes a code point escape.
fn css_escape_ident(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len());
    for (i, c) in ident.chars().enumerate() {
        match c {
            '0'..='9' if i == 0 => out.push_str(&format!("\\{:x} ", c as u32)),
            c if c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii() => {
                out.push(c)
            }
            c => {
                out.push('\\');
                out.push(c);
            }
        }
    }
    out
}

/// Map an element-level command failure onto the capability's error model.
fn element_error(id: u32, err: CmdError) -> BackendError {
    match err {
        CmdError::Standard(wd) => match wd.error {
            ErrorStatus::ElementNotInteractable => BackendError::ElementNotInteractable {
                id,
                reason: wd.message.to_string(),
            },
            ErrorStatus::ElementClickIntercepted => BackendError::ElementClickIntercepted {
                id,
                reason: wd.message.to_string(),
            },
            ErrorStatus::StaleElementReference => BackendError::ElementStale { id },
            _ => BackendError::Other(wd.message.to_string()),
        },
        CmdError::Lost(e) => BackendError::Io(e.to_string()),
        other => BackendError::Other(other.to_string()),
    }
}

#[async_trait]
impl Backend for WebDriverBackend {
    async fn launch(&mut self) -> Result<(), BackendError> {
        let url = self.config.webdriver_url.clone();
        info!("Connecting to WebDriver at {}...", url);
        let capabilities =
            webdriver::chrome_capabilities(self.config.binary.as_deref(), &self.config.args);
        let client = WebDriverClient::connect(&url, Some(capabilities))
            .await
            .map_err(|e| BackendError::Launch(e.to_string()))?;
        self.client = Some(client);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BackendError> {
        self.elements.clear();
        if let Some(client) = self.client.take() {
            client
                .close()
                .await
                .map_err(|e| BackendError::Other(e.to_string()))?;
        }
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        self.client.is_some()
    }

    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, BackendError> {
        let client = self.client()?;

        info!("Navigating to: {}", url);
        client
            .client
            .goto(url)
            .await
            .map_err(|e| BackendError::Navigation(e.to_string()))?;

        let result = Self::get_navigation_result(client).await;
        self.elements.clear();
        result
    }

    async fn go_back(&mut self) -> Result<NavigationResult, BackendError> {
        let client = self.client()?;

        client
            .client
            .back()
            .await
            .map_err(|e| BackendError::Navigation(format!("go_back failed: {}", e)))?;

        let result = Self::get_navigation_result(client).await;
        self.elements.clear();
        result
    }

    async fn find_element(
        &mut self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<Option<ElementRef>, BackendError> {
        let client = self.client()?;
        let css = css_for(locator)?;
        let wd_locator = match (locator, css.as_deref()) {
            (_, Some(css)) => WdLocator::Css(css),
            (Locator::Id(id), None) => WdLocator::Id(id),
            (Locator::Css(css), None) => WdLocator::Css(css),
            (Locator::XPath(xpath), None) => WdLocator::XPath(xpath),
            (Locator::ClassName(_) | Locator::Name(_), None) => {
                return Err(BackendError::SelectorInvalid {
                    selector: locator.value().to_string(),
                });
            }
        };

        let found = client
            .client
            .wait()
            .at_most(timeout)
            .for_element(wd_locator)
            .await;

        match found {
            Ok(element) => Ok(Some(self.register(element))),
            Err(CmdError::WaitTimeout) => {
                debug!(
                    "Failed to find element {} within {:?}",
                    locator, timeout
                );
                Ok(None)
            }
            Err(CmdError::Standard(wd)) if matches!(wd.error, ErrorStatus::NoSuchElement) => {
                Ok(None)
            }
            Err(CmdError::Standard(wd)) if matches!(wd.error, ErrorStatus::InvalidSelector) => {
                Err(BackendError::SelectorInvalid {
                    selector: locator.value().to_string(),
                })
            }
            Err(e) => Err(BackendError::Other(format!("find_element failed: {}", e))),
        }
    }

    async fn element_text(&mut self, element: &ElementRef) -> Result<String, BackendError> {
        self.element(element)?
            .text()
            .await
            .map_err(|e| element_error(element.id(), e))
    }

    async fn click(&mut self, element: &ElementRef) -> Result<(), BackendError> {
        self.element(element)?
            .click()
            .await
            .map(|_| ())
            .map_err(|e| element_error(element.id(), e))
    }

    async fn fill_text(&mut self, element: &ElementRef, text: &str) -> Result<(), BackendError> {
        let el = self.element(element)?;
        el.clear()
            .await
            .map_err(|e| element_error(element.id(), e))?;
        el.send_keys(text)
            .await
            .map_err(|e| element_error(element.id(), e))
    }

    async fn select_option(
        &mut self,
        element: &ElementRef,
        option: Option<&str>,
    ) -> Result<(), BackendError> {
        let el = self.element(element)?;
        match option {
            Some(label) => el.select_by_label(label).await.map(|_| ()).map_err(|e| {
                match element_error(element.id(), e) {
                    BackendError::Other(_) => BackendError::OptionNotFound {
                        value: label.to_string(),
                    },
                    other => other,
                }
            }),
            None => el
                .click()
                .await
                .map(|_| ())
                .map_err(|e| element_error(element.id(), e)),
        }
    }

    async fn enter_frame(&mut self, element: &ElementRef) -> Result<(), BackendError> {
        let el = self.element(element)?.clone();
        el.enter_frame()
            .await
            .map(|_| ())
            .map_err(|e| BackendError::Frame(e.to_string()))?;
        self.elements.clear();
        Ok(())
    }

    async fn exit_frame(&mut self) -> Result<(), BackendError> {
        self.client()?
            .client
            .enter_frame(None)
            .await
            .map(|_| ())
            .map_err(|e| BackendError::Frame(e.to_string()))?;
        self.elements.clear();
        Ok(())
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, BackendError> {
        let client = self.client()?;
        let bytes = client
            .client
            .screenshot()
            .await
            .map_err(|e| BackendError::Other(format!("Screenshot failed: {}", e)))?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn css(locator: Locator) -> Option<String> {
        css_for(&locator).unwrap()
    }

    #[test]
    fn name_and_class_become_css() {
        assert_eq!(css(Locator::ClassName("amount".into())).as_deref(), Some(".amount"));
        assert_eq!(
            css(Locator::Name("parcel".into())).as_deref(),
            Some("[name=\"parcel\"]")
        );
        assert_eq!(css(Locator::Id("go".into())), None);
    }

    #[test]
    fn class_metacharacters_are_escaped() {
        assert_eq!(
            css(Locator::ClassName("w-1/2".into())).as_deref(),
            Some(r".w-1\/2")
        );
        assert_eq!(
            css(Locator::ClassName("a.b#c".into())).as_deref(),
            Some(r".a\.b\#c")
        );
        assert_eq!(
            css(Locator::ClassName("2col".into())).as_deref(),
            Some(r".\32 col")
        );
        assert_eq!(
            css(Locator::Name("a\"b".into())).as_deref(),
            Some(r#"[name="a\"b"]"#)
        );
    }

    #[test]
    fn compound_class_names_are_invalid_selectors() {
        for class in ["owner name", "", "  "] {
            let err = css_for(&Locator::ClassName(class.into())).unwrap_err();
            assert!(matches!(err, BackendError::SelectorInvalid { .. }), "{class:?}");
        }
    }

    #[tokio::test]
    async fn commands_before_launch_are_not_ready() {
        let mut backend = WebDriverBackend::with_url("http://localhost:9515");
        assert!(!backend.is_ready().await);
        let err = backend.navigate("https://example.com").await.unwrap_err();
        assert!(matches!(err, BackendError::NotReady));
        let err = backend.click(&ElementRef(7)).await.unwrap_err();
        assert!(matches!(err, BackendError::UnknownElement(7)));
        assert!(backend.close().await.is_ok());
    }
}
