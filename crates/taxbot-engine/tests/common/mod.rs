#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use taxbot_engine::backend::{Backend, BackendError, NavigationResult};
use taxbot_engine::interpreter::{Interpreter, InterpreterOptions, Results, RunError};
use taxbot_engine::job::Job;
use taxbot_engine::locator::{ElementRef, Locator};
use taxbot_engine::script::Script;
use taxbot_engine::session::BrowserSession;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Launch,
    Close,
    Navigate(String),
    Wait(f64),
    Back,
    Find(Locator),
    Text(u32),
    Click(u32),
    Fill(u32, String),
    Select(u32, Option<String>),
    EnterFrame(u32),
    ExitFrame,
    Screenshot,
}

#[derive(Debug, Clone, Default)]
pub struct MockElement {
    pub text: String,
    pub click_error: Option<BackendError>,
}

impl MockElement {
    pub fn with_text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            click_error: None,
        }
    }

    pub fn failing_click(error: BackendError) -> Self {
        Self {
            text: String::new(),
            click_error: Some(error),
        }
    }
}

/// In-memory page: a fixed set of locators that resolve, everything else is missing.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    pub elements: Vec<(Locator, MockElement)>,
    pub invalid_selectors: Vec<String>,
    pub calls: Arc<Mutex<Vec<Call>>>,
    pub fail_launch: bool,
    pub fail_navigation: bool,
    pub launched: bool,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_element(mut self, locator: Locator, element: MockElement) -> Self {
        self.elements.push((locator, element));
        self
    }

    pub fn with_text(self, locator: Locator, text: &str) -> Self {
        self.with_element(locator, MockElement::with_text(text))
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn element(&self, element: &ElementRef) -> Result<&MockElement, BackendError> {
        self.elements
            .get(element.id() as usize)
            .map(|(_, e)| e)
            .ok_or(BackendError::UnknownElement(element.id()))
    }
}

pub fn calls(log: &Arc<Mutex<Vec<Call>>>) -> Vec<Call> {
    log.lock().unwrap().clone()
}

#[async_trait]
impl Backend for MockBackend {
    async fn launch(&mut self) -> Result<(), BackendError> {
        self.record(Call::Launch);
        if self.fail_launch {
            return Err(BackendError::Launch("no browser".into()));
        }
        self.launched = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BackendError> {
        self.record(Call::Close);
        self.launched = false;
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        self.launched
    }

    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, BackendError> {
        self.record(Call::Navigate(url.to_string()));
        if self.fail_navigation {
            return Err(BackendError::Navigation("connection refused".into()));
        }
        Ok(NavigationResult {
            url: url.to_string(),
            title: "mock".into(),
        })
    }

    async fn go_back(&mut self) -> Result<NavigationResult, BackendError> {
        self.record(Call::Back);
        Ok(NavigationResult {
            url: "about:blank".into(),
            title: "mock".into(),
        })
    }

    async fn wait_seconds(&mut self, seconds: f64) -> Result<(), BackendError> {
        self.record(Call::Wait(seconds));
        Ok(())
    }

    async fn find_element(
        &mut self,
        locator: &Locator,
        _timeout: Duration,
    ) -> Result<Option<ElementRef>, BackendError> {
        self.record(Call::Find(locator.clone()));
        if self.invalid_selectors.iter().any(|s| s == locator.value()) {
            return Err(BackendError::SelectorInvalid {
                selector: locator.value().to_string(),
            });
        }
        Ok(self
            .elements
            .iter()
            .position(|(l, _)| l == locator)
            .map(|i| ElementRef(i as u32)))
    }

    async fn element_text(&mut self, element: &ElementRef) -> Result<String, BackendError> {
        self.record(Call::Text(element.id()));
        Ok(self.element(element)?.text.clone())
    }

    async fn click(&mut self, element: &ElementRef) -> Result<(), BackendError> {
        self.record(Call::Click(element.id()));
        match &self.element(element)?.click_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    async fn fill_text(&mut self, element: &ElementRef, text: &str) -> Result<(), BackendError> {
        self.element(element)?;
        self.record(Call::Fill(element.id(), text.to_string()));
        Ok(())
    }

    async fn select_option(
        &mut self,
        element: &ElementRef,
        option: Option<&str>,
    ) -> Result<(), BackendError> {
        self.element(element)?;
        self.record(Call::Select(element.id(), option.map(str::to_string)));
        Ok(())
    }

    async fn enter_frame(&mut self, element: &ElementRef) -> Result<(), BackendError> {
        self.element(element)?;
        self.record(Call::EnterFrame(element.id()));
        Ok(())
    }

    async fn exit_frame(&mut self) -> Result<(), BackendError> {
        self.record(Call::ExitFrame);
        Ok(())
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, BackendError> {
        self.record(Call::Screenshot);
        Ok(vec![0x89, b'P', b'N', b'G'])
    }
}

pub fn fast_options() -> InterpreterOptions {
    InterpreterOptions {
        lookup_timeout: Duration::from_millis(10),
        screenshot_dir: None,
    }
}

pub async fn interpreter_for(
    yaml: &str,
    pid: &str,
    backend: MockBackend,
    options: InterpreterOptions,
) -> Interpreter<MockBackend> {
    let script = Script::from_yaml(yaml).expect("script should parse");
    let session = BrowserSession::open(backend)
        .await
        .expect("mock session should open");
    Interpreter::new(Job::new(pid, "51059"), script.into_steps(), session, options)
}

pub async fn run_script(yaml: &str, pid: &str, backend: MockBackend) -> Result<Results, RunError> {
    let mut interpreter = interpreter_for(yaml, pid, backend, fast_options()).await;
    interpreter.run().await
}
