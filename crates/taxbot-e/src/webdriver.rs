use fantoccini::{Client, ClientBuilder};
use std::path::Path;

pub type Capabilities = serde_json::Map<String, serde_json::Value>;

/// An open WebDriver session.
pub struct WebDriverClient {
    pub client: Client,
}

impl WebDriverClient {
    pub async fn connect(
        url: &str,
        capabilities: Option<Capabilities>,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let client = ClientBuilder::native()
            .capabilities(capabilities.unwrap_or_default())
            .connect(url)
            .await
            .map_err(|e| format!("Failed to connect to WebDriver at {}: {}", url, e))?;

        Ok(Self { client })
    }

    pub async fn close(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.client
            .close()
            .await
            .map_err(|e| format!("Failed to close session: {}", e))?;
        Ok(())
    }
}

/// Chrome capabilities for the given binary and command-line flags.
pub fn chrome_capabilities(binary: Option<&Path>, args: &[String]) -> Capabilities {
    let mut options = serde_json::Map::new();
    options.insert("args".into(), serde_json::json!(args));
    if let Some(binary) = binary {
        options.insert(
            "binary".into(),
            serde_json::Value::String(binary.display().to_string()),
        );
    }

    let mut caps = serde_json::Map::new();
    caps.insert("browserName".into(), "chrome".into());
    caps.insert("goog:chromeOptions".into(), serde_json::Value::Object(options));
    caps
}
