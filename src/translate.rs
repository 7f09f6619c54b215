//! Machine translation through `DeepL`
//!
//! [`Translator::translate`] never fails. Every fault comes back as a
//! sentinel string starting with [`TRANSLATION_ERROR_MARKER`] so callers can
//! show it and carry on.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::config::Config;
use crate::language::Language;
use crate::{Error, Result};

/// Prefix shared by every translation failure sentinel
pub const TRANSLATION_ERROR_MARKER: &str = "[translation error";

/// Reason reported when no `DeepL` key is configured
pub const MISSING_KEY_REASON: &str = "DeepL API key not configured";

const DEEPL_FREE_URL: &str = "https://api-free.deepl.com/v2/translate";
const DEEPL_PRO_URL: &str = "https://api.deepl.com/v2/translate";

/// Build a failure sentinel for `reason`
#[must_use]
pub fn translation_error(reason: &str) -> String {
    format!("{TRANSLATION_ERROR_MARKER}: {reason}]")
}

/// Whether `text` is a failure sentinel rather than a translation
#[must_use]
pub fn is_translation_error(text: &str) -> bool {
    text.starts_with(TRANSLATION_ERROR_MARKER)
}

/// `DeepL` endpoint for a key: free-tier keys end in `:fx`
#[must_use]
pub fn deepl_endpoint(api_key: &str) -> &'static str {
    if api_key.trim_end().ends_with(":fx") {
        DEEPL_FREE_URL
    } else {
        DEEPL_PRO_URL
    }
}

/// Raw HTTP response handed back by a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Sends a form-encoded translation request
#[async_trait]
pub trait TranslateTransport: Send + Sync {
    /// POST `form` to `url` with a `DeepL-Auth-Key` authorization header
    ///
    /// # Errors
    ///
    /// Returns error if the request could not be completed
    async fn post_form(&self, url: &str, api_key: &str, form: &[(&str, &str)]) -> Result<TransportResponse>;
}

/// Default transport over `reqwest`
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TranslateTransport for HttpTransport {
    async fn post_form(&self, url: &str, api_key: &str, form: &[(&str, &str)]) -> Result<TransportResponse> {
        let response = self
            .client
            .post(url)
            .header("Authorization", format!("DeepL-Auth-Key {api_key}"))
            .form(form)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(TransportResponse { status, body })
    }
}

#[derive(Debug, Deserialize)]
struct DeepLResponse {
    translations: Vec<DeepLTranslation>,
}

#[derive(Debug, Deserialize)]
struct DeepLTranslation {
    #[serde(default)]
    detected_source_language: Option<String>,
    text: String,
}

/// Translates text into a practice language
pub struct Translator {
    transport: Arc<dyn TranslateTransport>,
    api_key: Option<SecretString>,
    endpoint_override: Option<String>,
}

impl Translator {
    /// Build a translator over an explicit transport
    #[must_use]
    pub fn new(transport: Arc<dyn TranslateTransport>, config: &Config) -> Self {
        Self {
            transport,
            api_key: config.api_keys.clone().deepl,
            endpoint_override: config.network.deepl_url.clone(),
        }
    }

    /// Build a translator over HTTP with the configured request timeout
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = HttpTransport::new(config.network.request_timeout)?;
        Ok(Self::new(Arc::new(transport), config))
    }

    /// Whether a key is available at all
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Endpoint requests go to, if a key is configured
    #[must_use]
    pub fn endpoint(&self) -> Option<&str> {
        let key = self.api_key.as_ref()?;
        Some(
            self.endpoint_override
                .as_deref()
                .unwrap_or_else(|| deepl_endpoint(key.expose_secret())),
        )
    }

    /// Translate `text` into `language`
    ///
    /// Returns the translation, or a sentinel (see [`is_translation_error`]).
    pub async fn translate(&self, text: &str, language: Language) -> String {
        let Some(api_key) = self.api_key.as_ref().filter(|k| !k.expose_secret().trim().is_empty()) else {
            tracing::warn!("translation requested without a DeepL key");
            return translation_error(MISSING_KEY_REASON);
        };

        match self.request(api_key, text, language).await {
            Ok(translated) => {
                tracing::debug!(%language, chars = translated.chars().count(), "translation complete");
                translated
            }
            Err(e) => {
                tracing::warn!(%language, error = %e, "translation failed");
                match e {
                    Error::Translation(reason) => translation_error(&reason),
                    other => translation_error(&other.to_string()),
                }
            }
        }
    }

    async fn request(&self, api_key: &SecretString, text: &str, language: Language) -> Result<String> {
        let key = api_key.expose_secret();
        let url = self
            .endpoint_override
            .as_deref()
            .unwrap_or_else(|| deepl_endpoint(key));

        let form = [("text", text), ("target_lang", language.deepl_code())];
        let response = self.transport.post_form(url, key, &form).await?;

        if !(200..300).contains(&response.status) {
            return Err(Error::Translation(format!(
                "DeepL returned HTTP {}: {}",
                response.status,
                response.body.trim()
            )));
        }

        let parsed: DeepLResponse = serde_json::from_str(&response.body)
            .map_err(|e| Error::Translation(format!("malformed DeepL response: {e}")))?;

        let first = parsed
            .translations
            .into_iter()
            .next()
            .ok_or_else(|| Error::Translation("DeepL returned no translations".to_string()))?;

        if let Some(source) = &first.detected_source_language {
            tracing::trace!(source = %source, target = language.deepl_code(), "DeepL detected source");
        }

        Ok(first.text)
    }
}
