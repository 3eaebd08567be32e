//! Transport and request URLs for the SIMBAD endpoints.
//!
//! [`Simbad`] turns compiled script or ADQL text into a request URL on the
//! configured mirror, opens it through a [`Transport`] and frames the
//! returned stream into a [`SimbadResponse`].

use std::io::Read;
use std::sync::OnceLock;
use std::time::Duration;

pub use reqwest::Url;
use tracing::info;

use crate::config::SimbadConfig;
use crate::error::{Result, SimbadError};
use crate::query::QueryScript;
use crate::response::SimbadResponse;

/// Opens a URL and returns the response body as a byte stream.
pub trait Transport: Send + Sync {
    fn open(&self, url: &Url) -> Result<Box<dyn Read + Send>>;
}

/// Blocking HTTP transport.
///
/// The reqwest client is built on first use, so constructing a transport
/// inside an async runtime is safe; requests are expected to run on a
/// blocking thread (see [`BackgroundSource`](crate::BackgroundSource)).
#[derive(Debug, Clone)]
pub struct HttpTransport {
    user_agent: String,
    timeout: Duration,
    client: OnceLock<reqwest::blocking::Client>,
}

impl HttpTransport {
    pub fn new(config: &SimbadConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: config.timeout,
            client: OnceLock::new(),
        }
    }

    fn client(&self) -> Result<&reqwest::blocking::Client> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let client = reqwest::blocking::Client::builder()
            .user_agent(&self.user_agent)
            .timeout(self.timeout)
            .build()
            .map_err(|e| SimbadError::transport(format!("Failed to create HTTP client: {}", e)))?;
        Ok(self.client.get_or_init(|| client))
    }
}

impl Transport for HttpTransport {
    fn open(&self, url: &Url) -> Result<Box<dyn Read + Send>> {
        let response = self
            .client()?
            .get(url.clone())
            .send()
            .map_err(|e| SimbadError::transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SimbadError::Http {
                status: response.status().as_u16(),
            });
        }

        Ok(Box::new(response))
    }
}

impl Drop for HttpTransport {
    fn drop(&mut self) {
        // shutting down the client joins its runtime thread
        let Some(client) = self.client.take() else {
            return;
        };
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn_blocking(move || drop(client));
        }
    }
}

/// Client bound to one SIMBAD mirror.
pub struct Simbad {
    config: SimbadConfig,
    transport: Box<dyn Transport>,
}

impl Simbad {
    /// Client using [`HttpTransport`]. Fails if the mirror URL does not parse.
    pub fn new(config: SimbadConfig) -> Result<Self> {
        parse_endpoint(&config.tap_endpoint())?;
        let transport = HttpTransport::new(&config);
        Ok(Self::with_transport(config, transport))
    }

    pub fn with_transport(config: SimbadConfig, transport: impl Transport + 'static) -> Self {
        Self {
            config,
            transport: Box::new(transport),
        }
    }

    pub fn config(&self) -> &SimbadConfig {
        &self.config
    }

    /// `<mirror>/sim-script?script=<script>`
    pub fn script_url(&self, script: &QueryScript) -> Result<Url> {
        let mut url = parse_endpoint(&self.config.script_endpoint())?;
        url.query_pairs_mut().append_pair("script", &script.build());
        Ok(url)
    }

    /// `<mirror>/sim-tap/sync?request=doQuery&lang=adql&format=<format>&query=<sql>`
    pub fn adql_url(&self, sql: &str) -> Result<Url> {
        let mut url = parse_endpoint(&self.config.tap_endpoint())?;
        url.query_pairs_mut()
            .append_pair("request", "doQuery")
            .append_pair("lang", "adql")
            .append_pair("format", &self.config.tap_format)
            .append_pair("query", sql);
        Ok(url)
    }

    pub fn fetch_url(&self, url: &Url) -> Result<SimbadResponse> {
        info!(%url, "fetching data from SIMBAD");
        let stream = self.transport.open(url)?;
        SimbadResponse::new(stream)
    }

    pub fn fetch_script(&self, script: &QueryScript) -> Result<SimbadResponse> {
        self.fetch_url(&self.script_url(script)?)
    }

    pub fn fetch_adql(&self, sql: &str) -> Result<SimbadResponse> {
        self.fetch_url(&self.adql_url(sql)?)
    }
}

impl std::fmt::Debug for Simbad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simbad")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url> {
    Url::parse(endpoint).map_err(|e| SimbadError::invalid_url(endpoint, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTransport {
        body: &'static str,
        urls: Mutex<Vec<String>>,
    }

    impl Transport for RecordingTransport {
        fn open(&self, url: &Url) -> Result<Box<dyn Read + Send>> {
            self.urls.lock().unwrap().push(url.to_string());
            Ok(Box::new(Cursor::new(self.body.as_bytes().to_vec())))
        }
    }

    fn client(body: &'static str) -> Simbad {
        Simbad::with_transport(
            SimbadConfig::new(),
            RecordingTransport {
                body,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_adql_url_template() {
        let url = client("").adql_url("SELECT TOP 1 oid FROM basic").unwrap();
        assert_eq!(
            url.as_str(),
            "https://simbad.cds.unistra.fr/simbad/sim-tap/sync?request=doQuery&lang=adql\
             &format=votable%2Ftd&query=SELECT+TOP+1+oid+FROM+basic"
        );
    }

    #[test]
    fn test_adql_url_encodes_quotes_and_wildcards() {
        let url = client("")
            .adql_url("WHERE id LIKE 'NAME %Sirius%'")
            .unwrap();
        assert!(url
            .as_str()
            .ends_with("query=WHERE+id+LIKE+%27NAME+%25Sirius%25%27"));
        let (_, query) = url.query_pairs().last().unwrap();
        assert_eq!(query, "WHERE id LIKE 'NAME %Sirius%'");
    }

    #[test]
    fn test_script_url_template() {
        let script = QueryScript::new(2, ["main_id"], "Vmag < 1");
        let url = client("").script_url(&script).unwrap();
        assert!(url
            .as_str()
            .starts_with("https://simbad.cds.unistra.fr/simbad/sim-script?script=set+limit+2%0A"));
        let (key, value) = url.query_pairs().next().unwrap();
        assert_eq!(key, "script");
        assert_eq!(value, script.build());
    }

    #[test]
    fn test_custom_mirror() {
        let simbad = Simbad::with_transport(
            SimbadConfig::new().with_mirror("http://localhost:8080/simbad/"),
            RecordingTransport::default(),
        );
        let url = simbad.adql_url("x").unwrap();
        assert!(url.as_str().starts_with("http://localhost:8080/simbad/sim-tap/sync?"));
    }

    #[test]
    fn test_invalid_mirror() {
        let simbad = Simbad::with_transport(
            SimbadConfig::new().with_mirror("not a url"),
            RecordingTransport::default(),
        );
        let err = simbad.adql_url("x").unwrap_err();
        assert!(matches!(err, SimbadError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn test_http_client_constructed_inside_runtime() {
        let simbad = Simbad::new(SimbadConfig::new()).unwrap();
        assert_eq!(simbad.config().mirror_url, crate::config::DEFAULT_MIRROR);
        drop(simbad);
    }

    #[test]
    fn test_fetch_frames_response() {
        let simbad = client("::data::\n<?xml version=\"1.0\"?>\n<VOTABLE/>\n");
        let response = simbad.fetch_adql("SELECT 1").unwrap();
        assert!(response.metadata().contains("data"));
        assert!(response.error().is_none());
    }
}
