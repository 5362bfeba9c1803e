//! Synchronous HTTP submission to the remote compilation service.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

use crate::backend::{first_fatal_line, Artifact, CompileBackend, TexCompiler};
use crate::error::VellumError;
use crate::event::{CompileEvent, ProgressSink};
use crate::resources::Resource;

/// Default service endpoint (YtoTech LaTeX-on-HTTP, synchronous build API).
pub const DEFAULT_ENDPOINT: &str = "https://latex.ytotech.com/builds/sync";

/// One bounded request per compilation; the service compiles synchronously,
/// so the bound covers the whole build.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// A genuine PDF response is distinguished from an error disguised as a
/// small blob by content type plus a minimum-size sanity check.
const PDF_CONTENT_TYPE: &str = "application/pdf";
const MIN_PDF_BYTES: usize = 1000;

#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub endpoint: Url,
    pub compiler: TexCompiler,
    pub timeout: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            endpoint: Url::parse(DEFAULT_ENDPOINT).expect("default endpoint parses"),
            compiler: TexCompiler::default(),
            timeout: REQUEST_TIMEOUT,
        }
    }
}

/// Backend that serializes the resource list into a single JSON request and
/// submits it to the compilation service.
#[derive(Debug)]
pub struct RemoteServiceBackend {
    config: RemoteConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct CompileRequest<'a> {
    compiler: TexCompiler,
    resources: &'a [Resource],
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<RequestOptions>,
}

#[derive(Debug, Serialize)]
struct RequestOptions {
    bibliography: BibliographyCommand,
}

#[derive(Debug, Serialize)]
struct BibliographyCommand {
    command: String,
}

/// Structured failure body: `{error, log_files: {name: text, ...}}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    #[serde(default)]
    log_files: BTreeMap<String, String>,
}

impl RemoteServiceBackend {
    pub fn new(config: RemoteConfig) -> Result<Self, VellumError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(RemoteServiceBackend { config, client })
    }

    pub fn with_defaults() -> Result<Self, VellumError> {
        RemoteServiceBackend::new(RemoteConfig::default())
    }
}

#[async_trait::async_trait]
impl CompileBackend for RemoteServiceBackend {
    fn name(&self) -> &str {
        "remote-service"
    }

    async fn compile(
        &self,
        resources: &[Resource],
        progress: &ProgressSink,
    ) -> Result<Artifact, VellumError> {
        let use_biber = needs_biber(resources);
        let request = CompileRequest {
            compiler: self.config.compiler,
            resources,
            options: use_biber.then(|| RequestOptions {
                bibliography: BibliographyCommand {
                    command: "biber".to_string(),
                },
            }),
        };

        progress.send(CompileEvent::BackendDetail(format!(
            "Sending to compilation server ({}{})...",
            self.config.compiler,
            if use_biber { " + biber" } else { "" }
        )));

        let response = self
            .client
            .post(self.config.endpoint.clone())
            .json(&request)
            .send()
            .await?;

        progress.send(CompileEvent::BackendDetail(
            "Processing response...".to_string(),
        ));

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response.bytes().await?;

        classify_response(&content_type, &body)
    }
}

/// The biber pass is requested whenever the main document drives its
/// bibliography through biblatex.
fn needs_biber(resources: &[Resource]) -> bool {
    resources
        .iter()
        .find(|r| r.is_main)
        .and_then(Resource::text_content)
        .map(|text| text.contains("biblatex") || text.contains("\\addbibresource"))
        .unwrap_or(false)
}

/// Decides whether a service response is a real artifact or an error
/// payload, and classifies the latter.
fn classify_response(content_type: &str, body: &[u8]) -> Result<Artifact, VellumError> {
    if content_type.starts_with(PDF_CONTENT_TYPE) && body.len() > MIN_PDF_BYTES {
        return Ok(Artifact::new(body.to_vec()));
    }

    if let Ok(parsed) = serde_json::from_slice::<ErrorBody>(body) {
        if let Some(raw_error) = parsed.error {
            if let Some(log) = parsed.log_files.values().next() {
                if let Some((message, source_line)) = first_fatal_line(log) {
                    return Err(VellumError::RemoteCompile {
                        message,
                        source_line,
                    });
                }
            }
            return Err(VellumError::RemoteCompile {
                message: raw_error,
                source_line: None,
            });
        }
    }

    let snippet: String = String::from_utf8_lossy(body).chars().take(200).collect();
    Err(VellumError::RemoteCompile {
        message: format!("Invalid response: {snippet}"),
        source_line: None,
    })
}
