//! Gemini `generateContent` client

use crate::config::QueryConfig;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::query::{
    DocumentPart, DocumentQueryService, Location, LocatorResult, QueryOptions, RemoteFile,
};
use crate::store::CustomEndpoint;
use crate::viewer::geometry::Box2d;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

/// Upper bound of the model's normalized coordinate grid
const GRID_MAX: f64 = 1000.0;

/// Path segments that proxies commonly include in their base URL
const VERSION_SEGMENTS: [&str; 2] = ["v1beta", "v1"];

/// Resolved transport target for one call
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    base_url: Url,
    api_key: String,
}

impl Endpoint {
    /// Pick base URL and key: the custom endpoint when it is enabled and
    /// filled in, the defaults otherwise.
    pub fn resolve(
        custom: &CustomEndpoint,
        default_base_url: &str,
        fallback_api_key: Option<&str>,
    ) -> Result<Self> {
        let custom_key = Some(custom.api_key.as_str())
            .filter(|k| custom.enabled && !k.trim().is_empty());
        let api_key = custom_key
            .or(fallback_api_key)
            .map(clean_api_key)
            .filter(|k| !k.is_empty())
            .ok_or(Error::MissingApiKey)?;

        let base = if custom.enabled && !custom.base_url.trim().is_empty() {
            tracing::debug!(base_url = %custom.base_url.trim(), "using custom base URL");
            custom.base_url.as_str()
        } else {
            default_base_url
        };

        Ok(Self {
            base_url: parse_base_url(base)?,
            api_key,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Join an API path onto the base, collapsing empty and repeated
    /// version segments
    pub fn route(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        let mut segments: Vec<&str> = Vec::new();

        let joined = self
            .base_url
            .path_segments()
            .into_iter()
            .flatten()
            .chain(path.split('/'));
        for segment in joined.filter(|s| !s.is_empty()) {
            let repeated = segments.last() == Some(&segment) && VERSION_SEGMENTS.contains(&segment);
            if !repeated {
                segments.push(segment);
            }
        }

        url.set_path(&format!("/{}", segments.join("/")));
        url
    }

    /// First characters of the key, for logs
    fn key_hint(&self) -> String {
        let prefix: String = self.api_key.chars().take(4).collect();
        format!("{}****", prefix)
    }
}

/// Remove every whitespace character; pasted keys often carry newlines
pub fn clean_api_key(key: &str) -> String {
    key.chars().filter(|c| !c.is_whitespace()).collect()
}

fn parse_base_url(base: &str) -> Result<Url> {
    let trimmed = base.trim().trim_end_matches('/');
    let url = Url::parse(trimmed).map_err(|e| Error::InvalidEndpoint {
        reason: format!("{}: {}", trimmed, e),
    })?;

    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => Err(Error::InvalidEndpoint {
            reason: format!("{}: expected an http(s) URL with a host", trimmed),
        }),
    }
}

/// HTTP client for the Gemini API
pub struct GeminiClient {
    http: reqwest::Client,
    default_base_url: String,
    fallback_api_key: Option<String>,
    target_language: String,
    max_inline_bytes: u64,
}

impl GeminiClient {
    pub fn new(config: &QueryConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(Error::HttpRequest)?;

        Ok(Self {
            http,
            default_base_url: config.base_url.clone(),
            fallback_api_key: config.api_key.clone(),
            target_language: config.target_language.clone(),
            max_inline_bytes: config.max_inline_bytes,
        })
    }

    fn endpoint(&self, custom: &CustomEndpoint) -> Result<Endpoint> {
        Endpoint::resolve(custom, &self.default_base_url, self.fallback_api_key.as_deref())
    }

    fn request_body(&self, part: &DocumentPart, query: &str) -> Result<Value> {
        let document = match part {
            DocumentPart::Inline { mime_type, data } => {
                let size = data.len() as u64;
                if size > self.max_inline_bytes {
                    return Err(Error::DocumentTooLarge {
                        size,
                        max_size: self.max_inline_bytes,
                    });
                }
                let encoded = base64::engine::general_purpose::STANDARD.encode(data);
                json!({ "inlineData": { "mimeType": mime_type, "data": encoded } })
            }
            DocumentPart::Remote { mime_type, uri } => {
                json!({ "fileData": { "mimeType": mime_type, "fileUri": uri } })
            }
        };

        Ok(json!({
            "contents": [{
                "role": "user",
                "parts": [document, { "text": build_prompt(query, &self.target_language) }]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema()
            }
        }))
    }
}

impl DocumentQueryService for GeminiClient {
    async fn upload(&self, document: &Document, options: QueryOptions<'_>) -> Result<RemoteFile> {
        let endpoint = self.endpoint(options.endpoint)?;
        let mut url = endpoint.route("/upload/v1beta/files");
        url.query_pairs_mut().append_pair("uploadType", "media");

        tracing::info!(
            name = %document.name,
            bytes = document.len(),
            key = %endpoint.key_hint(),
            "uploading document"
        );

        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", endpoint.api_key())
            .header(reqwest::header::CONTENT_TYPE, document.mime_type.as_str())
            .body(document.data().to_vec())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        let uploaded: UploadResponse =
            serde_json::from_str(&body).map_err(|e| Error::Upload {
                reason: format!("unexpected upload response: {}", e),
            })?;

        match uploaded.file {
            Some(file) if !file.uri.is_empty() => Ok(file),
            _ => Err(Error::Upload {
                reason: "response carried no file uri".to_string(),
            }),
        }
    }

    async fn ask(
        &self,
        part: &DocumentPart,
        query: &str,
        options: QueryOptions<'_>,
    ) -> Result<LocatorResult> {
        let endpoint = self.endpoint(options.endpoint)?;
        let url = endpoint.route(&format!("/v1beta/models/{}:generateContent", options.model));
        let body = self.request_body(part, query)?;

        tracing::info!(
            model = options.model,
            remote = matches!(part, DocumentPart::Remote { .. }),
            key = %endpoint.key_hint(),
            "querying document"
        );

        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", endpoint.api_key())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(status_error(status, &text));
        }

        let generated: GenerateContentResponse = serde_json::from_str(&text)?;
        parse_locator(&generated.text().ok_or(Error::EmptyResponse)?)
    }
}

/// Instruction sent alongside the document
pub fn build_prompt(query: &str, target_language: &str) -> String {
    format!(
        r#"You are an intelligent PDF assistant. You can answer questions based on the document AND locate specific content visually.

User Query: "{query}"

Instructions:
1. First, analyze the document to answer the user's question. Put the answer in the 'answer' field. **IMPORTANT: ALWAYS Answer in {target_language}.**
2. If the user is asking to find something, or if the answer refers to a specific diagram, table, or paragraph, provide the location details.
3. If providing location:
   - Identify the most relevant page.
   - Identify the specific bounding box coordinates (0-1000 scale) [ymin, xmin, ymax, xmax].
   - Set 'foundLocation' to true.
4. If the question is general (e.g., "Summarize the file") and no specific location is needed, set 'foundLocation' to false and leave location fields empty or zero."#
    )
}

/// Structured output schema the model must follow
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "answer": {
                "type": "STRING",
                "description": "The natural language answer to the user's question."
            },
            "foundLocation": {
                "type": "BOOLEAN",
                "description": "Set to true if specific visual content or text passage was located in the document to answer the query."
            },
            "pageNumber": {
                "type": "INTEGER",
                "description": "The page number where the content is found (1-based index). Set to 0 if not found."
            },
            "box2d": {
                "type": "ARRAY",
                "items": { "type": "INTEGER" },
                "description": "The bounding box of the specific text/visual element. Format: [ymin, xmin, ymax, xmax] where the scale is 0 to 1000. 0,0 is top-left."
            },
            "snippet": {
                "type": "STRING",
                "description": "The specific text or short description of the visual element found."
            },
            "reasoning": {
                "type": "STRING",
                "description": "Brief explanation of why this location was chosen."
            }
        },
        "required": ["answer", "foundLocation"]
    })
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: Option<RemoteFile>,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<TextPart>,
}

#[derive(Debug, Deserialize)]
struct TextPart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();

        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Model output as it arrives, before the location invariant is enforced
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLocatorAnswer {
    answer: String,
    #[serde(default)]
    found_location: bool,
    page_number: Option<i64>,
    box2d: Option<Vec<f64>>,
    snippet: Option<String>,
    reasoning: Option<String>,
}

/// Parse the model's JSON answer into a [`LocatorResult`].
///
/// Location fields only count when `foundLocation` is set. A location
/// missing its page or a usable box is dropped as a whole.
pub fn parse_locator(text: &str) -> Result<LocatorResult> {
    let raw: RawLocatorAnswer =
        serde_json::from_str(text.trim()).map_err(|e| Error::MalformedResponse {
            reason: e.to_string(),
        })?;

    if !raw.found_location {
        return Ok(LocatorResult::answer_only(raw.answer));
    }

    let page_number = raw
        .page_number
        .filter(|&p| p > 0)
        .and_then(|p| u32::try_from(p).ok());
    let box2d = raw.box2d.as_deref().and_then(normalize_box);

    let mut result = match (page_number, box2d) {
        (Some(page_number), Some(box2d)) => LocatorResult::located(
            raw.answer,
            Location {
                page_number,
                box2d,
                snippet: raw.snippet.unwrap_or_default(),
            },
        ),
        _ => {
            tracing::debug!(
                page = ?raw.page_number,
                has_box = raw.box2d.is_some(),
                "incomplete location dropped"
            );
            LocatorResult::answer_only(raw.answer)
        }
    };
    result.reasoning = raw.reasoning;
    Ok(result)
}

/// Clamp a `[ymin, xmin, ymax, xmax]` array onto the grid with min <= max
fn normalize_box(coords: &[f64]) -> Option<Box2d> {
    let [y0, x0, y1, x1] = <[f64; 4]>::try_from(coords).ok()?;
    if ![y0, x0, y1, x1].iter().all(|v| v.is_finite()) {
        return None;
    }

    let grid = |v: f64| v.clamp(0.0, GRID_MAX);
    let (y0, x0, y1, x1) = (grid(y0), grid(x0), grid(y1), grid(x1));

    Some(Box2d {
        ymin: y0.min(y1),
        xmin: x0.min(x1),
        ymax: y0.max(y1),
        xmax: x0.max(x1),
    })
}

/// Turn a non-success response into an error carrying the service's message
fn status_error(status: reqwest::StatusCode, body: &str) -> Error {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        });

    tracing::warn!(status = status.as_u16(), message = %message, "query service request failed");

    Error::QueryStatus {
        status: status.as_u16(),
        message,
    }
}
