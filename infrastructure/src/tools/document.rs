//! `pdf_parser` tool — page text and tables from a document.
//!
//! Documents come from a [`DocumentSource`]: a local file (`file_path`,
//! capability `filesystem.read`) or a download (`url`, capability
//! `network`). Both decode the same three formats:
//!
//! - PDF, via `lopdf` (text per page; title and author from the info
//!   dictionary)
//! - plain text with form-feed (`\x0c`) page separators, as produced by
//!   `pdftotext`
//! - JSON: `{ "title": "...", "author": "...", "pages": [{ "text": "...", "tables": [...] }] }`
//!
//! At most `max_pages` pages are returned; pages beyond the bound are
//! omitted and the payload's `truncated` flag is set.

use std::path::{Path, PathBuf};

use agentic_domain::{
    ParamType, SandboxPolicy, ToolCall, ToolError, ToolKind, ToolParameter, ToolSpec, names,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

use super::paths;
use super::settings::{DocumentSettings, FILESYSTEM_READ, NETWORK};
use crate::sandbox::SandboxExecutor;

const PAGE_SEPARATOR: char = '\x0c';

/// Largest document accepted from a URL (50 MB)
#[cfg(feature = "web-tools")]
const MAX_DOWNLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// A loaded document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    pub pages: Vec<DocumentPage>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DocumentPage {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub tables: Vec<Value>,
}

#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn load(&self, path: &str) -> Result<Document, ToolError>;
}

/// Reads documents from the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct LocalDocumentSource {
    root: Option<PathBuf>,
}

impl LocalDocumentSource {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }
}

#[async_trait]
impl DocumentSource for LocalDocumentSource {
    async fn load(&self, path: &str) -> Result<Document, ToolError> {
        let resolved = paths::resolve(self.root.as_deref(), path)?;
        let bytes = tokio::fs::read(&resolved)
            .await
            .map_err(|e| ToolError::Execution(format!("cannot read {}: {}", resolved.display(), e)))?;
        decode_document(&resolved, bytes).await
    }
}

/// Downloads documents over HTTP(S).
#[cfg(feature = "web-tools")]
#[derive(Debug, Clone)]
pub struct HttpDocumentSource {
    client: reqwest::Client,
}

#[cfg(feature = "web-tools")]
impl HttpDocumentSource {
    pub fn new(timeout: std::time::Duration) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("agentic/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ToolError::Provider(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[cfg(feature = "web-tools")]
#[async_trait]
impl DocumentSource for HttpDocumentSource {
    async fn load(&self, url: &str) -> Result<Document, ToolError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| ToolError::validation(names::PDF_PARSER, format!("invalid url: {}", e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ToolError::validation(
                names::PDF_PARSER,
                "url must use http or https",
            ));
        }

        let response = self
            .client
            .get(parsed.clone())
            .send()
            .await
            .map_err(|e| ToolError::Provider(format!("download failed: {}", e)))?;
        if !response.status().is_success() {
            return Err(ToolError::Provider(format!(
                "download failed: HTTP {}",
                response.status()
            )));
        }
        if response.content_length().is_some_and(|len| len > MAX_DOWNLOAD_BYTES) {
            return Err(ToolError::Execution(format!(
                "document at {} exceeds {} bytes",
                url, MAX_DOWNLOAD_BYTES
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ToolError::Provider(format!("download failed: {}", e)))?;
        if bytes.len() as u64 > MAX_DOWNLOAD_BYTES {
            return Err(ToolError::Execution(format!(
                "document at {} exceeds {} bytes",
                url, MAX_DOWNLOAD_BYTES
            )));
        }
        debug!(url, bytes = bytes.len(), "Downloaded document");

        let name = parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|s| !s.is_empty())
            .unwrap_or("document")
            .to_string();
        decode_document(Path::new(&name), bytes.to_vec()).await
    }
}

/// Source used when no HTTP client is compiled in.
#[derive(Debug, Clone, Default)]
pub struct UnavailableDocumentSource;

#[async_trait]
impl DocumentSource for UnavailableDocumentSource {
    async fn load(&self, _url: &str) -> Result<Document, ToolError> {
        Err(ToolError::Provider(
            "document download is not available in this build (enable the web-tools feature)"
                .to_string(),
        ))
    }
}

/// Decode document bytes by content: PDF, JSON page dump or paged text.
/// `name` supplies the fallback title and the `.json` hint.
pub async fn decode_document(name: &Path, bytes: Vec<u8>) -> Result<Document, ToolError> {
    if bytes.starts_with(b"%PDF") {
        let label = name.display().to_string();
        return tokio::task::spawn_blocking(move || decode_pdf(&label, &bytes))
            .await
            .map_err(|e| ToolError::Execution(format!("PDF decoding aborted: {}", e)))?;
    }

    let text = String::from_utf8_lossy(&bytes);
    if is_json(name, &text) {
        return serde_json::from_str::<Document>(&text).map_err(|e| {
            ToolError::Execution(format!("invalid document JSON in {}: {}", name.display(), e))
        });
    }

    Ok(Document {
        title: file_title(name),
        author: String::new(),
        pages: split_pages(&text),
    })
}

fn decode_pdf(label: &str, bytes: &[u8]) -> Result<Document, ToolError> {
    let pdf = lopdf::Document::load_mem(bytes)
        .map_err(|e| ToolError::Execution(format!("cannot parse PDF {}: {}", label, e)))?;

    // Pages whose text cannot be extracted are kept empty so numbering holds
    let pages = pdf
        .get_pages()
        .keys()
        .map(|&number| DocumentPage {
            text: pdf.extract_text(&[number]).unwrap_or_default(),
            tables: Vec::new(),
        })
        .collect();

    let title = pdf_info(&pdf, b"Title");
    Ok(Document {
        title: if title.is_empty() { file_title(Path::new(label)) } else { title },
        author: pdf_info(&pdf, b"Author"),
        pages,
    })
}

/// A text entry of the PDF info dictionary, empty when absent.
fn pdf_info(pdf: &lopdf::Document, key: &[u8]) -> String {
    pdf.trailer
        .get(b"Info")
        .ok()
        .and_then(|info| pdf.dereference(info).ok())
        .and_then(|(_, info)| info.as_dict().ok())
        .and_then(|info| info.get(key).ok())
        .and_then(|value| value.as_str().ok())
        .map(pdf_text_string)
        .unwrap_or_default()
}

/// PDF text strings are UTF-16BE when they start with a byte-order mark.
fn pdf_text_string(bytes: &[u8]) -> String {
    match bytes.strip_prefix(&[0xFE, 0xFF]) {
        Some(utf16) => {
            let units = utf16
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
            char::decode_utf16(units)
                .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect()
        }
        None => String::from_utf8_lossy(bytes).into_owned(),
    }
}

fn file_title(name: &Path) -> String {
    name.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn is_json(path: &Path, text: &str) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        || text.trim_start().starts_with('{')
}

fn split_pages(text: &str) -> Vec<DocumentPage> {
    let mut pages: Vec<DocumentPage> = text
        .split(PAGE_SEPARATOR)
        .map(|page| DocumentPage {
            text: page.to_string(),
            tables: Vec::new(),
        })
        .collect();
    // A trailing separator does not start a new page
    if pages.len() > 1 && pages.last().is_some_and(|p| p.text.trim().is_empty()) {
        pages.pop();
    }
    pages
}

/// Page numbers (1-based) selected by `spec`, and whether the bound cut any.
///
/// `spec` is a comma-separated list of numbers and ranges (`"1-5,8"`).
/// Reversed ranges are swapped, duplicates removed, pages outside
/// `1..=total` dropped and the result truncated to `max_pages`. Unparseable
/// parts are ignored. No spec selects every page.
pub fn select_pages(spec: Option<&str>, total: usize, max_pages: usize) -> (Vec<usize>, bool) {
    let selected: BTreeSet<usize> = match spec.map(str::trim).filter(|s| !s.is_empty()) {
        None => (1..=total).collect(),
        Some(spec) => spec
            .split(',')
            .flat_map(|part| parse_part(part.trim(), total))
            .filter(|page| (1..=total).contains(page))
            .collect(),
    };

    let truncated = selected.len() > max_pages;
    (selected.into_iter().take(max_pages).collect(), truncated)
}

fn parse_part(part: &str, total: usize) -> Vec<usize> {
    if let Some((start, end)) = part.split_once('-') {
        let (Ok(start), Ok(end)) = (start.trim().parse::<usize>(), end.trim().parse::<usize>()) else {
            return Vec::new();
        };
        let (low, high) = if end < start { (end, start) } else { (start, end) };
        // Never expand past the document
        (low..=high.min(total)).collect()
    } else {
        part.parse::<usize>().map(|p| vec![p]).unwrap_or_default()
    }
}

/// The `pdf_parser` adapter.
#[derive(Clone)]
pub struct DocumentTool {
    local: Arc<dyn DocumentSource>,
    remote: Arc<dyn DocumentSource>,
    max_pages: usize,
    policy: SandboxPolicy,
}

impl DocumentTool {
    pub fn new(
        local: Arc<dyn DocumentSource>,
        remote: Arc<dyn DocumentSource>,
        settings: &DocumentSettings,
        policy: SandboxPolicy,
    ) -> Self {
        Self {
            local,
            remote,
            max_pages: settings.max_pages,
            policy,
        }
    }

    pub fn from_settings(settings: &DocumentSettings, policy: SandboxPolicy) -> Result<Self, ToolError> {
        #[cfg(feature = "web-tools")]
        let remote: Arc<dyn DocumentSource> = Arc::new(HttpDocumentSource::new(policy.timeout())?);
        #[cfg(not(feature = "web-tools"))]
        let remote: Arc<dyn DocumentSource> = Arc::new(UnavailableDocumentSource);

        Ok(Self::new(
            Arc::new(LocalDocumentSource::new(settings.root.clone())),
            remote,
            settings,
            policy,
        ))
    }

    pub fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            names::PDF_PARSER,
            "Extract text and tables from a document, page by page.",
            ToolKind::DocumentExtraction,
        )
        .with_parameter(ToolParameter::new(
            "file_path",
            "Path to a local document (PDF, paged text or JSON page dump)",
            ParamType::String,
            false,
        ))
        .with_parameter(ToolParameter::new(
            "url",
            "URL of a document to download; used instead of file_path",
            ParamType::String,
            false,
        ))
        .with_parameter(ToolParameter::new(
            "pages",
            "Pages to extract, e.g. '1-5' or '1,3,5' (default: all, bounded)",
            ParamType::String,
            false,
        ))
    }

    pub async fn execute(&self, call: &ToolCall, sandbox: &SandboxExecutor) -> Result<Value, ToolError> {
        let (reference, source, capability) = match (call.get_string("url"), call.get_string("file_path")) {
            (Some(url), _) => (url, &self.remote, NETWORK),
            (None, Some(path)) => (path, &self.local, FILESYSTEM_READ),
            (None, None) => {
                return Err(ToolError::validation(
                    names::PDF_PARSER,
                    "either file_path or url is required",
                ));
            }
        };
        let pages = call.get_string("pages");

        sandbox
            .run_in_process(&[capability], &self.policy, async {
                let document = source.load(reference).await?;
                let total = document.pages.len();
                let (selected, truncated) = select_pages(pages, total, self.max_pages);
                debug!(reference, total, selected = selected.len(), truncated, "Extracted document pages");

                let pages: Vec<Value> = selected
                    .iter()
                    .filter_map(|&n| document.pages.get(n - 1).map(|page| (n, page)))
                    .map(|(n, page)| {
                        json!({
                            "page_number": n,
                            "text": page.text,
                            "tables": page.tables,
                        })
                    })
                    .collect();

                Ok(json!({
                    "metadata": {
                        "title": document.title,
                        "author": document.author,
                        "total_pages": total,
                    },
                    "page_count": pages.len(),
                    "truncated": truncated,
                    "pages": pages,
                }))
            })
            .await
    }
}
