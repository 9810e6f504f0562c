//! Result records and their JSON / text renderings.

use crate::pipeline::client::ApiResult;
use crate::pipeline::extract::extract_text;
use crate::pipeline::input::InputKind;
use serde::{Serialize, Serializer};

/// The outcome for one page (PDF) or one image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OcrResult {
    /// 1-based position in the input.
    pub page: usize,
    /// Raw model JSON, or `{error, status_code}`.
    #[serde(serialize_with = "serialize_api_result")]
    pub response: ApiResult,
}

impl OcrResult {
    pub fn is_success(&self) -> bool {
        !is_error_response(&self.response)
    }

    pub fn text(&self) -> String {
        extract_text(&self.response)
    }
}

/// True for captured failures and for 2xx bodies that carry an `error` key.
pub fn is_error_response(response: &ApiResult) -> bool {
    match response {
        Err(_) => true,
        Ok(v) => v.get("error").is_some(),
    }
}

fn serialize_api_result<S: Serializer>(result: &ApiResult, s: S) -> Result<S::Ok, S::Error> {
    match result {
        Ok(v) => v.serialize(s),
        Err(e) => e.serialize(s),
    }
}

/// Response for one processed file, shaped for the upload endpoint.
///
/// Success:
/// `{"success": true, "filename": "...", "type": "pdf", "pages": 3, "results": [...]}`
/// (`pages` only for PDFs). Failure: `{"success": false, "error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<OcrResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileReport {
    pub fn processed(filename: impl Into<String>, kind: InputKind, results: Vec<OcrResult>) -> Self {
        let pages = (kind == InputKind::Pdf).then_some(results.len());
        Self {
            success: true,
            filename: Some(filename.into()),
            kind: Some(kind.as_str()),
            pages,
            results: Some(results),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            filename: None,
            kind: None,
            pages: None,
            results: None,
            error: Some(error.into()),
        }
    }

    /// Results, empty for a failed report.
    pub fn results(&self) -> &[OcrResult] {
        self.results.as_deref().unwrap_or(&[])
    }
}

/// One line item of a multi-file batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BatchEntry {
    /// A page of a PDF input.
    Page(OcrResult),
    /// An image input, or a file that failed before any page was sent.
    File {
        file: String,
        #[serde(serialize_with = "serialize_api_result")]
        response: ApiResult,
    },
}

impl BatchEntry {
    pub fn response(&self) -> &ApiResult {
        match self {
            BatchEntry::Page(r) => &r.response,
            BatchEntry::File { response, .. } => response,
        }
    }

    pub fn is_error(&self) -> bool {
        is_error_response(self.response())
    }
}

/// Whether any entry failed; drives the CLI exit code.
pub fn has_errors(entries: &[BatchEntry]) -> bool {
    entries.iter().any(BatchEntry::is_error)
}

/// Plain-text rendering of a batch.
///
/// Page entries get a `--- Page N ---` header when `separate_pages` is set;
/// file entries get `--- <file> ---` when more than one input was given.
pub fn render_text(entries: &[BatchEntry], separate_pages: bool, input_count: usize) -> String {
    let mut lines = Vec::with_capacity(entries.len() * 2);
    for entry in entries {
        match entry {
            BatchEntry::Page(result) => {
                if separate_pages {
                    lines.push(format!("\n--- Page {} ---", result.page));
                }
                lines.push(result.text());
            }
            BatchEntry::File { file, response } => {
                if input_count > 1 {
                    lines.push(format!("\n--- {file} ---"));
                }
                lines.push(extract_text(response));
            }
        }
    }
    lines.join("\n")
}

/// JSON rendering of a batch: each entry pretty-printed on its own.
pub fn render_json(entries: &[BatchEntry]) -> Result<String, serde_json::Error> {
    let parts = entries
        .iter()
        .map(serde_json::to_string_pretty)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(parts.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteApiError;
    use serde_json::json;

    fn ok(text: &str) -> ApiResult {
        Ok(json!({"choices": [{"message": {"content": text}}]}))
    }

    #[test]
    fn pdf_report_shape() {
        let report = FileReport::processed(
            "scan.pdf",
            InputKind::Pdf,
            vec![
                OcrResult { page: 1, response: ok("a") },
                OcrResult {
                    page: 2,
                    response: Err(RemoteApiError::new("timeout", None)),
                },
            ],
        );
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["success"], true);
        assert_eq!(v["type"], "pdf");
        assert_eq!(v["pages"], 2);
        assert_eq!(v["results"][0]["page"], 1);
        assert_eq!(v["results"][0]["response"]["choices"][0]["message"]["content"], "a");
        assert_eq!(v["results"][1]["response"]["error"], "timeout");
        assert!(v["results"][1]["response"]["status_code"].is_null());
        assert!(v.get("error").is_none());
    }

    #[test]
    fn image_report_has_no_pages_field() {
        let report = FileReport::processed(
            "a.png",
            InputKind::Image,
            vec![OcrResult { page: 1, response: ok("x") }],
        );
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["type"], "image");
        assert!(v.get("pages").is_none());
    }

    #[test]
    fn failure_report_shape() {
        let v = serde_json::to_value(FileReport::failure("boom")).unwrap();
        assert_eq!(v, json!({"success": false, "error": "boom"}));
    }

    #[test]
    fn batch_entries_serialise_untagged() {
        let page = BatchEntry::Page(OcrResult { page: 3, response: ok("t") });
        let file = BatchEntry::File {
            file: "b.png".into(),
            response: Err(RemoteApiError::network("refused")),
        };
        assert_eq!(serde_json::to_value(&page).unwrap()["page"], 3);
        let v = serde_json::to_value(&file).unwrap();
        assert_eq!(v["file"], "b.png");
        assert_eq!(v["response"]["error"], "refused");
    }

    #[test]
    fn render_text_headers() {
        let entries = vec![
            BatchEntry::Page(OcrResult { page: 1, response: ok("one") }),
            BatchEntry::Page(OcrResult { page: 2, response: ok("two") }),
            BatchEntry::File { file: "c.png".into(), response: ok("three") },
        ];
        let separated = render_text(&entries, true, 2);
        assert_eq!(
            separated,
            "\n--- Page 1 ---\none\n\n--- Page 2 ---\ntwo\n\n--- c.png ---\nthree"
        );
        let plain = render_text(&entries[2..], false, 1);
        assert_eq!(plain, "three");
    }

    #[test]
    fn error_detection() {
        let entries = vec![
            BatchEntry::Page(OcrResult { page: 1, response: ok("fine") }),
            BatchEntry::Page(OcrResult { page: 2, response: Ok(json!({"error": "bad"})) }),
        ];
        assert!(has_errors(&entries));
        assert!(!has_errors(&entries[..1]));
    }
}
