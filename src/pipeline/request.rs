//! Request building: one image + one prompt → one chat-completions body.
//!
//! Pure functions, no I/O. The serde types mirror the OpenAI-style wire
//! format that vLLM, the Hugging Face router, and most hosted VLMs accept:
//!
//! ```json
//! {"model": "...",
//!  "messages": [{"role": "user",
//!                "content": [{"type": "text", "text": "..."},
//!                            {"type": "image_url", "image_url": {"url": "..."}}]}]}
//! ```

use super::encode::EncodedImageRef;
use crate::prompts::page_annotated;
use serde::Serialize;

/// A fully-assembled request for one page or file. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrRequest {
    model: String,
    prompt: String,
    image: EncodedImageRef,
}

impl OcrRequest {
    /// Build a request. `page` is `(index, total)`, 1-based, and adds a
    /// `(Page i/N)` suffix to the prompt for multi-page batches.
    pub fn build(
        model: &str,
        prompt: &str,
        image: EncodedImageRef,
        page: Option<(usize, usize)>,
    ) -> Self {
        let prompt = match page {
            Some((index, total)) => page_annotated(prompt, index, total),
            None => prompt.to_string(),
        };
        Self {
            model: model.to_string(),
            prompt,
            image,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn image(&self) -> &EncodedImageRef {
        &self.image
    }

    /// The JSON body sent to the endpoint.
    pub fn payload(&self) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::Text {
                        text: self.prompt.clone(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: self.image.to_url(),
                        },
                    },
                ],
            }],
        }
    }
}

/// Chat-completions request body.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: Vec<ContentPart>,
}

/// One part of a multimodal message.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data_ref() -> EncodedImageRef {
        EncodedImageRef::Data {
            mime_type: "image/jpeg".into(),
            base64: "AAAA".into(),
        }
    }

    #[test]
    fn single_image_payload_shape() {
        let req = OcrRequest::build("qwen", "Read it", data_ref(), None);
        let body = serde_json::to_value(req.payload()).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "qwen",
                "messages": [{
                    "role": "user",
                    "content": [
                        {"type": "text", "text": "Read it"},
                        {"type": "image_url", "image_url": {"url": "data:image/jpeg;base64,AAAA"}}
                    ]
                }]
            })
        );
    }

    #[test]
    fn batch_prompt_is_page_annotated() {
        let req = OcrRequest::build("qwen", "Read it", data_ref(), Some((3, 7)));
        assert_eq!(req.prompt(), "Read it (Page 3/7)");
    }

    #[test]
    fn remote_url_forwarded_verbatim() {
        let url = "https://example.com/a.png?sig=abc&x=1";
        let req = OcrRequest::build("m", "p", EncodedImageRef::Url(url.into()), None);
        let body = serde_json::to_value(req.payload()).unwrap();
        assert_eq!(body["messages"][0]["content"][1]["image_url"]["url"], url);
    }
}
