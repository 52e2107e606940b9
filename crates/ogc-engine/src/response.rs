use bytes::Bytes;
use ogc_protocol::ExceptionDocument;

/// What the engine hands back to the binding.
#[derive(Debug, Clone)]
pub struct OgcResponse {
    pub status: u16,
    pub media_type: &'static str,
    pub body: Bytes,
    /// Exception code when the body is an exception document
    pub exception_code: Option<&'static str>,
}

impl OgcResponse {
    pub fn ok(media_type: &'static str, body: impl Into<Bytes>) -> Self {
        Self {
            status: 200,
            media_type,
            body: body.into(),
            exception_code: None,
        }
    }

    pub fn exception(doc: ExceptionDocument) -> Self {
        Self {
            status: doc.status,
            media_type: doc.media_type,
            body: Bytes::from(doc.body),
            exception_code: Some(doc.code),
        }
    }

    pub fn is_exception(&self) -> bool {
        self.exception_code.is_some()
    }

    /// Body as UTF-8 text, lossy for binary payloads.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
