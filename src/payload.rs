// Payload envelope (§3): immutable once staged. `metadata` is read from the
// SDK-identifying headers on every write request.

use axum::body::Bytes;
use axum::http::HeaderMap;

#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub sdk_version: String,
    pub machine_name: String,
    pub machine_ip: String,
}

impl Metadata {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header_str = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };
        Self {
            sdk_version: header_str("splitsdkversion"),
            machine_name: header_str("splitsdkmachinename"),
            machine_ip: header_str("splitsdkmachineip"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Envelope {
    pub metadata: Metadata,
    pub body: Bytes,
}
