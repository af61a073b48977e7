use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Acknowledgement body returned by most write and delete endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub status_code: u16,
}

/// RFC 7807 style validation problem returned for malformed requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationProblem {
    #[serde(rename = "type", default)]
    pub problem_type: Option<String>,
    pub title: String,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub trace_id: Option<String>,
    #[serde(default)]
    pub errors: BTreeMap<String, Vec<String>>,
}

/// Generic error body. The remote API capitalizes the field name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteMessage {
    #[serde(rename = "Message")]
    pub message: String,
}
