//! AdmissionReview wire envelope.
//!
//! Only the fields the pipeline reads are modelled; everything else in the
//! request is ignored on decode.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const API_VERSION_V1: &str = "admission.k8s.io/v1";
pub const API_VERSION_V1BETA1: &str = "admission.k8s.io/v1beta1";
const SUPPORTED_API_VERSIONS: &[&str] = &[API_VERSION_V1, API_VERSION_V1BETA1];
const REVIEW_KIND: &str = "AdmissionReview";

/// HTTP-style code carried by a denial.
pub const DENY_STATUS_CODE: u16 = 403;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed AdmissionReview: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported apiVersion {0:?}")]
    UnsupportedVersion(String),

    #[error("unexpected kind {0:?}, want AdmissionReview")]
    UnexpectedKind(String),

    #[error("AdmissionReview carries no request")]
    MissingRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionReview {
    pub api_version: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<AdmissionRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<AdmissionResponse>,
}

impl AdmissionReview {
    /// Wrap a response, echoing the request's apiVersion.
    pub fn respond(api_version: &str, response: AdmissionResponse) -> Self {
        Self {
            api_version: api_version.to_string(),
            kind: REVIEW_KIND.to_string(),
            request: None,
            response: Some(response),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupVersionKind {
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub extra: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionRequest {
    pub uid: String,
    #[serde(default)]
    pub kind: GroupVersionKind,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    pub operation: String,
    #[serde(default)]
    pub user_info: UserInfo,
    #[serde(default)]
    pub object: Option<Value>,
    #[serde(default)]
    pub old_object: Option<Value>,
    #[serde(default)]
    pub dry_run: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseStatus {
    pub code: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionResponse {
    pub uid: String,
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ResponseStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl AdmissionResponse {
    pub fn allow(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            allowed: true,
            status: None,
            warnings: Vec::new(),
        }
    }

    /// Allow, surfacing a diagnostic as an admission warning.
    pub fn allow_with_diagnostic(uid: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            warnings: vec![message.into()],
            ..Self::allow(uid)
        }
    }

    pub fn deny(uid: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            allowed: false,
            status: Some(ResponseStatus {
                code: DENY_STATUS_CODE,
                message: message.into(),
                reason: Some("Forbidden".to_string()),
            }),
            warnings: Vec::new(),
        }
    }
}

/// Decode a review body into its apiVersion and request.
pub fn decode_review(body: &[u8]) -> Result<(String, AdmissionRequest), DecodeError> {
    let review: AdmissionReview = serde_json::from_slice(body)?;
    if !SUPPORTED_API_VERSIONS.contains(&review.api_version.as_str()) {
        return Err(DecodeError::UnsupportedVersion(review.api_version));
    }
    if review.kind != REVIEW_KIND {
        return Err(DecodeError::UnexpectedKind(review.kind));
    }
    let request = review.request.ok_or(DecodeError::MissingRequest)?;
    Ok((review.api_version, request))
}

/// Best-effort recovery of `request.uid` and `apiVersion` from a body that
/// failed to decode, so the failure response can still be correlated.
pub fn salvage_identity(body: &[u8]) -> (String, String) {
    let Ok(value) = serde_json::from_slice::<Value>(body) else {
        return (API_VERSION_V1.to_string(), String::new());
    };
    let api_version = value
        .get("apiVersion")
        .and_then(Value::as_str)
        .filter(|v| SUPPORTED_API_VERSIONS.contains(v))
        .unwrap_or(API_VERSION_V1)
        .to_string();
    let uid = value
        .pointer("/request/uid")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    (api_version, uid)
}
