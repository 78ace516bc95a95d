//! Payload shapes exchanged with the transport layer for signing.

use crate::error::ErrorKind;
use crate::Error;
use serde::{Deserialize, Serialize};

/// Sign request as it arrives from a client. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignRequest {
    pub filename: Option<String>,
    pub page_number: Option<i64>,
    pub x_percent: Option<f64>,
    pub y_percent: Option<f64>,
    pub signature_text: Option<String>,
    pub font: Option<String>,
}

/// A sign request with all required fields present.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidSignRequest {
    pub filename: String,
    pub page_number: i64,
    pub x_percent: f64,
    pub y_percent: f64,
    /// May be empty.
    pub signature_text: String,
    pub font: Option<String>,
}

fn finite(value: Option<f64>, field: &'static str) -> Result<f64, Error> {
    match value {
        None => Err(Error::MissingField(field)),
        Some(value) if value.is_finite() => Ok(value),
        Some(_) => Err(Error::InvalidField(field)),
    }
}

impl SignRequest {
    /// Missing fields are reported before invalid ones.
    pub fn validate(self) -> Result<ValidSignRequest, Error> {
        let filename = self.filename.ok_or(Error::MissingField("filename"))?;
        let signature_text = self
            .signature_text
            .ok_or(Error::MissingField("signatureText"))?;
        let page_number = self.page_number.ok_or(Error::MissingField("pageNumber"))?;
        if self.x_percent.is_none() {
            return Err(Error::MissingField("xPercent"));
        }
        if self.y_percent.is_none() {
            return Err(Error::MissingField("yPercent"));
        }
        Ok(ValidSignRequest {
            filename,
            signature_text,
            page_number,
            x_percent: finite(self.x_percent, "xPercent")?,
            y_percent: finite(self.y_percent, "yPercent")?,
            font: self.font,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignResponse {
    pub message: String,
    pub signed_filename: String,
}

impl SignResponse {
    pub fn signed(signed_filename: String) -> Self {
        SignResponse {
            message: "Document signed".to_owned(),
            signed_filename,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Error> for ErrorResponse {
    fn from(err: &Error) -> Self {
        match err.kind() {
            ErrorKind::MissingField => ErrorResponse {
                message: "Missing required fields".to_owned(),
                error: Some(err.to_string()),
            },
            ErrorKind::InvalidField => ErrorResponse {
                message: "Invalid field value".to_owned(),
                error: Some(err.to_string()),
            },
            ErrorKind::NotFound => ErrorResponse {
                message: err.to_string(),
                error: None,
            },
            _ => ErrorResponse {
                message: "Failed to sign document".to_owned(),
                error: Some(err.to_string()),
            },
        }
    }
}

/// Turn the outcome of a sign operation into a status code and JSON body.
pub fn respond(result: &Result<SignResponse, Error>) -> (u16, serde_json::Value) {
    let body = match result {
        Ok(response) => serde_json::to_value(response),
        Err(err) => serde_json::to_value(ErrorResponse::from(err)),
    };
    let status = match result {
        Ok(_) => 200,
        Err(err) => err.kind().status_code(),
    };
    match body {
        Ok(body) => (status, body),
        Err(err) => {
            log::error!("Could not serialize response: {}", err);
            (500, serde_json::json!({ "message": "Failed to sign document" }))
        }
    }
}
