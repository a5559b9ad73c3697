use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use batchwire_core::{DecodingError, EncodedItem};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

use crate::{PredictionError, TransportError};

/// Ordered rows sent to the endpoint in one call. Serializes as `{"rows": [...]}`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchPayload {
    pub rows: Vec<EncodedItem>,
}

impl BatchPayload {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One response row: the encoded outputs, the endpoint's reason for
/// refusing that row, or a row that is not an object at all.
#[derive(Clone, Debug, PartialEq)]
pub enum RowOutcome {
    Ok(EncodedItem),
    Failed { code: String, message: String },
    Malformed { actual: &'static str },
}

impl RowOutcome {
    /// Classifies one row of a response body.
    pub fn from_json(row: Json) -> Self {
        match row {
            Json::Object(map) => match map.get("errorCode") {
                Some(code) => RowOutcome::Failed {
                    code: error_code(code),
                    message: error_message(&map),
                },
                None => RowOutcome::Ok(EncodedItem(map)),
            },
            other => RowOutcome::Malformed {
                actual: json_kind(&other),
            },
        }
    }

    pub(crate) fn into_result(self) -> Result<EncodedItem, PredictionError> {
        match self {
            RowOutcome::Ok(row) => Ok(row),
            RowOutcome::Failed { code, message } => Err(PredictionError::Rejected { code, message }),
            RowOutcome::Malformed { actual } => {
                Err(PredictionError::Decoding(DecodingError::MalformedRow { actual }))
            }
        }
    }
}

fn error_code(code: &Json) -> String {
    match code {
        Json::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn error_message(body: &Map<String, Json>) -> String {
    body.get("errorMessage")
        .and_then(Json::as_str)
        .unwrap_or_default()
        .to_string()
}

fn json_kind(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "a bool",
        Json::Number(_) => "a number",
        Json::String(_) => "a string",
        Json::Array(_) => "an array",
        Json::Object(_) => "an object",
    }
}

/// Rows answered by the endpoint, in the order they were sent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchResponse {
    pub rows: Vec<RowOutcome>,
}

impl BatchResponse {
    pub fn from_rows(rows: impl IntoIterator<Item = EncodedItem>) -> Self {
        Self {
            rows: rows.into_iter().map(RowOutcome::Ok).collect(),
        }
    }

    /// Parses a response body. A top-level `errorCode` fails the whole batch;
    /// each row is classified on its own.
    pub fn from_json(body: Json) -> Result<Self, TransportError> {
        let Json::Object(mut body) = body else {
            return Err(TransportError::MalformedResponse(
                "response is not an object".to_string(),
            ));
        };
        if let Some(code) = body.get("errorCode") {
            return Err(TransportError::Endpoint {
                code: error_code(code),
                message: error_message(&body),
            });
        }
        match body.remove("rows") {
            Some(Json::Array(rows)) => Ok(Self {
                rows: rows.into_iter().map(RowOutcome::from_json).collect(),
            }),
            Some(_) => Err(TransportError::MalformedResponse(
                "rows is not an array".to_string(),
            )),
            None => Err(TransportError::MalformedResponse(
                "response does not contain rows".to_string(),
            )),
        }
    }
}

/// Sends one batch to the remote endpoint.
///
/// Authentication, HTTP mechanics and socket-level retries live behind this
/// trait. The scheduler only relies on the response rows lining up with the
/// payload rows.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, payload: BatchPayload) -> Result<BatchResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, payload: BatchPayload) -> Result<BatchResponse, TransportError> {
        (**self).send(payload).await
    }
}

/// Adapts an async closure into a [`Transport`].
pub struct FnTransport<F>(F);

pub fn transport_fn<F, Fut>(f: F) -> FnTransport<F>
where
    F: Fn(BatchPayload) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<BatchResponse, TransportError>> + Send + 'static,
{
    FnTransport(f)
}

#[async_trait]
impl<F, Fut> Transport for FnTransport<F>
where
    F: Fn(BatchPayload) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<BatchResponse, TransportError>> + Send + 'static,
{
    async fn send(&self, payload: BatchPayload) -> Result<BatchResponse, TransportError> {
        (self.0)(payload).await
    }
}
