//! Envelope framing shared by every message exchanged with the engine.
//!
//! Each JSON object carries a `@type` discriminant. Replies additionally echo
//! the request's `@extra` (the correlation id); events never carry one. When
//! several logical connections share one engine, `@client_id` names the
//! connection the message belongs to.

use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{ERROR_TYPE, EngineError, EnvelopeError};
use crate::functions::Function;
use crate::ids::{ConnectionId, CorrelationId};

/// Only the routing fields; the payload is skipped without being built.
#[derive(Deserialize)]
struct RawHeader {
    #[serde(rename = "@type", default)]
    kind: String,
    #[serde(rename = "@extra", default)]
    extra: Option<serde_json::Value>,
    #[serde(rename = "@client_id", default)]
    client_id: Option<ConnectionId>,
}

/// Routing fields of an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeHeader {
    pub kind: String,
    pub correlation_id: Option<CorrelationId>,
    pub connection_id: Option<ConnectionId>,
}

impl EnvelopeHeader {
    pub fn parse(raw: &str) -> Result<Self, EnvelopeError> {
        let header: RawHeader = serde_json::from_str(raw)?;
        if header.kind.is_empty() {
            return Err(EnvelopeError::MissingType);
        }
        // Only string tokens are ours; anything else was not issued by this layer.
        let correlation_id = match header.extra {
            Some(serde_json::Value::String(s)) if !s.is_empty() => Some(CorrelationId::new(s)),
            _ => None,
        };
        Ok(Self {
            kind: header.kind,
            correlation_id,
            connection_id: header.client_id,
        })
    }
}

/// One message received from the engine.
///
/// Cheap to clone: the raw text is shared and decoded on demand.
#[derive(Debug, Clone)]
pub struct Envelope {
    header: EnvelopeHeader,
    raw: Arc<str>,
}

impl Envelope {
    pub fn parse(raw: impl Into<Arc<str>>) -> Result<Self, EnvelopeError> {
        let raw = raw.into();
        let header = EnvelopeHeader::parse(&raw)?;
        Ok(Self { header, raw })
    }

    #[must_use]
    pub fn header(&self) -> &EnvelopeHeader {
        &self.header
    }

    #[must_use]
    pub fn kind(&self) -> &str {
        &self.header.kind
    }

    #[must_use]
    pub fn correlation_id(&self) -> Option<&CorrelationId> {
        self.header.correlation_id.as_ref()
    }

    #[must_use]
    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.header.connection_id
    }

    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Whether this is a direct reply rather than an unsolicited event.
    #[must_use]
    pub fn is_reply(&self) -> bool {
        self.header.correlation_id.is_some()
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.header.kind == ERROR_TYPE
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.raw)
    }

    /// The engine's structured error, if this envelope is error-shaped.
    pub fn engine_error(&self) -> Option<Result<EngineError, serde_json::Error>> {
        self.is_error().then(|| self.decode())
    }
}

/// Serialize a typed request into the engine's envelope format.
pub fn encode_request<F: Function>(
    request: &F,
    correlation_id: Option<&CorrelationId>,
) -> Result<String, EnvelopeError> {
    let value = serde_json::to_value(request)?;
    encode_value(F::TYPE, value, correlation_id)
}

/// Stamp `@type` and `@extra` onto an already-built request object.
pub fn encode_value(
    kind: &'static str,
    value: serde_json::Value,
    correlation_id: Option<&CorrelationId>,
) -> Result<String, EnvelopeError> {
    let serde_json::Value::Object(mut map) = value else {
        return Err(EnvelopeError::NotAnObject { kind });
    };
    map.insert("@type".into(), kind.into());
    if let Some(id) = correlation_id {
        map.insert("@extra".into(), id.as_str().into());
    }
    Ok(serde_json::Value::Object(map).to_string())
}

/// Stamp a correlation id onto a free-form request that already names its `@type`.
pub fn tag_json(
    mut value: serde_json::Value,
    correlation_id: &CorrelationId,
) -> Result<String, EnvelopeError> {
    let Some(map) = value.as_object_mut() else {
        return Err(EnvelopeError::NotAnObject { kind: "json" });
    };
    if !map
        .get("@type")
        .and_then(serde_json::Value::as_str)
        .is_some_and(|kind| !kind.is_empty())
    {
        return Err(EnvelopeError::MissingType);
    }
    map.insert("@extra".into(), correlation_id.as_str().into());
    Ok(value.to_string())
}
