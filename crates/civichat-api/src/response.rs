//! APIv3 response envelope decoding.

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// Envelope returned by `civicrm/ajax/rest`.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse {
    #[serde(default, deserialize_with = "flag")]
    pub is_error: bool,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub values: Option<Values>,
}

/// `values` is an array with `sequential: 1`, an id-keyed object otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Values {
    List(Vec<Value>),
    Keyed(serde_json::Map<String, Value>),
}

impl ApiResponse {
    /// Decodes a response body and rejects CRM-flagged errors.
    pub fn parse(body: &str) -> Result<Self> {
        let response: Self = serde_json::from_str(body)?;
        if response.is_error {
            let message = response
                .error_message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "Unknown CiviCRM error".to_string());
            return Err(Error::Api(message));
        }
        Ok(response)
    }

    /// Decodes every row of `values`, in the order the CRM sent them.
    pub fn rows<T: DeserializeOwned>(self) -> Result<Vec<T>> {
        let values = match self.values {
            None => return Ok(Vec::new()),
            Some(Values::List(list)) => list,
            Some(Values::Keyed(map)) => map.into_iter().map(|(_, v)| v).collect(),
        };
        values
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(Error::from))
            .collect()
    }
}

/// `is_error` arrives as `0`/`1`, `true`/`false` or `"0"`/`"1"`.
fn flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_i64() != Some(0),
        Value::String(s) => !s.is_empty() && s != "0",
        _ => false,
    })
}

/// Ids may be JSON strings or numbers depending on the entity.
pub(crate) fn id_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!("expected an id, got {other}"))),
    }
}
