//! Shapes of workflow outputs, decided once where they enter the service.

use log::warn;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Output of the combined ad workflow.
///
/// `product_analysis` and `ad_copy` arrive as JSON text. Both are decoded
/// best-effort: anything unparseable becomes an empty object so one malformed
/// field never sinks the whole ad.
#[derive(Debug, Clone, PartialEq)]
pub struct AdContent {
    pub product_analysis: Value,
    pub ad_copy: Value,
    pub video_prompt: String,
}

impl AdContent {
    pub fn from_main_stuff(main_stuff: &Value) -> Self {
        Self {
            product_analysis: decode_embedded_json(main_stuff, "product_analysis"),
            ad_copy: decode_embedded_json(main_stuff, "ad_copy"),
            video_prompt: match main_stuff.get("video_prompt") {
                Some(Value::String(prompt)) => prompt.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            },
        }
    }
}

fn decode_embedded_json(main_stuff: &Value, name: &str) -> Value {
    match main_stuff.get(name) {
        Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
            Ok(value @ (Value::Object(_) | Value::Array(_))) => value,
            Ok(_) | Err(_) => {
                warn!("Could not decode `{}` from workflow output", name);
                Value::Object(Map::new())
            }
        },
        Some(value @ Value::Object(_)) => value.clone(),
        _ => Value::Object(Map::new()),
    }
}

/// Main output of the video workflow.
///
/// Some video contents expose their location directly, others only as a
/// dumped mapping with `url` or `video_url`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum VideoArtifact {
    Link(String),
    Mapping(Map<String, Value>),
    Other(Value),
}

impl VideoArtifact {
    pub fn from_main_stuff(main_stuff: &Value) -> Self {
        match main_stuff {
            Value::String(url) => VideoArtifact::Link(url.clone()),
            Value::Object(map) => VideoArtifact::Mapping(map.clone()),
            other => VideoArtifact::Other(other.clone()),
        }
    }

    pub fn video_url(&self) -> Option<&str> {
        match self {
            VideoArtifact::Link(url) => Some(url.as_str()).filter(|u| !u.is_empty()),
            VideoArtifact::Mapping(map) => ["url", "video_url"]
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str))
                .filter(|u| !u.is_empty()),
            VideoArtifact::Other(_) => None,
        }
    }
}
