use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

/// What the framework should run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipeTarget {
    /// A pipe already registered in the framework's library
    Code(String),
    /// A pipe defined inside a workflow bundle shipped with the request
    Bundle { pipe_code: String, definition: String },
}

impl PipeTarget {
    pub fn pipe_code(&self) -> &str {
        match self {
            PipeTarget::Code(code) => code,
            PipeTarget::Bundle { pipe_code, .. } => pipe_code,
        }
    }
}

/// A named input as the framework expects it.
#[derive(Debug, Clone, PartialEq)]
pub enum PipeInput {
    Image { url: String },
    Structured { concept: String, content: Value },
    Text(String),
}

impl PipeInput {
    pub fn image(url: impl Into<String>) -> Self {
        PipeInput::Image { url: url.into() }
    }

    pub fn structured(concept: &str, content: Value) -> Self {
        PipeInput::Structured {
            concept: concept.to_string(),
            content,
        }
    }

    pub fn to_wire(&self) -> Value {
        match self {
            PipeInput::Image { url } => json!({
                "concept": "Image",
                "content": { "url": url },
            }),
            PipeInput::Structured { concept, content } => json!({
                "concept": concept,
                "content": content,
            }),
            PipeInput::Text(text) => Value::String(text.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipeRequest {
    pub target: PipeTarget,
    pub inputs: BTreeMap<String, PipeInput>,
}

#[derive(Serialize)]
struct WireRequest<'a> {
    pipe_code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    plx_content: Option<&'a str>,
    inputs: Map<String, Value>,
}

impl PipeRequest {
    pub fn new(target: PipeTarget) -> Self {
        Self {
            target,
            inputs: BTreeMap::new(),
        }
    }

    pub fn input(mut self, name: &str, input: PipeInput) -> Self {
        self.inputs.insert(name.to_string(), input);
        self
    }

    pub fn pipe_code(&self) -> &str {
        self.target.pipe_code()
    }
}

impl Serialize for PipeRequest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let plx_content = match &self.target {
            PipeTarget::Code(_) => None,
            PipeTarget::Bundle { definition, .. } => Some(definition.as_str()),
        };
        WireRequest {
            pipe_code: self.target.pipe_code(),
            plx_content,
            inputs: self
                .inputs
                .iter()
                .map(|(name, input)| (name.clone(), input.to_wire()))
                .collect(),
        }
        .serialize(serializer)
    }
}

/// The dumped main output of a finished workflow. Never `null`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PipeOutput {
    pub main_stuff: Value,
}

impl PipeOutput {
    pub fn new(main_stuff: Value) -> Self {
        Self { main_stuff }
    }

    /// Decode a reply document shared by every transport.
    pub fn from_reply(reply: Value) -> Result<Self> {
        match reply.get("main_stuff") {
            Some(Value::Null) | None => match reply.get("error").and_then(Value::as_str) {
                Some(message) => Err(anyhow!(message.to_string())),
                None => Err(anyhow!("Pipeline reply has no main_stuff")),
            },
            Some(_) => serde_json::from_value(reply).context("Malformed pipeline reply"),
        }
    }
}
