//! `adflow-executor`: run one workflow and print its envelope on stdout.
//!
//! Stdout carries nothing but the envelope JSON; every log line goes to
//! stderr so callers can parse the output directly.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::error;
use serde_json::{Map, Value};
use std::io::{Read, Write};
use std::path::PathBuf;

use crate::bootstrap::initialize;
use crate::common::{CLI_RUNTIME, PIPE_GENERATE_COMPLETE_AD};
use crate::orchestration::envelope::Envelope;
use crate::orchestration::generator::AdGenerator;

#[derive(Debug, Parser)]
#[command(
    name = "adflow-executor",
    version,
    about = "Run an AdFlow workflow and print its result envelope as JSON"
)]
pub struct Cli {
    /// JSON file with `{workflow_name, inputs}`; reads stdin when absent or `-`
    pub input: Option<PathBuf>,

    /// Indent the printed envelope
    #[arg(long)]
    pub pretty: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub workflow_name: String,
    pub inputs: Map<String, Value>,
}

impl Invocation {
    /// Accepts `{workflow_name, inputs}`, or the bare `{image_url,
    /// product_info}` document which runs the complete ad workflow.
    pub fn from_document(document: Value) -> Result<Self> {
        let Value::Object(mut document) = document else {
            return Err(anyhow!("Input must be a JSON object"));
        };

        match document.remove("workflow_name") {
            Some(Value::String(workflow_name)) => {
                let inputs = match document.remove("inputs") {
                    Some(Value::Object(inputs)) => inputs,
                    Some(Value::Null) | None => Map::new(),
                    Some(_) => return Err(anyhow!("`inputs` must be a JSON object")),
                };
                Ok(Self {
                    workflow_name,
                    inputs,
                })
            }
            Some(_) => Err(anyhow!("`workflow_name` must be a string")),
            None => Ok(Self {
                workflow_name: PIPE_GENERATE_COMPLETE_AD.to_string(),
                inputs: document,
            }),
        }
    }
}

fn read_document<R: Read>(input: Option<&PathBuf>, mut stdin: R) -> Result<Value> {
    let raw = match input {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path)
            .with_context(|| format!("Input file {} not found or unreadable", path.display()))?,
        _ => {
            let mut buffer = String::new();
            stdin
                .read_to_string(&mut buffer)
                .context("Failed to read stdin")?;
            buffer
        }
    };
    serde_json::from_str(&raw).context("Input is not valid JSON")
}

fn write_envelope<W: Write>(out: &mut W, envelope: &Envelope, pretty: bool) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *out, envelope)?;
    } else {
        serde_json::to_writer(&mut *out, envelope)?;
    }
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Returns the process exit code.
pub fn run(cli: Cli) -> Result<i32> {
    let mut out = std::io::stdout().lock();
    let generator = match initialize() {
        Ok((_, generator)) => generator,
        Err(e) => {
            write_envelope(&mut out, &Envelope::failure(format!("{:#}", e)), cli.pretty)?;
            return Ok(1);
        }
    };
    run_with(&generator, &cli, std::io::stdin().lock(), &mut out)
}

/// Read one invocation, run it on `generator` and write its envelope to
/// `out`. Exit code 1 means the input never reached a workflow.
pub fn run_with<R: Read, W: Write>(
    generator: &AdGenerator,
    cli: &Cli,
    stdin: R,
    out: &mut W,
) -> Result<i32> {
    let invocation = match read_document(cli.input.as_ref(), stdin)
        .and_then(Invocation::from_document)
    {
        Ok(invocation) => invocation,
        Err(e) => {
            error!("Invalid executor input: {:#}", e);
            write_envelope(out, &Envelope::failure(format!("{:#}", e)), cli.pretty)?;
            return Ok(1);
        }
    };

    let envelope = CLI_RUNTIME.block_on(
        generator.execute_workflow(&invocation.workflow_name, &invocation.inputs),
    );
    write_envelope(out, &envelope, cli.pretty)?;
    Ok(0)
}
