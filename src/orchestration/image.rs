use anyhow::{Context, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::path::Path;

use crate::utils::PathExt;

/// Where a product image lives, as given by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageReference<'a> {
    Remote(&'a str),
    DataUri(&'a str),
    LocalPath(&'a Path),
}

impl<'a> ImageReference<'a> {
    pub fn classify(reference: &'a str) -> Self {
        let trimmed = reference.trim_start();
        if has_prefix_ignore_case(trimmed, "http://") || has_prefix_ignore_case(trimmed, "https://")
        {
            ImageReference::Remote(reference)
        } else if has_prefix_ignore_case(trimmed, "data:") {
            ImageReference::DataUri(reference)
        } else {
            ImageReference::LocalPath(Path::new(reference))
        }
    }
}

fn has_prefix_ignore_case(text: &str, prefix: &str) -> bool {
    text.as_bytes()
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix.as_bytes()))
}

pub fn mime_for_path(path: &Path) -> &'static str {
    match path.ext_lower().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "image/jpeg",
    }
}

pub fn encode_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", BASE64.encode(bytes))
}

/// Turn any image reference into something the framework can fetch across a
/// process boundary: URLs and data URIs pass through, local files are inlined.
pub async fn normalize_image(reference: &str) -> Result<String> {
    match ImageReference::classify(reference) {
        ImageReference::Remote(url) => Ok(url.to_string()),
        ImageReference::DataUri(uri) => Ok(uri.to_string()),
        ImageReference::LocalPath(path) => {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read image file {}", path.display()))?;
            Ok(encode_data_uri(mime_for_path(path), &bytes))
        }
    }
}
