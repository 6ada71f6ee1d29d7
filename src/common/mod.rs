use std::sync::LazyLock;

use tokio::runtime::{Builder, Runtime};

pub const SERVICE_NAME: &str = "AdFlow AI API";

pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Veo 3 Fast rejects prompts above this many characters.
pub const MAX_VIDEO_PROMPT_CHARS: usize = 2000;

pub const DEFAULT_TONE: &str = "professional";

pub const KNOWN_TONES: &[&str] = &["professional", "casual", "enthusiastic", "persuasive"];

pub const PRODUCT_INFO_CONCEPT: &str = "adflow.ProductInfo";

pub const IMAGE_ANALYSIS_CONCEPT: &str = "adflow.ImageAnalysis";

// Pipe codes understood by the Pipelex library.
pub const PIPE_ANALYZE_PRODUCT_IMAGE: &str = "analyze_product_image";
pub const PIPE_GENERATE_AD_COPY_VARIANTS: &str = "generate_ad_copy_variants";
pub const PIPE_GENERATE_SINGLE_TONE_AD: &str = "generate_single_tone_ad";
pub const PIPE_GENERATE_COMPLETE_AD: &str = "generate_complete_ad";
pub const PIPE_GENERATE_VIDEO: &str = "generate_video";

pub const WORKFLOW_COMPOSE_COMPLETE_AD: &str = "compose_complete_ad";

pub static CURRENT_NUM_THREADS: LazyLock<usize> = LazyLock::new(|| {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
});

// Rocket-specific Tokio Runtime
// Every request handler and every pipeline await runs on this runtime.
pub static ROCKET_RUNTIME: LazyLock<Runtime> = LazyLock::new(|| {
    Builder::new_multi_thread()
        .worker_threads(*CURRENT_NUM_THREADS)
        .thread_name("rocket-io-worker")
        .enable_all()
        .build()
        .expect("Failed to build Rocket Tokio runtime")
});

// The executor CLI runs exactly one workflow, a single thread is enough.
pub static CLI_RUNTIME: LazyLock<Runtime> = LazyLock::new(|| {
    Builder::new_current_thread()
        .thread_name("executor-cli")
        .enable_all()
        .build()
        .expect("Failed to build CLI Tokio runtime")
});

/// Inline data URIs can be posted as `image_url`, so JSON bodies get room.
pub const MAX_JSON_BODY_MIB: u64 = 20;
