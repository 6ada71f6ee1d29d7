use anyhow::{Context, Result, anyhow, bail};
use log::{debug, info};
use serde_json::{Map, Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::common::{
    DEFAULT_TONE, IMAGE_ANALYSIS_CONCEPT, KNOWN_TONES, MAX_VIDEO_PROMPT_CHARS,
    PIPE_ANALYZE_PRODUCT_IMAGE, PIPE_GENERATE_AD_COPY_VARIANTS, PIPE_GENERATE_COMPLETE_AD,
    PIPE_GENERATE_SINGLE_TONE_AD, PIPE_GENERATE_VIDEO, PRODUCT_INFO_CONCEPT,
    WORKFLOW_COMPOSE_COMPLETE_AD,
};
use crate::config::AppConfig;
use crate::orchestration::content::{AdContent, VideoArtifact};
use crate::orchestration::envelope::Envelope;
use crate::orchestration::image::normalize_image;
use crate::pipeline::{PipeInput, PipeRequest, PipeTarget, PipelineExecutor};
use crate::utils::truncate_chars;

pub type ProductInfo = Map<String, Value>;

/// Runs the AdFlow workflows and shapes their outputs into envelopes.
///
/// Holds only read-only state, so one instance serves every request.
pub struct AdGenerator {
    executor: Arc<dyn PipelineExecutor>,
    complete_ad_workflow: PathBuf,
    video_workflow: PathBuf,
}

impl AdGenerator {
    pub fn new(executor: Arc<dyn PipelineExecutor>, config: &AppConfig) -> Self {
        Self::with_workflows(
            executor,
            config.complete_ad_workflow.clone(),
            config.video_workflow.clone(),
        )
    }

    pub fn with_workflows(
        executor: Arc<dyn PipelineExecutor>,
        complete_ad_workflow: PathBuf,
        video_workflow: PathBuf,
    ) -> Self {
        Self {
            executor,
            complete_ad_workflow,
            video_workflow,
        }
    }

    async fn run(&self, request: PipeRequest) -> Result<Value> {
        let start_time = Instant::now();
        let pipe_code = request.pipe_code().to_string();
        info!("Running pipe `{}` via {}", pipe_code, self.executor.name());
        let output = self.executor.execute(request).await?;
        if output.main_stuff.is_null() {
            bail!("Pipe `{}` produced no output", pipe_code);
        }
        info!(
            duration = &*format!("{:?}", start_time.elapsed());
            "Pipe `{}` completed", pipe_code
        );
        Ok(output.main_stuff)
    }

    pub async fn analyze_product_image(
        &self,
        image_url: &str,
        product_info: &ProductInfo,
    ) -> Envelope {
        Envelope::from_result(self.try_analyze_product_image(image_url, product_info).await)
    }

    async fn try_analyze_product_image(
        &self,
        image_url: &str,
        product_info: &ProductInfo,
    ) -> Result<Value> {
        let image = normalize_image(image_url).await?;
        let request = PipeRequest::new(PipeTarget::Code(PIPE_ANALYZE_PRODUCT_IMAGE.to_string()))
            .input("image", PipeInput::image(image))
            .input(
                "product_info",
                PipeInput::structured(PRODUCT_INFO_CONCEPT, Value::Object(product_info.clone())),
            );
        self.run(request).await
    }

    pub async fn generate_ad_copy_variants(
        &self,
        product_info: &ProductInfo,
        image_analysis: &Value,
    ) -> Envelope {
        let request = PipeRequest::new(PipeTarget::Code(PIPE_GENERATE_AD_COPY_VARIANTS.to_string()))
            .input(
                "product_info",
                PipeInput::structured(PRODUCT_INFO_CONCEPT, Value::Object(product_info.clone())),
            )
            .input(
                "image_analysis",
                PipeInput::structured(IMAGE_ANALYSIS_CONCEPT, image_analysis.clone()),
            );
        Envelope::from_result(self.run(request).await)
    }

    /// Single combined workflow: analysis, ad copy and video prompt in one
    /// run, with the two JSON-text fields unwrapped afterwards.
    pub async fn generate_complete_ad(
        &self,
        image_url: &str,
        product_info: &ProductInfo,
    ) -> Envelope {
        Envelope::from_result(self.try_generate_complete_ad(image_url, product_info).await)
    }

    async fn try_generate_complete_ad(
        &self,
        image_url: &str,
        product_info: &ProductInfo,
    ) -> Result<Value> {
        let definition = load_workflow(&self.complete_ad_workflow).await?;
        let image = normalize_image(image_url).await?;
        let request = PipeRequest::new(PipeTarget::Bundle {
            pipe_code: PIPE_GENERATE_COMPLETE_AD.to_string(),
            definition,
        })
        .input("product_image", PipeInput::image(image));

        let main_stuff = self.run(request).await?;
        let content = AdContent::from_main_stuff(&main_stuff);
        Ok(json!({
            "product_analysis": content.product_analysis,
            "ad_copy": content.ad_copy,
            "video_prompt": content.video_prompt,
            "product_info": product_info,
            "image_url": image_url,
        }))
    }

    /// Two discrete workflow calls: analyze the image, then write copy
    /// variants from that analysis. A failing step's envelope is returned
    /// unchanged.
    pub async fn compose_complete_ad(
        &self,
        image_url: &str,
        product_info: &ProductInfo,
    ) -> Envelope {
        let image_analysis = match self
            .analyze_product_image(image_url, product_info)
            .await
            .into_result()
        {
            Ok(analysis) => analysis,
            Err(error) => return Envelope::failure(error),
        };

        let ad_variants = match self
            .generate_ad_copy_variants(product_info, &image_analysis)
            .await
            .into_result()
        {
            Ok(variants) => variants,
            Err(error) => return Envelope::failure(error),
        };

        Envelope::success(json!({
            "image_analysis": image_analysis,
            "ad_variants": ad_variants,
            "product_info": product_info,
            "image_url": image_url,
        }))
    }

    pub async fn generate_single_tone_ad(
        &self,
        product_info: &ProductInfo,
        image_analysis: &Value,
        tone: &str,
    ) -> Envelope {
        if !KNOWN_TONES.contains(&tone) {
            debug!("Using caller-supplied tone `{}`", tone);
        }
        let request = PipeRequest::new(PipeTarget::Code(PIPE_GENERATE_SINGLE_TONE_AD.to_string()))
            .input(
                "product_info",
                PipeInput::structured(PRODUCT_INFO_CONCEPT, Value::Object(product_info.clone())),
            )
            .input(
                "image_analysis",
                PipeInput::structured(IMAGE_ANALYSIS_CONCEPT, image_analysis.clone()),
            )
            .input("tone", PipeInput::Text(tone.to_string()));
        Envelope::from_result(self.run(request).await)
    }

    pub async fn generate_video(&self, video_prompt: &str) -> Envelope {
        Envelope::from_result(self.try_generate_video(video_prompt).await)
    }

    async fn try_generate_video(&self, video_prompt: &str) -> Result<Value> {
        let definition = load_workflow(&self.video_workflow).await?;
        let prompt = truncate_chars(video_prompt, MAX_VIDEO_PROMPT_CHARS);
        if prompt.len() < video_prompt.len() {
            info!(
                "Video prompt truncated to {} characters",
                MAX_VIDEO_PROMPT_CHARS
            );
        }
        let request = PipeRequest::new(PipeTarget::Bundle {
            pipe_code: PIPE_GENERATE_VIDEO.to_string(),
            definition,
        })
        .input("video_prompt", PipeInput::Text(prompt.to_string()));

        let main_stuff = self.run(request).await?;
        let artifact = VideoArtifact::from_main_stuff(&main_stuff);
        Ok(json!({
            "video_url": artifact.video_url(),
            "prompt": prompt,
        }))
    }

    /// Dispatch a workflow by name with loosely typed inputs, as received by
    /// the executor CLI.
    pub async fn execute_workflow(
        &self,
        workflow_name: &str,
        inputs: &Map<String, Value>,
    ) -> Envelope {
        let prepared = match WorkflowCall::parse(workflow_name, inputs) {
            Ok(call) => call,
            Err(error) => return Envelope::failure(format!("{:#}", error)),
        };

        match prepared {
            WorkflowCall::AnalyzeProductImage { image_url, product_info } => {
                self.analyze_product_image(&image_url, &product_info).await
            }
            WorkflowCall::GenerateAdCopyVariants { product_info, image_analysis } => {
                self.generate_ad_copy_variants(&product_info, &image_analysis).await
            }
            WorkflowCall::GenerateCompleteAd { image_url, product_info } => {
                self.generate_complete_ad(&image_url, &product_info).await
            }
            WorkflowCall::ComposeCompleteAd { image_url, product_info } => {
                self.compose_complete_ad(&image_url, &product_info).await
            }
            WorkflowCall::GenerateSingleToneAd { product_info, image_analysis, tone } => {
                self.generate_single_tone_ad(&product_info, &image_analysis, &tone).await
            }
            WorkflowCall::GenerateVideo { video_prompt } => {
                self.generate_video(&video_prompt).await
            }
        }
    }
}

async fn load_workflow(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to load workflow definition {}", path.display()))
}

#[derive(Debug, Clone, PartialEq)]
enum WorkflowCall {
    AnalyzeProductImage { image_url: String, product_info: ProductInfo },
    GenerateAdCopyVariants { product_info: ProductInfo, image_analysis: Value },
    GenerateCompleteAd { image_url: String, product_info: ProductInfo },
    ComposeCompleteAd { image_url: String, product_info: ProductInfo },
    GenerateSingleToneAd { product_info: ProductInfo, image_analysis: Value, tone: String },
    GenerateVideo { video_prompt: String },
}

impl WorkflowCall {
    fn parse(name: &str, inputs: &Map<String, Value>) -> Result<Self> {
        let call = match name {
            PIPE_ANALYZE_PRODUCT_IMAGE => WorkflowCall::AnalyzeProductImage {
                image_url: required_str(inputs, "image_url")?,
                product_info: product_info(inputs)?,
            },
            PIPE_GENERATE_AD_COPY_VARIANTS => WorkflowCall::GenerateAdCopyVariants {
                product_info: product_info(inputs)?,
                image_analysis: required_value(inputs, "image_analysis")?,
            },
            PIPE_GENERATE_COMPLETE_AD => WorkflowCall::GenerateCompleteAd {
                image_url: required_str(inputs, "image_url")?,
                product_info: product_info(inputs)?,
            },
            WORKFLOW_COMPOSE_COMPLETE_AD => WorkflowCall::ComposeCompleteAd {
                image_url: required_str(inputs, "image_url")?,
                product_info: product_info(inputs)?,
            },
            PIPE_GENERATE_SINGLE_TONE_AD => WorkflowCall::GenerateSingleToneAd {
                product_info: product_info(inputs)?,
                image_analysis: required_value(inputs, "image_analysis")?,
                tone: inputs
                    .get("tone")
                    .and_then(Value::as_str)
                    .unwrap_or(DEFAULT_TONE)
                    .to_string(),
            },
            PIPE_GENERATE_VIDEO => WorkflowCall::GenerateVideo {
                video_prompt: required_str(inputs, "video_prompt")?,
            },
            unknown => return Err(anyhow!("Unknown workflow: {}", unknown)),
        };
        Ok(call)
    }
}

fn required_value(inputs: &Map<String, Value>, key: &str) -> Result<Value> {
    match inputs.get(key) {
        Some(Value::Null) | None => Err(anyhow!("Missing required input: {}", key)),
        Some(value) => Ok(value.clone()),
    }
}

fn required_str(inputs: &Map<String, Value>, key: &str) -> Result<String> {
    match required_value(inputs, key)? {
        Value::String(text) => Ok(text),
        _ => Err(anyhow!("Input `{}` must be a string", key)),
    }
}

fn product_info(inputs: &Map<String, Value>) -> Result<ProductInfo> {
    match inputs.get("product_info") {
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(Value::Null) | None => Ok(ProductInfo::new()),
        Some(_) => Err(anyhow!("Input `product_info` must be a JSON object")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestration::testing::MockExecutor;

    fn product() -> ProductInfo {
        json!({"name": "Trail Shoe", "price": 129.0, "features": ["grippy", "light"]})
            .as_object()
            .cloned()
            .unwrap_or_default()
    }

    fn generator_with(executor: Arc<MockExecutor>, dir: &Path) -> AdGenerator {
        let complete = dir.join("adflow_complete.plx");
        let video = dir.join("video_generation.plx");
        std::fs::write(&complete, "domain = \"adflow\"").unwrap();
        std::fs::write(&video, "domain = \"video\"").unwrap();
        AdGenerator::with_workflows(executor, complete, video)
    }

    #[tokio::test]
    async fn analyze_success_fills_data() {
        let temp = tempfile::tempdir().unwrap();
        let executor = MockExecutor::replying(json!({"colors": ["red"], "quality": "high"}));
        let generator = generator_with(executor.clone(), temp.path());

        let envelope = generator
            .analyze_product_image("https://cdn.example/shoe.png", &product())
            .await;
        assert!(envelope.success);
        assert_eq!(envelope.error, None);
        assert_eq!(envelope.data, Some(json!({"colors": ["red"], "quality": "high"})));

        let requests = executor.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].pipe_code(), "analyze_product_image");
        assert_eq!(
            requests[0].inputs["image"],
            PipeInput::image("https://cdn.example/shoe.png")
        );
    }

    #[tokio::test]
    async fn executor_error_becomes_failure_envelope() {
        let temp = tempfile::tempdir().unwrap();
        let executor = MockExecutor::failing("model call failed");
        let generator = generator_with(executor, temp.path());

        let envelope = generator
            .analyze_product_image("https://cdn.example/shoe.png", &product())
            .await;
        assert_eq!(envelope, Envelope::failure("model call failed"));
    }

    #[tokio::test]
    async fn null_output_is_never_a_success() {
        let temp = tempfile::tempdir().unwrap();
        let executor = MockExecutor::replying(Value::Null);
        let generator = generator_with(executor, temp.path());

        let envelope = generator
            .analyze_product_image("https://cdn.example/shoe.png", &product())
            .await;
        assert_eq!(
            envelope,
            Envelope::failure("Pipe `analyze_product_image` produced no output")
        );
    }

    #[tokio::test]
    async fn complete_ad_inlines_local_image_and_unwraps_fields() {
        let temp = tempfile::tempdir().unwrap();
        let image = temp.path().join("shoe.png");
        std::fs::write(&image, b"png-bytes").unwrap();
        let executor = MockExecutor::replying(json!({
            "product_analysis": "{\"sentiment\": \"energetic\"}",
            "ad_copy": "not json at all",
            "video_prompt": "Slow pan over a trail shoe",
        }));
        let generator = generator_with(executor.clone(), temp.path());
        let image_ref = image.to_str().unwrap();

        let envelope = generator.generate_complete_ad(image_ref, &product()).await;
        let data = envelope.into_result().unwrap();
        assert_eq!(data["product_analysis"], json!({"sentiment": "energetic"}));
        assert_eq!(data["ad_copy"], json!({}));
        assert_eq!(data["video_prompt"], "Slow pan over a trail shoe");
        assert_eq!(data["image_url"], image_ref);
        assert_eq!(data["product_info"]["name"], "Trail Shoe");

        let requests = executor.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].target,
            PipeTarget::Bundle {
                pipe_code: "generate_complete_ad".to_string(),
                definition: "domain = \"adflow\"".to_string(),
            }
        );
        assert_eq!(requests[0].inputs.len(), 1);
        match &requests[0].inputs["product_image"] {
            PipeInput::Image { url } => assert!(url.starts_with("data:image/png;base64,")),
            other => panic!("unexpected input {:?}", other),
        }
    }

    #[tokio::test]
    async fn complete_ad_without_workflow_file_fails() {
        let executor = MockExecutor::replying(json!({}));
        let generator = AdGenerator::with_workflows(
            executor.clone(),
            PathBuf::from("/missing/adflow_complete.plx"),
            PathBuf::from("/missing/video_generation.plx"),
        );
        let envelope = generator
            .generate_complete_ad("https://cdn.example/shoe.png", &product())
            .await;
        assert!(!envelope.success);
        assert!(
            envelope
                .error
                .unwrap_or_default()
                .starts_with("Failed to load workflow definition /missing/adflow_complete.plx")
        );
        assert!(executor.requests().is_empty());
    }

    #[tokio::test]
    async fn compose_runs_analysis_then_variants() {
        let temp = tempfile::tempdir().unwrap();
        let executor = MockExecutor::new(|request| match request.pipe_code() {
            "analyze_product_image" => Ok(json!({"objects": ["shoe"]})),
            "generate_ad_copy_variants" => Ok(json!([{"headline": "Go further"}])),
            other => Err(anyhow!("unexpected pipe {}", other)),
        });
        let generator = generator_with(executor.clone(), temp.path());

        let data = generator
            .compose_complete_ad("https://cdn.example/shoe.png", &product())
            .await
            .into_result()
            .unwrap();
        assert_eq!(data["image_analysis"], json!({"objects": ["shoe"]}));
        assert_eq!(data["ad_variants"][0]["headline"], "Go further");

        let requests = executor.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[1].inputs["image_analysis"],
            PipeInput::structured(IMAGE_ANALYSIS_CONCEPT, json!({"objects": ["shoe"]}))
        );
    }

    #[tokio::test]
    async fn compose_stops_at_failed_analysis() {
        let temp = tempfile::tempdir().unwrap();
        let executor = MockExecutor::failing("vision model unavailable");
        let generator = generator_with(executor.clone(), temp.path());

        let envelope = generator
            .compose_complete_ad("https://cdn.example/shoe.png", &product())
            .await;
        assert_eq!(envelope, Envelope::failure("vision model unavailable"));
        assert_eq!(executor.requests().len(), 1);
    }

    #[tokio::test]
    async fn single_tone_forwards_any_tone() {
        let temp = tempfile::tempdir().unwrap();
        let executor = MockExecutor::replying(json!({"headline": "Yo"}));
        let generator = generator_with(executor.clone(), temp.path());

        let envelope = generator
            .generate_single_tone_ad(&product(), &json!({}), "sarcastic")
            .await;
        assert!(envelope.success);
        assert_eq!(
            executor.requests()[0].inputs["tone"],
            PipeInput::Text("sarcastic".to_string())
        );
    }

    #[tokio::test]
    async fn video_prompt_is_truncated_before_forwarding() {
        let temp = tempfile::tempdir().unwrap();
        let executor = MockExecutor::replying(json!({"video_url": "https://v/clip.mp4"}));
        let generator = generator_with(executor.clone(), temp.path());
        let long_prompt = "ab".repeat(1500);

        let data = generator
            .generate_video(&long_prompt)
            .await
            .into_result()
            .unwrap();
        assert_eq!(data["video_url"], "https://v/clip.mp4");
        assert_eq!(data["prompt"].as_str().unwrap().chars().count(), 2000);

        let forwarded = match &executor.requests()[0].inputs["video_prompt"] {
            PipeInput::Text(text) => text.clone(),
            other => panic!("unexpected input {:?}", other),
        };
        assert_eq!(forwarded, long_prompt[..2000]);
    }

    #[tokio::test]
    async fn short_video_prompt_is_unchanged_and_missing_url_is_null() {
        let temp = tempfile::tempdir().unwrap();
        let executor = MockExecutor::replying(json!({"status": "done"}));
        let generator = generator_with(executor.clone(), temp.path());

        let data = generator
            .generate_video("A shoe on a mountain")
            .await
            .into_result()
            .unwrap();
        assert_eq!(data, json!({"video_url": null, "prompt": "A shoe on a mountain"}));
    }

    #[tokio::test]
    async fn dispatch_validates_names_and_inputs() {
        let temp = tempfile::tempdir().unwrap();
        let executor = MockExecutor::replying(json!({"headline": "Hi"}));
        let generator = generator_with(executor.clone(), temp.path());

        let unknown = generator.execute_workflow("make_coffee", &Map::new()).await;
        assert_eq!(unknown, Envelope::failure("Unknown workflow: make_coffee"));

        let missing = generator
            .execute_workflow("analyze_product_image", &Map::new())
            .await;
        assert_eq!(missing, Envelope::failure("Missing required input: image_url"));

        let inputs = json!({"product_info": {"name": "Shoe"}, "image_analysis": {"colors": []}});
        let envelope = generator
            .execute_workflow("generate_single_tone_ad", inputs.as_object().unwrap())
            .await;
        assert!(envelope.success);
        assert_eq!(
            executor.requests()[0].inputs["tone"],
            PipeInput::Text("professional".to_string())
        );
        assert!(executor.requests().len() == 1);
    }
}
