use log::{error, info};
use rocket::State;
use rocket::http::Status;
use rocket::post;
use rocket::serde::json::{self, Json};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::api::{AppError, AppResult};
use crate::orchestration::envelope::Envelope;
use crate::orchestration::generator::{AdGenerator, ProductInfo};

#[derive(Debug, Deserialize)]
pub struct AdRequest {
    pub image_url: String,
    pub product_info: ProductInfo,
}

#[derive(Debug, Deserialize)]
pub struct VideoRequest {
    pub video_prompt: String,
}

fn product_name(product_info: &ProductInfo) -> &str {
    product_info
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("Unknown")
}

/// Hand back `data` on success, otherwise a 500 carrying the envelope error.
fn respond(operation: &str, envelope: Envelope) -> AppResult<Json<Value>> {
    match envelope.into_result() {
        Ok(data) => {
            info!("{} successful", operation);
            Ok(Json(data))
        }
        Err(message) => {
            error!("{} failed: {}", operation, message);
            Err(AppError::new(
                Status::InternalServerError,
                anyhow::anyhow!(message),
            ))
        }
    }
}

#[post("/api/generate-ad", data = "<request>")]
pub async fn generate_ad(
    generator: &State<Arc<AdGenerator>>,
    request: Result<Json<AdRequest>, json::Error<'_>>,
) -> AppResult<Json<Value>> {
    let request = request.map_err(AppError::from_body_error)?.into_inner();
    info!(
        "Generating ad for product: {}",
        product_name(&request.product_info)
    );
    let envelope = generator
        .generate_complete_ad(&request.image_url, &request.product_info)
        .await;
    respond("Ad generation", envelope)
}

#[post("/api/analyze-image", data = "<request>")]
pub async fn analyze_image(
    generator: &State<Arc<AdGenerator>>,
    request: Result<Json<AdRequest>, json::Error<'_>>,
) -> AppResult<Json<Value>> {
    let request = request.map_err(AppError::from_body_error)?.into_inner();
    info!(
        "Analyzing product image for: {}",
        product_name(&request.product_info)
    );
    let envelope = generator
        .analyze_product_image(&request.image_url, &request.product_info)
        .await;
    respond("Image analysis", envelope)
}

#[post("/api/generate-video", data = "<request>")]
pub async fn generate_video(
    generator: &State<Arc<AdGenerator>>,
    request: Result<Json<VideoRequest>, json::Error<'_>>,
) -> AppResult<Json<Value>> {
    let request = request.map_err(AppError::from_body_error)?.into_inner();
    info!("Generating video");
    let envelope = generator.generate_video(&request.video_prompt).await;
    respond("Video generation", envelope)
}
