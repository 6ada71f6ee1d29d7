use rocket::serde::json::Json;
use rocket::{Catcher, Request};
use serde_json::{Value, json};

pub fn generate_catchers() -> Vec<Catcher> {
    catchers![not_found, bad_request, unprocessable_entity, internal_error]
}

#[catch(404)]
pub fn not_found(req: &Request<'_>) -> Json<Value> {
    Json(json!({
        "success": false,
        "error": "Endpoint not found",
        "detail": format!("No route for {} {}", req.method(), req.uri()),
    }))
}

#[catch(400)]
pub fn bad_request() -> Json<Value> {
    Json(json!({ "detail": "Malformed request" }))
}

#[catch(422)]
pub fn unprocessable_entity() -> Json<Value> {
    Json(json!({ "detail": "Request body is missing required fields" }))
}

#[catch(500)]
pub fn internal_error() -> Json<Value> {
    Json(json!({
        "success": false,
        "error": "Internal server error",
        "detail": "Internal server error",
    }))
}
