use rocket::Route;

pub mod generation;
pub mod system;

pub fn generate_system_routes() -> Vec<Route> {
    routes![system::index, system::health]
}

pub fn generate_generation_routes() -> Vec<Route> {
    routes![
        generation::generate_ad,
        generation::analyze_image,
        generation::generate_video
    ]
}
