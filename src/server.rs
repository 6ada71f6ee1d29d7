use rocket::data::{Limits, ToByteUnit};
use rocket::{Build, Rocket};
use std::sync::Arc;

use crate::api::catchers::generate_catchers;
use crate::api::fairings::cors::Cors;
use crate::api::fairings::generate_fairing_routes;
use crate::api::handlers::{generate_generation_routes, generate_system_routes};
use crate::common::MAX_JSON_BODY_MIB;
use crate::config::AppConfig;
use crate::orchestration::generator::AdGenerator;

pub fn build_rocket(config: &AppConfig, generator: Arc<AdGenerator>) -> Rocket<Build> {
    let figment = rocket::Config::figment()
        .merge(("address", config.address.clone()))
        .merge(("port", config.port))
        .merge((
            "limits",
            Limits::default().limit("json", MAX_JSON_BODY_MIB.mebibytes()),
        ));

    rocket::custom(figment)
        .manage(generator)
        .attach(Cors::from_config(config))
        .mount("/", generate_system_routes())
        .mount("/", generate_generation_routes())
        .mount("/", generate_fairing_routes())
        .register("/", generate_catchers())
}
