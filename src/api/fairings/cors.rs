use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::{Header, Status};
use rocket::{Request, Response};

use crate::config::AppConfig;

/// Adds `Access-Control-Allow-*` headers for the configured origins.
pub struct Cors {
    allowed_origins: Vec<String>,
    allow_any: bool,
}

impl Cors {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            allowed_origins: config.allowed_origins.clone(),
            allow_any: config.allows_any_origin(),
        }
    }

    fn allowed_origin<'a>(&self, origin: &'a str) -> Option<&'a str> {
        if self.allow_any || self.allowed_origins.iter().any(|o| o == origin) {
            Some(origin)
        } else {
            None
        }
    }
}

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "CORS headers",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        match req.headers().get_one("Origin") {
            Some(origin) => {
                let Some(origin) = self.allowed_origin(origin) else {
                    return;
                };
                res.set_header(Header::new("Access-Control-Allow-Origin", origin.to_string()));
                res.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
                res.set_header(Header::new("Vary", "Origin"));
            }
            None if self.allow_any => {
                res.set_header(Header::new("Access-Control-Allow-Origin", "*"));
            }
            None => return,
        }
        res.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "GET, POST, OPTIONS",
        ));
        res.set_header(Header::new(
            "Access-Control-Allow-Headers",
            req.headers()
                .get_one("Access-Control-Request-Headers")
                .unwrap_or("Content-Type, Authorization")
                .to_string(),
        ));
    }
}

#[options("/<_..>")]
pub fn preflight() -> Status {
    Status::NoContent
}
