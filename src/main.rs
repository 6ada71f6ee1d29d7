use adflow_api::bootstrap::initialize;
use adflow_api::common::ROCKET_RUNTIME;
use adflow_api::server::build_rocket;
use anyhow::Result;
use log::{error, info};

fn main() -> Result<()> {
    let (config, generator) = initialize()?;
    info!(
        "Starting {} on {}:{}",
        adflow_api::common::SERVICE_NAME,
        config.address,
        config.port
    );

    let result = ROCKET_RUNTIME.block_on(async {
        let rocket_instance = build_rocket(config, generator).ignite().await?;
        rocket_instance.launch().await
    });

    if let Err(e) = result {
        error!("Rocket server failed: {}", e);
        return Err(anyhow::Error::from(e));
    }
    Ok(())
}
