use rgen_proxy::{logger, Config};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();

    let config = Config::from_env();
    logger::init_with_config(logger::LoggerConfig::from_app_config(&config))?;

    if dotenv_loaded {
        log::info!(".env file loaded");
    } else {
        log::warn!("No .env file found, using system environment variables");
    }

    logger::log_startup_info(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"), &config);

    if config.openai.credential().is_none() && config.xai.credential().is_none() {
        log::warn!("No provider API keys configured; generation requests will fail with 500");
    }

    rgen_proxy::server::run(config).await?;
    Ok(())
}
