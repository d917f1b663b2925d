use pixed_core::Config;

// Use mimalloc as the global allocator for better performance and lower
// fragmentation, especially when running on musl-based systems inside
// containers.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Loads .env as a side effect.
    let config = Config::from_env()?;

    pixed_api::telemetry::init();

    let (_state, router) = pixed_api::setup::initialize_app(config.clone()).await?;

    pixed_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
