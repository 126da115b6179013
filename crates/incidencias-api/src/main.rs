use incidencias_core::Config;
use tikv_jemallocator::Jemalloc;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize the application (store, routes)
    let (state, router) = incidencias_api::setup::initialize_app(config.clone()).await?;

    // Start the server
    incidencias_api::setup::server::start_server(&config, router, state).await?;

    Ok(())
}
