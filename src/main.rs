use smart_schedule::infrastructure::logging::init_logging;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    init_logging();

    if let Err(error) = smart_schedule::run().await {
        tracing::error!(kind = error.kind(), "smart schedule stopped: {error}");
        std::process::exit(1);
    }
}
