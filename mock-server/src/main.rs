use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let customer_id = std::env::var("MOCK_CUSTOMER_ID").unwrap_or_else(|_| "customer".to_string());
    let api_token = std::env::var("MOCK_API_TOKEN").unwrap_or_else(|_| "token".to_string());

    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!("listening on {addr}, base URL http://{addr}/{customer_id}/vm/");
    mock_server::run(listener, &customer_id, &api_token).await
}
