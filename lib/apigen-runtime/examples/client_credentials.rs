//! OAuth2 client-credentials client.
//!
//! Token and API endpoints are usually `https`, so this example needs TLS:
//!
//! ```sh
//! cargo run --example client_credentials --features rustls
//! ```

use std::env;

use anyhow::Context;
use apigen_runtime::{ApiClient, Credentials, FileTokenStore, OAuth2Credentials};
use http::Method;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().pretty().init();

    let client_id = env::var("OAUTH2_CLIENT_ID").context("OAUTH2_CLIENT_ID is required")?;
    let client_secret =
        env::var("OAUTH2_CLIENT_SECRET").context("OAUTH2_CLIENT_SECRET is required")?;
    let token_url = env::var("OAUTH2_TOKEN_URL").context("OAUTH2_TOKEN_URL is required")?;
    let api_url = env::var("API_URL").context("API_URL is required")?;

    // The token survives restarts: the next run reuses it until it expires
    let oauth2 = OAuth2Credentials::new(client_id, client_secret, token_url)
        .with_token_store(FileTokenStore::new(".token.json"));

    let client = ApiClient::builder()
        .with_base_url(api_url)?
        .with_credentials(Credentials::OAuth2(oauth2))
        .with_version(env!("CARGO_PKG_VERSION"))
        .build()?;

    let request = client.request(Method::GET, "/me")?;
    let response = client.execute(request).await?;

    let status = response.status();
    let body = response.text().await?;
    println!("{status}\n{body}");

    Ok(())
}
