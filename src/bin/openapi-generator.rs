//! Print the OpenAPI document of the persistence API.

use anyhow::Context;
use utoipa::OpenApi;
use wordy_back::services::documentation::ApiDoc;

fn main() -> anyhow::Result<()> {
    let doc = ApiDoc::openapi()
        .to_pretty_json()
        .context("serializing OpenAPI document")?;
    println!("{doc}");
    Ok(())
}
