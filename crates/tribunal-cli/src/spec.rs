//! `tribunal spec` — dump the OpenAPI specification.

use anyhow::Context;
use clap::Args;
use utoipa::OpenApi;

use tribunal_api::openapi::ApiDoc;

/// Arguments for `tribunal spec`.
#[derive(Args, Debug)]
pub struct SpecArgs {
    /// Pretty-print the JSON output.
    #[arg(long)]
    pub pretty: bool,
}

/// Print the OpenAPI spec for the full API surface to stdout.
pub fn run_spec(args: &SpecArgs) -> anyhow::Result<u8> {
    let spec = ApiDoc::openapi();
    let rendered = if args.pretty {
        serde_json::to_string_pretty(&spec)
    } else {
        serde_json::to_string(&spec)
    }
    .context("serializing the OpenAPI spec")?;
    println!("{rendered}");
    Ok(0)
}
