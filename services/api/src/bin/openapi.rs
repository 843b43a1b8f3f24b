//! services/api/src/bin/openapi.rs
//!
//! Writes the chapter API's OpenAPI document: the list, get and upload routes
//! under `/api/v1/chapters` with their query parameters, the chapter and
//! upload-report schemas, and the `{"error": ...}` body shared by 400, 403,
//! 404, 429 and 500 responses.
//!
//! Usage: `openapi [PATH]`, defaulting to `openapi.json`.

use chapter_api::web::rest::ApiDoc;
use utoipa::OpenApi;

const DEFAULT_PATH: &str = "openapi.json";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_PATH.to_string());
    std::fs::write(&path, ApiDoc::openapi().to_pretty_json()?)?;
    println!("Chapter API document written to {}", path);
    Ok(())
}
