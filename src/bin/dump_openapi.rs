use std::fs;

fn main() -> anyhow::Result<()> {
    let doc = revue::docs::build_openapi(8000);
    let s = serde_json::to_string_pretty(&doc)?;
    let path = "/tmp/openapi-generated.json";
    fs::write(path, s)?;
    println!("wrote {}", path);
    Ok(())
}
