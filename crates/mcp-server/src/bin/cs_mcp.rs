use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    codehealth_mcp::main_entry().await
}
