use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    data_source_monitor::run().await
}
