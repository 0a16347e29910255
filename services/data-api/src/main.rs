use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    data_api::run().await
}
