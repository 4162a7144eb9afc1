#[tokio::main]
async fn main() -> anyhow::Result<()> {
    simplechat_lib::run().await
}
