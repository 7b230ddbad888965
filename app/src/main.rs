#[tokio::main]
async fn main() -> anyhow::Result<()> {
    leakscan_app::run().await
}
