#[tokio::main]
async fn main() -> anyhow::Result<()> {
    signcapture_lib::run().await
}
