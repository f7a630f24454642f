#[tokio::main]
async fn main() -> anyhow::Result<()> {
    sheetform_cli::cli::run().await
}
