#[tokio::main]
async fn main() {
    hilltop::server::run().await;
}
