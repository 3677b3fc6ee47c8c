#[tokio::main]
async fn main() {
    portal::start_server().await;
}
