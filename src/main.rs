#[tokio::main]
async fn main() {
    if let Err(e) = diagnostica_lib::run().await {
        eprintln!("diagnostica: {e}");
        std::process::exit(1);
    }
}
