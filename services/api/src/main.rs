use invigil_api::run;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("invigil error: {err}");
        std::process::exit(1);
    }
}
