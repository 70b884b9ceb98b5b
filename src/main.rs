//! Blog site - binary entry point
//! Delegates to the library for all app logic.

#[tokio::main]
async fn main() {
    if let Err(e) = blog_site::run().await {
        eprintln!("blog-site: {}", e);
        std::process::exit(1);
    }
}
