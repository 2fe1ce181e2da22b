use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match blog_server::start_server().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Logging may not be initialized when configuration fails.
            eprintln!("blog_server: {err}");
            ExitCode::FAILURE
        }
    }
}
