use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    nativestage_lib::run().await
}
