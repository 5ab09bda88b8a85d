use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    identity_gateway::frameworks::probe::run().await
}
