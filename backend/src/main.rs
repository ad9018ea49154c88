use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    blendfarm_deadline_lib::run().await
}
