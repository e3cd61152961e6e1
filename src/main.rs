use std::process::ExitCode;

use athena_batch::config::{AthenaSettings, LogConfigResolver};
use athena_batch::{AthenaClientFactory, Cli, JobRunner};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse_lenient(std::env::args_os());

    let runner = JobRunner::new(
        LogConfigResolver::from_env(),
        AthenaClientFactory::new(AthenaSettings::from_env()),
    );

    let outcome = runner.run(&cli.run_context()).await;
    ExitCode::from(outcome.code())
}
