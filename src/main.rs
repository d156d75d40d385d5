use std::process::ExitCode;

use clap::Parser;
use skillshare::cli::{Args, build_config, execute, init_logging, load_jwt_secret, validate_api_url};
use skillshare::create_shell;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    init_logging(&args.log_format, args.verbose);

    let Some(api_url) = validate_api_url(&args.api_url) else {
        return ExitCode::FAILURE;
    };

    let Some(jwt_secret) = load_jwt_secret(args.jwt_secret_file.as_deref()) else {
        return ExitCode::FAILURE;
    };

    let config = build_config(api_url, args.state_dir, jwt_secret, args.timeout);
    let mut shell = match create_shell(&config) {
        Ok(shell) => shell,
        Err(e) => {
            error!(error = %e, "Failed to start");
            return ExitCode::FAILURE;
        }
    };

    let output = execute(&mut shell, args.command).await;
    if !output.text.is_empty() {
        println!("{}", output.text);
    }

    if output.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
