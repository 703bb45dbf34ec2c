use clap::{Parser, Subcommand};
use futures::prelude::*;
use riya_bot::tracing_err;
use std::panic::AssertUnwindSafe;
use std::process::ExitCode;
use tracing::{error, info, warn};

/// Bulk poster of monetized links to Discord and Telegram
#[derive(Parser, Debug)]
struct Args {
    #[clap(subcommand)]
    cmd: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Run the HTTP server (the default)
    Serve,
    PreparePool(riya_bot::PreparePoolArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if dotenvy::dotenv().is_err() {
        eprintln!("Dotenv config was not found, ignoring this...")
    }

    let logging_task = riya_bot::init_logging();

    let main_fut = AssertUnwindSafe(async {
        let result = try_main(args.cmd.unwrap_or(Cmd::Serve)).await;

        result.map(|()| ExitCode::SUCCESS).unwrap_or_else(|err| {
            error!(err = tracing_err(&err), "Exitting with an error...");
            ExitCode::FAILURE
        })
    })
    .catch_unwind()
    .unwrap_or_else(|_| {
        error!("Exitting due to a panic...");
        ExitCode::FAILURE
    });

    let exit_code = tokio::select! {
        exit_code = main_fut => {
            info!("Main task has finished, exiting...");
            exit_code
        }
        () = abort_signal() => ExitCode::SUCCESS,
    };

    logging_task.shutdown().await;

    exit_code
}

async fn try_main(cmd: Cmd) -> riya_bot::Result {
    match cmd {
        Cmd::Serve => {
            riya_bot::init_metrics();
            let config = riya_bot::Config::load_or_panic();
            riya_bot::run(config).await
        }
        Cmd::PreparePool(args) => {
            riya_bot::prepare_pool(args).await?;
            Ok(())
        }
    }
}

async fn abort_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(
            err = tracing_err(&err),
            "Failed to wait for Ctrl+C, it won't be handled"
        );
        std::future::pending::<()>().await;
    } else {
        info!("Ctrl+C received, exiting...");
    }
}
