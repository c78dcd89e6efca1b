use scheduler_cli::{logging, CommandDispatcher, GrpcConnector, RemoteJobClient};
use std::{io, process};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    logging::init();

    let client = RemoteJobClient::new(GrpcConnector::default());
    let mut dispatcher = CommandDispatcher::new(client, io::stdout(), io::stderr());
    let args = std::env::args_os().map(|arg| arg.to_string_lossy().into_owned());

    let outcome = dispatcher.dispatch(args).await;
    // process::exit runs no destructors
    drop(dispatcher);
    match outcome {
        Ok(status) => process::exit(status.code()),
        Err(err) => {
            tracing::error!(error = ?err, "aborting");
            eprintln!("error: {}", err);
            process::exit(1);
        }
    }
}
