use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

/// Cancel the returned token on SIGTERM or SIGINT.
///
/// If a signal handler cannot be installed the failure is logged and the
/// process only stops on the remaining signal.
pub fn install_shutdown_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        let signal_name = wait_for_signal().await;
        tracing::info!(signal = signal_name, "Shutting down API server");
        trigger.cancel();
    });

    token
}

async fn wait_for_signal() -> &'static str {
    let sigterm = signal(SignalKind::terminate())
        .map_err(|e| tracing::warn!(error = %e, "Cannot listen for SIGTERM"))
        .ok();
    let sigint = signal(SignalKind::interrupt())
        .map_err(|e| tracing::warn!(error = %e, "Cannot listen for SIGINT"))
        .ok();

    let term = async {
        match sigterm {
            Some(mut s) => {
                s.recv().await;
            }
            None => std::future::pending::<()>().await,
        }
    };
    let int = async {
        match sigint {
            Some(mut s) => {
                s.recv().await;
            }
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = term => "SIGTERM",
        _ = int => "SIGINT",
    }
}
