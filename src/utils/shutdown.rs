use tokio::select;
use tokio_util::sync::CancellationToken;

/// Cancels `cancelation` once the user presses Ctrl-C. Live views (`status --watch`,
/// `pomodoro run`) select on the token to leave their tick loop.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            cancelation.cancel();
        },
        _ = cancelation.cancelled() => (),
    };
}
