use anyhow::Result;

/// The client is driven by a single event loop. Network calls and live views share it.
pub fn single_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
