//! Serve command

use super::Context;
use crate::app::ServeArgs;
use anyhow::{Context as _, Result};
use std::sync::Arc;
use threatcl_core::{PendingWatch, QueryEngine, ThreatclError, WatchHandle};
use threatcl_server::Server;
use tracing::info;

pub async fn run(args: ServeArgs, ctx: &Context) -> Result<()> {
    if !ctx.root.is_dir() {
        return Err(ThreatclError::InvalidRoot(ctx.root.clone()).into());
    }
    let store = ctx.store();

    // Watch before loading so edits made during the load are replayed
    let pending = if ctx.config.watch.enabled && !args.no_watch {
        Some(WatchHandle::attach(store.clone()).context("failed to watch threat model root")?)
    } else {
        None
    };
    ctx.first_load(&store)?;
    let watch = pending.map(PendingWatch::start);

    let shutdown = ShutdownSignal::listen()?;
    let engine = Arc::new(QueryEngine::new(store.clone()));
    let addr = args.addr.as_deref().unwrap_or(&ctx.config.server.addr);
    let server = Server::start(engine, addr).await?;
    eprintln!(
        "Serving {} threat models from {} on http://{}/graphql",
        store.count(),
        ctx.root.display(),
        server.addr()
    );

    shutdown.wait().await?;
    info!("shutting down");

    if let Some(watch) = watch {
        watch.stop().await;
    }
    server.stop().await;
    Ok(())
}

/// Ctrl-C, plus SIGTERM on unix. The SIGTERM handler is installed when the
/// listener is created, so signals that arrive before `wait` are not lost.
struct ShutdownSignal {
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl ShutdownSignal {
    fn listen() -> Result<Self> {
        Ok(Self {
            #[cfg(unix)]
            terminate: tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .context("failed to listen for SIGTERM")?,
        })
    }

    #[cfg(unix)]
    async fn wait(mut self) -> Result<()> {
        tokio::select! {
            result = tokio::signal::ctrl_c() => result.context("failed to listen for ctrl-c")?,
            _ = self.terminate.recv() => info!("received SIGTERM"),
        }
        Ok(())
    }

    #[cfg(not(unix))]
    async fn wait(self) -> Result<()> {
        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for ctrl-c")
    }
}
