//! Restart-on-failure wrapper around [`Session`].
//!
//! Any error that escapes a session tears down the connection together with
//! all state derived from it. After a fixed pause a new connection and a new
//! session are built from scratch.

use std::convert::Infallible;
use std::time::Duration;

use tracing::{error, info};

use crate::backend::{BackendError, WindowSystem};
use crate::config::Config;
use crate::session::{Session, SessionError};

/// Runs sessions forever.
#[derive(Debug, Clone)]
pub struct Supervisor {
    config: Config,
    restart_delay: Duration,
}

impl Supervisor {
    pub fn new(config: Config) -> Self {
        let restart_delay = config.restart_delay();
        Self {
            config,
            restart_delay,
        }
    }

    /// Connect with `connect`, run a session, and start over when it fails.
    pub async fn run<W, F>(&self, mut connect: F) -> Infallible
    where
        W: WindowSystem,
        F: FnMut() -> Result<W, BackendError>,
    {
        let mut generation: u64 = 0;
        loop {
            generation += 1;
            let err = self.run_session(&mut connect, generation).await;
            error!(
                "Error encountered: {}. Restarting in {:?}",
                err, self.restart_delay
            );
            tokio::time::sleep(self.restart_delay).await;
        }
    }

    async fn run_session<W, F>(&self, connect: &mut F, generation: u64) -> SessionError
    where
        W: WindowSystem,
        F: FnMut() -> Result<W, BackendError>,
    {
        let ws = match connect() {
            Ok(ws) => ws,
            Err(e) => return e.into(),
        };

        let mut session = match Session::new(ws, &self.config) {
            Ok(session) => session,
            Err(e) => return e,
        };

        if let Err(e) = session.start() {
            return e;
        }
        if generation > 1 {
            info!("Recovered (session {})", generation);
        }

        match session.run().await {
            Ok(never) => match never {},
            Err(e) => e,
        }
    }
}
