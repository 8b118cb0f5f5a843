//! Session manager
//!
//! Drives one session through its lifecycle. The downlink runs as its own
//! task; the uplink runs on the session task. Whichever ends first, or the
//! idle watchdog, closes the session, and teardown always releases both
//! connections.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;

use crate::error::GatewayError;
use crate::error::handlers::user_message;
use crate::protocol::messages;
use crate::relay::{self, Downlink, RelayContext, SharedWriter, Uplink, UplinkExit};
use crate::server::config::BridgeSettings;
use crate::session::idle::{self, Activity};
use crate::session::state::{Session, SessionState};
use crate::utils::logging::LogSink;

pub struct SessionManager {
    session: Session,
    local: TcpStream,
    settings: Arc<BridgeSettings>,
    sink: Arc<dyn LogSink>,
}

impl SessionManager {
    pub fn new(
        id: u64,
        local: TcpStream,
        peer: SocketAddr,
        settings: Arc<BridgeSettings>,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            session: Session::new(id, peer),
            local,
            settings,
            sink,
        }
    }

    /// Runs the session to completion and returns it in the `Closed` state.
    pub async fn run(self) -> Session {
        let SessionManager {
            mut session,
            local,
            settings,
            sink,
        } = self;
        let label = session.label();
        let (local_read, local_write) = local.into_split();
        let local_writer = relay::shared(local_write);

        let remote = match connect_remote(&settings).await {
            Ok(stream) => stream,
            Err(err) => {
                sink.error(&format!("{}: {}", label, err));
                if let Some(message) = user_message(&err) {
                    notify(&local_writer, &settings, message, &label, &*sink).await;
                }
                drop(local_read);
                teardown(&mut session, &local_writer, None, &*sink).await;
                return session;
            }
        };
        sink.info(&format!("{}: connected to BBS {}", label, settings.remote_addr()));

        let (remote_read, remote_write) = remote.into_split();
        let remote_writer = relay::shared(remote_write);
        let greeting = messages::connected(&settings.remote_host, settings.remote_port);
        notify(&local_writer, &settings, &greeting, &label, &*sink).await;
        session.advance(SessionState::Bridging, &*sink);

        let ctx = RelayContext {
            label: label.clone(),
            settings: Arc::clone(&settings),
            sink: Arc::clone(&sink),
            activity: Arc::new(Activity::new()),
        };
        let mut downlink =
            tokio::spawn(Downlink::new(ctx.clone(), remote_read, Arc::clone(&local_writer)).run());
        let uplink = Uplink::new(
            ctx.clone(),
            local_read,
            Arc::clone(&local_writer),
            Arc::clone(&remote_writer),
        )
        .run();

        let downlink_finished = tokio::select! {
            exit = uplink => {
                match exit {
                    Ok(UplinkExit::ExitCommand) => {
                        sink.info(&format!("{}: exit command received", label));
                    }
                    Ok(UplinkExit::LocalClosed) => {}
                    Err(e) => sink.info(&format!("{}: {}", label, e)),
                }
                false
            }
            joined = &mut downlink => {
                if let Err(e) = joined {
                    sink.warn(&format!("{}: downlink task failed: {}", label, e));
                }
                true
            }
            () = idle::expired(&ctx.activity, settings.idle_timeout) => {
                sink.info(&format!("{}: idle timeout", label));
                notify(&local_writer, &settings, messages::IDLE_TIMEOUT, &label, &*sink).await;
                false
            }
        };
        session.advance(SessionState::Closing, &*sink);

        if !downlink_finished {
            downlink.abort();
            if let Err(e) = downlink.await {
                if !e.is_cancelled() {
                    sink.warn(&format!("{}: downlink task failed: {}", label, e));
                }
            }
        }

        teardown(&mut session, &local_writer, Some(&remote_writer), &*sink).await;
        session
    }
}

async fn connect_remote(settings: &BridgeSettings) -> Result<TcpStream, GatewayError> {
    let addr = settings.remote_addr();
    let stream = TcpStream::connect(&addr)
        .await
        .map_err(|source| GatewayError::RemoteConnect { addr, source })?;
    stream.set_nodelay(true)?;
    Ok(stream)
}

async fn notify(
    local: &SharedWriter,
    settings: &BridgeSettings,
    message: &str,
    label: &str,
    sink: &dyn LogSink,
) {
    if let Err(e) = relay::send_line(local, settings.local_charset, message).await {
        sink.debug(&format!("{}: notice not delivered: {}", label, e));
    }
}

/// Releases both connections. Runs on every exit path and never fails.
async fn teardown(
    session: &mut Session,
    local: &SharedWriter,
    remote: Option<&SharedWriter>,
    sink: &dyn LogSink,
) {
    let label = session.label();
    if let Some(remote) = remote {
        relay::close(remote, "BBS", &label, sink).await;
    }
    relay::close(local, "node", &label, sink).await;
    session.advance(SessionState::Closed, sink);
    sink.info(&format!("{}: session terminated", label));
}
