//! SSH tunnel
//!
//! Thin local-forward wrapper over `ssh2`: authenticate against the SSH
//! endpoint, bind a loopback listener on an OS-assigned port, and pump
//! accepted connections through a direct-tcpip channel to the database
//! host. The SSH protocol itself is entirely `ssh2`'s concern.

use crate::client::{SshAuth, TunnelConfig};
use crate::{Error, Result};
use ssh2::Session;
use std::io::{ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How long blocking channel reads wait before handing control back to the
/// pump loop, in milliseconds
const CHANNEL_READ_TIMEOUT_MS: u32 = 50;

const IDLE_BACKOFF: Duration = Duration::from_millis(5);
const ACCEPT_BACKOFF: Duration = Duration::from_millis(20);

/// A running SSH tunnel forwarding a loopback port to the database host
///
/// Created by [`SshTunnel::open`]; the forwarding thread runs until
/// [`SshTunnel::close`] (or drop).
pub struct SshTunnel {
    local_port: u16,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl SshTunnel {
    /// Establish the tunnel and start forwarding.
    ///
    /// Connects to `(ssh_host, ssh_port)`, authenticates with the
    /// configured method, and binds `127.0.0.1:0`; the assigned port is
    /// available through [`SshTunnel::local_port`]. Every connection
    /// accepted there is forwarded to `(remote_host, remote_port)` through
    /// the SSH session.
    pub fn open(config: &TunnelConfig, remote_host: &str, remote_port: u16) -> Result<Self> {
        let stream = TcpStream::connect((config.ssh_host.as_str(), config.ssh_port)).map_err(
            |err| {
                Error::Connection(format!(
                    "ssh connect to {}:{} failed: {}",
                    config.ssh_host, config.ssh_port, err
                ))
            },
        )?;

        let mut session = Session::new()
            .map_err(|err| Error::Connection(format!("ssh session init failed: {}", err)))?;
        session.set_tcp_stream(stream);
        session
            .handshake()
            .map_err(|err| Error::Connection(format!("ssh handshake failed: {}", err)))?;

        match &config.auth {
            SshAuth::Password(passwd) => session.userauth_password(&config.ssh_user, passwd),
            SshAuth::KeyFile(path) => {
                session.userauth_pubkey_file(&config.ssh_user, None, path, None)
            }
        }
        .map_err(|err| {
            Error::Connection(format!(
                "ssh authentication for {} failed: {}",
                config.ssh_user, err
            ))
        })?;

        let listener = TcpListener::bind(("127.0.0.1", 0))
            .map_err(|err| Error::Connection(format!("tunnel listener bind failed: {}", err)))?;
        let local_port = listener
            .local_addr()
            .map_err(|err| Error::Connection(format!("tunnel listener address: {}", err)))?
            .port();
        listener
            .set_nonblocking(true)
            .map_err(|err| Error::Connection(format!("tunnel listener setup failed: {}", err)))?;

        // Blocking channel reads time out so the pump can interleave both
        // directions on one thread.
        session.set_timeout(CHANNEL_READ_TIMEOUT_MS);

        let stop = Arc::new(AtomicBool::new(false));
        let worker = {
            let stop = Arc::clone(&stop);
            let remote_host = remote_host.to_string();
            thread::spawn(move || forward_loop(session, listener, remote_host, remote_port, stop))
        };

        tracing::info!(
            ssh_host = %config.ssh_host,
            local_port,
            remote_port,
            "ssh tunnel established"
        );

        Ok(Self {
            local_port,
            stop,
            worker: Some(worker),
        })
    }

    /// Loopback port the tunnel listens on
    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    /// Stop forwarding and tear the tunnel down. Safe to call repeatedly.
    pub fn close(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
            tracing::debug!(local_port = self.local_port, "ssh tunnel closed");
        }
    }
}

impl Drop for SshTunnel {
    fn drop(&mut self) {
        self.close();
    }
}

fn forward_loop(
    session: Session,
    listener: TcpListener,
    remote_host: String,
    remote_port: u16,
    stop: Arc<AtomicBool>,
) {
    while !stop.load(Ordering::Relaxed) {
        match listener.accept() {
            Ok((stream, peer)) => {
                tracing::debug!(%peer, "tunnel accepted connection");
                match session.channel_direct_tcpip(&remote_host, remote_port, None) {
                    Ok(channel) => pump(channel, stream, &stop),
                    Err(err) => {
                        tracing::warn!("direct-tcpip channel to {}:{} failed: {}", remote_host, remote_port, err);
                    }
                }
            }
            Err(err) if err.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_BACKOFF),
            Err(err) => {
                tracing::warn!("tunnel accept failed: {}", err);
                break;
            }
        }
    }
}

/// Copy bytes both ways until either side closes or the tunnel stops.
fn pump(mut channel: ssh2::Channel, mut stream: TcpStream, stop: &AtomicBool) {
    if stream.set_nonblocking(true).is_err() {
        return;
    }
    let mut buf = [0u8; 16 * 1024];
    while !stop.load(Ordering::Relaxed) {
        let mut idle = true;

        match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if write_fully(&mut channel, &buf[..n]).is_err() {
                    break;
                }
                idle = false;
            }
            Err(ref err) if err.kind() == ErrorKind::WouldBlock => {}
            Err(_) => break,
        }

        match channel.read(&mut buf) {
            Ok(0) => {
                if channel.eof() {
                    break;
                }
            }
            Ok(n) => {
                if write_fully(&mut stream, &buf[..n]).is_err() {
                    break;
                }
                idle = false;
            }
            Err(ref err)
                if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::TimedOut => {}
            Err(_) => break,
        }

        if idle {
            thread::sleep(IDLE_BACKOFF);
        }
    }
    let _ = channel.close();
}

/// `write_all` that rides out WouldBlock/TimedOut from the non-blocking
/// stream and the timed-out session.
fn write_fully(writer: &mut impl Write, mut data: &[u8]) -> std::io::Result<()> {
    while !data.is_empty() {
        match writer.write(data) {
            Ok(0) => return Err(ErrorKind::WriteZero.into()),
            Ok(n) => data = &data[n..],
            Err(ref err)
                if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::TimedOut =>
            {
                thread::sleep(IDLE_BACKOFF);
            }
            Err(err) => return Err(err),
        }
    }
    Ok(())
}
