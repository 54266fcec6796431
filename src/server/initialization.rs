// src/server/initialization.rs

//! Handles the complete server initialization process: binding the configured
//! TCP and Unix-socket endpoints, setting up mutual TLS, and constructing the
//! shared `ServerState` (§4.1, §6).

use super::context::ServerContext;
use crate::config::{Config, TcpEndpoint, TlsConfig, UnixEndpoint};
use crate::core::state::ServerState;
use anyhow::{Result, anyhow};
use std::ffi::CString;
use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;
use tokio::net::{TcpListener, UnixListener};
use tokio::task::JoinSet;
use tokio_rustls::{TlsAcceptor, rustls};
use tracing::info;
use tracing_subscriber::{filter::EnvFilter, reload};

/// Initializes all server components before starting the main loop.
pub async fn setup(
    config: Config,
    config_path: String,
    log_reload_handle: Arc<reload::Handle<EnvFilter, tracing_subscriber::Registry>>,
) -> Result<ServerContext> {
    log_startup_info(&config);

    let acceptor = if config.tls.enabled {
        info!("TLS is enabled; mutual authentication will be required on TCP endpoints.");
        Some(build_tls_acceptor(&config.tls)?)
    } else {
        None
    };

    let listeners = bind_tcp_endpoints(&config.tcp_endpoints).await?;
    let unix_listeners = bind_unix_endpoints(&config.unix_endpoints).await?;

    let state = ServerState::new(config, config_path, log_reload_handle);
    info!(
        "control server state initialized with {} peer workers, max_active={}",
        state.workers.len(),
        state.max_active
    );

    Ok(ServerContext {
        state,
        listeners,
        unix_listeners,
        background_tasks: JoinSet::new(),
        acceptor,
    })
}

async fn bind_tcp_endpoints(endpoints: &[TcpEndpoint]) -> Result<Vec<TcpListener>> {
    let mut listeners = Vec::with_capacity(endpoints.len());
    for ep in endpoints {
        let listener = TcpListener::bind((ep.host.as_str(), ep.port))
            .await
            .map_err(|e| anyhow!("failed to bind control endpoint {}:{}: {e}", ep.host, ep.port))?;
        info!("control listener bound to {}:{}", ep.host, ep.port);
        listeners.push(listener);
    }
    Ok(listeners)
}

async fn bind_unix_endpoints(endpoints: &[UnixEndpoint]) -> Result<Vec<UnixListener>> {
    let mut listeners = Vec::with_capacity(endpoints.len());
    for ep in endpoints {
        let path = std::path::Path::new(&ep.path);
        if path.exists() {
            std::fs::remove_file(path)
                .map_err(|e| anyhow!("failed to remove stale control socket '{}': {e}", ep.path))?;
        }
        let listener = UnixListener::bind(path)
            .map_err(|e| anyhow!("failed to bind control socket '{}': {e}", ep.path))?;
        apply_unix_permissions(&ep.path, ep.mode, ep.owner.as_deref(), ep.group.as_deref())?;
        info!("control socket listening on {} (mode {:o})", ep.path, ep.mode);
        listeners.push(listener);
    }
    Ok(listeners)
}

/// Sets the `0660`-style mode and, if configured, the owning user/group on a
/// freshly bound filesystem socket — the authority for local-socket
/// authentication, since those connections carry no TLS handshake (§4.1).
fn apply_unix_permissions(path: &str, mode: u32, owner: Option<&str>, group: Option<&str>) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .map_err(|e| anyhow!("failed to chmod '{path}': {e}"))?;

    if owner.is_none() && group.is_none() {
        return Ok(());
    }
    let uid = match owner {
        Some(name) => resolve_uid(name)?,
        None => u32::MAX, // libc::chown's "leave unchanged" sentinel
    };
    let gid = match group {
        Some(name) => resolve_gid(name)?,
        None => u32::MAX,
    };
    let cpath = CString::new(path)?;
    // SAFETY: `cpath` is a valid NUL-terminated string for the lifetime of the call.
    let ret = unsafe { libc::chown(cpath.as_ptr(), uid, gid) };
    if ret != 0 {
        return Err(anyhow!(
            "chown failed for '{path}': {}",
            std::io::Error::last_os_error()
        ));
    }
    Ok(())
}

fn resolve_uid(name: &str) -> Result<libc::uid_t> {
    let cname = CString::new(name)?;
    // SAFETY: `cname` is valid for the duration of the call; the returned pointer
    // is not retained past this statement.
    let pw = unsafe { libc::getpwnam(cname.as_ptr()) };
    if pw.is_null() {
        return Err(anyhow!("unknown user '{name}'"));
    }
    Ok(unsafe { (*pw).pw_uid })
}

fn resolve_gid(name: &str) -> Result<libc::gid_t> {
    let cname = CString::new(name)?;
    // SAFETY: see `resolve_uid`.
    let gr = unsafe { libc::getgrnam(cname.as_ptr()) };
    if gr.is_null() {
        return Err(anyhow!("unknown group '{name}'"));
    }
    Ok(unsafe { (*gr).gr_gid })
}

/// Builds a server TLS config requiring a verified client certificate, trusting
/// the same CA file for both the server's own chain and the client verifier
/// (§6's "the lineage reuses the same file for both directions").
fn build_tls_acceptor(tls: &TlsConfig) -> Result<TlsAcceptor> {
    let certs = load_certs(&tls.server_cert)?;
    let key = load_key(&tls.server_key)?;

    let mut roots = rustls::RootCertStore::empty();
    for cert in load_certs(&tls.client_ca)? {
        roots
            .add(cert)
            .map_err(|e| anyhow!("invalid client CA certificate: {e}"))?;
    }
    let verifier = rustls::server::WebPkiClientVerifier::builder(Arc::new(roots))
        .build()
        .map_err(|e| anyhow!("failed to build client certificate verifier: {e}"))?;

    let server_config = rustls::ServerConfig::builder()
        .with_client_cert_verifier(verifier)
        .with_single_cert(certs, key)?;
    Ok(TlsAcceptor::from(Arc::new(server_config)))
}

/// Loads TLS certificates from a PEM file.
fn load_certs(path: &str) -> Result<Vec<rustls::pki_types::CertificateDer<'static>>> {
    let cert_file =
        File::open(path).map_err(|e| anyhow!("failed to open certificate file '{path}': {e}"))?;
    let mut cert_reader = BufReader::new(cert_file);
    let certs = rustls_pemfile::certs(&mut cert_reader).collect::<Result<Vec<_>, _>>()?;
    if certs.is_empty() {
        return Err(anyhow!("no certificates found in '{path}'"));
    }
    Ok(certs)
}

/// Loads a private key from a PEM file.
fn load_key(path: &str) -> Result<rustls::pki_types::PrivateKeyDer<'static>> {
    let key_file =
        File::open(path).map_err(|e| anyhow!("failed to open private key file '{path}': {e}"))?;
    let mut key_reader = BufReader::new(key_file);
    rustls_pemfile::private_key(&mut key_reader)?
        .ok_or_else(|| anyhow!("no private key found in key file '{path}'"))
}

fn log_startup_info(config: &Config) {
    info!(
        "control server configured with {} tcp endpoint(s), {} unix endpoint(s), max_active={}, num_workers={}",
        config.tcp_endpoints.len(),
        config.unix_endpoints.len(),
        config.max_active,
        config.num_workers
    );
}
