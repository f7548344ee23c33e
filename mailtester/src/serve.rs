use std::net::{IpAddr, SocketAddr};

use axum::Router;
use if_addrs::get_if_addrs;
use tokio::net::{TcpListener, ToSocketAddrs};

/// Binds `addr` and serves `router` until Ctrl+C or SIGTERM.
pub async fn serve<S: ToSocketAddrs>(addr: S, router: Router) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    log_listener_urls(&listener);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("relay stopped");
    Ok(())
}

fn log_listener_urls(listener: &TcpListener) {
    let addr = match listener.local_addr() {
        Ok(addr) => addr,
        Err(e) => {
            log::warn!("could not determine the listening address: {}", e);
            return;
        }
    };

    let port = addr.port();
    log::info!("Relay listening on port {}", port);
    let ips = match addr {
        SocketAddr::V4(v4) if v4.ip().is_unspecified() => interface_ips(false),
        SocketAddr::V6(v6) if v6.ip().is_unspecified() => interface_ips(true),
        _ => vec![addr.ip()],
    };
    for ip in ips {
        log::info!("➜  {}", endpoint_url(ip, port));
    }
}

fn interface_ips(ipv6: bool) -> Vec<IpAddr> {
    get_if_addrs()
        .into_iter()
        .flatten()
        .map(|i| i.ip())
        .filter(|ip| ip.is_ipv6() == ipv6)
        .collect()
}

fn endpoint_url(ip: IpAddr, port: u16) -> String {
    match ip {
        _ if ip.is_loopback() => format!("http://localhost:{}{}", port, crate::relay::SEND_EMAIL_PATH),
        IpAddr::V4(v4) => format!("http://{}:{}{}", v4, port, crate::relay::SEND_EMAIL_PATH),
        IpAddr::V6(v6) => format!("http://[{}]:{}{}", v6, port, crate::relay::SEND_EMAIL_PATH),
    }
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, Ipv6Addr};

    use super::*;

    #[test]
    fn endpoint_urls() {
        assert_eq!(
            endpoint_url(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
            "http://localhost:3000/api/send-email"
        );
        assert_eq!(
            endpoint_url(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)), 8080),
            "http://192.168.1.20:8080/api/send-email"
        );
        assert_eq!(
            endpoint_url(IpAddr::V6("fe80::1".parse::<Ipv6Addr>().unwrap()), 3000),
            "http://[fe80::1]:3000/api/send-email"
        );
    }
}
