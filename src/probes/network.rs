use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info};

use super::PortProbe;
use crate::models::{PortFinding, PortState};
use crate::utils::truncation::banner_line;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServicePort {
    pub port: u16,
    pub service: &'static str,
}

const fn sp(port: u16, service: &'static str) -> ServicePort {
    ServicePort { port, service }
}

/// Well-known ports checked on every host.
pub const PORT_CATALOG: &[ServicePort] = &[
    sp(21, "ftp"),
    sp(22, "ssh"),
    sp(23, "telnet"),
    sp(25, "smtp"),
    sp(53, "dns"),
    sp(80, "http"),
    sp(110, "pop3"),
    sp(143, "imap"),
    sp(443, "https"),
    sp(445, "smb"),
    sp(993, "imaps"),
    sp(995, "pop3s"),
    sp(1433, "mssql"),
    sp(1521, "oracle"),
    sp(3306, "mysql"),
    sp(3389, "rdp"),
    sp(5432, "postgresql"),
    sp(5900, "vnc"),
    sp(6379, "redis"),
    sp(8080, "http-proxy"),
    sp(8443, "https-alt"),
    sp(9200, "elasticsearch"),
    sp(27017, "mongodb"),
];

const HTTP_PROBE: &[u8] = b"HEAD / HTTP/1.0\r\n\r\n";

/// Services that speak first after the TCP handshake.
const GREETING_SERVICES: &[&str] = &["ftp", "ssh", "smtp", "pop3", "imap"];

fn is_http_like(service: &str) -> bool {
    service.starts_with("http") || service == "elasticsearch"
}

/// TCP connect scanner with banner capture.
pub struct NetworkProbe {
    catalog: Vec<ServicePort>,
    timeout: Duration,
}

impl NetworkProbe {
    pub fn new(timeout: Duration) -> Self {
        Self::with_catalog(PORT_CATALOG.to_vec(), timeout)
    }

    pub fn with_catalog(catalog: Vec<ServicePort>, timeout: Duration) -> Self {
        Self { catalog, timeout }
    }

    /// Check one port. Connect and banner read share a single deadline, so a
    /// port never takes longer than the configured timeout.
    pub async fn probe_port(&self, host: &str, target: ServicePort) -> PortFinding {
        let deadline = Instant::now() + self.timeout;
        let mut finding = PortFinding::open(target.port, target.service);

        let stream = match timeout_at(deadline, TcpStream::connect((host, target.port))).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                debug!(host, port = target.port, error = %e, "Port closed");
                finding.state = PortState::Closed;
                return finding;
            }
            Err(_) => {
                debug!(host, port = target.port, "Port filtered (timeout)");
                finding.state = PortState::Filtered;
                return finding;
            }
        };

        let probe = if is_http_like(target.service) {
            Some(HTTP_PROBE)
        } else if GREETING_SERVICES.contains(&target.service) {
            None
        } else {
            return finding;
        };

        finding.banner = read_banner(stream, probe, deadline).await;
        finding
    }

    pub async fn scan(&self, host: &str) -> Vec<PortFinding> {
        let results = join_all(self.catalog.iter().map(|target| self.probe_port(host, *target))).await;
        let open: Vec<PortFinding> = results.into_iter().filter(|p| p.state == PortState::Open).collect();
        info!(host, probed = self.catalog.len(), open = open.len(), "Port scan finished");
        open
    }
}

async fn read_banner(mut stream: TcpStream, probe: Option<&[u8]>, deadline: Instant) -> Option<String> {
    let io = async {
        if let Some(bytes) = probe {
            stream.write_all(bytes).await?;
        }
        let mut buf = [0u8; 512];
        let n = stream.read(&mut buf).await?;
        Ok::<_, std::io::Error>(buf[..n].to_vec())
    };

    match timeout_at(deadline, io).await {
        Ok(Ok(bytes)) => banner_line(&bytes),
        _ => None,
    }
}

#[async_trait]
impl PortProbe for NetworkProbe {
    async fn scan_ports(&self, host: &str) -> Vec<PortFinding> {
        self.scan(host).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn test_scan_returns_only_open_ports_with_banner() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let open = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 64];
            let _ = sock.read(&mut buf).await;
            sock.write_all(b"HTTP/1.0 200 OK\r\nServer: nginx/1.18.0\r\n\r\n").await.unwrap();
        });
        let closed = closed_port().await;

        let probe = NetworkProbe::with_catalog(
            vec![ServicePort { port: open, service: "http" }, ServicePort { port: closed, service: "redis" }],
            Duration::from_secs(2),
        );
        let ports = probe.scan("127.0.0.1").await;

        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].port, open);
        assert_eq!(ports[0].state, PortState::Open);
        assert_eq!(ports[0].banner.as_deref(), Some("HTTP/1.0 200 OK"));
    }

    #[tokio::test]
    async fn test_closed_port_classified() {
        let port = closed_port().await;
        let probe = NetworkProbe::new(Duration::from_secs(2));
        let finding = probe.probe_port("127.0.0.1", ServicePort { port, service: "ftp" }).await;
        assert_eq!(finding.state, PortState::Closed);
    }

    #[tokio::test]
    async fn test_silent_service_bounded_by_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (_sock, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let probe = NetworkProbe::new(Duration::from_millis(300));
        let started = std::time::Instant::now();
        let finding = probe.probe_port("127.0.0.1", ServicePort { port, service: "ssh" }).await;

        assert_eq!(finding.state, PortState::Open);
        assert!(finding.banner.is_none());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_catalog_has_dangerous_services() {
        for service in ["telnet", "rdp", "redis", "mongodb", "vnc"] {
            assert!(PORT_CATALOG.iter().any(|p| p.service == service), "{}", service);
        }
    }
}
