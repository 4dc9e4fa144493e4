use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use openssl::error::ErrorStack;
use openssl::ssl::{SslConnector, SslMethod, SslVerifyMode};
use tokio::task::spawn_blocking;
use tracing::{debug, error, info};
use x509_parser::parse_x509_certificate;

use super::TlsProbe;
use crate::errors::ReconError;
use crate::models::TlsFinding;

/// Cipher name fragments that mark a suite as weak.
const WEAK_CIPHER_PATTERNS: &[&str] = &[
    "RC4", "DES", "3DES", "MD5", "NULL", "EXPORT", "ADH", "AECDH", "DH_ANON", "ANON",
];

/// Everything the library can speak, including the legacy suites we are looking for.
const PERMISSIVE_CIPHER_LIST: &str = "ALL:COMPLEMENTOFALL:@SECLEVEL=0";

const SECONDS_PER_DAY: i64 = 86_400;

/// Where an inspection stopped.
#[derive(Debug)]
enum Failure {
    /// Nothing accepted the TCP connection.
    Unreachable(String),
    /// TCP connected, TLS did not produce a readable session.
    Handshake(String),
}

fn setup_error(e: ErrorStack) -> ReconError {
    ReconError::Internal(format!("TLS connector setup: {}", e))
}

/// Certificate and cipher inspection over a permissive OpenSSL client, so hosts
/// that only speak legacy suites still negotiate and get reported.
pub struct TlsInspector {
    connector: SslConnector,
    port: u16,
    timeout: Duration,
}

impl TlsInspector {
    pub fn new(timeout: Duration) -> Result<Self, ReconError> {
        let mut builder = SslConnector::builder(SslMethod::tls()).map_err(setup_error)?;
        // Trust failures are findings, not reasons to stop
        builder.set_verify(SslVerifyMode::NONE);
        builder.set_min_proto_version(None).map_err(setup_error)?;
        builder.set_cipher_list(PERMISSIVE_CIPHER_LIST).map_err(setup_error)?;

        Ok(Self {
            connector: builder.build(),
            port: 443,
            timeout,
        })
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Always returns a finding. No TCP listener gives [`TlsFinding::unreachable`];
    /// a listener that will not negotiate gives [`TlsFinding::handshake_refused`].
    pub async fn inspect_domain(&self, domain: &str) -> TlsFinding {
        let connector = self.connector.clone();
        let target = domain.to_string();
        let (port, timeout) = (self.port, self.timeout);

        debug!(domain, port, "Spawning blocking task for TLS inspection");
        let task = spawn_blocking(move || inspect_blocking(&connector, &target, port, timeout));

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(Ok(finding))) => {
                info!(
                    domain,
                    days_until_expiry = finding.days_until_expiry,
                    weak_ciphers = finding.weak_ciphers.len(),
                    "TLS inspection finished"
                );
                finding
            }
            Ok(Ok(Err(Failure::Handshake(reason)))) => {
                info!(domain, reason = %reason, "TLS handshake refused");
                TlsFinding::handshake_refused(domain, &reason)
            }
            Ok(Ok(Err(Failure::Unreachable(reason)))) => {
                debug!(domain, reason = %reason, "TLS port unreachable");
                TlsFinding::unreachable(domain)
            }
            Ok(Err(e)) => {
                error!(domain, panic = %e, "Blocking TLS inspection task panicked");
                TlsFinding::unreachable(domain)
            }
            Err(_) => {
                debug!(domain, "TLS inspection timed out");
                TlsFinding::unreachable(domain)
            }
        }
    }
}

fn connect(domain: &str, port: u16, timeout: Duration) -> Result<TcpStream, Failure> {
    let addrs = (domain, port)
        .to_socket_addrs()
        .map_err(|e| Failure::Unreachable(format!("resolve {}: {}", domain, e)))?;

    let mut last_error = format!("{} has no addresses", domain);
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => {
                stream
                    .set_read_timeout(Some(timeout))
                    .and_then(|_| stream.set_write_timeout(Some(timeout)))
                    .map_err(|e| Failure::Unreachable(e.to_string()))?;
                return Ok(stream);
            }
            Err(e) => last_error = format!("{}: {}", addr, e),
        }
    }
    Err(Failure::Unreachable(last_error))
}

fn inspect_blocking(
    connector: &SslConnector,
    domain: &str,
    port: u16,
    timeout: Duration,
) -> Result<TlsFinding, Failure> {
    let stream = connect(domain, port, timeout)?;

    let config = connector
        .configure()
        .map_err(|e| Failure::Handshake(e.to_string()))?
        .verify_hostname(false);
    let tls = config
        .connect(domain, stream)
        .map_err(|e| Failure::Handshake(e.to_string()))?;

    let ssl = tls.ssl();
    let ciphers: Vec<String> = ssl
        .current_cipher()
        .map(|cipher| cipher.name().to_string())
        .into_iter()
        .collect();

    let Some(cert) = ssl.peer_certificate() else {
        return Ok(TlsFinding::without_certificate(domain, weak_ciphers(&ciphers)));
    };
    let der = cert
        .to_der()
        .map_err(|e| Failure::Handshake(format!("certificate encoding: {}", e)))?;
    finding_from_der(domain, &der, &ciphers, Utc::now()).map_err(|e| Failure::Handshake(e.to_string()))
}

/// Build a finding from a DER leaf certificate and the negotiated cipher names.
pub fn finding_from_der(
    domain: &str,
    der: &[u8],
    ciphers: &[String],
    now: DateTime<Utc>,
) -> Result<TlsFinding, ReconError> {
    let (_, cert) = parse_x509_certificate(der)
        .map_err(|e| ReconError::Parse(format!("X.509 parse error: {}", e)))?;

    let validity = cert.validity();
    let valid_from = DateTime::from_timestamp(validity.not_before.timestamp(), 0);
    let valid_to = DateTime::from_timestamp(validity.not_after.timestamp(), 0)
        .ok_or_else(|| ReconError::Parse("Certificate notAfter out of range".into()))?;

    Ok(TlsFinding::new(
        domain,
        cert.issuer().to_string(),
        Some(cert.subject().to_string()),
        valid_from,
        valid_to,
        days_until(valid_to, now),
        weak_ciphers(ciphers),
    ))
}

/// Whole days until `valid_to`, rounded up.
pub fn days_until(valid_to: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let secs = (valid_to - now).num_seconds();
    let days = secs.div_euclid(SECONDS_PER_DAY);
    if secs.rem_euclid(SECONDS_PER_DAY) > 0 {
        days + 1
    } else {
        days
    }
}

pub fn weak_ciphers(ciphers: &[String]) -> Vec<String> {
    ciphers
        .iter()
        .filter(|c| {
            let upper = c.to_uppercase();
            WEAK_CIPHER_PATTERNS.iter().any(|p| upper.contains(p))
        })
        .cloned()
        .collect()
}

#[async_trait]
impl TlsProbe for TlsInspector {
    async fn inspect(&self, domain: &str) -> TlsFinding {
        self.inspect_domain(domain).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use openssl::asn1::Asn1Time;
    use openssl::bn::BigNum;
    use openssl::hash::MessageDigest;
    use openssl::pkey::{PKey, Private};
    use openssl::rsa::Rsa;
    use openssl::ssl::{SslAcceptor, SslVersion};
    use openssl::x509::{X509NameBuilder, X509};
    use std::io::Read;

    fn self_signed(days_valid: u32) -> (PKey<Private>, X509) {
        let key = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();
        let mut name = X509NameBuilder::new().unwrap();
        name.append_entry_by_text("CN", "localhost").unwrap();
        let name = name.build();

        let mut builder = X509::builder().unwrap();
        builder.set_version(2).unwrap();
        let serial = BigNum::from_u32(1).unwrap().to_asn1_integer().unwrap();
        builder.set_serial_number(&serial).unwrap();
        builder.set_subject_name(&name).unwrap();
        builder.set_issuer_name(&name).unwrap();
        builder.set_pubkey(&key).unwrap();
        builder.set_not_before(&Asn1Time::days_from_now(0).unwrap()).unwrap();
        builder.set_not_after(&Asn1Time::days_from_now(days_valid).unwrap()).unwrap();
        builder.sign(&key, MessageDigest::sha256()).unwrap();
        (key, builder.build())
    }

    /// TLS 1.2 server restricted to `cipher_list`, serving one connection.
    fn legacy_server(cipher_list: &str) -> u16 {
        let (key, cert) = self_signed(30);
        let mut builder = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls()).unwrap();
        builder.set_private_key(&key).unwrap();
        builder.set_certificate(&cert).unwrap();
        builder.set_max_proto_version(Some(SslVersion::TLS1_2)).unwrap();
        builder.set_cipher_list(cipher_list).unwrap();
        let acceptor = builder.build();

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        std::thread::spawn(move || {
            if let Ok((sock, _)) = listener.accept() {
                if let Ok(mut tls) = acceptor.accept(sock) {
                    let mut buf = [0u8; 16];
                    let _ = tls.read(&mut buf);
                }
            }
        });
        port
    }

    #[test]
    fn test_days_until_rounds_up() {
        let now = Utc::now();
        assert_eq!(days_until(now + ChronoDuration::hours(12), now), 1);
        assert_eq!(days_until(now + ChronoDuration::days(30), now), 30);
        assert_eq!(days_until(now, now), 0);
        assert_eq!(days_until(now - ChronoDuration::hours(36), now), -1);
    }

    #[test]
    fn test_weak_cipher_detection() {
        let ciphers = vec![
            "TLS_AES_256_GCM_SHA384".to_string(),
            "RC4-SHA".to_string(),
            "ADH-AES128-SHA".to_string(),
            "ECDHE-RSA-CHACHA20-POLY1305".to_string(),
            "DES-CBC3-SHA".to_string(),
        ];
        let weak = weak_ciphers(&ciphers);
        assert_eq!(weak, vec![ciphers[1].clone(), ciphers[2].clone(), ciphers[4].clone()]);
    }

    #[test]
    fn test_garbage_certificate_is_parse_error() {
        let err = finding_from_der("example.com", b"not a certificate", &[], Utc::now()).unwrap_err();
        assert!(matches!(err, ReconError::Parse(_)));
    }

    #[tokio::test]
    async fn test_legacy_rsa_cbc_server_is_inspected() {
        let port = legacy_server("AES128-SHA:@SECLEVEL=0");

        let inspector = TlsInspector::new(Duration::from_secs(5)).unwrap().with_port(port);
        let finding = inspector.inspect_domain("127.0.0.1").await;

        assert!(finding.has_certificate());
        assert!(finding.handshake_error.is_none());
        assert!(finding.subject.as_deref().unwrap().contains("localhost"));
        assert_eq!(finding.days_until_expiry, 30);
        assert!(finding.weak_ciphers.is_empty());
    }

    #[tokio::test]
    async fn test_null_cipher_server_is_flagged() {
        let port = legacy_server("NULL-SHA256:@SECLEVEL=0");

        let inspector = TlsInspector::new(Duration::from_secs(5)).unwrap().with_port(port);
        let finding = inspector.inspect_domain("127.0.0.1").await;

        assert!(finding.has_certificate());
        assert_eq!(finding.weak_ciphers, vec!["NULL-SHA256".to_string()]);
        assert!(!finding.is_valid);
    }

    #[tokio::test]
    async fn test_unreachable_host_returns_sentinel() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let inspector = TlsInspector::new(Duration::from_secs(2)).unwrap().with_port(port);
        let finding = inspector.inspect_domain("127.0.0.1").await;

        assert_eq!(finding.issuer, "Unknown");
        assert_eq!(finding.days_until_expiry, -1);
        assert!(!finding.is_valid);
        assert_eq!(finding.valid_to.timestamp(), 0);
        assert!(finding.handshake_error.is_none());
    }

    #[tokio::test]
    async fn test_non_tls_peer_is_handshake_refused() {
        use tokio::io::AsyncWriteExt;
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let _ = sock.write_all(b"SSH-2.0-OpenSSH_7.4\r\n").await;
        });

        let inspector = TlsInspector::new(Duration::from_secs(2)).unwrap().with_port(port);
        let finding = inspector.inspect_domain("127.0.0.1").await;
        assert!(!finding.is_valid);
        assert_eq!(finding.issuer, "Unknown");
        assert!(!finding.has_certificate());
        assert!(finding.handshake_error.is_some());
    }
}
