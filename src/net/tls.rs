//! TLS configuration and certificate loading.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use axum_server::tls_rustls::RustlsConfig;

#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("cannot read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no certificates found in {0:?}")]
    NoCertificates(PathBuf),

    #[error("no private key found in {0:?}")]
    NoPrivateKey(PathBuf),
}

/// Load TLS configuration from certificate and key files.
///
/// Both files are parsed up front so a bad PEM fails at startup with the
/// offending path instead of on the first handshake.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig, TlsError> {
    check_pem(cert_path, key_path)?;
    RustlsConfig::from_pem_file(cert_path, key_path)
        .await
        .map_err(|source| TlsError::Io {
            path: cert_path.to_path_buf(),
            source,
        })
}

fn check_pem(cert_path: &Path, key_path: &Path) -> Result<(), TlsError> {
    let io = |path: &Path| {
        let path = path.to_path_buf();
        move |source| TlsError::Io { path, source }
    };

    let mut certs = BufReader::new(File::open(cert_path).map_err(io(cert_path))?);
    let found = rustls_pemfile::certs(&mut certs)
        .collect::<Result<Vec<_>, _>>()
        .map_err(io(cert_path))?;
    if found.is_empty() {
        return Err(TlsError::NoCertificates(cert_path.to_path_buf()));
    }

    let mut key = BufReader::new(File::open(key_path).map_err(io(key_path))?);
    match rustls_pemfile::private_key(&mut key).map_err(io(key_path))? {
        Some(_) => Ok(()),
        None => Err(TlsError::NoPrivateKey(key_path.to_path_buf())),
    }
}
