use std::{
    fs::File,
    io::BufReader,
    net::{IpAddr, SocketAddr},
    str::FromStr,
    time::Duration,
};

use lazy_static::lazy_static;
use log::{error, info, warn};
use rustls::ServerConfig;

use crate::auth::SessionSettings;

// get and parse an environment variable
// use default value if not set
fn var<T>(name: &str, default: &str) -> T
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Debug,
{
    let given = std::env::var(name).unwrap_or(default.to_owned());
    match given.parse() {
        Ok(parsed) => parsed,
        Err(e) => {
            error!(
                "Invalid config option `{}={}`: {:?} ({}'s default is usually {})",
                name, given, e, name, default
            );
            std::process::exit(1);
        }
    }
}

/// Parses a 32 byte hex key. Anything else is rejected.
pub fn parse_secret_key(hex_key: &str) -> Option<[u8; 32]> {
    hex::decode(hex_key.trim()).ok()?.try_into().ok()
}

lazy_static! {
    pub static ref NUM_WEB_WORKERS: usize = var("NUM_WEB_WORKERS", "4");

    static ref DB_HOST: String = var("DB_HOST", "127.0.0.1");
    static ref DB_PORT: u16 = var("DB_PORT", "5432");
    static ref DB_USER: String = var("DB_USER", "langchat");
    static ref DB_PASSWORD: String = var("DB_PASSWORD", "dev");
    static ref DB_NAME: String = var("DB_NAME", "langchat");
    pub static ref DB_POOL_MAX_CONNS: u32 = var("DB_POOL_MAX_CONNS", "5");
    pub static ref DB_RUN_MIGRATIONS: bool = var("DB_RUN_MIGRATIONS", "true");

    pub static ref BIND_ADDR: SocketAddr = var("BIND_ADDR", "127.0.0.1:8080");

    pub static ref SSL_ENABLE: bool = var("SSL_ENABLE", "false");
    pub static ref SSL_ONLY: bool = var("SSL_ONLY", "false");
    pub static ref SSL_BIND_ADDR: SocketAddr = var("SSL_BIND_ADDR", "127.0.0.1:8443");
    static ref SSL_CERT_PATH: String = var("SSL_CERT_PATH", "cert.pem");
    static ref SSL_KEY_PATH: String = var("SSL_KEY_PATH", "key.pem");

    pub static ref HANDLE_CORS: bool = var("HANDLE_CORS", "true");

    /// seconds a token stays valid after login
    static ref TOKEN_TIMEOUT: u64 = var("TOKEN_TIMEOUT", "2592000");
    static ref TOKEN_CONCURRENT: bool = var("TOKEN_CONCURRENT", "true");
    static ref SESSION_SWEEP_INTERVAL: u64 = var("SESSION_SWEEP_INTERVAL", "60");

    pub static ref AUTH_SECRET_KEY: [u8; 32] = {
        let key: String = var("AUTH_SECRET_KEY", "");

        if key.is_empty() {
            info!("Generating new auth secret key... (provide one with AUTH_SECRET_KEY)");
            let generated = crate::crypto::generate_secret_key();
            info!("Auth secret key: {}", hex::encode(generated));
            warn!("Passwords stored under any other key will not decrypt, every login will fail!");
            generated
        } else {
            match parse_secret_key(&key) {
                Some(key) => key,
                None => {
                    error!("Invalid AUTH_SECRET_KEY, must be 32 bytes of hex");
                    std::process::exit(1);
                }
            }
        }
    };
}

pub fn session_settings() -> SessionSettings {
    SessionSettings {
        timeout: Duration::from_secs(*TOKEN_TIMEOUT),
        concurrent: *TOKEN_CONCURRENT,
    }
}

pub fn sweep_interval() -> Duration {
    Duration::from_secs(*SESSION_SWEEP_INTERVAL)
}

pub fn db_conn_string() -> String {
    format!(
        "postgres://{}:{}@{}:{}/{}",
        *DB_USER, *DB_PASSWORD, *DB_HOST, *DB_PORT, *DB_NAME
    )
}

pub fn bind_addr() -> (IpAddr, u16) {
    (BIND_ADDR.ip(), BIND_ADDR.port())
}

pub fn ssl_bind_addr() -> (IpAddr, u16) {
    (SSL_BIND_ADDR.ip(), SSL_BIND_ADDR.port())
}

/// Load the SSL certificate and key files into a rustls config object
///
/// Taken from https://github.com/actix/examples/blob/master/https-tls/rustls/src/main.rs
pub fn ssl_config() -> std::io::Result<rustls::ServerConfig> {
    // init server config builder with safe defaults
    let config = ServerConfig::builder()
        .with_safe_defaults()
        .with_no_client_auth();

    // load TLS key/cert files
    let cert_file = &mut BufReader::new(File::open(&*SSL_CERT_PATH)?);
    let key_file = &mut BufReader::new(File::open(&*SSL_KEY_PATH)?);

    // convert files to key/cert objects
    let cert_chain = rustls_pemfile::certs(cert_file)?
        .into_iter()
        .map(rustls::Certificate)
        .collect();

    let mut keys: Vec<rustls::PrivateKey> = rustls_pemfile::pkcs8_private_keys(key_file)?
        .into_iter()
        .map(rustls::PrivateKey)
        .collect();

    // exit if no keys could be parsed
    if keys.is_empty() {
        error!("Could not locate SSL private key at {}", *SSL_KEY_PATH);
        std::process::exit(1);
    }

    config
        .with_single_cert(cert_chain, keys.remove(0))
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

pub fn initialize_all() {
    lazy_static::initialize(&NUM_WEB_WORKERS);

    lazy_static::initialize(&BIND_ADDR);

    lazy_static::initialize(&SSL_ENABLE);
    lazy_static::initialize(&SSL_ONLY);

    if !*SSL_ENABLE && *SSL_ONLY {
        error!("SSL_ONLY cannot be true if SSL_ENABLE is false");
        std::process::exit(1);
    }

    lazy_static::initialize(&SSL_BIND_ADDR);
    lazy_static::initialize(&SSL_CERT_PATH);
    lazy_static::initialize(&SSL_KEY_PATH);
    lazy_static::initialize(&HANDLE_CORS);

    lazy_static::initialize(&DB_HOST);
    lazy_static::initialize(&DB_PORT);
    lazy_static::initialize(&DB_USER);
    lazy_static::initialize(&DB_PASSWORD);
    lazy_static::initialize(&DB_NAME);
    lazy_static::initialize(&DB_POOL_MAX_CONNS);
    lazy_static::initialize(&DB_RUN_MIGRATIONS);

    lazy_static::initialize(&TOKEN_TIMEOUT);

    if *TOKEN_TIMEOUT == 0 {
        error!("TOKEN_TIMEOUT must be at least 1 second");
        std::process::exit(1);
    }

    lazy_static::initialize(&TOKEN_CONCURRENT);
    lazy_static::initialize(&SESSION_SWEEP_INTERVAL);

    if *SESSION_SWEEP_INTERVAL == 0 {
        error!("SESSION_SWEEP_INTERVAL must be at least 1 second");
        std::process::exit(1);
    }

    lazy_static::initialize(&AUTH_SECRET_KEY);
}

pub fn print_all() {
    info!("config: Listening on {}", *BIND_ADDR);

    if *SSL_ENABLE {
        info!(
            "config: SSL on {}{}",
            *SSL_BIND_ADDR,
            if *SSL_ONLY { " (plain http disabled)" } else { "" }
        );
    }

    info!(
        "config: Database: {} at {}:{} ({} max connections)",
        *DB_NAME, *DB_HOST, *DB_PORT, *DB_POOL_MAX_CONNS
    );

    info!(
        "config: Tokens valid for {}s, concurrent logins {}",
        *TOKEN_TIMEOUT,
        if *TOKEN_CONCURRENT { "allowed" } else { "replace older tokens" }
    );

    info!(
        "config: Expired sessions swept every {}s",
        *SESSION_SWEEP_INTERVAL
    );
}
