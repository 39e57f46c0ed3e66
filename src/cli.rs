//! Command-line interface for header-session.
//!
//! Uses lexopt for minimal binary size overhead.

use std::ffi::OsString;
use std::net::IpAddr;
use std::path::PathBuf;

/// Command-line arguments.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Host address to bind to (overrides config file and env).
    pub host: Option<IpAddr>,
    /// Port to listen on (overrides config file and env).
    pub port: Option<u16>,
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Store URL (overrides config file).
    pub redis_url: Option<String>,
    /// Session TTL in seconds.
    pub ttl: Option<u64>,
    /// Store sessions without expiry.
    pub persist: bool,
    /// Verbose store error logging.
    pub debug: bool,
    /// Enable destroy-all and key listing endpoints.
    pub admin: bool,
    /// Use the in-process store instead of Redis.
    pub memory: bool,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('H') | Long("host") => {
                let value: String = parser.value()?.parse()?;
                result.host = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("host", value))?,
                );
            }
            Short('p') | Long("port") => {
                let value: String = parser.value()?.parse()?;
                result.port = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("port", value))?,
                );
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('r') | Long("redis-url") => {
                result.redis_url = Some(parser.value()?.parse()?);
            }
            Short('t') | Long("ttl") => {
                let value: String = parser.value()?.parse()?;
                result.ttl = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("ttl", value))?,
                );
            }
            Long("persist") => {
                result.persist = true;
            }
            Long("debug") => {
                result.debug = true;
            }
            Long("admin") => {
                result.admin = true;
            }
            Long("memory") => {
                result.memory = true;
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Value(val) => {
                return Err(ArgsError::UnexpectedArgument(val.to_string_lossy().into()));
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(result)
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"header-session {version}
Header-based session service for cookieless HTTP clients

USAGE:
    header-session [OPTIONS]

OPTIONS:
    -H, --host <ADDR>        Host address to bind [default: 127.0.0.1]
    -p, --port <PORT>        Port to listen on [default: 3000]
    -c, --config <FILE>      Path to configuration file (JSON)
    -r, --redis-url <URL>    Session store URL [default: redis://127.0.0.1:6379]
    -t, --ttl <SECS>         Session time-to-live [default: 600]
        --persist            Store sessions without expiry
        --debug              Log store failures at error level
        --admin              Enable destroy-all and key listing
        --memory             Use an in-process store (sessions lost on exit)
    -l, --log-level <LVL>    Log level (error, warn, info, debug, trace)
    -h, --help               Print help
    -V, --version            Print version

ENVIRONMENT VARIABLES:
    HEADER_SESSION_HOST        Host address (overrides config)
    HEADER_SESSION_PORT        Port number (overrides config)
    HEADER_SESSION_REDIS_URL   Store URL (overrides config; REDIS_URL also accepted)
    HEADER_SESSION_TTL         Session TTL in seconds
    HEADER_SESSION_PERSIST     Store sessions without expiry (true/false)
    HEADER_SESSION_DEBUG       Verbose store error logging (true/false)
    HEADER_SESSION_ADMIN       Enable admin operations (true/false)
    HEADER_SESSION_SID_HEADER  Session header name
    HEADER_SESSION_LOG_LEVEL   Log level (overrides config)
    RUST_LOG                   Alternative log level setting

EXAMPLES:
    # Start with defaults (localhost:3000, local Redis)
    header-session

    # Custom store and a one-hour TTL
    header-session -r redis://cache.internal:6379/2 -t 3600

    # Local development without Redis
    header-session --memory --admin --debug
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("header-session {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug, thiserror::Error)]
pub enum ArgsError {
    /// Lexopt parsing error.
    #[error("{0}")]
    Lexopt(#[from] lexopt::Error),
    /// Invalid argument value.
    #[error("invalid value for --{0}: '{1}'")]
    InvalidValue(&'static str, String),
    /// Unexpected positional argument.
    #[error("unexpected argument: '{0}'")]
    UnexpectedArgument(String),
}
