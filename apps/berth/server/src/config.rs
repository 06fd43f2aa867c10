use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;

use crate::cli::Cli;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub handoff_timeout: Duration,
    pub shutdown_grace: Duration,
}

impl TryFrom<&Cli> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(cli: &Cli) -> Result<Self, Self::Error> {
        let listen_addr: SocketAddr = cli
            .listen_addr
            .parse()
            .with_context(|| format!("invalid listen address: {}", cli.listen_addr))?;
        anyhow::ensure!(
            cli.handoff_timeout_secs > 0,
            "handoff timeout must be non-zero"
        );
        Ok(ServerConfig {
            listen_addr,
            handoff_timeout: Duration::from_secs(cli.handoff_timeout_secs),
            shutdown_grace: Duration::from_secs(cli.shutdown_grace_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test_deadline::deadline]
    fn defaults_parse_into_a_config() {
        let cli = Cli::parse_from(["berth-server"]);
        let config = ServerConfig::try_from(&cli).unwrap();
        assert_eq!(config.handoff_timeout, Duration::from_secs(30));
        assert_eq!(config.listen_addr.port(), 8089);
    }

    #[test_deadline::deadline]
    fn rejects_a_malformed_listen_address() {
        let cli = Cli::parse_from(["berth-server", "--listen-addr", "not-an-address"]);
        assert!(ServerConfig::try_from(&cli).is_err());
    }

    #[test_deadline::deadline]
    fn rejects_a_zero_handoff_timeout() {
        let cli = Cli::parse_from(["berth-server", "--handoff-timeout-secs", "0"]);
        assert!(ServerConfig::try_from(&cli).is_err());
    }
}
