//! Command-line flags. Each one overrides its environment variable.

use std::path::PathBuf;

use clap::Parser;
use kubetrail_core::Config;

/// Admission webhook that records and polices cluster changes.
#[derive(Parser, Debug, Default)]
#[command(name = "kubetrail", version, about)]
pub struct Cli {
    /// Listen address (overrides KUBETRAIL_HOST).
    #[arg(long)]
    pub host: Option<String>,

    /// Listen port (overrides KUBETRAIL_PORT).
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory holding `ignore-config` and `block-config` (overrides KUBETRAIL_RULES_DIR).
    #[arg(long)]
    pub rules_dir: Option<PathBuf>,
}

impl Cli {
    pub fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(dir) = &self.rules_dir {
            config.rules.rules_dir = dir.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from(["kubetrail", "--port", "9443", "--rules-dir", "/tmp/rules"]);
        let mut config = Config::from_env();
        let host_before = config.server.host.clone();
        cli.apply(&mut config);

        assert_eq!(config.server.port, 9443);
        assert_eq!(config.rules.rules_dir, PathBuf::from("/tmp/rules"));
        assert_eq!(config.server.host, host_before);
    }

    #[test]
    fn no_flags_change_nothing() {
        let mut config = Config::from_env();
        let port = config.server.port;
        Cli::default().apply(&mut config);
        assert_eq!(config.server.port, port);
    }
}
