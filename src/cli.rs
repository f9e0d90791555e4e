//! Command line surface: `serve` (the default) runs the fixture, `probe`
//! sends it a single request.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args as ClapArgs, Parser, Subcommand};

use crate::config::FixtureConfig;
use crate::error::{FixtureError, FixtureResult};
use crate::scgi::client;
use crate::scgi::environment::{Environment, PATH_INFO, SCGI};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the canned responses on a Unix socket.
    Serve(ServeArgs),
    /// Send one request to a running fixture and print the reply.
    Probe(ProbeArgs),
}

impl Default for Command {
    fn default() -> Self {
        Command::Serve(ServeArgs::default())
    }
}

#[derive(ClapArgs, Debug, Default)]
pub struct ServeArgs {
    /// TOML config file.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Overrides `socket_path` from the config.
    #[arg(long)]
    pub socket: Option<PathBuf>,
    /// Overrides `sleep_unit` from the config.
    #[arg(long)]
    pub sleep_unit_ms: Option<u64>,
}

impl ServeArgs {
    pub fn resolve_config(&self) -> FixtureConfig {
        let mut config = match &self.config {
            Some(path) => FixtureConfig::from_file(path),
            None => FixtureConfig::default(),
        };
        if let Some(socket) = &self.socket {
            config.socket_path = socket.clone();
        }
        if let Some(ms) = self.sleep_unit_ms {
            config.sleep_unit = Duration::from_millis(ms);
        }
        config
    }
}

#[derive(ClapArgs, Debug)]
pub struct ProbeArgs {
    /// Value sent as PATH_INFO.
    pub path_info: String,
    #[arg(long, default_value = "./run/scgi_test.sock")]
    pub socket: PathBuf,
    /// Extra environment entries.
    #[arg(long = "env", value_name = "KEY=VALUE")]
    pub env: Vec<String>,
    /// Request body.
    #[arg(long, default_value = "")]
    pub body: String,
    /// Seconds to wait for the whole exchange.
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,
}

impl ProbeArgs {
    pub fn environment(&self) -> FixtureResult<Environment> {
        let mut env = Environment::new();
        env.insert(SCGI, "1");
        env.insert(PATH_INFO, &self.path_info);
        for entry in &self.env {
            let (name, value) = entry
                .split_once('=')
                .filter(|(name, _)| !name.is_empty())
                .ok_or_else(|| FixtureError::EnvArgument(entry.clone()))?;
            env.insert(name, value);
        }
        Ok(env)
    }
}

/// Sends the probe request and returns the raw reply.
pub async fn probe(args: &ProbeArgs) -> FixtureResult<Vec<u8>> {
    let env = args.environment()?;
    let timeout = Duration::from_secs(args.timeout);
    Ok(client::send(&args.socket, &env, args.body.as_bytes(), timeout).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_serve() {
        let args = Args::parse_from(["scgi-fixture"]);
        assert!(args.command.is_none());
        assert!(matches!(args.command.unwrap_or_default(), Command::Serve(_)));
    }

    #[test]
    fn serve_overrides_apply_on_top_of_config() {
        let args = Args::parse_from([
            "scgi-fixture",
            "serve",
            "--socket",
            "/tmp/x.sock",
            "--sleep-unit-ms",
            "20",
        ]);
        let Some(Command::Serve(serve)) = args.command else {
            panic!("expected serve");
        };
        let config = serve.resolve_config();
        assert_eq!(config.socket_path, PathBuf::from("/tmp/x.sock"));
        assert_eq!(config.sleep_unit, Duration::from_millis(20));
        assert_eq!(config.max_body_size, FixtureConfig::default().max_body_size);
    }

    #[test]
    fn probe_builds_environment() {
        let args = Args::parse_from([
            "scgi-fixture",
            "probe",
            "/client_auth",
            "--env",
            "TLS_CLIENT_HASH=abc=123",
        ]);
        let Some(Command::Probe(probe)) = args.command else {
            panic!("expected probe");
        };
        let env = probe.environment().unwrap();
        assert_eq!(env.get("PATH_INFO"), Some("/client_auth"));
        assert_eq!(env.get("TLS_CLIENT_HASH"), Some("abc=123"));
        assert_eq!(env.get("SCGI"), Some("1"));
    }

    #[test]
    fn probe_rejects_env_without_equals() {
        let args = Args::parse_from(["scgi-fixture", "probe", "/", "--env", "NOPE"]);
        let Some(Command::Probe(probe)) = args.command else {
            panic!("expected probe");
        };
        assert!(matches!(
            probe.environment(),
            Err(FixtureError::EnvArgument(value)) if value == "NOPE"
        ));
    }
}
