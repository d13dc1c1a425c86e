use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args as ClapArgs, Parser, Subcommand};
use erp_relay::config::{DEFAULT_BRIDGE_PORT, RelayStrategy};
use erp_relay::substitution::DEFAULT_LINKED_SERVER;

#[derive(Parser, Debug)]
#[command(author, version, about = "Authenticated relay for read-only ERP queries")]
pub(crate) struct Args {
    /// Also append log output to this file.
    #[arg(long, global = true)]
    pub(crate) log: Option<PathBuf>,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Run the bridge agent next to the ERP.
    Bridge(BridgeArgs),
    /// Send one query through the configured relay and print the rows as JSON.
    Query(QueryArgs),
}

#[derive(ClapArgs, Debug)]
pub(crate) struct BridgeArgs {
    #[arg(long, env = "BRIDGE_HOST", default_value = "0.0.0.0")]
    pub(crate) host: IpAddr,
    #[arg(long, env = "BRIDGE_PORT", default_value_t = DEFAULT_BRIDGE_PORT)]
    pub(crate) port: u16,
    #[arg(long, env = "BRIDGE_SECRET_KEY", hide_env_values = true)]
    pub(crate) secret: String,
    #[arg(
        long = "odbc-connection-string",
        env = "ERP_ODBC_CONNECTION_STRING",
        hide_env_values = true,
        default_value = ""
    )]
    pub(crate) connection_string: String,
    #[arg(long = "query-timeout", env = "ERP_QUERY_TIMEOUT", default_value = "2m", value_parser = humantime::parse_duration)]
    pub(crate) query_timeout: Duration,
}

#[derive(ClapArgs, Debug)]
pub(crate) struct QueryArgs {
    /// SQL template with positional `?` placeholders.
    pub(crate) sql: String,
    /// One parameter per placeholder, as a JSON scalar (`42`, `"O'Brien"`, `null`).
    #[arg(long = "param", short = 'p')]
    pub(crate) params: Vec<String>,
    #[arg(long, value_enum, env = "ERP_RELAY_STRATEGY", default_value = "http")]
    pub(crate) strategy: RelayStrategy,
    #[arg(long, env = "ERP_RELAY_TIMEOUT", default_value = "2m", value_parser = humantime::parse_duration)]
    pub(crate) timeout: Duration,
    #[command(flatten)]
    pub(crate) http: HttpArgs,
    #[command(flatten)]
    pub(crate) gateway: GatewayArgs,
    #[command(flatten)]
    pub(crate) direct: DirectArgs,
}

#[derive(ClapArgs, Debug)]
pub(crate) struct DirectArgs {
    #[arg(
        long = "odbc-connection-string",
        env = "ERP_ODBC_CONNECTION_STRING",
        hide_env_values = true
    )]
    pub(crate) connection_string: Option<String>,
}

#[derive(ClapArgs, Debug)]
pub(crate) struct HttpArgs {
    #[arg(long = "bridge-url", env = "ERP_BRIDGE_URL")]
    pub(crate) bridge_url: Option<String>,
    #[arg(long = "secret", env = "BRIDGE_SECRET_KEY", hide_env_values = true)]
    pub(crate) secret: Option<String>,
}

#[derive(ClapArgs, Debug)]
pub(crate) struct GatewayArgs {
    #[arg(long = "gateway-host", env = "GATEWAY_HOST")]
    pub(crate) host: Option<String>,
    #[arg(long = "gateway-port", env = "GATEWAY_PORT")]
    pub(crate) port: Option<u16>,
    #[arg(long = "gateway-instance", env = "GATEWAY_INSTANCE")]
    pub(crate) instance: Option<String>,
    #[arg(long = "gateway-database", env = "GATEWAY_DATABASE", default_value = "master")]
    pub(crate) database: String,
    #[arg(long = "gateway-user", env = "GATEWAY_USER", default_value = "")]
    pub(crate) user: String,
    #[arg(long = "gateway-password", env = "GATEWAY_PASSWORD", hide_env_values = true, default_value = "")]
    pub(crate) password: String,
    #[arg(long = "linked-server", env = "GATEWAY_LINKED_SERVER", default_value = DEFAULT_LINKED_SERVER)]
    pub(crate) linked_server: String,
}
