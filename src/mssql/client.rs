use tiberius::{AuthMethod, Client, Config, SqlBrowser};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use crate::config::GatewayConfig;
use crate::error::RelayError;

/// Type alias for a SQL Server client over a tokio socket
pub type MssqlClient = Client<Compat<TcpStream>>;

pub(crate) fn build_tiberius_config(opts: &GatewayConfig) -> Config {
    let mut config = Config::new();
    config.host(&opts.server);
    config.database(&opts.database);
    config.port(opts.port.unwrap_or(1433));
    config.authentication(AuthMethod::sql_server(&opts.user, opts.password.expose()));
    if let Some(instance) = &opts.instance_name {
        config.instance_name(instance);
    }
    config.application_name("erp-relay");
    config.trust_cert();
    config
}

/// Open a dedicated SQL Server connection for one gateway query.
///
/// # Errors
/// Returns `RelayError::Driver` if the TCP connection or the TDS login fails.
pub async fn create_mssql_client(opts: &GatewayConfig) -> Result<MssqlClient, RelayError> {
    let config = build_tiberius_config(opts);

    // named instances resolve their port through the SQL Server Browser service
    let tcp = if opts.instance_name.is_some() {
        TcpStream::connect_named(&config)
            .await
            .map_err(|e| RelayError::Driver(format!("SQL Browser lookup failed: {e}")))?
    } else {
        TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| RelayError::Driver(format!("TCP connection to gateway failed: {e}")))?
    };
    tcp.set_nodelay(true)
        .map_err(|e| RelayError::Driver(format!("failed to configure gateway socket: {e}")))?;

    Client::connect(config, tcp.compat_write())
        .await
        .map_err(|e| RelayError::Driver(format!("SQL Server login failed: {e}")))
}
