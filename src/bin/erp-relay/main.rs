mod args;
mod logging;

use std::net::SocketAddr;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use erp_relay::config::{
    DirectConfig, GatewayConfig, RelayClientConfig, RelayStrategy, Secret,
};
use erp_relay::relay::{RelaySettings, build_relay};
use erp_relay::types::ScalarValue;

use crate::args::{Args, BridgeArgs, Command, QueryArgs};
use crate::logging::LogWriter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let writer = LogWriter::new(args.log.clone()).context("failed to open log file")?;
    logging::init(writer);

    match args.command {
        Command::Bridge(bridge) => run_bridge(bridge).await,
        Command::Query(query) => run_query(query).await,
    }
}

#[cfg(feature = "odbc")]
async fn run_bridge(args: BridgeArgs) -> Result<()> {
    use std::sync::Arc;

    use erp_relay::bridge::BridgeServer;
    use erp_relay::config::BridgeConfig;
    use erp_relay::odbc::OdbcConnector;

    let config = BridgeConfig::new(
        SocketAddr::new(args.host, args.port),
        Secret::new(args.secret),
        Secret::new(args.connection_string),
    )
    .with_query_timeout(args.query_timeout);
    tracing::info!(
        bind = %config.bind_addr,
        query_timeout = %humantime::format_duration(config.query_timeout),
        "starting ERP bridge"
    );

    let connector = Arc::new(OdbcConnector::from_config(&config));
    BridgeServer::new(config, connector)?.run().await?;
    Ok(())
}

#[cfg(not(feature = "odbc"))]
async fn run_bridge(args: BridgeArgs) -> Result<()> {
    let addr = SocketAddr::new(args.host, args.port);
    bail!("cannot serve on {addr}: this build has no ERP backend, rebuild with `--features odbc`")
}

async fn run_query(args: QueryArgs) -> Result<()> {
    let params = args
        .params
        .iter()
        .map(|raw| parse_param(raw))
        .collect::<Result<Vec<_>>>()?;

    let settings = settings_from(&args)?;
    let relay = build_relay(settings)?;
    let rows = relay
        .query_erp(&args.sql, &params)
        .await
        .map_err(|err| anyhow!("{err}: {}", err.cause()))?;

    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

fn settings_from(args: &QueryArgs) -> Result<RelaySettings> {
    Ok(match args.strategy {
        RelayStrategy::Http => {
            let url = args
                .http
                .bridge_url
                .clone()
                .context("ERP_BRIDGE_URL (or --bridge-url) is required for the http strategy")?;
            let secret = args
                .http
                .secret
                .clone()
                .context("BRIDGE_SECRET_KEY (or --secret) is required for the http strategy")?;
            RelaySettings::Http(
                RelayClientConfig::new(url, Secret::new(secret)).with_timeout(args.timeout),
            )
        }
        RelayStrategy::Gateway => {
            let gw = &args.gateway;
            let host = gw
                .host
                .clone()
                .context("GATEWAY_HOST (or --gateway-host) is required for the gateway strategy")?;
            RelaySettings::Gateway(
                GatewayConfig::new(
                    host,
                    gw.database.clone(),
                    gw.user.clone(),
                    Secret::new(gw.password.clone()),
                )
                .with_port(gw.port)
                .with_instance_name(gw.instance.clone())
                .with_linked_server(gw.linked_server.clone())
                .with_timeout(args.timeout),
            )
        }
        RelayStrategy::Direct => {
            let connection_string = args.direct.connection_string.clone().context(
                "ERP_ODBC_CONNECTION_STRING (or --odbc-connection-string) is required for the direct strategy",
            )?;
            RelaySettings::Direct(
                DirectConfig::new(Secret::new(connection_string)).with_timeout(args.timeout),
            )
        }
    })
}

/// Parse a `--param` value as a JSON scalar; anything that is not valid JSON is taken as text.
fn parse_param(raw: &str) -> Result<ScalarValue> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Array(_) | serde_json::Value::Object(_)) => {
            bail!("parameter {raw:?} is not a scalar")
        }
        Ok(value) => Ok(serde_json::from_value(value)?),
        Err(_) => Ok(ScalarValue::Text(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_parse_as_json_scalars() {
        assert_eq!(parse_param("42").unwrap(), ScalarValue::Int(42));
        assert_eq!(parse_param("null").unwrap(), ScalarValue::Null);
        assert_eq!(parse_param("\"7\"").unwrap(), ScalarValue::Text("7".into()));
        assert_eq!(parse_param("O'Brien").unwrap(), ScalarValue::Text("O'Brien".into()));
        assert!(parse_param("[1]").is_err());
    }
}
