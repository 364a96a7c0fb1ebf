//! SQL Server session establishment.

use tiberius::{Client, Config, SqlBrowser};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info};

use crate::config::SourceConfig;
use crate::error::Result;

/// A tiberius client over a tokio TCP stream.
pub type TdsClient = Client<Compat<TcpStream>>;

/// An open session to a database server.
pub struct ServerSession {
    client: TdsClient,
}

/// Open a session as described by `config`.
///
/// Local mode resolves a named instance through the SQL Browser service.
/// Remote mode connects over TCP, follows one gateway redirect and checks the
/// connection before returning. Failures are returned as-is; nothing is retried.
pub async fn connect(config: &SourceConfig) -> Result<ServerSession> {
    let tds = config.tiberius_config()?;

    let client = if config.is_local {
        connect_local(tds).await?
    } else {
        connect_remote(tds).await?
    };

    Ok(ServerSession { client })
}

async fn connect_local(config: Config) -> Result<TdsClient> {
    let tcp = TcpStream::connect_named(&config).await?;
    tcp.set_nodelay(true).ok();

    let client = Client::connect(config, tcp.compat_write()).await?;
    info!("Connected to local instance");
    Ok(client)
}

async fn connect_remote(mut config: Config) -> Result<TdsClient> {
    let mut client = match connect_tcp(config.clone()).await {
        // Azure SQL gateways hand the login over to the node hosting the database
        Err(tiberius::error::Error::Routing { host, port }) => {
            debug!("Server redirected connection to {}:{}", host, port);
            config.host(&host);
            config.port(port);
            connect_tcp(config.clone()).await?
        }
        other => other?,
    };

    client.simple_query("SELECT 1").await?.into_row().await?;

    info!("Connected to {}", config.get_addr());
    Ok(client)
}

async fn connect_tcp(config: Config) -> tiberius::Result<TdsClient> {
    let tcp = TcpStream::connect(config.get_addr())
        .await
        .map_err(|e| tiberius::error::Error::Io {
            kind: e.kind(),
            message: e.to_string(),
        })?;

    tcp.set_nodelay(true).ok();

    Client::connect(config, tcp.compat_write()).await
}

impl ServerSession {
    /// Product version reported by the server, e.g. `16.0.1000.6`.
    pub async fn server_version(&mut self) -> Result<String> {
        let row = self
            .client
            .simple_query("SELECT CAST(SERVERPROPERTY('ProductVersion') AS NVARCHAR(128))")
            .await?
            .into_row()
            .await?;

        Ok(row
            .and_then(|r| r.get::<&str, _>(0).map(String::from))
            .unwrap_or_default())
    }

    /// Whether the server has a database named `name`.
    pub async fn has_database(&mut self, name: &str) -> Result<bool> {
        let row = self
            .client
            .query("SELECT COUNT(*) FROM sys.databases WHERE name = @P1", &[&name])
            .await?
            .into_row()
            .await?;

        Ok(row.and_then(|r| r.get::<i32, _>(0)).unwrap_or(0) > 0)
    }

    pub(crate) fn client_mut(&mut self) -> &mut TdsClient {
        &mut self.client
    }

    /// Log out and close the connection.
    pub async fn close(self) -> Result<()> {
        self.client.close().await?;
        debug!("Closed server session");
        Ok(())
    }
}
