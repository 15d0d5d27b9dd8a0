//! SQL Server sessions over tiberius

use crate::config::MssqlSettings;
use crate::database::connection::DatabaseBackend;
use crate::database::session::{DatabaseSession, ResultSet};
use crate::database::value::CellValue;
use crate::error::{LoaderError, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tiberius::{AuthMethod, Client, ColumnData, Config, FromSql, Query, SqlBrowser};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{info, warn};

/// SQL Server error numbers reported for constraint violations:
/// PRIMARY KEY (2627), unique index (2601), FOREIGN KEY/CHECK (547), NULL insert (515).
const INTEGRITY_ERROR_CODES: [u32; 4] = [2627, 2601, 547, 515];

/// Session over a single tiberius client
pub struct MssqlSession {
    client: Client<Compat<TcpStream>>,
    database: String,
}

impl MssqlSession {
    /// Connect with SQL authentication
    pub async fn connect(settings: &MssqlSettings) -> Result<Self> {
        let mut config = Config::new();
        config.host(&settings.host);
        config.port(settings.port);
        config.database(&settings.database);
        config.application_name(env!("CARGO_PKG_NAME"));
        config.authentication(AuthMethod::sql_server(
            &settings.username,
            &settings.password,
        ));
        if settings.trust_server_certificate {
            config.trust_cert();
        }

        let tcp = match &settings.instance {
            Some(instance) => {
                config.instance_name(instance);
                TcpStream::connect_named(&config).await?
            }
            None => TcpStream::connect(config.get_addr()).await?,
        };
        tcp.set_nodelay(true)?;

        let client = Client::connect(config, tcp.compat_write()).await?;
        info!(
            "Connected to SQL Server at {}:{} ({})",
            settings.host, settings.port, settings.database
        );

        Ok(Self {
            client,
            database: settings.database.clone(),
        })
    }

    async fn simple(&mut self, sql: &str) -> Result<()> {
        self.client
            .simple_query(sql)
            .await
            .map_err(classify)?
            .into_results()
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn begin(&mut self) -> Result<()> {
        self.simple("BEGIN TRANSACTION").await
    }

    async fn commit(&mut self) -> Result<()> {
        self.simple("COMMIT TRANSACTION").await
    }

    async fn rollback(&mut self) {
        // Some errors abort the transaction server-side already.
        if let Err(e) = self.simple("IF @@TRANCOUNT > 0 ROLLBACK TRANSACTION").await {
            warn!("Rollback failed: {}", e);
        }
    }
}

/// Map a tiberius error onto the loader's integrity/statement split
pub(crate) fn classify(err: tiberius::error::Error) -> LoaderError {
    match &err {
        tiberius::error::Error::Server(token) => classify_server(token.code(), token.message()),
        _ => LoaderError::Mssql(err),
    }
}

fn classify_server(code: u32, message: &str) -> LoaderError {
    if INTEGRITY_ERROR_CODES.contains(&code) {
        LoaderError::Integrity(message.to_string())
    } else {
        LoaderError::Statement(message.to_string())
    }
}

fn bind_cell<'a>(query: &mut Query<'a>, cell: &'a CellValue) {
    match cell {
        CellValue::Null => query.bind(Option::<&'a str>::None),
        CellValue::Integer(v) => query.bind(*v),
        CellValue::Float(v) => query.bind(*v),
        CellValue::Text(s) => query.bind(s.as_str()),
    }
}

/// `{database}.dbo.{table}`
fn qualify(database: &str, table: &str) -> String {
    let schema = DatabaseBackend::MSSQL.default_schema().unwrap_or("dbo");
    format!("{}.{}.{}", database, schema, table)
}

/// Render a DECIMAL/NUMERIC value from its unscaled integer and scale
pub(crate) fn format_decimal(value: i128, scale: u8) -> String {
    if scale == 0 {
        return value.to_string();
    }
    let divisor = 10u128.pow(u32::from(scale));
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    format!(
        "{}{}.{:0width$}",
        sign,
        abs / divisor,
        abs % divisor,
        width = usize::from(scale)
    )
}

fn format_cell(data: &ColumnData<'static>) -> Result<Option<String>> {
    let text = match data {
        ColumnData::U8(v) => v.map(|v| v.to_string()),
        ColumnData::I16(v) => v.map(|v| v.to_string()),
        ColumnData::I32(v) => v.map(|v| v.to_string()),
        ColumnData::I64(v) => v.map(|v| v.to_string()),
        ColumnData::F32(v) => v.map(|v| v.to_string()),
        ColumnData::F64(v) => v.map(|v| v.to_string()),
        ColumnData::Bit(v) => v.map(|v| v.to_string()),
        ColumnData::String(v) => v.as_ref().map(|s| s.to_string()),
        ColumnData::Guid(v) => v.as_ref().map(|g| g.to_string()),
        ColumnData::Numeric(v) => v.as_ref().map(|n| format_decimal(n.value(), n.scale())),
        ColumnData::Binary(v) => v.as_ref().map(|bytes| {
            let hex: String = bytes.iter().map(|b| format!("{:02X}", b)).collect();
            format!("0x{}", hex)
        }),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            NaiveDateTime::from_sql(data)?.map(|v| v.to_string())
        }
        ColumnData::Date(_) => NaiveDate::from_sql(data)?.map(|v| v.to_string()),
        ColumnData::Time(_) => NaiveTime::from_sql(data)?.map(|v| v.to_string()),
        other => Some(format!("{:?}", other)),
    };
    Ok(text)
}

#[async_trait]
impl DatabaseSession for MssqlSession {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::MSSQL
    }

    fn qualified_name(&self, table: &str) -> String {
        qualify(&self.database, table)
    }

    async fn execute(&mut self, sql: &str) -> Result<u64> {
        self.begin().await?;
        match self.client.execute(sql, &[]).await {
            Ok(result) => {
                self.commit().await?;
                Ok(result.total())
            }
            Err(e) => {
                self.rollback().await;
                Err(classify(e))
            }
        }
    }

    async fn execute_many(&mut self, sql: &str, rows: &[Vec<CellValue>]) -> Result<u64> {
        self.begin().await?;

        let mut affected = 0;
        for row in rows {
            let mut query = Query::new(sql);
            for cell in row {
                bind_cell(&mut query, cell);
            }
            match query.execute(&mut self.client).await {
                Ok(result) => affected += result.total(),
                Err(e) => {
                    self.rollback().await;
                    return Err(classify(e));
                }
            }
        }

        self.commit().await?;
        Ok(affected)
    }

    async fn query(&mut self, sql: &str) -> Result<ResultSet> {
        let mut stream = self.client.simple_query(sql).await.map_err(classify)?;
        let columns = stream
            .columns()
            .await
            .map_err(classify)?
            .map(|cols| cols.iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();
        let rows = stream.into_first_result().await.map_err(classify)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let cells = row
                .into_iter()
                .map(|data| format_cell(&data))
                .collect::<Result<Vec<_>>>()?;
            out.push(cells);
        }

        Ok(ResultSet { columns, rows: out })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_decimal() {
        assert_eq!(format_decimal(1250, 2), "12.50");
        assert_eq!(format_decimal(-5, 2), "-0.05");
        assert_eq!(format_decimal(42, 0), "42");
        assert_eq!(format_decimal(100001, 3), "100.001");
    }

    #[test]
    fn test_format_cell_scalars() {
        assert_eq!(format_cell(&ColumnData::I32(Some(7))).unwrap(), Some("7".to_string()));
        assert_eq!(format_cell(&ColumnData::I32(None)).unwrap(), None);
        assert_eq!(
            format_cell(&ColumnData::String(Some("E01".into()))).unwrap(),
            Some("E01".to_string())
        );
    }

    #[test]
    fn test_constraint_codes_are_integrity_errors() {
        for code in [2627, 2601, 547, 515] {
            let err = classify_server(code, "Violation of PRIMARY KEY constraint");
            assert!(matches!(err, LoaderError::Integrity(_)), "code {code}: {err:?}");
        }
    }

    #[test]
    fn test_other_server_codes_are_statement_errors() {
        // 3701: cannot drop the table because it does not exist
        let err = classify_server(3701, "Cannot drop the table 'ghost'");
        assert!(matches!(err, LoaderError::Statement(ref m) if m.contains("ghost")));
        assert!(matches!(classify_server(208, "Invalid object name"), LoaderError::Statement(_)));
    }

    #[test]
    fn test_transport_errors_stay_driver_errors() {
        let err = tiberius::error::Error::Io {
            kind: std::io::ErrorKind::ConnectionReset,
            message: "reset".to_string(),
        };
        assert!(matches!(classify(err), LoaderError::Mssql(_)));
    }

    #[test]
    fn test_qualify_uses_database_and_dbo() {
        assert_eq!(qualify("bookstore", "orders"), "bookstore.dbo.orders");
    }
}
