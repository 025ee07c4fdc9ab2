use std::time::Duration;

use mongodb::{Client, Database, bson::doc};
use tokio::time::sleep;
use tracing::debug;

use super::{
    config::MongoConfig,
    error::{MongoDaoError, MongoResult},
};

/// Pings attempted before giving the failure back to the storage supervisor.
const PING_ATTEMPTS: u32 = 3;
const PING_PAUSE: Duration = Duration::from_millis(500);

/// Build a client for `config` and wait until its database answers a ping.
///
/// Long outages are not retried here; the storage supervisor owns the backoff.
pub async fn establish_connection(config: &MongoConfig) -> MongoResult<(Client, Database)> {
    let client = Client::with_options(config.options.clone())
        .map_err(|source| MongoDaoError::ClientConstruction { source })?;
    let database = client.database(&config.database_name);

    let mut attempt = 1;
    loop {
        match database.run_command(doc! { "ping": 1 }).await {
            Ok(_) => return Ok((client, database)),
            Err(source) if attempt >= PING_ATTEMPTS => {
                return Err(MongoDaoError::InitialPing {
                    attempts: attempt,
                    source,
                });
            }
            Err(err) => {
                debug!(attempt, error = %err, database = %config.database_name, "MongoDB ping failed");
                attempt += 1;
                sleep(PING_PAUSE * attempt).await;
            }
        }
    }
}
