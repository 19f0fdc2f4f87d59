//! Single writer thread. Every write job runs inside an immediate transaction
//! on one dedicated connection, so SQLite never sees concurrent writers.

use std::sync::mpsc;
use std::thread;

use diesel::sqlite::SqliteConnection;
use log::{error, warn};
use tokio::sync::oneshot;

use seniorlink_core::errors::{Error, Result};

use super::{get_connection, DbPool};
use crate::errors::StorageError;

type Job = Box<dyn FnOnce(&DbPool) + Send + 'static>;

#[derive(Clone)]
pub struct WriteHandle {
    jobs: mpsc::Sender<Job>,
}

pub fn spawn_writer(pool: DbPool) -> WriteHandle {
    let (jobs, inbox) = mpsc::channel::<Job>();
    let spawned = thread::Builder::new()
        .name("seniorlink-sqlite-writer".to_string())
        .spawn(move || {
            for job in inbox {
                job(&pool);
            }
        });
    if let Err(e) = spawned {
        // The handle stays usable; every exec reports the store as unavailable.
        error!("Failed to start SQLite writer thread: {}", e);
    }
    WriteHandle { jobs }
}

impl WriteHandle {
    pub async fn exec<T, F>(&self, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
    {
        let (reply, response) = oneshot::channel();
        let boxed: Job = Box::new(move |pool| {
            let result = run_job(pool, job);
            if reply.send(result).is_err() {
                warn!("SQLite write finished after its caller went away");
            }
        });
        self.jobs
            .send(boxed)
            .map_err(|_| Error::storage_unavailable("SQLite writer is not running"))?;
        response
            .await
            .map_err(|_| Error::storage_unavailable("SQLite writer dropped the job"))?
    }
}

fn run_job<T, F>(pool: &DbPool, job: F) -> Result<T>
where
    F: FnOnce(&mut SqliteConnection) -> Result<T>,
{
    let mut conn = get_connection(pool)?;
    conn.immediate_transaction::<_, StorageError, _>(|tx| job(tx).map_err(StorageError::from))
        .map_err(Error::from)
}
