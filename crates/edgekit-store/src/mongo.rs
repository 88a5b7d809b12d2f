use crate::error::{Result, StoreError};
use edgekit_core::MongoConfig;
use futures::TryStreamExt;
use mongodb::bson::{self, Document};
use mongodb::options::ClientOptions;
use mongodb::results::{DeleteResult, InsertOneResult, UpdateResult};
use mongodb::{Client, Collection};
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A MongoDB client bound to one database and collection.
///
/// Every call runs under its own deadline: `connect_timeout_secs` for
/// connecting, `query_timeout_secs` for `find_all` and `write_timeout_secs`
/// for everything else.
pub struct MongoStore {
    client: Client,
    collection: Collection<Document>,
    write_timeout: Duration,
    query_timeout: Duration,
}

impl MongoStore {
    /// Parse the URI and build the client.
    ///
    /// The driver connects lazily, so an unreachable server surfaces on the
    /// first operation rather than here.
    pub async fn connect(config: &MongoConfig) -> Result<Self> {
        let connect_timeout = Duration::from_secs(config.connect_timeout_secs);
        let client = with_timeout("connect", connect_timeout, async {
            let mut options = ClientOptions::parse(config.uri.as_str()).await?;
            options.connect_timeout = Some(connect_timeout);
            Client::with_options(options)
        })
        .await?;

        let collection = client
            .database(&config.database)
            .collection::<Document>(&config.collection);
        info!(
            "MongoDB client ready for {}.{}",
            config.database, config.collection
        );

        Ok(Self {
            client,
            collection,
            write_timeout: Duration::from_secs(config.write_timeout_secs),
            query_timeout: Duration::from_secs(config.query_timeout_secs),
        })
    }

    pub fn collection_name(&self) -> &str {
        self.collection.name()
    }

    pub async fn insert_one(&self, document: Document) -> Result<InsertOneResult> {
        with_timeout("insert_one", self.write_timeout, async {
            self.collection.insert_one(document).await
        })
        .await
    }

    /// Serialize `value` into a BSON document and insert it.
    pub async fn insert<T: Serialize>(&self, value: &T) -> Result<InsertOneResult> {
        let document = bson::to_document(value)?;
        self.insert_one(document).await
    }

    /// Every document matching `filter`, with the cursor drained under the
    /// same deadline.
    pub async fn find_all(&self, filter: Document) -> Result<Vec<Document>> {
        let documents = with_timeout("find", self.query_timeout, async {
            let cursor = self.collection.find(filter).await?;
            cursor.try_collect::<Vec<Document>>().await
        })
        .await?;
        debug!(
            "Found {} documents in {}",
            documents.len(),
            self.collection.name()
        );
        Ok(documents)
    }

    pub async fn update_one(&self, filter: Document, update: Document) -> Result<UpdateResult> {
        with_timeout("update_one", self.write_timeout, async {
            self.collection.update_one(filter, update).await
        })
        .await
    }

    pub async fn delete_one(&self, filter: Document) -> Result<DeleteResult> {
        with_timeout("delete_one", self.write_timeout, async {
            self.collection.delete_one(filter).await
        })
        .await
    }

    /// Close pooled connections and stop background monitoring.
    pub async fn disconnect(self) -> Result<()> {
        let Self {
            client,
            collection,
            write_timeout,
            ..
        } = self;
        drop(collection);

        with_timeout("disconnect", write_timeout, async move {
            client.shutdown().await;
            Ok(())
        })
        .await?;
        info!("Disconnected from MongoDB");
        Ok(())
    }
}

async fn with_timeout<T, F>(operation: &'static str, limit: Duration, future: F) -> Result<T>
where
    F: Future<Output = mongodb::error::Result<T>>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(result) => Ok(result?),
        Err(_) => {
            warn!("MongoDB {} timed out after {:?}", operation, limit);
            Err(StoreError::Timeout {
                operation,
                timeout: limit,
            })
        }
    }
}
