// MongoDB backend
use crate::config::MongoConfig;
use crate::error::MigrationError;
use crate::store::connection::Connector;
use crate::store::DocumentStore;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::error::ErrorKind;
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};

const APP_NAME: &str = "csv2mongo";

/// Live handle on the target MongoDB collection
#[derive(Debug, Clone)]
pub struct MongoStore {
    client: Client,
    collection: Collection<Document>,
}

impl MongoStore {
    /// Lightweight `ping` against the admin database
    pub async fn ping(&self) -> Result<(), MigrationError> {
        ping(&self.client).await
    }
}

async fn ping(client: &Client) -> Result<(), MigrationError> {
    client
        .database("admin")
        .run_command(doc! { "ping": 1 })
        .await
        .map_err(classify_error)?;
    Ok(())
}

/// Map driver errors onto the retry classification: connectivity problems become
/// `Connection`, bad connection strings become `Configuration`, the rest stay as
/// driver errors and are not retried.
pub fn classify_error(err: mongodb::error::Error) -> MigrationError {
    let connectivity = match err.kind.as_ref() {
        ErrorKind::ServerSelection { .. }
        | ErrorKind::Io(_)
        | ErrorKind::ConnectionPoolCleared { .. } => Some(true),
        ErrorKind::InvalidArgument { .. } | ErrorKind::DnsResolve { .. } => Some(false),
        _ => None,
    };

    match connectivity {
        Some(true) => MigrationError::connection(err.to_string()),
        Some(false) => MigrationError::configuration(err.to_string()),
        None => MigrationError::Database(err),
    }
}

impl DocumentStore for MongoStore {
    fn namespace(&self) -> String {
        self.collection.namespace().to_string()
    }

    async fn insert_one(&self, document: Document) -> Result<Bson, MigrationError> {
        let result = self.collection.insert_one(document).await?;
        Ok(result.inserted_id)
    }

    async fn insert_many(&self, documents: Vec<Document>) -> Result<usize, MigrationError> {
        // The driver rejects an empty batch
        if documents.is_empty() {
            return Ok(0);
        }
        let result = self.collection.insert_many(documents).await?;
        Ok(result.inserted_ids.len())
    }

    async fn find(&self, filter: Document, include_id: bool) -> Result<Vec<Document>, MigrationError> {
        let mut action = self.collection.find(filter);
        if !include_id {
            action = action.projection(doc! { "_id": 0 });
        }
        let cursor = action.await?;
        let documents: Vec<Document> = cursor.try_collect().await?;
        Ok(documents)
    }

    async fn update_many(&self, filter: Document, fields: Document) -> Result<u64, MigrationError> {
        let result = self
            .collection
            .update_many(filter, doc! { "$set": fields })
            .await?;
        Ok(result.modified_count)
    }

    async fn delete_many(&self, filter: Document) -> Result<u64, MigrationError> {
        let result = self.collection.delete_many(filter).await?;
        Ok(result.deleted_count)
    }

    async fn count(&self, filter: Document) -> Result<u64, MigrationError> {
        Ok(self.collection.count_documents(filter).await?)
    }
}

/// Opens MongoDB clients from [`MongoConfig`]
#[derive(Debug, Clone, Copy, Default)]
pub struct MongoConnector;

impl Connector for MongoConnector {
    type Store = MongoStore;

    async fn open(&self, config: &MongoConfig) -> Result<MongoStore, MigrationError> {
        let uri = config.connection_uri();
        let mut options = ClientOptions::parse(uri.as_str())
            .await
            .map_err(classify_error)?;
        options.server_selection_timeout = Some(config.probe_timeout);
        options.connect_timeout = Some(config.probe_timeout);
        options.app_name = Some(APP_NAME.to_string());

        let client = Client::with_options(options).map_err(classify_error)?;
        ping(&client).await?;

        let collection = client
            .database(&config.database_name())
            .collection::<Document>(&config.collection_name());

        Ok(MongoStore { client, collection })
    }
}
