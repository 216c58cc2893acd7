pub mod memory_store;
pub mod user_store;

pub use memory_store::MemoryUserStore;
pub use user_store::{MongoUserStore, UserStore};

use crate::{
    config::DatabaseConfig,
    models::{User, USERS_COLLECTION},
    utils::AppError,
};
use mongodb::{Client, Collection, Database};

#[derive(Clone)]
pub struct MongoDB {
    client: Client,
    db: Database,
}

impl MongoDB {
    pub async fn new(config: &DatabaseConfig) -> Result<Self, AppError> {
        let mut client_options = mongodb::options::ClientOptions::parse(&config.uri).await?;

        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)?;
        let db = client.database(&config.database);

        // Test connection
        db.list_collection_names().await?;
        log::info!("✅ Connected to MongoDB database: {}", config.database);

        let mongodb = Self { client, db };
        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Creates the unique email index the user collection relies on
    async fn ensure_indexes(&self) -> Result<(), AppError> {
        use mongodb::bson::doc;
        use mongodb::options::IndexOptions;
        use mongodb::IndexModel;

        log::info!("🔧 Creating database indexes...");

        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        self.users().create_index(email_index).await?;
        log::info!("   ✅ Index ready: {}(email, unique)", USERS_COLLECTION);

        Ok(())
    }

    pub fn users(&self) -> Collection<User> {
        self.db.collection(USERS_COLLECTION)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}
