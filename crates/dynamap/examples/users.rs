//! End-to-end walkthrough against a local DynamoDB.
//!
//! Run with a local endpoint, e.g.:
//!
//! ```sh
//! AWS_ENDPOINT_URL=http://localhost:8000 cargo run --example users
//! ```

use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

use dynamap::{
    Attr, Connection, FieldDef, FieldKind, Item, Model, Overwrite, QueryOptions, Schema, Store,
    ValidationError, Value,
};

#[derive(Debug, Clone)]
struct User {
    email: String,
    name: String,
    year_of_birth: Option<i64>,
    cities_visited: Vec<String>,
}

static USER_SCHEMA: OnceLock<Schema> = OnceLock::new();

impl Model for User {
    fn schema() -> &'static Schema {
        USER_SCHEMA.get_or_init(|| {
            Schema::builder("users")
                .hash_key("email")
                .field(FieldDef::email("email").required())
                .field(FieldDef::string("name").required())
                .field(
                    FieldDef::integer("year_of_birth")
                        .min_value(1900.0)
                        .max_value(2018.0),
                )
                .field(FieldDef::list("cities_visited", FieldKind::String))
                .build()
                .expect("user schema is valid")
        })
    }

    fn to_item(&self) -> Item {
        let mut item = Item::new();
        item.insert("email".to_string(), Value::from(self.email.as_str()));
        item.insert("name".to_string(), Value::from(self.name.as_str()));
        item.insert("year_of_birth".to_string(), Value::from(self.year_of_birth));
        item.insert(
            "cities_visited".to_string(),
            Value::from(self.cities_visited.clone()),
        );
        item
    }

    fn from_item(item: &Item) -> Result<Self, ValidationError> {
        Ok(User {
            email: get_string(item, "email")?,
            name: get_string(item, "name")?,
            year_of_birth: item.get("year_of_birth").and_then(Value::as_int),
            cities_visited: item
                .get("cities_visited")
                .and_then(Value::as_list)
                .map(|cities| {
                    cities
                        .iter()
                        .filter_map(|city| city.as_str().map(String::from))
                        .collect()
                })
                .unwrap_or_default(),
        })
    }
}

fn get_string(item: &Item, attr: &str) -> Result<String, ValidationError> {
    item.get(attr)
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| ValidationError::MissingRequired {
            attr: attr.to_string(),
        })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    Connection::from_env().await.set_global()?;
    let store = Store::global()?;

    let users = vec![
        User {
            email: "john@example.com".to_string(),
            name: "John".to_string(),
            year_of_birth: Some(1990),
            cities_visited: vec!["Nairobi".to_string(), "New York".to_string()],
        },
        User {
            email: "jane@example.com".to_string(),
            name: "Jane".to_string(),
            year_of_birth: Some(1985),
            cities_visited: vec!["Oslo".to_string()],
        },
    ];

    let saved = store.save_many(&users, Overwrite::Always).await;
    tracing::info!(saved = saved.success_count(), "saved users");

    // Exact-key read.
    let john: Option<User> = store.get_one("john@example.com").await?;
    tracing::info!(?john, "fetched by key");

    // Batch read, one request per key, input order preserved.
    let both: Vec<User> = store
        .get_many(
            vec!["john@example.com", "jane@example.com"],
            QueryOptions::default(),
        )
        .await?;
    tracing::info!(count = both.len(), "fetched batch");

    // Filtered scan: no key predicate in the tree.
    let eighties: Vec<User> = store
        .get_many(
            Attr::new("year_of_birth").between(1980i64, 1989i64),
            QueryOptions::default(),
        )
        .await?;
    tracing::info!(count = eighties.len(), "born in the eighties");

    // Update guarded by a residual condition on the stored item.
    let updated: Option<User> = store
        .update_one(
            Attr::new("email").eq("john@example.com") & Attr::new("year_of_birth").eq(1990i64),
            &[
                Attr::new("cities_visited").append(vec!["Lisbon"]),
                Attr::new("name").set("John R."),
            ],
        )
        .await?;
    tracing::info!(?updated, "updated");

    // Conditional delete: removed only when the guard holds.
    let deleted: Option<User> = store
        .delete_one(
            Attr::new("email").eq("jane@example.com") & Attr::new("year_of_birth").lt(1990i64),
        )
        .await?;
    tracing::info!(deleted = deleted.is_some(), "conditional delete");

    Ok(())
}
