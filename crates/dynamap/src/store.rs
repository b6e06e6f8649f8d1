//! Model store: the operations surface over DynamoDB.
//!
//! Every operation follows the same shape: resolve the caller's strategy
//! into condition trees, validate and render them, and only then issue the
//! request. A strategy that cannot be expressed fails before anything is
//! sent.

use std::collections::{BTreeMap, HashMap};

use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use tracing::debug;

use dynamap_core::{
    exact_key_with_condition, normalize, render, render_condition, render_updates, split, Attr,
    Condition, Item, KeyConditionMode, Model, Resolved, Schema, Strategy, Update, ValidationError,
    Value,
};

use crate::batch::BatchResult;
use crate::connection::Connection;
use crate::convert::{attributes_to_item, item_to_attributes};
use crate::error::{
    map_delete_item_error, map_get_item_error, map_put_item_error, map_query_error,
    map_scan_error, map_update_item_error, Result, StoreError,
};

/// Overwrite policy for writes.
#[derive(Debug, Clone)]
pub enum Overwrite {
    /// Replace any existing item with the same primary key.
    Always,
    /// Fail with [`StoreError::ConditionFailed`] when the item exists.
    Never,
    /// Replace only when the condition holds against the stored item.
    When(Condition),
}

/// Options for multi-item reads.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Read the range key in descending order.
    pub descending: bool,
    /// Stop after this many items.
    pub limit: Option<usize>,
}

/// The operations surface for model persistence.
#[derive(Debug, Clone)]
pub struct Store {
    connection: Connection,
}

impl Store {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    /// A store over the process-wide connection.
    pub fn global() -> Result<Self> {
        Ok(Self::new(Connection::global()?.clone()))
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    fn table<M: Model>(&self) -> String {
        self.connection.table_name(M::schema().table())
    }

    /// Fetch a single item by its exact primary key.
    ///
    /// The strategy must pin every primary-key attribute with an equality
    /// and nothing more; a residual condition fails with
    /// `ConditionNotAllowed` since GetItem cannot filter.
    pub async fn get_one<M: Model>(&self, strategy: impl Into<Strategy>) -> Result<Option<M>> {
        let schema = M::schema();
        let condition = resolve_one(schema, strategy.into())?;
        let key = exact_key_only(schema, &condition)?;
        self.get_by_key(schema, &key).await
    }

    /// Fetch many items: a batch of exact keys, a key-condition query, or a
    /// filtered scan, depending on what the strategy resolves to.
    pub async fn get_many<M: Model>(
        &self,
        strategy: impl Into<Strategy>,
        options: QueryOptions,
    ) -> Result<Vec<M>> {
        let schema = M::schema();

        match normalize(schema, strategy.into())? {
            Resolved::Many(conditions) => {
                let mut models = Vec::new();
                for condition in conditions {
                    if let Some(limit) = options.limit {
                        if models.len() >= limit {
                            break;
                        }
                    }
                    let key = exact_key_only(schema, &condition)?;
                    if let Some(model) = self.get_by_key(schema, &key).await? {
                        models.push(model);
                    }
                }
                Ok(models)
            }
            Resolved::One(condition) => {
                let parts = split(schema, &condition, KeyConditionMode::Optional)?;
                let rendered = render(schema, &parts)?;

                let items = match rendered.key_expression {
                    Some(key_expression) => {
                        self.query(
                            &self.table::<M>(),
                            key_expression,
                            rendered.filter_expression,
                            &rendered.names,
                            &rendered.values,
                            &options,
                        )
                        .await?
                    }
                    None => {
                        self.scan(
                            &self.table::<M>(),
                            rendered.filter_expression,
                            &rendered.names,
                            &rendered.values,
                            &options,
                        )
                        .await?
                    }
                };

                items
                    .iter()
                    .map(|item| M::from_item(item).map_err(StoreError::Validation))
                    .collect()
            }
        }
    }

    /// Persist one model instance.
    ///
    /// The instance is cleaned against its schema first: defaults applied,
    /// every field validated, empty values dropped.
    pub async fn save_one<M: Model>(&self, model: &M, overwrite: Overwrite) -> Result<()> {
        let schema = M::schema();
        let table = self.table::<M>();
        let item = schema.clean_item(&model.to_item())?;

        let guard = match overwrite {
            Overwrite::Always => None,
            Overwrite::Never => {
                let absent = schema
                    .keys()
                    .primary_keys()
                    .into_iter()
                    .map(|key| Attr::new(key).not_exists());
                Condition::all(absent)
            }
            Overwrite::When(condition) => Some(condition),
        };

        let mut request = self
            .connection
            .client()
            .put_item()
            .table_name(&table)
            .set_item(Some(item_to_attributes(&item)?));

        if let Some(guard) = guard {
            let rendered = render_condition(schema, &guard)?;
            request = request
                .condition_expression(rendered.expression)
                .set_expression_attribute_names(expression_names(&rendered.names))
                .set_expression_attribute_values(expression_values(&rendered.values)?);
        }

        debug!(table = %table, "put item");
        request.send().await.map_err(map_put_item_error)?;
        Ok(())
    }

    /// Persist many instances as independent writes.
    ///
    /// One rejected write never aborts the rest; outcomes come back in
    /// input order.
    pub async fn save_many<M: Model>(&self, models: &[M], overwrite: Overwrite) -> BatchResult<()> {
        let mut outcomes = Vec::with_capacity(models.len());
        for model in models {
            outcomes.push(self.save_one(model, overwrite.clone()).await);
        }
        BatchResult::new(outcomes)
    }

    /// Delete a single item by its exact primary key, returning the deleted
    /// item when it existed.
    ///
    /// A residual condition becomes a delete guard; when it does not hold,
    /// nothing is deleted and `None` is returned.
    pub async fn delete_one<M: Model>(&self, strategy: impl Into<Strategy>) -> Result<Option<M>> {
        let schema = M::schema();
        let condition = resolve_one(schema, strategy.into())?;
        let (key, residual) = exact_key_with_condition(schema, &condition)?;
        self.delete_by_key(schema, &key, residual).await
    }

    /// Delete many items: a batch of exact keys, or everything a condition
    /// matches. Outcomes come back in input order; for the condition form,
    /// in the order the items were fetched.
    pub async fn delete_many<M: Model>(
        &self,
        strategy: impl Into<Strategy>,
    ) -> Result<BatchResult<Option<M>>> {
        let schema = M::schema();

        match normalize(schema, strategy.into())? {
            Resolved::Many(conditions) => {
                let mut outcomes = Vec::with_capacity(conditions.len());
                for condition in conditions {
                    let outcome = match exact_key_with_condition(schema, &condition) {
                        Ok((key, residual)) => self.delete_by_key(schema, &key, residual).await,
                        Err(err) => Err(err.into()),
                    };
                    outcomes.push(outcome);
                }
                Ok(BatchResult::new(outcomes))
            }
            Resolved::One(condition) => {
                let matched: Vec<M> = self
                    .get_many(Strategy::Condition(condition), QueryOptions::default())
                    .await?;

                let mut outcomes = Vec::with_capacity(matched.len());
                for model in matched {
                    let outcome = match schema.key_item(&model.to_item()) {
                        Ok(key) => self.delete_by_key(schema, &key, None).await,
                        Err(err) => Err(err.into()),
                    };
                    outcomes.push(outcome);
                }
                Ok(BatchResult::new(outcomes))
            }
        }
    }

    /// Apply update actions to a single existing item, returning the item
    /// as stored after the update.
    ///
    /// The update only applies to an item that already exists; a residual
    /// condition from the strategy guards it further. When the guard fails
    /// or the item is absent, nothing changes and `None` is returned.
    pub async fn update_one<M: Model>(
        &self,
        strategy: impl Into<Strategy>,
        updates: &[Update],
    ) -> Result<Option<M>> {
        let schema = M::schema();
        let table = self.table::<M>();
        let condition = resolve_one(schema, strategy.into())?;
        let (key, residual) = exact_key_with_condition(schema, &condition)?;

        let rendered_updates = render_updates(schema, updates)?;

        // Updates never create items, so the item's presence is part of
        // the guard alongside any residual condition.
        let exists = Attr::new(schema.keys().hash_key()).exists();
        let guard = match residual {
            Some(residual) => exists.and(residual),
            None => exists,
        };
        let rendered_guard = render_condition(schema, &guard)?;

        // The #u/:u and #n/:v prefixes keep these maps disjoint.
        let mut names = rendered_updates.names;
        names.extend(rendered_guard.names);
        let mut values = rendered_updates.values;
        values.extend(rendered_guard.values);

        let request = self
            .connection
            .client()
            .update_item()
            .table_name(&table)
            .set_key(Some(item_to_attributes(&key)?))
            .update_expression(rendered_updates.expression)
            .condition_expression(rendered_guard.expression)
            .set_expression_attribute_names(expression_names(&names))
            .set_expression_attribute_values(expression_values(&values)?)
            .return_values(ReturnValue::AllNew);

        debug!(table = %table, "update item");
        let output = match request.send().await {
            Ok(output) => output,
            Err(err) => match map_update_item_error(err) {
                StoreError::ConditionFailed => return Ok(None),
                other => return Err(other),
            },
        };

        match output.attributes() {
            Some(attributes) => {
                let item = attributes_to_item(attributes)?;
                Ok(Some(M::from_item(&item)?))
            }
            None => Ok(None),
        }
    }

    async fn get_by_key<M: Model>(&self, schema: &Schema, key: &Item) -> Result<Option<M>> {
        let table = self.connection.table_name(schema.table());

        debug!(table = %table, "get item");
        let output = self
            .connection
            .client()
            .get_item()
            .table_name(&table)
            .set_key(Some(item_to_attributes(key)?))
            .send()
            .await
            .map_err(map_get_item_error)?;

        match output.item() {
            Some(attributes) => {
                let item = attributes_to_item(attributes)?;
                Ok(Some(M::from_item(&item)?))
            }
            None => Ok(None),
        }
    }

    async fn delete_by_key<M: Model>(
        &self,
        schema: &Schema,
        key: &Item,
        guard: Option<Condition>,
    ) -> Result<Option<M>> {
        let table = self.connection.table_name(schema.table());

        let mut request = self
            .connection
            .client()
            .delete_item()
            .table_name(&table)
            .set_key(Some(item_to_attributes(key)?))
            .return_values(ReturnValue::AllOld);

        if let Some(guard) = guard {
            let rendered = render_condition(schema, &guard)?;
            request = request
                .condition_expression(rendered.expression)
                .set_expression_attribute_names(expression_names(&rendered.names))
                .set_expression_attribute_values(expression_values(&rendered.values)?);
        }

        debug!(table = %table, "delete item");
        let output = match request.send().await {
            Ok(output) => output,
            Err(err) => match map_delete_item_error(err) {
                StoreError::ConditionFailed => return Ok(None),
                other => return Err(other),
            },
        };

        match output.attributes() {
            Some(attributes) => {
                let item = attributes_to_item(attributes)?;
                Ok(Some(M::from_item(&item)?))
            }
            None => Ok(None),
        }
    }

    async fn query(
        &self,
        table: &str,
        key_expression: String,
        filter_expression: Option<String>,
        names: &BTreeMap<String, String>,
        values: &BTreeMap<String, Value>,
        options: &QueryOptions,
    ) -> Result<Vec<Item>> {
        let mut items = Vec::new();
        let mut start_key: Option<HashMap<String, AttributeValue>> = None;

        debug!(table = %table, descending = options.descending, "query");
        loop {
            let output = self
                .connection
                .client()
                .query()
                .table_name(table)
                .key_condition_expression(key_expression.clone())
                .set_filter_expression(filter_expression.clone())
                .set_expression_attribute_names(expression_names(names))
                .set_expression_attribute_values(expression_values(values)?)
                .scan_index_forward(!options.descending)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(map_query_error)?;

            for attributes in output.items() {
                items.push(attributes_to_item(attributes)?);
                if let Some(limit) = options.limit {
                    if items.len() >= limit {
                        return Ok(items);
                    }
                }
            }

            match output.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => return Ok(items),
            }
        }
    }

    async fn scan(
        &self,
        table: &str,
        filter_expression: Option<String>,
        names: &BTreeMap<String, String>,
        values: &BTreeMap<String, Value>,
        options: &QueryOptions,
    ) -> Result<Vec<Item>> {
        let mut items = Vec::new();
        let mut start_key: Option<HashMap<String, AttributeValue>> = None;

        debug!(table = %table, "scan");
        loop {
            let output = self
                .connection
                .client()
                .scan()
                .table_name(table)
                .set_filter_expression(filter_expression.clone())
                .set_expression_attribute_names(expression_names(names))
                .set_expression_attribute_values(expression_values(values)?)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(map_scan_error)?;

            for attributes in output.items() {
                items.push(attributes_to_item(attributes)?);
                if let Some(limit) = options.limit {
                    if items.len() >= limit {
                        return Ok(items);
                    }
                }
            }

            match output.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => return Ok(items),
            }
        }
    }
}

fn resolve_one(schema: &Schema, strategy: Strategy) -> Result<Condition> {
    match normalize(schema, strategy)? {
        Resolved::One(condition) => Ok(condition),
        Resolved::Many(_) => Err(ValidationError::InvalidStrategy(
            "a batch strategy is not valid for single-item operations".to_string(),
        )
        .into()),
    }
}

fn exact_key_only(schema: &Schema, condition: &Condition) -> Result<Item> {
    let (key, residual) = exact_key_with_condition(schema, condition)?;
    if residual.is_some() {
        return Err(ValidationError::ConditionNotAllowed.into());
    }
    Ok(key)
}

fn expression_names(names: &BTreeMap<String, String>) -> Option<HashMap<String, String>> {
    if names.is_empty() {
        return None;
    }
    Some(
        names
            .iter()
            .map(|(placeholder, attr)| (placeholder.clone(), attr.clone()))
            .collect(),
    )
}

fn expression_values(
    values: &BTreeMap<String, Value>,
) -> Result<Option<HashMap<String, AttributeValue>>> {
    if values.is_empty() {
        return Ok(None);
    }
    let mut attributes = HashMap::with_capacity(values.len());
    for (placeholder, value) in values {
        attributes.insert(
            placeholder.clone(),
            crate::convert::value_to_attribute(value)?,
        );
    }
    Ok(Some(attributes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expression_maps_are_omitted_when_empty() {
        assert_eq!(expression_names(&BTreeMap::new()), None);
        assert!(expression_values(&BTreeMap::new()).unwrap().is_none());
    }

    #[test]
    fn test_expression_values_convert_literals() {
        let mut values = BTreeMap::new();
        values.insert(":v0".to_string(), Value::from(1990i64));

        let attributes = expression_values(&values).unwrap().unwrap();
        assert_eq!(
            attributes.get(":v0"),
            Some(&AttributeValue::N("1990".to_string()))
        );
    }
}
