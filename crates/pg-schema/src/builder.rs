use crate::cdc_source::{CdcSource, ChangeEvent};
use crate::connections::{build_connection_type, build_edge_type, build_page_info_type};
use crate::executor::QueryExecutor;
use crate::filter::{build_filter_input, filter_input_name};
use crate::mutations::{build_create_input, build_create_with_relationships_input, build_delete_input, build_update_input};
use crate::naming;
use crate::objects::build_object_type;
use crate::orderby::{build_order_by_input, build_sort_direction_enum};
use crate::where_input::build_where_input;
use async_graphql::dynamic::{
    Enum, EnumItem, Field, FieldFuture, FieldValue, InputValue, Object, Schema, Subscription,
    SubscriptionField, SubscriptionFieldFuture, TypeRef,
};
use async_graphql::{Error, Value};
use itertools::Itertools;
use pg_catalog::CatalogSnapshot;
use pg_types::{FieldType, ScalarCategory};
use std::sync::Arc;
use std::time::Duration;

const SCALAR_CATEGORIES: &[ScalarCategory] = &[
    ScalarCategory::Numeric,
    ScalarCategory::Bool,
    ScalarCategory::Text,
    ScalarCategory::Uuid,
    ScalarCategory::DateTime,
    ScalarCategory::Interval,
    ScalarCategory::Network,
    ScalarCategory::Json,
    ScalarCategory::Xml,
    ScalarCategory::Binary,
    ScalarCategory::Array,
];

fn representative_type(category: ScalarCategory) -> TypeRef {
    match category {
        ScalarCategory::Numeric => TypeRef::named(TypeRef::FLOAT),
        ScalarCategory::Bool => TypeRef::named(TypeRef::BOOLEAN),
        ScalarCategory::Json => TypeRef::named("JSON"),
        ScalarCategory::Array => TypeRef::named(TypeRef::STRING),
        _ => TypeRef::named(TypeRef::STRING),
    }
}

/// Builds the complete GraphQL schema projected from `snapshot`, wired to
/// resolve every field through `executor` and every subscription through
/// `cdc` (§4.6, §4.8).
pub fn build_schema(
    snapshot: &CatalogSnapshot,
    executor: Arc<dyn QueryExecutor>,
    cdc: Arc<dyn CdcSource>,
) -> Result<Schema, async_graphql::dynamic::SchemaError> {
    let mut schema_builder = Schema::build("Query", Some("Mutation"), Some("Subscription"));

    schema_builder = schema_builder.register(build_sort_direction_enum());
    schema_builder = schema_builder.register(build_page_info_type());

    for category in SCALAR_CATEGORIES {
        let filter = build_filter_input(filter_input_name(*category), *category, representative_type(*category));
        schema_builder = schema_builder.register(filter);
    }

    for enum_type in snapshot.enums.values() {
        let mut gql_enum = Enum::new(naming::enum_type_name(&enum_type.name));
        for value in &enum_type.values {
            gql_enum = gql_enum.item(EnumItem::new(value.clone()));
        }
        schema_builder = schema_builder.register(gql_enum);
        let enum_filter = build_filter_input(
            &format!("{}Filter", naming::pascal_case(&enum_type.name)),
            ScalarCategory::Enum,
            TypeRef::named(naming::enum_type_name(&enum_type.name)),
        );
        schema_builder = schema_builder.register(enum_filter);
    }

    let mut query = Object::new("Query");
    let mut mutation = Object::new("Mutation");
    let mut subscription = Subscription::new("Subscription");

    for table in snapshot.tables.values() {
        schema_builder = schema_builder.register(build_object_type(table, snapshot, executor.clone()));
        schema_builder = schema_builder.register(build_edge_type(&table.name));
        schema_builder = schema_builder.register(build_connection_type(&table.name));
        schema_builder = schema_builder.register(build_where_input(table));
        schema_builder = schema_builder.register(build_order_by_input(table));

        let object_type_name = naming::object_type_name(&table.name);
        let where_input_name = naming::where_input_name(&table.name);

        {
            let exec = executor.clone();
            let table_name = table.name.clone();
            let where_arg = where_input_name.clone();
            query = query.field(
                Field::new(
                    naming::query_field_name(&table.name),
                    TypeRef::List(Box::new(TypeRef::named(object_type_name.clone()))),
                    move |ctx| {
                        let exec = exec.clone();
                        let table_name = table_name.clone();
                        FieldFuture::new(async move {
                            let args = args_to_json(&ctx);
                            let rows = exec.list(&table_name, args).await.map_err(|e| Error::new(e.0))?;
                            Ok(Some(FieldValue::list(rows.into_iter().map(FieldValue::owned_any))))
                        })
                    },
                )
                .argument(InputValue::new("where", TypeRef::named(where_arg.clone())))
                .argument(InputValue::new("or", TypeRef::List(Box::new(TypeRef::named(where_arg)))))
                .argument(InputValue::new("orderBy", TypeRef::named(naming::order_by_input_name(&table.name))))
                .argument(InputValue::new("limit", TypeRef::named(TypeRef::INT)))
                .argument(InputValue::new("offset", TypeRef::named(TypeRef::INT))),
            );
        }

        {
            let exec = executor.clone();
            let table_name = table.name.clone();
            let connection_type = naming::connection_type_name(&table.name);
            let where_arg = where_input_name.clone();
            query = query.field(
                Field::new(
                    naming::connection_field_name(&table.name),
                    TypeRef::named_nn(connection_type),
                    move |ctx| {
                        let exec = exec.clone();
                        let table_name = table_name.clone();
                        FieldFuture::new(async move {
                            let args = args_to_json(&ctx);
                            let page = exec.connection(&table_name, args).await.map_err(|e| Error::new(e.0))?;
                            Ok(Some(FieldValue::owned_any(page)))
                        })
                    },
                )
                .argument(InputValue::new("where", TypeRef::named(where_arg.clone())))
                .argument(InputValue::new("or", TypeRef::List(Box::new(TypeRef::named(where_arg)))))
                .argument(InputValue::new("orderBy", TypeRef::named(naming::order_by_input_name(&table.name))))
                .argument(InputValue::new("first", TypeRef::named(TypeRef::INT)))
                .argument(InputValue::new("after", TypeRef::named(TypeRef::STRING)))
                .argument(InputValue::new("last", TypeRef::named(TypeRef::INT)))
                .argument(InputValue::new("before", TypeRef::named(TypeRef::STRING))),
            );
        }

        if !table.kind.is_view() {
            schema_builder = schema_builder.register(build_create_input(table));
            schema_builder = schema_builder.register(build_update_input(table));
            schema_builder = schema_builder.register(build_delete_input(table));
            let children: Vec<_> = snapshot.referencing(&table.name).into_iter().map(|(t, _)| t).unique_by(|t| t.name.clone()).collect();
            schema_builder = schema_builder.register(build_create_with_relationships_input(table, &children));

            mutation = register_mutations(mutation, table, &object_type_name, executor.clone());
        }

        subscription = register_subscription(subscription, table, &object_type_name, cdc.clone());
    }

    subscription = subscription.field(SubscriptionField::new("health", TypeRef::named_nn(TypeRef::STRING), |_ctx| {
        SubscriptionFieldFuture::new(async move {
            use tokio_stream::StreamExt;
            let stream = tokio_stream::wrappers::IntervalStream::new(tokio::time::interval(Duration::from_secs(30)))
                .map(|_| Ok(Value::from("ok")));
            Ok(stream)
        })
    }));

    schema_builder = schema_builder.register(query).register(mutation).register(subscription);
    schema_builder.finish()
}

fn row_to_json(row: pg_sql::Row) -> serde_json::Value {
    serde_json::Value::Object(row.into_iter().collect())
}

fn args_to_json(ctx: &async_graphql::dynamic::ResolverContext) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for (name, value) in ctx.args.iter() {
        if let Ok(json) = value.as_value().clone().into_json() {
            map.insert(name.to_string(), json);
        }
    }
    serde_json::Value::Object(map)
}

fn register_mutations(mutation: Object, table: &pg_catalog::Table, object_type_name: &str, executor: Arc<dyn QueryExecutor>) -> Object {
    let create_input = naming::create_input_name(&table.name);
    let update_input = naming::update_input_name(&table.name);
    let delete_input = format!("{}DeleteInput", naming::pascal_case(&table.name));
    let create_with_rel_input = naming::create_with_relationships_input_name(&table.name);

    let mutation = {
        let exec = executor.clone();
        let table_name = table.name.clone();
        mutation.field(
            Field::new(naming::create_mutation_name(&table.name), TypeRef::named_nn(object_type_name), move |ctx| {
                let exec = exec.clone();
                let table_name = table_name.clone();
                FieldFuture::new(async move {
                    let input = single_arg_json(&ctx, "input");
                    let row = exec.create(&table_name, input).await.map_err(|e| Error::new(e.0))?;
                    Ok(Some(FieldValue::owned_any(row)))
                })
            })
            .argument(InputValue::new("input", TypeRef::named_nn(create_input))),
        )
    };

    let mutation = {
        let exec = executor.clone();
        let table_name = table.name.clone();
        mutation.field(
            Field::new(
                naming::bulk_create_mutation_name(&table.name),
                TypeRef::List(Box::new(TypeRef::named(object_type_name))),
                move |ctx| {
                    let exec = exec.clone();
                    let table_name = table_name.clone();
                    FieldFuture::new(async move {
                        let inputs = list_arg_json(&ctx, "inputs");
                        let rows = exec.bulk_create(&table_name, inputs).await.map_err(|e| Error::new(e.0))?;
                        Ok(Some(FieldValue::list(rows.into_iter().map(FieldValue::owned_any))))
                    })
                },
            )
            .argument(InputValue::new("inputs", TypeRef::List(Box::new(TypeRef::named_nn(naming::create_input_name(&table.name)))))),
        )
    };

    let mutation = {
        let exec = executor.clone();
        let table_name = table.name.clone();
        mutation.field(
            Field::new(naming::update_mutation_name(&table.name), TypeRef::named_nn(object_type_name), move |ctx| {
                let exec = exec.clone();
                let table_name = table_name.clone();
                FieldFuture::new(async move {
                    let input = single_arg_json(&ctx, "input");
                    let row = exec.update(&table_name, input).await.map_err(|e| Error::new(e.0))?;
                    Ok(Some(FieldValue::owned_any(row)))
                })
            })
            .argument(InputValue::new("input", TypeRef::named_nn(update_input))),
        )
    };

    let mutation = {
        let exec = executor.clone();
        let table_name = table.name.clone();
        mutation.field(
            Field::new(naming::delete_mutation_name(&table.name), TypeRef::named_nn(TypeRef::BOOLEAN), move |ctx| {
                let exec = exec.clone();
                let table_name = table_name.clone();
                FieldFuture::new(async move {
                    let input = single_arg_json(&ctx, "input");
                    let deleted = exec.delete(&table_name, input).await.map_err(|e| Error::new(e.0))?;
                    Ok(Some(FieldValue::value(deleted)))
                })
            })
            .argument(InputValue::new("input", TypeRef::named_nn(delete_input))),
        )
    };

    let mutation = {
        let exec = executor.clone();
        let table_name = table.name.clone();
        mutation.field(
            Field::new(
                naming::create_with_relationships_mutation_name(&table.name),
                TypeRef::named_nn(object_type_name),
                move |ctx| {
                    let exec = exec.clone();
                    let table_name = table_name.clone();
                    FieldFuture::new(async move {
                        let input = single_arg_json(&ctx, "input");
                        let row = exec
                            .create_with_relationships(&table_name, input)
                            .await
                            .map_err(|e| Error::new(e.0))?;
                        Ok(Some(FieldValue::owned_any(row)))
                    })
                },
            )
            .argument(InputValue::new("input", TypeRef::named_nn(create_with_rel_input))),
        )
    };

    mutation
}

/// Streams the after-image of every insert/update and the row of every
/// delete for `table` as they're published by the CDC fan-out registry.
/// A lagged subscriber sees one terminal `Error` event, then the stream ends
/// (§4.8 "slow subscribers may be dropped").
fn register_subscription(subscription: Subscription, table: &pg_catalog::Table, object_type_name: &str, cdc: Arc<dyn CdcSource>) -> Subscription {
    let field_name = naming::subscription_field_name(&table.name);
    let table_name = table.name.clone();
    subscription.field(SubscriptionField::new(field_name, TypeRef::named_nn(object_type_name), move |_ctx| {
        let cdc = cdc.clone();
        let table_name = table_name.clone();
        SubscriptionFieldFuture::new(async move {
            use futures::StreamExt;
            let stream = cdc.subscribe(&table_name).await.map_err(|e| Error::new(e.0))?;
            let mapped = stream.map(|event| match event {
                ChangeEvent::Insert(row) | ChangeEvent::Delete(row) => Value::from_json(row_to_json(row)).map_err(Error::new),
                ChangeEvent::Update { after, .. } => Value::from_json(row_to_json(after)).map_err(Error::new),
                ChangeEvent::Overflow => Err(Error::new("subscription overflow: some changes were not delivered")),
            });
            Ok(mapped)
        })
    }))
}

fn single_arg_json(ctx: &async_graphql::dynamic::ResolverContext, name: &str) -> serde_json::Value {
    ctx.args
        .get(name)
        .and_then(|v| v.as_value().clone().into_json().ok())
        .unwrap_or(serde_json::Value::Null)
}

fn list_arg_json(ctx: &async_graphql::dynamic::ResolverContext, name: &str) -> Vec<serde_json::Value> {
    match single_arg_json(ctx, name) {
        serde_json::Value::Array(values) => values,
        other => vec![other],
    }
}

#[cfg(test)]
mod tests {
    use super::representative_type;
    use async_graphql::dynamic::TypeRef;
    use pg_types::ScalarCategory;

    #[test]
    fn json_category_represents_as_the_json_scalar() {
        assert!(matches!(representative_type(ScalarCategory::Json), TypeRef::Named(_)));
    }
}
