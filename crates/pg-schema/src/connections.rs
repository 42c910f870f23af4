use crate::executor::ConnectionPage;
use crate::naming;
use async_graphql::dynamic::{Field, FieldFuture, FieldValue, Object, TypeRef};
use pg_sql::Row;

/// A single edge's `(node, cursor)` pair, carried through the resolver chain
/// as the parent value of the `Edge` type's fields.
#[derive(Clone)]
pub struct Edge {
    pub node: Row,
    pub cursor: String,
}

/// Builds the `<Table>Edge` object type: `node` (the table's object type)
/// and an opaque `cursor` string (§4.6).
pub fn build_edge_type(table: &str) -> Object {
    let node_type = naming::object_type_name(table);
    Object::new(naming::edge_type_name(table))
        .field(Field::new("node", TypeRef::named(node_type), |ctx| {
            FieldFuture::new(async move {
                let edge = ctx.parent_value.try_downcast_ref::<Edge>()?;
                Ok(Some(FieldValue::owned_any(edge.node.clone())))
            })
        }))
        .field(Field::new("cursor", TypeRef::named_nn(TypeRef::STRING), |ctx| {
            FieldFuture::new(async move {
                let edge = ctx.parent_value.try_downcast_ref::<Edge>()?;
                Ok(Some(FieldValue::value(edge.cursor.clone())))
            })
        }))
}

/// Builds the shared `PageInfo` object type (one instance reused by every
/// connection type, since its shape never varies per table).
pub fn build_page_info_type() -> Object {
    Object::new("PageInfo")
        .field(Field::new("hasNextPage", TypeRef::named_nn(TypeRef::BOOLEAN), |ctx| {
            FieldFuture::new(async move {
                let page = ctx.parent_value.try_downcast_ref::<ConnectionPage>()?;
                Ok(Some(FieldValue::value(page.has_next_page)))
            })
        }))
        .field(Field::new("hasPreviousPage", TypeRef::named_nn(TypeRef::BOOLEAN), |ctx| {
            FieldFuture::new(async move {
                let page = ctx.parent_value.try_downcast_ref::<ConnectionPage>()?;
                Ok(Some(FieldValue::value(page.has_previous_page)))
            })
        }))
        .field(Field::new("startCursor", TypeRef::named(TypeRef::STRING), |ctx| {
            FieldFuture::new(async move {
                let page = ctx.parent_value.try_downcast_ref::<ConnectionPage>()?;
                Ok(page.edges.first().map(|(_, cursor)| FieldValue::value(cursor.clone())))
            })
        }))
        .field(Field::new("endCursor", TypeRef::named(TypeRef::STRING), |ctx| {
            FieldFuture::new(async move {
                let page = ctx.parent_value.try_downcast_ref::<ConnectionPage>()?;
                Ok(page.edges.last().map(|(_, cursor)| FieldValue::value(cursor.clone())))
            })
        }))
}

/// Builds the `<Table>Connection` type: `edges`, `pageInfo`, and `totalCount`
/// (§4.6).
pub fn build_connection_type(table: &str) -> Object {
    let edge_type = naming::edge_type_name(table);
    Object::new(naming::connection_type_name(table))
        .field(Field::new(
            "edges",
            TypeRef::List(Box::new(TypeRef::named(edge_type))),
            |ctx| {
                FieldFuture::new(async move {
                    let page = ctx.parent_value.try_downcast_ref::<ConnectionPage>()?;
                    let edges = page
                        .edges
                        .iter()
                        .map(|(node, cursor)| {
                            FieldValue::owned_any(Edge { node: node.clone(), cursor: cursor.clone() })
                        });
                    Ok(Some(FieldValue::list(edges)))
                })
            },
        ))
        .field(Field::new("pageInfo", TypeRef::named_nn("PageInfo"), |ctx| {
            FieldFuture::new(async move {
                let page = ctx.parent_value.try_downcast_ref::<ConnectionPage>()?.clone();
                Ok(Some(FieldValue::owned_any(page)))
            })
        }))
        .field(Field::new("totalCount", TypeRef::named_nn(TypeRef::INT), |ctx| {
            FieldFuture::new(async move {
                let page = ctx.parent_value.try_downcast_ref::<ConnectionPage>()?;
                Ok(Some(FieldValue::value(page.total_count as i32)))
            })
        }))
}
