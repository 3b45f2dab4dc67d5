use std::{collections::HashMap, hint::black_box, sync::Arc};

use criterion::{criterion_group, criterion_main, Criterion};
use graphql_execution_engine::{
    batch_loader_fn,
    cache::document::MokaDocumentCache,
    schema::resolver::{async_resolver_fn, resolver_fn},
    ExecutionInput, GraphQLEngine, Schema, Value,
};
use tokio::runtime::Runtime;

const SCHEMA: &str = r#"
type Query { products(first: Int = 100): [Product!]! }
type Product { id: ID! title: String! price: Float reviews: [Review!]! }
type Review { stars: Int! author: String }
"#;

const QUERY: &str = "{ products { id title price reviews { stars author } } }";

fn product(index: i64) -> Value {
    Value::object([
        ("id", Value::from(index.to_string())),
        ("title", Value::from(format!("Product {index}"))),
        ("price", Value::from(index as f64 * 1.5)),
        (
            "reviews",
            Value::Array(
                (0..3)
                    .map(|stars| {
                        Value::object([
                            ("stars", Value::from(stars)),
                            ("author", Value::from("anonymous")),
                        ])
                    })
                    .collect(),
            ),
        ),
    ])
}

fn engine(batched: bool) -> GraphQLEngine {
    let mut builder = Schema::builder(SCHEMA)
        .expect("valid schema")
        .resolver(
            "Query",
            "products",
            resolver_fn(|ctx| {
                let first = ctx.argument("first").and_then(Value::as_i64).unwrap_or(100);
                Ok(Value::Array((0..first).map(product).collect()))
            }),
        )
        .expect("known field");
    if batched {
        builder = builder
            .resolver(
                "Product",
                "title",
                async_resolver_fn(|ctx| {
                    let id = ctx.source().get("id").and_then(Value::as_str).unwrap_or_default();
                    let handle = ctx.load("titles", id);
                    async move { Ok(handle.await?.into_value()) }
                }),
            )
            .expect("known field");
    }

    GraphQLEngine::builder(builder.build())
        .document_cache(Arc::new(MokaDocumentCache::new(100, None)))
        .batch_loader(
            "titles",
            batch_loader_fn(|keys| async move {
                Ok(keys
                    .into_iter()
                    .map(|key| {
                        let title = Value::from(format!("Product {key}"));
                        (key, Ok(title))
                    })
                    .collect::<HashMap<_, _>>())
            }),
        )
        .build()
}

fn execute_plain_resolvers(c: &mut Criterion) {
    let rt = Runtime::new().expect("Failed to create Tokio runtime");
    let engine = engine(false);
    c.bench_function("execute_plain_resolvers", |b| {
        b.to_async(&rt).iter(|| async {
            let engine = black_box(&engine);
            let result = engine.execute(ExecutionInput::new(QUERY)).await;
            black_box(result)
        });
    });
}

fn execute_batched_resolvers(c: &mut Criterion) {
    let rt = Runtime::new().expect("Failed to create Tokio runtime");
    let engine = engine(true);
    c.bench_function("execute_batched_resolvers", |b| {
        b.to_async(&rt).iter(|| async {
            let engine = black_box(&engine);
            let result = engine.execute(ExecutionInput::new(QUERY)).await;
            black_box(result)
        });
    });
}

fn serialize_result(c: &mut Criterion) {
    let rt = Runtime::new().expect("Failed to create Tokio runtime");
    let result = rt.block_on(engine(false).execute(ExecutionInput::new(QUERY)));
    c.bench_function("serialize_result", |b| {
        b.iter(|| {
            let result = black_box(&result);
            black_box(sonic_rs::to_string(result).expect("serializable result"))
        });
    });
}

criterion_group!(
    benches,
    execute_plain_resolvers,
    execute_batched_resolvers,
    serialize_result
);
criterion_main!(benches);
