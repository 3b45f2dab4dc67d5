use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use crate::{
    engine::GraphQLEngine,
    execution::error::FieldError,
    input::ExecutionInput,
    response::value::Value,
    schema::{
        resolver::{async_resolver_fn, resolver_fn, Resolver},
        Schema,
    },
    tests::{data_json, run},
};

fn delayed(
    value: &'static str,
    delay_ms: u64,
    completed: Arc<Mutex<Vec<&'static str>>>,
) -> Arc<dyn Resolver> {
    async_resolver_fn(move |_| {
        let completed = completed.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            completed.lock().unwrap().push(value);
            Ok(Value::from(value))
        }
    })
}

#[tokio::test]
async fn keys_follow_selection_order_not_completion_order() {
    let completed = Arc::new(Mutex::new(Vec::new()));
    let schema = Schema::builder("type Query { slow: String fast: String medium: String }")
        .unwrap()
        .resolver("Query", "slow", delayed("slow", 60, completed.clone()))
        .unwrap()
        .resolver("Query", "fast", delayed("fast", 0, completed.clone()))
        .unwrap()
        .resolver("Query", "medium", delayed("medium", 20, completed.clone()))
        .unwrap()
        .build();
    let engine = GraphQLEngine::builder(schema).build();

    let result = run(&engine, "{ slow fast medium again: fast }").await;

    assert!(result.errors.is_empty());
    assert_eq!(
        data_json(&result),
        r#"{"slow":"slow","fast":"fast","medium":"medium","again":"fast"}"#
    );
    assert_eq!(completed.lock().unwrap().last(), Some(&"slow"));
}

#[tokio::test]
async fn merged_fields_and_fragments_keep_first_occurrence_order() {
    let schema = Schema::builder("type Query { user: User } type User { id: ID name: String age: Int }")
        .unwrap()
        .resolver(
            "Query",
            "user",
            resolver_fn(|_| {
                Ok(Value::object([
                    ("id", Value::from("1")),
                    ("name", Value::from("Ada")),
                    ("age", Value::from(36)),
                ]))
            }),
        )
        .unwrap()
        .build();
    let engine = GraphQLEngine::builder(schema).build();

    let result = run(
        &engine,
        "{ user { name ...Details ... on User { name id } } } fragment Details on User { age id }",
    )
    .await;

    assert!(result.errors.is_empty());
    assert_eq!(data_json(&result), r#"{"user":{"name":"Ada","age":36,"id":"1"}}"#);
}

#[tokio::test]
async fn skip_and_include_use_variables() {
    let schema = Schema::builder("type Query { a: String b: String }")
        .unwrap()
        .build();
    let engine = GraphQLEngine::builder(schema)
        .root_value(Value::object([("a", Value::from("A")), ("b", Value::from("B"))]))
        .build();

    let result = engine
        .execute(
            ExecutionInput::new("query ($skip: Boolean!) { a @skip(if: $skip) b @include(if: false) }")
                .variable("skip", false),
        )
        .await;

    assert!(result.errors.is_empty());
    assert_eq!(data_json(&result), r#"{"a":"A"}"#);
}

#[tokio::test]
async fn mutation_root_fields_run_one_after_another() {
    let events = Arc::new(Mutex::new(Vec::<String>::new()));
    let step = |name: &'static str, events: Arc<Mutex<Vec<String>>>| {
        async_resolver_fn(move |_| {
            let events = events.clone();
            async move {
                events.lock().unwrap().push(format!("{name}:start"));
                tokio::time::sleep(Duration::from_millis(if name == "first" { 40 } else { 0 })).await;
                events.lock().unwrap().push(format!("{name}:end"));
                Ok(Value::object([("name", Value::from(name))]))
            }
        })
    };
    let label_events = events.clone();
    let schema = Schema::builder(
        "type Query { noop: String } type Mutation { first: Outcome second: Outcome } type Outcome { label: String }",
    )
    .unwrap()
    .resolver("Mutation", "first", step("first", events.clone()))
    .unwrap()
    .resolver("Mutation", "second", step("second", events.clone()))
    .unwrap()
    .resolver(
        "Outcome",
        "label",
        async_resolver_fn(move |ctx| {
            let events = label_events.clone();
            let name = ctx
                .source()
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                events.lock().unwrap().push(format!("{name}.label"));
                Ok(Value::from(name))
            }
        }),
    )
    .unwrap()
    .build();
    let engine = GraphQLEngine::builder(schema).build();

    let result = run(&engine, "mutation { second { label } first { label } }").await;

    assert!(result.errors.is_empty());
    assert_eq!(
        data_json(&result),
        r#"{"second":{"label":"second"},"first":{"label":"first"}}"#
    );
    assert_eq!(
        *events.lock().unwrap(),
        vec![
            "second:start",
            "second:end",
            "second.label",
            "first:start",
            "first:end",
            "first.label",
        ]
    );
}

fn failing_then_recording(sdl: &str, events: Arc<Mutex<Vec<String>>>) -> GraphQLEngine {
    let first_events = events.clone();
    let schema = Schema::builder(sdl)
        .unwrap()
        .resolver(
            "Mutation",
            "first",
            async_resolver_fn(move |_| {
                let events = first_events.clone();
                async move {
                    events.lock().unwrap().push("first:start".to_string());
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    events.lock().unwrap().push("first:failed".to_string());
                    Err(FieldError::new("first failed"))
                }
            }),
        )
        .unwrap()
        .resolver(
            "Mutation",
            "second",
            resolver_fn(move |_| {
                events.lock().unwrap().push("second:start".to_string());
                Ok(Value::from("done"))
            }),
        )
        .unwrap()
        .build();
    GraphQLEngine::builder(schema).build()
}

#[tokio::test]
async fn mutation_continues_after_a_failed_nullable_field() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let engine = failing_then_recording(
        "type Query { noop: String } type Mutation { first: String second: String }",
        events.clone(),
    );

    let result = run(&engine, "mutation { first second }").await;

    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].message.contains("first failed"));
    assert_eq!(data_json(&result), r#"{"first":null,"second":"done"}"#);
    assert_eq!(
        *events.lock().unwrap(),
        vec!["first:start", "first:failed", "second:start"]
    );
}

#[tokio::test]
async fn mutation_stops_when_a_null_reaches_the_root() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let engine = failing_then_recording(
        "type Query { noop: String } type Mutation { first: String! second: String }",
        events.clone(),
    );

    let result = run(&engine, "mutation { first second }").await;

    assert_eq!(result.errors.len(), 1);
    assert_eq!(data_json(&result), "null");
    assert_eq!(*events.lock().unwrap(), vec!["first:start", "first:failed"]);
}

#[tokio::test]
async fn abstract_types_resolve_from_typename() {
    let schema = Schema::builder(
        "type Query { search: [Result] } union Result = Book | Movie type Book { title: String } type Movie { title: String length: Int }",
    )
    .unwrap()
    .resolver(
        "Query",
        "search",
        resolver_fn(|_| {
            Ok(Value::Array(vec![
                Value::object([("__typename", Value::from("Book")), ("title", Value::from("Dune"))]),
                Value::object([
                    ("__typename", Value::from("Movie")),
                    ("title", Value::from("Alien")),
                    ("length", Value::from(117)),
                ]),
            ]))
        }),
    )
    .unwrap()
    .build();
    let engine = GraphQLEngine::builder(schema).build();

    let result = run(
        &engine,
        "{ search { __typename ... on Book { title } ... on Movie { title length } } }",
    )
    .await;

    assert!(result.errors.is_empty());
    assert_eq!(
        data_json(&result),
        r#"{"search":[{"__typename":"Book","title":"Dune"},{"__typename":"Movie","title":"Alien","length":117}]}"#
    );
}
