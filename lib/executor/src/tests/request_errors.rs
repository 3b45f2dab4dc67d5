use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use indexmap::IndexMap;

use crate::{
    cache::{
        document::ParsedDocument, normalized::MokaNormalizedDocumentCache,
        persisted::PersistedQueryCache,
    },
    engine::GraphQLEngine,
    input::ExecutionInput,
    instrumentation::{
        context::when_completed, parameters::ExecutionParameters, ContextResult, Instrumentation,
        InstrumentationState,
    },
    response::value::Value,
    schema::{resolver::resolver_fn, Schema},
    tests::{data_json, run},
};

fn engine() -> GraphQLEngine {
    let schema = Schema::builder("type Query { greet(name: String! = \"you\"): String }")
        .unwrap()
        .resolver(
            "Query",
            "greet",
            resolver_fn(|ctx| {
                let name = ctx.argument("name").and_then(Value::as_str).unwrap_or_default();
                Ok(Value::from(format!("hi {name}")))
            }),
        )
        .unwrap()
        .build();
    GraphQLEngine::builder(schema).build()
}

fn codes(result: &crate::response::execution_result::ExecutionResult) -> Vec<String> {
    result
        .errors
        .iter()
        .filter_map(|error| error.extensions.as_ref()?.get("code")?.as_str().map(str::to_string))
        .collect()
}

#[tokio::test]
async fn parse_errors_have_no_data() {
    let result = run(&engine(), "{ greet ").await;

    assert!(result.data.is_none());
    assert_eq!(codes(&result), vec!["GRAPHQL_PARSE_FAILED"]);
}

#[tokio::test]
async fn out_of_range_int_literals_fail_to_parse() {
    let result = run(&engine(), "{ greet(name: 99999999999999999999) }").await;

    assert!(result.data.is_none());
    assert_eq!(codes(&result), vec!["GRAPHQL_PARSE_FAILED"]);
}

#[tokio::test]
async fn validation_errors_have_no_data() {
    let result = run(&engine(), "{ greet unknown }").await;

    assert!(result.data.is_none());
    insta::assert_snapshot!(sonic_rs::to_string(&result).unwrap(), @r#"{"errors":[{"message":"Cannot query field 'unknown' on type 'Query'.","locations":[{"line":1,"column":9}]}]}"#);
}

#[tokio::test]
async fn operation_selection_errors() {
    let engine = engine();

    let ambiguous = run(&engine, "query A { greet } query B { greet }").await;
    assert_eq!(
        ambiguous.errors[0].message,
        "Must provide operation name if query contains multiple operations."
    );

    let unknown = engine
        .execute(ExecutionInput::new("query A { greet }").operation_name("C"))
        .await;
    assert_eq!(unknown.errors[0].message, "Unknown operation named 'C'.");
    assert!(unknown.data.is_none());

    let named = engine
        .execute(ExecutionInput::new("query A { greet } query B { b: greet(name: \"B\") }").operation_name("B"))
        .await;
    assert_eq!(data_json(&named), r#"{"b":"hi B"}"#);
}

#[tokio::test]
async fn arguments_use_variables_and_defaults() {
    let engine = engine();

    let result = engine
        .execute(
            ExecutionInput::new("query ($who: String!) { a: greet(name: $who) b: greet }")
                .variable("who", "Ada"),
        )
        .await;

    assert!(result.errors.is_empty());
    assert_eq!(data_json(&result), r#"{"a":"hi Ada","b":"hi you"}"#);
}

#[tokio::test]
async fn missing_required_variable_fails_the_request() {
    let result = run(&engine(), "query ($who: String!) { greet(name: $who) }").await;

    assert!(result.data.is_none());
    assert_eq!(codes(&result), vec!["BAD_USER_INPUT"]);
    assert_eq!(
        result.errors[0].message,
        "Variable '$who' of required type 'String!' was not provided."
    );
}

fn persisted_extension(hash: &str) -> IndexMap<String, Value> {
    IndexMap::from([(
        "persistedQuery".to_string(),
        Value::object([("version", Value::from(1)), ("sha256Hash", Value::from(hash))]),
    )])
}

#[tokio::test]
async fn persisted_queries_register_then_serve_by_hash() {
    let schema = Schema::builder("type Query { greet: String }").unwrap().build();
    let engine = GraphQLEngine::builder(schema)
        .root_value(Value::object([("greet", Value::from("hello"))]))
        .persisted_queries(PersistedQueryCache::new(10))
        .build();

    let miss = engine
        .execute(ExecutionInput::default().extensions(persisted_extension("abc")))
        .await;
    assert_eq!(codes(&miss), vec!["PERSISTED_QUERY_NOT_FOUND"]);

    let register = engine
        .execute(ExecutionInput::new("{ greet }").extensions(persisted_extension("abc")))
        .await;
    assert_eq!(data_json(&register), r#"{"greet":"hello"}"#);

    let hit = engine
        .execute(ExecutionInput::default().extensions(persisted_extension("abc")))
        .await;
    assert_eq!(data_json(&hit), r#"{"greet":"hello"}"#);
}

struct ParseCounter {
    parses: Arc<AtomicUsize>,
}

impl Instrumentation for ParseCounter {
    fn begin_parse(
        &self,
        _params: &ExecutionParameters<'_>,
        _state: &InstrumentationState,
    ) -> ContextResult<ParsedDocument> {
        self.parses.fetch_add(1, Ordering::SeqCst);
        when_completed(|_| {})
    }
}

#[tokio::test]
async fn normalized_cache_skips_parse_and_validation_on_hit() {
    let parses = Arc::new(AtomicUsize::new(0));
    let schema = Schema::builder("type Query { greet: String }").unwrap().build();
    let engine = GraphQLEngine::builder(schema)
        .root_value(Value::object([("greet", Value::from("hello"))]))
        .normalized_document_cache(Arc::new(MokaNormalizedDocumentCache::new(10, None)))
        .instrumentation(Arc::new(ParseCounter {
            parses: parses.clone(),
        }))
        .build();

    for _ in 0..3 {
        let result = run(&engine, "{ greet }").await;
        assert_eq!(data_json(&result), r#"{"greet":"hello"}"#);
    }

    assert_eq!(parses.load(Ordering::SeqCst), 1);
}
