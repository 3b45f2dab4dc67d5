use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio_util::sync::CancellationToken;

use crate::{
    engine::GraphQLEngine,
    input::ExecutionInput,
    response::value::Value,
    schema::{resolver::async_resolver_fn, Schema},
    tests::data_json,
};

fn slow_engine(observed_cancel: Arc<AtomicBool>, timeout: Option<Duration>) -> GraphQLEngine {
    let schema = Schema::builder("type Query { fast: String slow: String }")
        .unwrap()
        .resolver(
            "Query",
            "slow",
            async_resolver_fn(move |ctx| {
                let token = ctx.cancellation().clone();
                let observed = observed_cancel.clone();
                async move {
                    tokio::spawn(async move {
                        token.cancelled().await;
                        observed.store(true, Ordering::SeqCst);
                    });
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(Value::from("late"))
                }
            }),
        )
        .unwrap()
        .build();
    let builder = GraphQLEngine::builder(schema).root_value(Value::object([("fast", Value::from("quick"))]));
    match timeout {
        Some(timeout) => builder.timeout(timeout).build(),
        None => builder.build(),
    }
}

#[tokio::test]
async fn timeout_yields_null_data_and_one_error() {
    let observed = Arc::new(AtomicBool::new(false));
    let engine = slow_engine(observed.clone(), Some(Duration::from_millis(20)));

    let result = engine.execute(ExecutionInput::new("{ fast slow }")).await;

    assert_eq!(data_json(&result), "null");
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].message, "Execution timed out after 20ms");
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(observed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn input_timeout_overrides_engine_timeout() {
    let engine = slow_engine(Arc::default(), Some(Duration::from_secs(60)));

    let result = engine
        .execute(ExecutionInput::new("{ slow }").timeout(Duration::from_millis(10)))
        .await;

    assert_eq!(result.errors[0].message, "Execution timed out after 10ms");
}

#[tokio::test]
async fn cancellation_token_stops_execution() {
    let engine = slow_engine(Arc::default(), None);
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let result = engine
        .execute(ExecutionInput::new("{ fast slow }").cancellation(token))
        .await;

    assert_eq!(data_json(&result), "null");
    insta::assert_snapshot!(sonic_rs::to_string(&result.errors).unwrap(), @r#"[{"message":"Execution was cancelled","extensions":{"code":"EXECUTION_CANCELLED"}}]"#);
}
