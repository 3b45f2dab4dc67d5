use crate::{
    engine::GraphQLEngine, input::ExecutionInput, response::execution_result::ExecutionResult,
};

mod cancellation;
mod execution_order;
mod instrumentation;
mod request_errors;

pub(crate) async fn run(engine: &GraphQLEngine, query: &str) -> ExecutionResult {
    engine.execute(ExecutionInput::new(query)).await
}

pub(crate) fn data_json(result: &ExecutionResult) -> String {
    sonic_rs::to_string(&result.data).unwrap()
}

pub(crate) fn error_paths(result: &ExecutionResult) -> Vec<String> {
    result
        .errors
        .iter()
        .map(|error| sonic_rs::to_string(&error.path).unwrap())
        .collect()
}
