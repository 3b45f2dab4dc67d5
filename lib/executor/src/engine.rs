use std::{future::Future, sync::Arc, time::Duration};

use futures::FutureExt;
use graphql_execution_config::EngineConfig;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, Instrument};

use crate::{
    batching::{
        coordinator::BatchCoordinator,
        dispatch::LevelDispatchStrategy,
        loader::{BatchLoader, BatchLoaderRegistry},
    },
    cache::{
        document::{
            parse_document, DocumentCacheProvider, MokaDocumentCache, NoopDocumentCache,
            ParsedDocument,
        },
        normalized::{NormalizationInput, NormalizedDocumentCacheProvider, NormalizedDocumentEntry},
        persisted::PersistedQueryCache,
    },
    context::ExecutionContext,
    execution::{
        error::ExecutionError,
        null_propagation::ErrorCollector,
        operation::{collect_fragments, select_operation},
        strategy::execute_operation,
    },
    input::ExecutionInput,
    instrumentation::{
        parameters::{ExecuteOperationParameters, ExecutionParameters, ValidationParameters},
        ChainedInstrumentation, Instrumentation, InstrumentationState, NoopInstrumentation,
        PhaseError, PhaseGuard,
    },
    response::{execution_result::ExecutionResult, value::Value},
    schema::{types::TypeRef, Schema},
    validation::{BasicValidator, DocumentValidator},
    variables::{coerce_variable_values, Variables},
};

/// Entry point of the engine: parses, validates and executes requests
/// against one schema.
///
/// Cheap to clone, every clone shares caches and loaders.
#[derive(Clone)]
pub struct GraphQLEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    schema: Schema,
    instrumentation: Arc<dyn Instrumentation>,
    document_cache: Arc<dyn DocumentCacheProvider>,
    normalized_cache: Option<Arc<dyn NormalizedDocumentCacheProvider>>,
    persisted_queries: Option<PersistedQueryCache>,
    validator: Arc<dyn DocumentValidator>,
    batch_loaders: Arc<BatchLoaderRegistry>,
    batching: bool,
    timeout: Option<Duration>,
    root_value: Value,
}

pub struct GraphQLEngineBuilder {
    schema: Schema,
    instrumentations: Vec<Arc<dyn Instrumentation>>,
    document_cache: Option<Arc<dyn DocumentCacheProvider>>,
    normalized_cache: Option<Arc<dyn NormalizedDocumentCacheProvider>>,
    persisted_queries: Option<PersistedQueryCache>,
    validator: Option<Arc<dyn DocumentValidator>>,
    batch_loaders: BatchLoaderRegistry,
    batching: bool,
    timeout: Option<Duration>,
    root_value: Value,
}

impl GraphQLEngineBuilder {
    /// Adds an instrumentation. Several instrumentations are chained in the
    /// order they were added.
    pub fn instrumentation(mut self, instrumentation: Arc<dyn Instrumentation>) -> Self {
        self.instrumentations.push(instrumentation);
        self
    }

    pub fn document_cache(mut self, cache: Arc<dyn DocumentCacheProvider>) -> Self {
        self.document_cache = Some(cache);
        self
    }

    /// Caches parsed and validated documents per query text and operation name.
    pub fn normalized_document_cache(
        mut self,
        cache: Arc<dyn NormalizedDocumentCacheProvider>,
    ) -> Self {
        self.normalized_cache = Some(cache);
        self
    }

    pub fn persisted_queries(mut self, cache: PersistedQueryCache) -> Self {
        self.persisted_queries = Some(cache);
        self
    }

    pub fn validator(mut self, validator: Arc<dyn DocumentValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn batch_loader(mut self, batch_key: impl Into<String>, loader: Arc<dyn BatchLoader>) -> Self {
        self.batch_loaders.register(batch_key, loader);
        self
    }

    /// Dispatch batches per tree level. When disabled, every batch handle
    /// flushes on its own first poll.
    pub fn batching(mut self, enabled: bool) -> Self {
        self.batching = enabled;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Source value handed to the resolvers of root fields.
    pub fn root_value(mut self, root_value: Value) -> Self {
        self.root_value = root_value;
        self
    }

    /// Applies the execution, document cache and persisted query settings.
    pub fn with_config(mut self, config: &EngineConfig) -> Self {
        self.timeout = config.execution.timeout;
        self.batching = config.execution.batching;
        self.document_cache = Some(if config.document_cache.enabled {
            Arc::new(MokaDocumentCache::new(
                config.document_cache.max_entries,
                config.document_cache.ttl,
            ))
        } else {
            Arc::new(NoopDocumentCache)
        });
        self.persisted_queries = (!config.persisted_documents.is_disabled())
            .then(|| PersistedQueryCache::new(config.persisted_documents.max_entries));
        self
    }

    pub fn build(self) -> GraphQLEngine {
        let mut instrumentations = self.instrumentations;
        let instrumentation: Arc<dyn Instrumentation> = match instrumentations.len() {
            0 => Arc::new(NoopInstrumentation),
            1 => instrumentations.remove(0),
            _ => Arc::new(ChainedInstrumentation::new(instrumentations)),
        };

        GraphQLEngine {
            inner: Arc::new(EngineInner {
                schema: self.schema,
                instrumentation,
                document_cache: self
                    .document_cache
                    .unwrap_or_else(|| Arc::new(NoopDocumentCache)),
                normalized_cache: self.normalized_cache,
                persisted_queries: self.persisted_queries,
                validator: self.validator.unwrap_or_else(|| Arc::new(BasicValidator)),
                batch_loaders: Arc::new(self.batch_loaders),
                batching: self.batching,
                timeout: self.timeout,
                root_value: self.root_value,
            }),
        }
    }
}

impl GraphQLEngine {
    pub fn builder(schema: Schema) -> GraphQLEngineBuilder {
        GraphQLEngineBuilder {
            schema,
            instrumentations: Vec::new(),
            document_cache: None,
            normalized_cache: None,
            persisted_queries: None,
            validator: None,
            batch_loaders: BatchLoaderRegistry::new(),
            batching: true,
            timeout: None,
            root_value: Value::Null,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    /// Executes one request.
    ///
    /// Request level failures are reported in the result, this never fails.
    pub async fn execute(&self, input: ExecutionInput) -> ExecutionResult {
        let inner = self.inner.as_ref();
        let state = InstrumentationState::default();
        inner.instrumentation.init_state(&state);
        let input = inner.instrumentation.instrument_execution_input(input, &state);

        let execution_guard = PhaseGuard::new(inner.instrumentation.begin_execution(
            &ExecutionParameters {
                input: &input,
                schema: &inner.schema,
            },
            &state,
        ));

        let span = tracing::debug_span!(
            "graphql_execute",
            operation_name = input.operation_name.as_deref().unwrap_or_default()
        );
        let result = match inner.execute_input(&input, &state).instrument(span).await {
            Ok(result) => result,
            Err(err) => {
                error!(code = err.error_code(), "request failed: {}", err);
                ExecutionResult::from_errors(err.to_graphql_errors())
            }
        };

        execution_guard.complete(Ok(&result));
        inner
            .instrumentation
            .instrument_execution_result(result, &state)
            .await
    }
}

impl EngineInner {
    async fn execute_input(
        &self,
        input: &ExecutionInput,
        state: &InstrumentationState,
    ) -> Result<ExecutionResult, ExecutionError> {
        let query = match &self.persisted_queries {
            Some(persisted) => persisted.resolve(input.query.as_deref(), input.extensions.as_ref())?,
            None => input.query.clone(),
        }
        .ok_or(ExecutionError::NoOperation)?;

        let document = self.prepare_document(&query, input, state).await?;
        let (document, variables) = self.instrumentation.instrument_document_and_variables(
            document,
            input.variables.clone(),
            state,
        );

        self.execute_document(&document, variables, input, state).await
    }

    /// Parsed and validated document, through the normalized cache when one is set.
    async fn prepare_document(
        &self,
        query: &str,
        input: &ExecutionInput,
        state: &InstrumentationState,
    ) -> Result<ParsedDocument, ExecutionError> {
        let Some(cache) = &self.normalized_cache else {
            return self.parse_and_validate(query, input, state);
        };

        let key = NormalizationInput {
            query: query.to_string(),
            operation_name: input.operation_name.clone(),
        };
        let creator = async move {
            self.parse_and_validate(query, input, state)
                .map(|document| NormalizedDocumentEntry { document })
        }
        .boxed();
        let entry = cache.get_normalized(&key, creator).await?;
        Ok(entry.document.clone())
    }

    fn parse_and_validate(
        &self,
        query: &str,
        input: &ExecutionInput,
        state: &InstrumentationState,
    ) -> Result<ParsedDocument, ExecutionError> {
        let parse_guard = PhaseGuard::new(self.instrumentation.begin_parse(
            &ExecutionParameters {
                input,
                schema: &self.schema,
            },
            state,
        ));
        let document = match self
            .document_cache
            .get(query, Box::new(|| parse_document(query)))
        {
            Ok(document) => {
                parse_guard.complete(Ok(&document));
                document
            }
            Err(err) => {
                let err = ExecutionError::Parse(err);
                parse_guard.complete(Err(&PhaseError::Request(err.clone())));
                return Err(err);
            }
        };

        let operation_name = input.operation_name.as_deref();
        let validation_guard = PhaseGuard::new(self.instrumentation.begin_validation(
            &ValidationParameters {
                document: &document,
                operation_name,
                schema: &self.schema,
            },
            state,
        ));
        let errors = self
            .validator
            .validate(&self.schema, document.document(), operation_name);
        validation_guard.complete(Ok(&errors));

        if !errors.is_empty() {
            debug!(errors = errors.len(), "document failed validation");
            return Err(ExecutionError::Validation(errors));
        }
        Ok(document)
    }

    #[instrument(level = "trace", skip_all)]
    async fn execute_document(
        &self,
        document: &ParsedDocument,
        variables: Variables,
        input: &ExecutionInput,
        state: &InstrumentationState,
    ) -> Result<ExecutionResult, ExecutionError> {
        let operation = select_operation(document.document(), input.operation_name.as_deref())?;
        let root_object = self
            .schema
            .root_type(operation.kind)
            .ok_or(ExecutionError::UnsupportedOperation(operation.kind.as_str()))?;
        let variables =
            coerce_variable_values(&self.schema, operation.variable_definitions, variables)?;

        let batches = Arc::new(BatchCoordinator::new(self.batch_loaders.clone()));
        let dispatcher = (self.batching && !self.batch_loaders.is_empty())
            .then(|| LevelDispatchStrategy::new(batches.clone()));
        let cancellation = input.cancellation.clone().unwrap_or_default();

        let ctx = ExecutionContext {
            schema: &self.schema,
            document: document.document(),
            operation,
            fragments: collect_fragments(document.document()),
            variables,
            instrumentation: self.instrumentation.as_ref(),
            instrumentation_state: state,
            errors: ErrorCollector::default(),
            batches,
            dispatcher,
            cancellation: cancellation.clone(),
            request_context: input.context.clone(),
            root_type: TypeRef::non_null(TypeRef::named(root_object.name.clone())),
        };

        let operation_guard = PhaseGuard::new(self.instrumentation.begin_execute_operation(
            &ExecuteOperationParameters {
                operation_kind: operation.kind,
                operation_name: operation.name,
                variables: &ctx.variables,
            },
            state,
        ));
        debug!(kind = operation.kind.as_str(), name = operation.name, "executing operation");

        let outcome = run_bounded(
            execute_operation(&ctx, self.root_value.clone()),
            input.timeout.or(self.timeout),
            &cancellation,
        )
        .await;

        let result = match outcome {
            Ok(field_state) => ExecutionResult::new(field_state.into_value(), ctx.errors.into_errors()),
            Err(err) => {
                error!(code = err.error_code(), "operation aborted: {}", err);
                ExecutionResult::new(Value::Null, err.to_graphql_errors())
            }
        };

        operation_guard.complete(Ok(&result));
        Ok(result)
    }
}

/// Runs `execution` until it completes, the token is cancelled or `timeout` elapses.
///
/// A timeout cancels the token so resolvers running elsewhere can stop.
async fn run_bounded<F: Future>(
    execution: F,
    timeout: Option<Duration>,
    cancellation: &CancellationToken,
) -> Result<F::Output, ExecutionError> {
    let deadline = async {
        match timeout {
            Some(timeout) => tokio::time::sleep(timeout).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        biased;
        _ = cancellation.cancelled() => Err(ExecutionError::Cancelled),
        _ = deadline => {
            cancellation.cancel();
            Err(ExecutionError::Timeout(timeout.unwrap_or_default()))
        }
        output = execution => Ok(output),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio_util::sync::CancellationToken;

    use super::run_bounded;
    use crate::execution::error::ExecutionError;

    #[tokio::test]
    async fn completes_before_the_deadline() {
        let token = CancellationToken::new();
        let output = run_bounded(async { 42 }, Some(Duration::from_secs(5)), &token).await;

        assert_eq!(output.ok(), Some(42));
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn timeout_cancels_the_token() {
        let token = CancellationToken::new();
        let output = run_bounded(
            tokio::time::sleep(Duration::from_secs(5)),
            Some(Duration::from_millis(10)),
            &token,
        )
        .await;

        assert!(matches!(output, Err(ExecutionError::Timeout(_))));
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_token_wins() {
        let token = CancellationToken::new();
        token.cancel();
        let output = run_bounded(async { 42 }, None, &token).await;

        assert!(matches!(output, Err(ExecutionError::Cancelled)));
    }
}
