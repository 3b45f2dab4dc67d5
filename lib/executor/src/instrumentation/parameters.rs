use crate::{
    cache::document::ParsedDocument,
    execution::step_info::StepInfo,
    input::ExecutionInput,
    schema::{OperationKind, Schema},
    variables::Variables,
};

/// Request wide phases: execution, parsing, input transformation.
pub struct ExecutionParameters<'a> {
    pub input: &'a ExecutionInput,
    pub schema: &'a Schema,
}

pub struct ValidationParameters<'a> {
    pub document: &'a ParsedDocument,
    pub operation_name: Option<&'a str>,
    pub schema: &'a Schema,
}

pub struct ExecuteOperationParameters<'a> {
    pub operation_kind: OperationKind,
    pub operation_name: Option<&'a str>,
    pub variables: &'a Variables,
}

/// Field phases. The step describes the field being executed.
pub struct FieldParameters<'a> {
    pub step_info: &'a StepInfo<'a>,
}
