use graphql_parser::{
    query::{Field, SelectionSet, Value as AstValue},
    Pos,
};

/// All field selections sharing one response key under one parent.
///
/// `{ a a(x: 1) }` is invalid GraphQL, so arguments and directives are read
/// from the first field; selection sets of every field are merged.
#[derive(Debug, Clone)]
pub struct MergedField<'exec> {
    response_key: &'exec str,
    fields: Vec<&'exec Field<'static, String>>,
}

impl<'exec> MergedField<'exec> {
    pub fn new(field: &'exec Field<'static, String>) -> Self {
        MergedField {
            response_key: field.alias.as_deref().unwrap_or(&field.name),
            fields: vec![field],
        }
    }

    pub(crate) fn push(&mut self, field: &'exec Field<'static, String>) {
        self.fields.push(field);
    }

    pub fn response_key(&self) -> &'exec str {
        self.response_key
    }

    pub fn name(&self) -> &'exec str {
        &self.single_field().name
    }

    pub fn single_field(&self) -> &'exec Field<'static, String> {
        self.fields[0]
    }

    pub fn fields(&self) -> &[&'exec Field<'static, String>] {
        &self.fields
    }

    pub fn arguments(&self) -> &'exec [(String, AstValue<'static, String>)] {
        &self.single_field().arguments
    }

    pub fn position(&self) -> Pos {
        self.single_field().position
    }

    /// Selection sets of every merged field, in document order.
    pub fn sub_selections(&self) -> impl Iterator<Item = &'exec SelectionSet<'static, String>> + '_ {
        self.fields.iter().map(|field| &field.selection_set)
    }
}
