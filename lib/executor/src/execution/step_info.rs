use std::sync::Arc;

use crate::{
    execution::{arguments::Arguments, merged_field::MergedField, path::ResultPath},
    schema::{types::TypeRef, FieldDefinition},
};

/// Immutable description of one node of the execution tree.
///
/// Children point to their parent, parents never point to children.
#[derive(Debug, Clone)]
pub struct StepInfo<'exec> {
    field_type: &'exec TypeRef,
    object_type: &'exec str,
    field_definition: Option<&'exec FieldDefinition>,
    field: Option<Arc<MergedField<'exec>>>,
    arguments: Arc<Arguments>,
    parent: Option<Arc<StepInfo<'exec>>>,
    path: ResultPath,
}

impl<'exec> StepInfo<'exec> {
    /// Step of the operation root.
    pub fn root(root_type: &'exec TypeRef) -> Self {
        StepInfo {
            field_type: root_type,
            object_type: root_type.named_type(),
            field_definition: None,
            field: None,
            arguments: Arc::new(Arguments::new()),
            parent: None,
            path: ResultPath::root(),
        }
    }

    /// Step of a field resolved on an object of type `object_type`.
    pub fn for_field(
        parent: &Arc<StepInfo<'exec>>,
        object_type: &'exec str,
        field_definition: &'exec FieldDefinition,
        field: Arc<MergedField<'exec>>,
        arguments: Arc<Arguments>,
    ) -> Self {
        StepInfo {
            field_type: &field_definition.field_type,
            object_type,
            field_definition: Some(field_definition),
            path: parent.path.segment(field.response_key()),
            field: Some(field),
            arguments,
            parent: Some(parent.clone()),
        }
    }

    /// New step that shares field and arguments but has its own type, parent and path.
    pub fn transform(
        &self,
        field_type: &'exec TypeRef,
        parent: Option<Arc<StepInfo<'exec>>>,
        path: ResultPath,
    ) -> Self {
        StepInfo {
            field_type,
            object_type: self.object_type,
            field_definition: self.field_definition,
            field: self.field.clone(),
            arguments: self.arguments.clone(),
            parent,
            path,
        }
    }

    pub fn field_type(&self) -> &'exec TypeRef {
        self.field_type
    }

    pub fn is_non_null(&self) -> bool {
        self.field_type.is_non_null()
    }

    pub fn is_list(&self) -> bool {
        self.field_type.is_list()
    }

    /// Name of the concrete type of the object owning this field.
    pub fn object_type_name(&self) -> &'exec str {
        self.object_type
    }

    pub fn field_definition(&self) -> Option<&'exec FieldDefinition> {
        self.field_definition
    }

    pub fn field(&self) -> Option<&Arc<MergedField<'exec>>> {
        self.field.as_ref()
    }

    pub fn field_name(&self) -> &'exec str {
        self.field_definition.map_or("", |definition| definition.name.as_str())
    }

    pub fn result_key(&self) -> &'exec str {
        self.field
            .as_ref()
            .map_or("", |field| field.response_key())
    }

    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    pub fn parent(&self) -> Option<&Arc<StepInfo<'exec>>> {
        self.parent.as_ref()
    }

    pub fn path(&self) -> &ResultPath {
        &self.path
    }

    /// Closest step, this one included, whose type accepts null.
    ///
    /// `None` means null reaches the operation root.
    pub fn nearest_nullable_ancestor(&self) -> Option<&StepInfo<'exec>> {
        let mut current = Some(self);
        while let Some(step) = current {
            if step.parent.is_none() {
                return None;
            }
            if !step.is_non_null() {
                return Some(step);
            }
            current = step.parent.as_deref();
        }
        None
    }
}
