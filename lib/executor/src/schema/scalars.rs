use std::sync::Arc;

use crate::response::value::Value;

/// Output serialization and input coercion for a scalar type.
pub trait ScalarSerializer: Send + Sync + 'static {
    /// Converts a resolved value into its response representation.
    fn serialize(&self, value: &Value) -> Result<Value, String>;

    /// Validates and converts a variable value supplied for this scalar.
    fn parse_value(&self, value: &Value) -> Result<Value, String> {
        Ok(value.clone())
    }
}

fn conversion_error(type_name: &str, value: &Value) -> String {
    format!(
        "Expected a value that can be converted to type '{}' but it was a '{}'",
        type_name,
        value.kind()
    )
}

pub struct IntScalar;

impl IntScalar {
    fn in_range(value: i64) -> Option<Value> {
        i32::try_from(value).ok().map(|v| Value::I64(v as i64))
    }
}

impl ScalarSerializer for IntScalar {
    fn serialize(&self, value: &Value) -> Result<Value, String> {
        let converted = match value {
            Value::String(s) => s.trim().parse::<i64>().ok().and_then(Self::in_range),
            Value::Bool(b) => Some(Value::I64(*b as i64)),
            other => other.as_i64().and_then(Self::in_range),
        };
        converted.ok_or_else(|| conversion_error("Int", value))
    }

    fn parse_value(&self, value: &Value) -> Result<Value, String> {
        match value {
            Value::I64(_) | Value::U64(_) => value
                .as_i64()
                .and_then(Self::in_range)
                .ok_or_else(|| format!("Int cannot represent non 32-bit signed integer value: {}", value)),
            other => Err(conversion_error("Int", other)),
        }
    }
}

pub struct FloatScalar;

impl ScalarSerializer for FloatScalar {
    fn serialize(&self, value: &Value) -> Result<Value, String> {
        let converted = match value {
            Value::String(s) => s.trim().parse::<f64>().ok(),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            other => other.as_f64(),
        };
        converted
            .filter(|f| f.is_finite())
            .map(Value::F64)
            .ok_or_else(|| conversion_error("Float", value))
    }

    fn parse_value(&self, value: &Value) -> Result<Value, String> {
        match value {
            Value::F64(_) | Value::I64(_) | Value::U64(_) => value
                .as_f64()
                .map(Value::F64)
                .ok_or_else(|| conversion_error("Float", value)),
            other => Err(conversion_error("Float", other)),
        }
    }
}

pub struct StringScalar;

impl ScalarSerializer for StringScalar {
    fn serialize(&self, value: &Value) -> Result<Value, String> {
        match value {
            Value::String(_) => Ok(value.clone()),
            Value::Bool(_) | Value::I64(_) | Value::U64(_) | Value::F64(_) => {
                Ok(Value::String(value.to_string()))
            }
            other => Err(conversion_error("String", other)),
        }
    }

    fn parse_value(&self, value: &Value) -> Result<Value, String> {
        match value {
            Value::String(_) => Ok(value.clone()),
            other => Err(conversion_error("String", other)),
        }
    }
}

pub struct BooleanScalar;

impl ScalarSerializer for BooleanScalar {
    fn serialize(&self, value: &Value) -> Result<Value, String> {
        match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
            other => match other.as_i64() {
                Some(n) => Ok(Value::Bool(n != 0)),
                None => Err(conversion_error("Boolean", other)),
            },
        }
    }

    fn parse_value(&self, value: &Value) -> Result<Value, String> {
        match value {
            Value::Bool(_) => Ok(value.clone()),
            other => Err(conversion_error("Boolean", other)),
        }
    }
}

pub struct IdScalar;

impl ScalarSerializer for IdScalar {
    fn serialize(&self, value: &Value) -> Result<Value, String> {
        match value {
            Value::String(_) => Ok(value.clone()),
            Value::I64(n) => Ok(Value::String(n.to_string())),
            Value::U64(n) => Ok(Value::String(n.to_string())),
            other => Err(conversion_error("ID", other)),
        }
    }

    fn parse_value(&self, value: &Value) -> Result<Value, String> {
        self.serialize(value)
    }
}

/// Custom scalar without wiring: values pass through unchanged.
pub struct PassThroughScalar;

impl ScalarSerializer for PassThroughScalar {
    fn serialize(&self, value: &Value) -> Result<Value, String> {
        Ok(value.clone())
    }
}

pub struct FnScalar<F> {
    serialize: F,
}

impl<F> ScalarSerializer for FnScalar<F>
where
    F: Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
{
    fn serialize(&self, value: &Value) -> Result<Value, String> {
        (self.serialize)(value)
    }
}

/// Builds a scalar from a serialization closure. Input values pass through.
pub fn scalar_fn<F>(serialize: F) -> Arc<dyn ScalarSerializer>
where
    F: Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
{
    Arc::new(FnScalar { serialize })
}

pub(crate) fn built_in_scalars() -> [(&'static str, Arc<dyn ScalarSerializer>); 5] {
    [
        ("Int", Arc::new(IntScalar)),
        ("Float", Arc::new(FloatScalar)),
        ("String", Arc::new(StringScalar)),
        ("Boolean", Arc::new(BooleanScalar)),
        ("ID", Arc::new(IdScalar)),
    ]
}
