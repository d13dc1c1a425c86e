use odbc_api::parameter::{InputParameter, VarCharBox};

use crate::types::ScalarValue;

/// Owned, boxed parameters so they can move onto the blocking pool with the statement.
pub type BoundParams = Vec<Box<dyn InputParameter + Send>>;

/// Convert envelope scalars to ODBC input parameters, in placeholder order.
///
/// Booleans bind as integers 0/1, matching the flag columns the ERP uses.
#[must_use]
pub fn bind_params(params: &[ScalarValue]) -> BoundParams {
    params.iter().map(bind_param).collect()
}

fn bind_param(value: &ScalarValue) -> Box<dyn InputParameter + Send> {
    match value {
        ScalarValue::Null => Box::new(VarCharBox::null()),
        ScalarValue::Bool(b) => Box::new(i64::from(*b)),
        ScalarValue::Int(i) => Box::new(*i),
        ScalarValue::Float(f) => Box::new(*f),
        ScalarValue::Text(s) => Box::new(VarCharBox::from_string(s.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binds_one_parameter_per_scalar() {
        let bound = bind_params(&[
            ScalarValue::Int(42),
            ScalarValue::Text("O'Brien".into()),
            ScalarValue::Null,
            ScalarValue::Bool(true),
        ]);
        assert_eq!(bound.len(), 4);
    }
}
