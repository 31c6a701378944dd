//! Literal, array literal and associative-array literal evaluation

use super::{Evaluate, Interpreter};
use crate::ast::Expr;
use crate::component::{array, assoc_array};
use crate::error::EvalError;
use crate::lexer::Literal;
use crate::Value;

pub fn eval_literal(literal: &Literal) -> Value {
    match literal {
        Literal::Invalid => Value::Invalid,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int32(n) => Value::Int32(*n),
        Literal::Int64(n) => Value::Int64(*n),
        Literal::Float(n) => Value::Float(*n),
        Literal::Double(n) => Value::Double(*n),
        Literal::String(s) => Value::string(s),
    }
}

/// `[a, b, c]`: a fresh `roArray` per evaluation.
pub fn eval_array(elements: &[Expr], interp: &mut Interpreter) -> Result<Value, EvalError> {
    let values = elements
        .iter()
        .map(|e| e.eval(interp))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(array::new_value(values))
}

/// `{key: value}`: a fresh `roAssociativeArray`; later duplicate keys win.
pub fn eval_assoc_array(entries: &[(String, Expr)], interp: &mut Interpreter) -> Result<Value, EvalError> {
    let values = entries
        .iter()
        .map(|(key, e)| Ok((key.clone(), e.eval(interp)?)))
        .collect::<Result<Vec<_>, EvalError>>()?;
    Ok(assoc_array::new_value(values))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literals() {
        assert_eq!(eval_literal(&Literal::Int32(5)), Value::Int32(5));
        assert_eq!(eval_literal(&Literal::String("hi".into())), Value::from("hi"));
        assert_eq!(eval_literal(&Literal::Invalid), Value::Invalid);
    }

    #[test]
    fn test_array_literal_is_fresh() {
        let mut interp = Interpreter::new();
        let items = vec![Expr::Literal(Literal::Int32(1))];
        let a = eval_array(&items, &mut interp).unwrap();
        let b = eval_array(&items, &mut interp).unwrap();
        assert_ne!(a, b);
        assert_eq!(a.type_name(), "roArray");
    }

    #[test]
    fn test_assoc_array_literal_duplicate_keys() {
        let mut interp = Interpreter::new();
        let entries = vec![
            ("a".to_string(), Expr::Literal(Literal::Int32(1))),
            ("A".to_string(), Expr::Literal(Literal::Int32(2))),
        ];
        let aa = eval_assoc_array(&entries, &mut interp).unwrap();
        let obj = aa.as_object().unwrap();
        assert_eq!(assoc_array::get_member(obj, "a"), Value::Int32(2));
    }
}
