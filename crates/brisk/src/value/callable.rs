//! Callable value types: script functions, native builtins and component methods

use std::fmt;
use std::rc::Rc;

use super::{Object, Value, ValueKind};
use crate::ast::{Expr, FunctionDecl};
use crate::error::{EvalError, RuntimeErrorDetail};
use crate::eval::Interpreter;

/// A native function exposed to scripts.
pub type NativeFn = Rc<dyn Fn(&mut Interpreter, &[Value]) -> Result<Value, EvalError>>;

/// A component method; the receiver is the component it was invoked on.
pub type MethodFn = fn(&mut Interpreter, &Object, &[Value]) -> Result<Value, EvalError>;

/// Default for an omitted trailing argument.
#[derive(Clone)]
pub enum ParamDefault {
    /// A constant, used by native functions and methods
    Value(Value),

    /// An expression evaluated at call time in the callee's scope
    Expr(Expr),
}

impl fmt::Debug for ParamDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamDefault::Value(v) => write!(f, "Value({v:?})"),
            ParamDefault::Expr(e) => write!(f, "Expr({e:?})"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub kind: ValueKind,
    pub default: Option<ParamDefault>,
}

impl Param {
    pub fn required(name: &str, kind: ValueKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            default: None,
        }
    }

    pub fn optional(name: &str, kind: ValueKind, default: Value) -> Self {
        Self {
            name: name.to_string(),
            kind,
            default: Some(ParamDefault::Value(default)),
        }
    }
}

/// Declared parameters and return kind of a callable.
#[derive(Debug, Clone)]
pub struct Signature {
    pub params: Vec<Param>,
    pub returns: ValueKind,

    /// Accept any number of extra arguments past `params`
    pub variadic: bool,
}

impl Signature {
    pub fn new(params: Vec<Param>, returns: ValueKind) -> Self {
        Self {
            params,
            returns,
            variadic: false,
        }
    }

    /// A signature with no declared parameters that accepts any arguments.
    pub fn variadic(returns: ValueKind) -> Self {
        Self {
            params: Vec::new(),
            returns,
            variadic: true,
        }
    }

    /// Number of leading parameters without a default.
    pub fn required_count(&self) -> usize {
        self.params.iter().take_while(|p| p.default.is_none()).count()
    }

    /// Check `args` against this signature, coercing numeric arguments to
    /// the declared kinds. Omitted trailing arguments are left for the
    /// caller to fill from defaults.
    pub fn bind(&self, name: &str, args: Vec<Value>, is_method: bool) -> Result<Vec<Value>, EvalError> {
        let arity_detail = if is_method {
            RuntimeErrorDetail::RoWrongNumberOfParams
        } else {
            RuntimeErrorDetail::WrongNumberOfParams
        };

        let required = self.required_count();
        if args.len() < required || (!self.variadic && args.len() > self.params.len()) {
            let expected = if required == self.params.len() {
                required.to_string()
            } else {
                format!("{required}-{}", self.params.len())
            };
            return Err(EvalError::runtime(
                arity_detail,
                format!(
                    "{} '{name}' expects {expected} argument(s), received {}",
                    arity_detail.message(),
                    args.len()
                ),
            ));
        }

        args.into_iter()
            .enumerate()
            .map(|(i, arg)| match self.params.get(i) {
                Some(param) => coerce_argument(arg, param.kind).ok_or_else(|| {
                    EvalError::type_mismatch(format!(
                        "Argument '{}' of '{name}' must be {}",
                        param.name, param.kind
                    ))
                }),
                None => Ok(arg),
            })
            .collect()
    }
}

/// Convert `value` to `kind` if the language allows the conversion.
pub(crate) fn coerce_argument(value: Value, kind: ValueKind) -> Option<Value> {
    match (kind, value) {
        (ValueKind::Dynamic | ValueKind::Object, value) => Some(value),
        (ValueKind::Invalid, Value::Invalid) => Some(Value::Invalid),
        (ValueKind::Boolean, v @ Value::Bool(_)) => Some(v),
        (ValueKind::String, v @ Value::String(_)) => Some(v),
        (ValueKind::Callable, v @ Value::Function(_)) => Some(v),
        (ValueKind::Int32, v) => v.to_i64().map(|n| Value::Int32(n as i32)),
        (ValueKind::Int64, v) => v.to_i64().map(Value::Int64),
        (ValueKind::Float, v) => v.as_f64().map(|n| Value::Float(n as f32)),
        (ValueKind::Double, v) => v.as_f64().map(Value::Double),
        _ => None,
    }
}

/// How a callable runs.
#[derive(Clone)]
pub enum CallableBody {
    Native(NativeFn),
    Method(MethodFn),
    User(Rc<FunctionDecl>),
}

/// Anything that can be called from a script.
pub struct Callable {
    pub name: String,
    pub signature: Signature,
    pub body: CallableBody,
}

impl Callable {
    pub fn native(
        name: &str,
        signature: Signature,
        func: impl Fn(&mut Interpreter, &[Value]) -> Result<Value, EvalError> + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            signature,
            body: CallableBody::Native(Rc::new(func)),
        }
    }

    pub fn method(name: &str, signature: Signature, func: MethodFn) -> Self {
        Self {
            name: name.to_string(),
            signature,
            body: CallableBody::Method(func),
        }
    }

    /// Wrap a parsed function declaration.
    pub fn user(decl: Rc<FunctionDecl>) -> Self {
        let params = decl
            .params
            .iter()
            .map(|p| Param {
                name: p.name.clone(),
                kind: p.kind,
                default: p.default.clone().map(ParamDefault::Expr),
            })
            .collect();
        Self {
            name: decl.name.clone().unwrap_or_else(|| "$anon".to_string()),
            signature: Signature::new(params, decl.returns),
            body: CallableBody::User(decl),
        }
    }

    pub fn is_method(&self) -> bool {
        matches!(self.body, CallableBody::Method(_))
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.body {
            CallableBody::Native(_) => "native",
            CallableBody::Method(_) => "method",
            CallableBody::User(_) => "user",
        };
        write!(f, "Callable({} {})", kind, self.name)
    }
}

/// A callable as a first-class value.
#[derive(Clone)]
pub struct FunctionValue {
    pub callable: Rc<Callable>,

    /// Object the function was looked up on; becomes `m` in the call
    pub receiver: Option<Object>,
}

impl FunctionValue {
    pub fn new(callable: Rc<Callable>) -> Self {
        Self {
            callable,
            receiver: None,
        }
    }

    pub fn bound(callable: Rc<Callable>, receiver: Object) -> Self {
        Self {
            callable,
            receiver: Some(receiver),
        }
    }

    pub fn name(&self) -> &str {
        &self.callable.name
    }
}

impl fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FunctionValue({})", self.callable.name)
    }
}
