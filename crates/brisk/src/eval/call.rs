//! Function and method calls

use std::rc::Rc;

use tracing::trace;

use super::control::ControlFlow;
use super::field::{self, member_not_found};
use super::stmt::exec_block;
use super::{Evaluate, Interpreter};
use crate::ast::{Expr, FunctionDecl};
use crate::component::assoc_array;
use crate::error::{EvalError, RuntimeErrorDetail};
use crate::value::{coerce_argument, CallableBody, FunctionValue, ParamDefault, Signature, ValueKind};
use crate::Value;

/// Evaluate `callee(args)`.
///
/// For `object.name(args)` the function found on the object is bound to
/// it, so a function stored in an associative array sees that array as
/// `m`.
pub fn eval_call(callee: &Expr, args: &[Expr], interp: &mut Interpreter) -> Result<Value, EvalError> {
    let function = match callee {
        Expr::DottedGet { object, name } => {
            let target = object.eval(interp)?;
            match field::get_member(&target, name)? {
                Value::Function(f) if f.receiver.is_some() => f,
                Value::Function(f) => match &target {
                    Value::Object(obj) => FunctionValue::bound(f.callable, Rc::clone(obj)),
                    _ => f,
                },
                Value::Invalid => {
                    return Err(match &target {
                        Value::Object(obj) => member_not_found(obj, name),
                        other => field::dot_on_non_object(other),
                    })
                }
                other => return Err(not_a_function(&other)),
            }
        }
        Expr::Variable(name) => match interp.env().get(name) {
            Some(Value::Function(f)) => f.clone(),
            Some(other) => return Err(not_a_function(other)),
            None => {
                return Err(EvalError::runtime(
                    RuntimeErrorDetail::FunctionNotFound,
                    format!("Function '{name}' is not defined"),
                ))
            }
        },
        other => match other.eval(interp)? {
            Value::Function(f) => f,
            value => return Err(not_a_function(&value)),
        },
    };

    let args = args.iter().map(|a| a.eval(interp)).collect::<Result<Vec<_>, _>>()?;
    interp.call_function(&function, args)
}

fn not_a_function(value: &Value) -> EvalError {
    EvalError::runtime(
        RuntimeErrorDetail::NotAFunction,
        format!(
            "{} Got {}.",
            RuntimeErrorDetail::NotAFunction.message(),
            value.type_name()
        ),
    )
}

impl Interpreter {
    /// Call a function value with already evaluated arguments.
    ///
    /// Arguments are checked against the signature first; omitted trailing
    /// arguments take their declared defaults.
    pub fn call_function(&mut self, function: &FunctionValue, args: Vec<Value>) -> Result<Value, EvalError> {
        let callable = Rc::clone(&function.callable);
        trace!(name = %callable.name, argc = args.len(), "call");
        let mut args = callable.signature.bind(&callable.name, args, callable.is_method())?;

        match &callable.body {
            CallableBody::Native(native) => {
                fill_constant_defaults(&callable.signature, &mut args);
                self.env_mut().enter_call()?;
                let result = native(self, &args);
                self.env_mut().exit_call();
                result
            }
            CallableBody::Method(method) => {
                fill_constant_defaults(&callable.signature, &mut args);
                let receiver = function
                    .receiver
                    .clone()
                    .ok_or_else(|| EvalError::internal(format!("method '{}' called without a receiver", callable.name)))?;
                method(self, &receiver, &args)
            }
            CallableBody::User(decl) => {
                let decl = Rc::clone(decl);
                let m = function
                    .receiver
                    .clone()
                    .unwrap_or_else(|| Rc::clone(self.env().global_aa()));
                self.call_user(&decl, &callable.signature, m, args)
            }
        }
    }

    /// Call a global function by name.
    pub fn call_named(&mut self, name: &str, args: Vec<Value>) -> Result<Value, EvalError> {
        let function = self.env().function(name).ok_or_else(|| {
            EvalError::runtime(
                RuntimeErrorDetail::FunctionNotFound,
                format!("Function '{name}' is not defined"),
            )
        })?;
        self.call_function(&function, args)
    }

    /// Run a script function in a fresh frame. The frame sees its
    /// parameters, `m` and the globals; never the caller's locals.
    fn call_user(
        &mut self,
        decl: &FunctionDecl,
        signature: &Signature,
        m: crate::value::Object,
        args: Vec<Value>,
    ) -> Result<Value, EvalError> {
        self.env_mut().enter_call()?;
        self.env_mut().push_frame();
        self.env_mut().define("m", Value::Object(m));

        let result = self.bind_and_run(decl, signature, args);

        self.env_mut().pop_frame();
        self.env_mut().exit_call();

        let value = match result {
            Ok(()) => return Ok(Value::Invalid),
            Err(EvalError::ControlFlow(ControlFlow::Return { value })) => value,
            Err(EvalError::ControlFlow(flow)) => return Err(EvalError::Runtime(flow.into_error())),
            Err(e) => return Err(e),
        };
        coerce_return(decl, value)
    }

    fn bind_and_run(&mut self, decl: &FunctionDecl, signature: &Signature, args: Vec<Value>) -> Result<(), EvalError> {
        let name = decl.name.as_deref().unwrap_or("$anon");
        let mut args = args.into_iter();
        for param in &signature.params {
            let value = match (args.next(), &param.default) {
                (Some(value), _) => value,
                (None, Some(ParamDefault::Expr(expr))) => {
                    let value = expr.eval(self)?;
                    coerce_argument(value, param.kind).ok_or_else(|| {
                        EvalError::type_mismatch(format!(
                            "Default for argument '{}' of '{name}' must be {}",
                            param.name, param.kind
                        ))
                    })?
                }
                (None, Some(ParamDefault::Value(value))) => value.clone(),
                (None, None) => Value::Invalid,
            };
            self.env_mut().define(&param.name, value);
        }
        exec_block(&decl.body, self)
    }
}

/// Fill omitted trailing arguments from constant defaults.
fn fill_constant_defaults(signature: &Signature, args: &mut Vec<Value>) {
    for param in signature.params.iter().skip(args.len()) {
        match &param.default {
            Some(ParamDefault::Value(value)) => args.push(value.clone()),
            _ => args.push(Value::Invalid),
        }
    }
}

/// Convert a returned value to the declared return kind. A `sub`
/// returns `invalid` whatever its body produced.
fn coerce_return(decl: &FunctionDecl, value: Value) -> Result<Value, EvalError> {
    if decl.is_sub || decl.returns == ValueKind::Void {
        return Ok(Value::Invalid);
    }
    coerce_argument(value.clone(), decl.returns).ok_or_else(|| {
        EvalError::type_mismatch(format!(
            "{} Function '{}' must return {}, returned {}.",
            RuntimeErrorDetail::TypeMismatch.message(),
            decl.name.as_deref().unwrap_or("$anon"),
            decl.returns,
            value.type_name()
        ))
    })
}

/// An associative array holding the event data passed to observers that
/// take a parameter.
pub(crate) fn event_object(event: &crate::scenegraph::FieldEvent) -> Value {
    assoc_array::new_value(vec![
        ("node".to_string(), Value::Object(Rc::clone(&event.node))),
        ("field".to_string(), Value::from(event.field.as_str())),
        ("data".to_string(), event.data.clone()),
    ])
}
