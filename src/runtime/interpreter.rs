use crate::language::ast::{
    AssignStmt, BinaryOp, CallExpr, Expr, FunctionDef, IfStmt, Literal, Param, PassMode, Program,
    Statement, UnaryOp, WhileStmt,
};
use crate::runtime::{
    console::Console,
    environment::{Environment, ScopeLabel},
    error::{RuntimeError, RuntimeResult},
    value::{lookup_field, new_cell, Cell, LambdaValue, Object, ObjectRef, Value},
};
use std::collections::HashMap;
use std::rc::Rc;

const PRINT: &str = "print";
const INPUT_INT: &str = "inputi";
const INPUT_STR: &str = "inputs";
const THIS: &str = "this";
const PROTO: &str = "proto";

pub struct Interpreter {
    functions: Vec<Rc<FunctionDef>>,
    env: Environment,
    console: Box<dyn Console>,
}

/// Result of executing a statement list: either it ran to the end, or a
/// `return` is unwinding to the owning call frame.
enum FlowSignal {
    Normal,
    Return(Value),
}

impl Interpreter {
    pub fn new(program: Program, console: Box<dyn Console>) -> Self {
        Self {
            functions: program.functions,
            env: Environment::new(),
            console,
        }
    }

    /// Runs the program's `main` function to completion. `main` must exist
    /// and take no parameters.
    pub fn run(&mut self) -> RuntimeResult<()> {
        let main = self
            .functions
            .iter()
            .find(|def| def.name == "main" && def.params.is_empty())
            .map(Rc::clone)
            .ok_or(RuntimeError::MissingMain)?;
        let _ = self.invoke(&main.name, &main.params, &main.statements, &[], None, None)?;
        Ok(())
    }

    /// Common call path for functions, lambdas and methods: binds arguments
    /// against the caller's frames, pushes the callee frame (closure
    /// captures and `this` first, so parameters shadow them), executes the
    /// body and pops. A body that falls off the end yields nil.
    fn invoke(
        &mut self,
        label: &str,
        params: &[Param],
        body: &[Statement],
        args: &[Expr],
        captures: Option<&HashMap<String, Cell>>,
        receiver: Option<ObjectRef>,
    ) -> RuntimeResult<Value> {
        let mut bound = Vec::with_capacity(params.len());
        for (param, actual) in params.iter().zip(args) {
            let cell = match param.mode {
                PassMode::ByRef => self.resolve_ref_argument(&param.name, actual)?,
                PassMode::ByValue => new_cell(self.eval_expression(actual)?),
            };
            bound.push((param.name.clone(), cell));
        }

        self.env.push(ScopeLabel::Call(label.to_string()));
        if let Some(captures) = captures {
            for (name, cell) in captures {
                self.env.bind_cell(name, Rc::clone(cell));
            }
        }
        if let Some(receiver) = receiver {
            self.env.bind_new(THIS, Value::Object(receiver));
        }
        for (name, cell) in bound {
            self.env.bind_cell(&name, cell);
        }

        let flow = self.exec_statements(body);
        self.env.pop();
        match flow? {
            FlowSignal::Return(value) => Ok(value),
            FlowSignal::Normal => Ok(Value::Nil),
        }
    }

    /// A reference parameter aliases the cell behind the actual argument,
    /// which must be a variable (or field) reference.
    fn resolve_ref_argument(&mut self, param: &str, actual: &Expr) -> RuntimeResult<Cell> {
        let name = match actual {
            Expr::Variable(name) => name,
            _ => {
                return Err(RuntimeError::InvalidRefArgument {
                    name: param.to_string(),
                })
            }
        };
        match name.split_once('.') {
            None => self
                .env
                .lookup(name)
                .ok_or_else(|| RuntimeError::UnknownVariable { name: name.clone() }),
            Some((base, path)) => {
                let root = self.resolve_base_object(base)?;
                let (init, last) = split_last(path);
                let owner = walk_segments(base, root, init)?;
                if last == PROTO {
                    // proto is stored raw on the object, there is no cell to alias
                    return Err(RuntimeError::InvalidRefArgument {
                        name: param.to_string(),
                    });
                }
                lookup_field(&owner, last)?.ok_or_else(|| RuntimeError::UnknownField {
                    name: base.to_string(),
                    field: last.to_string(),
                })
            }
        }
    }

    fn exec_statements(&mut self, statements: &[Statement]) -> RuntimeResult<FlowSignal> {
        for statement in statements {
            if let FlowSignal::Return(value) = self.exec_statement(statement)? {
                return Ok(FlowSignal::Return(value));
            }
        }
        Ok(FlowSignal::Normal)
    }

    fn exec_statement(&mut self, statement: &Statement) -> RuntimeResult<FlowSignal> {
        match statement {
            Statement::Assign(assign) => {
                self.exec_assign(assign)?;
                Ok(FlowSignal::Normal)
            }
            Statement::Call(call) => {
                self.eval_call(call)?;
                Ok(FlowSignal::Normal)
            }
            Statement::If(stmt) => self.exec_if(stmt),
            Statement::While(stmt) => self.exec_while(stmt),
            Statement::Return(stmt) => {
                let value = match &stmt.expression {
                    Some(expr) => self.eval_expression(expr)?,
                    None => Value::Nil,
                };
                Ok(FlowSignal::Return(value))
            }
        }
    }

    fn exec_assign(&mut self, assign: &AssignStmt) -> RuntimeResult<()> {
        let value = self.eval_expression(&assign.value)?;
        match assign.target.split_once('.') {
            None => {
                self.env.declare_or_set(&assign.target, value);
                Ok(())
            }
            Some((base, path)) => {
                let root = self.resolve_base_object(base)?;
                let (init, last) = split_last(path);
                let owner = walk_segments(base, root, init)?;
                if last == PROTO {
                    match value {
                        Value::Nil => owner.borrow_mut().set_proto(None),
                        Value::Object(proto) => owner.borrow_mut().set_proto(Some(proto)),
                        other => {
                            return Err(RuntimeError::InvalidProto {
                                type_name: other.type_name(),
                            })
                        }
                    }
                } else {
                    owner.borrow_mut().set_field(last, value);
                }
                Ok(())
            }
        }
    }

    fn exec_if(&mut self, stmt: &IfStmt) -> RuntimeResult<FlowSignal> {
        self.env.push(ScopeLabel::If);
        let flow = self.exec_if_branches(stmt);
        self.env.pop();
        flow
    }

    fn exec_if_branches(&mut self, stmt: &IfStmt) -> RuntimeResult<FlowSignal> {
        if self.eval_condition(&stmt.condition)? {
            self.exec_statements(&stmt.statements)
        } else if let Some(else_statements) = &stmt.else_statements {
            self.exec_statements(else_statements)
        } else {
            Ok(FlowSignal::Normal)
        }
    }

    fn exec_while(&mut self, stmt: &WhileStmt) -> RuntimeResult<FlowSignal> {
        while self.eval_condition(&stmt.condition)? {
            self.env.push(ScopeLabel::While);
            let flow = self.exec_statements(&stmt.statements);
            self.env.pop();
            if let FlowSignal::Return(value) = flow? {
                return Ok(FlowSignal::Return(value));
            }
        }
        Ok(FlowSignal::Normal)
    }

    fn eval_condition(&mut self, expr: &Expr) -> RuntimeResult<bool> {
        match self.eval_expression(expr)? {
            Value::Bool(value) => Ok(value),
            Value::Int(value) => Ok(value != 0),
            other => Err(RuntimeError::InvalidCondition {
                type_name: other.type_name(),
            }),
        }
    }

    fn eval_expression(&mut self, expr: &Expr) -> RuntimeResult<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                Literal::Int(value) => Value::Int(*value),
                Literal::Str(value) => Value::Str(value.clone()),
                Literal::Bool(value) => Value::Bool(*value),
                Literal::Nil => Value::Nil,
            }),
            Expr::Variable(name) => self.eval_variable(name),
            Expr::Binary { op, op1, op2 } => {
                // both operands evaluate eagerly, even for && and ||
                let lhs = self.eval_expression(op1)?;
                let rhs = self.eval_expression(op2)?;
                self.eval_binary(*op, lhs, rhs)
            }
            Expr::Unary { op, op1 } => {
                let value = self.eval_expression(op1)?;
                eval_unary(*op, value)
            }
            Expr::Lambda(def) => Ok(Value::Lambda(LambdaValue {
                def: Rc::clone(def),
                captures: self.env.snapshot(),
            })),
            Expr::Call(call) => self.eval_call(call),
            Expr::NewObject => Ok(Value::Object(Object::empty())),
        }
    }

    fn eval_variable(&mut self, name: &str) -> RuntimeResult<Value> {
        match name.split_once('.') {
            Some((base, path)) => {
                let root = self.resolve_base_object(base)?;
                let (init, last) = split_last(path);
                let owner = walk_segments(base, root, init)?;
                read_field(&owner, last, base)
            }
            None => {
                if let Some(value) = self.env.get(name) {
                    return Ok(value);
                }
                self.function_by_name(name).map(Value::Function)
            }
        }
    }

    /// Bare function names are values too, as long as the name is not
    /// overloaded.
    fn function_by_name(&self, name: &str) -> RuntimeResult<Rc<FunctionDef>> {
        let mut matches = self.functions.iter().filter(|def| def.name == name);
        match (matches.next(), matches.next()) {
            (Some(def), None) => Ok(Rc::clone(def)),
            (Some(_), Some(_)) => Err(RuntimeError::AmbiguousFunction {
                name: name.to_string(),
            }),
            (None, _) => Err(RuntimeError::UnknownVariable {
                name: name.to_string(),
            }),
        }
    }

    fn resolve_base_object(&self, base: &str) -> RuntimeResult<ObjectRef> {
        let value = self
            .env
            .get(base)
            .ok_or_else(|| RuntimeError::UnknownVariable {
                name: base.to_string(),
            })?;
        match value {
            Value::Object(object) => Ok(object),
            _ => Err(RuntimeError::NotAnObject {
                name: base.to_string(),
            }),
        }
    }

    fn eval_call(&mut self, call: &CallExpr) -> RuntimeResult<Value> {
        if let Some(objref) = &call.objref {
            return self.call_method(objref, call);
        }
        match call.name.as_str() {
            PRINT => self.call_print(call),
            INPUT_INT => self.call_input(call, true),
            INPUT_STR => self.call_input(call, false),
            _ => self.call_named(call),
        }
    }

    fn call_print(&mut self, call: &CallExpr) -> RuntimeResult<Value> {
        let mut line = String::new();
        for arg in &call.args {
            let value = self.eval_expression(arg)?;
            line.push_str(&value.to_string());
        }
        self.console.output(&line);
        Ok(Value::Nil)
    }

    fn call_input(&mut self, call: &CallExpr, integer: bool) -> RuntimeResult<Value> {
        if call.args.len() > 1 {
            return Err(RuntimeError::PromptArity {
                name: call.name.clone(),
            });
        }
        if let Some(prompt) = call.args.first() {
            let prompt = self.eval_expression(prompt)?;
            self.console.output(&prompt.to_string());
        }
        let line = self
            .console
            .get_input()
            .ok_or(RuntimeError::InputExhausted)?;
        if integer {
            let value = line
                .trim()
                .parse::<i64>()
                .map_err(|_| RuntimeError::MalformedInput { line: line.clone() })?;
            Ok(Value::Int(value))
        } else {
            Ok(Value::Str(line))
        }
    }

    /// Named calls try the function table first (name plus exact arity),
    /// then fall back to a variable bound to a function or lambda reference.
    fn call_named(&mut self, call: &CallExpr) -> RuntimeResult<Value> {
        if let Some(def) = self
            .functions
            .iter()
            .find(|def| def.name == call.name && def.params.len() == call.args.len())
            .map(Rc::clone)
        {
            return self.invoke(&call.name, &def.params, &def.statements, &call.args, None, None);
        }
        match self.env.get(&call.name) {
            Some(value) => self.call_value(&call.name, &value, &call.args, None),
            None => Err(RuntimeError::UnknownFunction {
                name: call.name.clone(),
                arity: call.args.len(),
            }),
        }
    }

    /// Method calls resolve the receiver, then walk its proto chain for a
    /// field holding a callable of matching arity; `this` aliases the
    /// receiver inside the method body.
    fn call_method(&mut self, objref: &str, call: &CallExpr) -> RuntimeResult<Value> {
        let receiver = match self.env.get(objref) {
            Some(Value::Object(object)) => object,
            Some(_) => {
                return Err(RuntimeError::NotAnObject {
                    name: objref.to_string(),
                })
            }
            None => {
                return Err(RuntimeError::UnknownVariable {
                    name: objref.to_string(),
                })
            }
        };
        let method = match lookup_field(&receiver, &call.name)? {
            Some(cell) => cell.borrow().clone(),
            None => {
                return Err(RuntimeError::UnknownMethod {
                    objref: objref.to_string(),
                    name: call.name.clone(),
                })
            }
        };
        self.call_value(&call.name, &method, &call.args, Some(receiver))
    }

    fn call_value(
        &mut self,
        name: &str,
        callee: &Value,
        args: &[Expr],
        receiver: Option<ObjectRef>,
    ) -> RuntimeResult<Value> {
        match callee {
            Value::Function(def) if def.params.len() == args.len() => {
                let def = Rc::clone(def);
                self.invoke(name, &def.params, &def.statements, args, None, receiver)
            }
            Value::Lambda(lambda) if lambda.def.params.len() == args.len() => {
                let lambda = lambda.clone();
                self.invoke(
                    name,
                    &lambda.def.params,
                    &lambda.def.statements,
                    args,
                    Some(&lambda.captures),
                    receiver,
                )
            }
            _ => Err(RuntimeError::NotCallable {
                name: name.to_string(),
                arity: args.len(),
            }),
        }
    }

    /// Operator dispatch on the runtime types of both operands.
    fn eval_binary(&self, op: BinaryOp, lhs: Value, rhs: Value) -> RuntimeResult<Value> {
        use BinaryOp::*;
        match (&lhs, &rhs) {
            (Value::Int(a), Value::Int(b)) => match op {
                Add => Ok(Value::Int(a + b)),
                Sub => Ok(Value::Int(a - b)),
                Mul => Ok(Value::Int(a * b)),
                Div => floor_div(*a, *b),
                Lt => Ok(Value::Bool(a < b)),
                Gt => Ok(Value::Bool(a > b)),
                LtEq => Ok(Value::Bool(a <= b)),
                GtEq => Ok(Value::Bool(a >= b)),
                Eq => Ok(Value::Bool(a == b)),
                NotEq => Ok(Value::Bool(a != b)),
                And => Ok(Value::Bool(*a != 0 && *b != 0)),
                Or => Ok(Value::Bool(*a != 0 || *b != 0)),
            },
            (Value::Bool(a), Value::Bool(b)) => match op {
                Eq => Ok(Value::Bool(a == b)),
                NotEq => Ok(Value::Bool(a != b)),
                And => Ok(Value::Bool(*a && *b)),
                Or => Ok(Value::Bool(*a || *b)),
                Add | Sub | Mul | Div => {
                    self.eval_binary(op, Value::Int(i64::from(*a)), Value::Int(i64::from(*b)))
                }
                _ => Err(binary_type_error(op, &lhs, &rhs)),
            },
            (Value::Str(a), Value::Str(b)) => match op {
                Add => Ok(Value::Str(format!("{a}{b}"))),
                Eq => Ok(Value::Bool(a == b)),
                NotEq => Ok(Value::Bool(a != b)),
                _ => Err(binary_type_error(op, &lhs, &rhs)),
            },
            (Value::Nil, Value::Nil) => match op {
                Eq => Ok(Value::Bool(true)),
                NotEq => Ok(Value::Bool(false)),
                _ => Err(binary_type_error(op, &lhs, &rhs)),
            },
            (Value::Int(_), Value::Bool(_)) | (Value::Bool(_), Value::Int(_)) => match op {
                // arithmetic coerces the boolean to 0/1
                Add | Sub | Mul | Div => {
                    self.eval_binary(op, Value::Int(coerce_int(&lhs)), Value::Int(coerce_int(&rhs)))
                }
                // comparison and logic go through truthiness, so 5 == true
                And => Ok(Value::Bool(truthy(&lhs) && truthy(&rhs))),
                Or => Ok(Value::Bool(truthy(&lhs) || truthy(&rhs))),
                Eq => Ok(Value::Bool(truthy(&lhs) == truthy(&rhs))),
                NotEq => Ok(Value::Bool(truthy(&lhs) != truthy(&rhs))),
                _ => Err(binary_type_error(op, &lhs, &rhs)),
            },
            (Value::Object(a), Value::Object(b)) => match op {
                Eq => Ok(Value::Bool(Rc::ptr_eq(a, b))),
                NotEq => Ok(Value::Bool(!Rc::ptr_eq(a, b))),
                _ => Err(binary_type_error(op, &lhs, &rhs)),
            },
            (Value::Function(a), Value::Function(b)) => match op {
                Eq => Ok(Value::Bool(Rc::ptr_eq(a, b))),
                NotEq => Ok(Value::Bool(!Rc::ptr_eq(a, b))),
                _ => Err(binary_type_error(op, &lhs, &rhs)),
            },
            (Value::Lambda(a), Value::Lambda(b)) => match op {
                Eq => Ok(Value::Bool(a.same_closure(b))),
                NotEq => Ok(Value::Bool(!a.same_closure(b))),
                _ => Err(binary_type_error(op, &lhs, &rhs)),
            },
            _ => match op {
                // remaining cross-type pairs are unequal, nothing else is defined
                Eq => Ok(Value::Bool(false)),
                NotEq => Ok(Value::Bool(true)),
                _ => Err(binary_type_error(op, &lhs, &rhs)),
            },
        }
    }
}

fn eval_unary(op: UnaryOp, value: Value) -> RuntimeResult<Value> {
    match op {
        UnaryOp::Neg => match value {
            Value::Int(v) => Ok(Value::Int(-v)),
            other => Err(RuntimeError::TypeMismatch {
                message: format!("unary `-` is not defined for {}", other.type_name()),
            }),
        },
        UnaryOp::Not => match value {
            Value::Bool(v) => Ok(Value::Bool(!v)),
            Value::Int(v) => Ok(Value::Bool(v == 0)),
            other => Err(RuntimeError::TypeMismatch {
                message: format!("unary `!` is not defined for {}", other.type_name()),
            }),
        },
    }
}

/// Integer division with the quotient rounded toward negative infinity.
fn floor_div(a: i64, b: i64) -> RuntimeResult<Value> {
    if b == 0 {
        return Err(RuntimeError::DivisionByZero);
    }
    let quotient = a / b;
    let remainder = a % b;
    if remainder != 0 && (remainder < 0) != (b < 0) {
        Ok(Value::Int(quotient - 1))
    } else {
        Ok(Value::Int(quotient))
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        _ => false,
    }
}

fn coerce_int(value: &Value) -> i64 {
    match value {
        Value::Bool(b) => i64::from(*b),
        Value::Int(i) => *i,
        _ => 0,
    }
}

fn binary_type_error(op: BinaryOp, lhs: &Value, rhs: &Value) -> RuntimeError {
    RuntimeError::TypeMismatch {
        message: format!(
            "`{}` is not defined for {} and {}",
            op_symbol(op),
            lhs.type_name(),
            rhs.type_name()
        ),
    }
}

fn op_symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Lt => "<",
        BinaryOp::Gt => ">",
        BinaryOp::LtEq => "<=",
        BinaryOp::GtEq => ">=",
        BinaryOp::Eq => "==",
        BinaryOp::NotEq => "!=",
        BinaryOp::And => "&&",
        BinaryOp::Or => "||",
    }
}

/// Splits a field path into everything before the final segment (possibly
/// empty) and the final segment itself.
fn split_last(path: &str) -> (&str, &str) {
    match path.rsplit_once('.') {
        Some((init, last)) => (init, last),
        None => ("", path),
    }
}

/// Follows the intermediate segments of a dotted path, resolving each
/// through the proto chain; every step must land on an object.
fn walk_segments(base: &str, root: ObjectRef, init: &str) -> RuntimeResult<ObjectRef> {
    let mut current = root;
    if init.is_empty() {
        return Ok(current);
    }
    for segment in init.split('.') {
        match read_field(&current, segment, base)? {
            Value::Object(next) => current = next,
            _ => {
                return Err(RuntimeError::NotAnObject {
                    name: format!("{base}.{segment}"),
                })
            }
        }
    }
    Ok(current)
}

fn read_field(object: &ObjectRef, field: &str, owner: &str) -> RuntimeResult<Value> {
    if field == PROTO {
        return Ok(match object.borrow().proto() {
            Some(proto) => Value::Object(proto),
            None => Value::Nil,
        });
    }
    match lookup_field(object, field)? {
        Some(cell) => Ok(cell.borrow().clone()),
        None => Err(RuntimeError::UnknownField {
            name: owner.to_string(),
            field: field.to_string(),
        }),
    }
}
