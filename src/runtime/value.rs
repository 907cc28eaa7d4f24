use crate::language::ast::{FunctionDef, LambdaDef};
use crate::runtime::error::{RuntimeError, RuntimeResult};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// One mutable storage slot. Every name that refers to the same cell
/// observes the same value; aliasing cells is how reference parameters and
/// closure captures share state.
pub type Cell = Rc<RefCell<Value>>;

pub fn new_cell(value: Value) -> Cell {
    Rc::new(RefCell::new(value))
}

pub type ObjectRef = Rc<RefCell<Object>>;

#[derive(Clone, Debug)]
pub enum Value {
    Nil,
    Int(i64),
    Bool(bool),
    Str(String),
    Object(ObjectRef),
    Function(Rc<FunctionDef>),
    Lambda(LambdaValue),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Int(_) => "int",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
            Value::Lambda(_) => "lambda",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Str(v) => write!(f, "{v}"),
            Value::Object(_) => write!(f, "<object>"),
            Value::Function(def) => write!(f, "<function {}>", def.name),
            Value::Lambda(_) => write!(f, "<lambda>"),
        }
    }
}

/// A lambda reference: the definition node plus the bindings snapshot taken
/// when the lambda expression was evaluated. The snapshot cells are shared
/// between every copy of this value, so mutations made by one invocation are
/// visible to the next.
#[derive(Clone, Debug)]
pub struct LambdaValue {
    pub def: Rc<LambdaDef>,
    pub captures: HashMap<String, Cell>,
}

impl LambdaValue {
    /// Two lambda references are the same closure when they carry the same
    /// definition node and the same capture cells.
    pub fn same_closure(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.def, &other.def)
            && self.captures.len() == other.captures.len()
            && self.captures.iter().all(|(name, cell)| {
                other
                    .captures
                    .get(name)
                    .map_or(false, |theirs| Rc::ptr_eq(cell, theirs))
            })
    }
}

/// Prototype-chained field storage. Ordinary fields are boxed in cells;
/// `proto` is held directly as an optional object reference.
#[derive(Debug, Default)]
pub struct Object {
    fields: HashMap<String, Cell>,
    proto: Option<ObjectRef>,
}

impl Object {
    pub fn empty() -> ObjectRef {
        Rc::new(RefCell::new(Object::default()))
    }

    /// Writes always hit an own field: an existing cell is overwritten in
    /// place (preserving aliases), otherwise a fresh cell is created.
    pub fn set_field(&mut self, name: &str, value: Value) {
        match self.fields.get(name) {
            Some(cell) => *cell.borrow_mut() = value,
            None => {
                self.fields.insert(name.to_string(), new_cell(value));
            }
        }
    }

    pub fn proto(&self) -> Option<ObjectRef> {
        self.proto.clone()
    }

    pub fn set_proto(&mut self, proto: Option<ObjectRef>) {
        self.proto = proto;
    }
}

/// Resolves a field by walking the proto chain, own fields first. Returns
/// the field's cell so callers can read or alias it. A chain that loops back
/// on itself is a fault.
pub fn lookup_field(object: &ObjectRef, name: &str) -> RuntimeResult<Option<Cell>> {
    let mut visited: Vec<*const RefCell<Object>> = Vec::new();
    let mut current = Rc::clone(object);
    loop {
        let ptr = Rc::as_ptr(&current);
        if visited.contains(&ptr) {
            return Err(RuntimeError::ProtoCycle);
        }
        visited.push(ptr);
        let next = {
            let borrowed = current.borrow();
            if let Some(cell) = borrowed.fields.get(name) {
                return Ok(Some(Rc::clone(cell)));
            }
            borrowed.proto()
        };
        match next {
            Some(proto) => current = proto,
            None => return Ok(None),
        }
    }
}
