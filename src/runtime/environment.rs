use crate::runtime::value::{new_cell, Cell, Value};
use std::collections::HashMap;
use std::rc::Rc;

/// Diagnostics-only tag for a frame: the call it belongs to, or the block
/// kind that pushed it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScopeLabel {
    Call(String),
    If,
    While,
}

#[derive(Debug)]
struct Frame {
    label: ScopeLabel,
    bindings: HashMap<String, Cell>,
}

impl Frame {
    fn new(label: ScopeLabel) -> Self {
        Self {
            label,
            bindings: HashMap::new(),
        }
    }
}

/// The scope stack. Resolution is dynamic, not lexical: reads and
/// write-target resolution both walk the live frame stack innermost-out, so
/// a callee sees the frames of callers that have not been popped yet, for
/// the duration of the call.
#[derive(Debug)]
pub struct Environment {
    frames: Vec<Frame>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    pub fn push(&mut self, label: ScopeLabel) {
        self.frames.push(Frame::new(label));
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    /// Innermost-out walk; returns the first cell bound to `name`.
    pub fn lookup(&self, name: &str) -> Option<Cell> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.bindings.get(name).map(Rc::clone))
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.lookup(name).map(|cell| cell.borrow().clone())
    }

    /// If some frame already binds `name`, its cell is overwritten in place
    /// (every alias of that cell observes the write); otherwise a fresh cell
    /// is created in the topmost frame.
    pub fn declare_or_set(&mut self, name: &str, value: Value) {
        for frame in self.frames.iter().rev() {
            if let Some(cell) = frame.bindings.get(name) {
                *cell.borrow_mut() = value;
                return;
            }
        }
        self.bind_new(name, value);
    }

    /// Binds `name` to a fresh cell in the topmost frame, shadowing any
    /// outer binding of the same name.
    pub fn bind_new(&mut self, name: &str, value: Value) {
        self.bind_cell(name, new_cell(value));
    }

    /// Binds `name` in the topmost frame to an existing cell, aliasing it.
    pub fn bind_cell(&mut self, name: &str, cell: Cell) {
        if let Some(frame) = self.frames.last_mut() {
            frame.bindings.insert(name.to_string(), cell);
        }
    }

    /// Closure capture: every binding visible right now is copied into a
    /// newly independent cell holding its current value. Inner frames win on
    /// name collisions. Captured once; later mutations of the originals are
    /// not observed.
    pub fn snapshot(&self) -> HashMap<String, Cell> {
        let mut captured = HashMap::new();
        for frame in &self.frames {
            for (name, cell) in &frame.bindings {
                captured.insert(name.clone(), new_cell(cell.borrow().clone()));
            }
        }
        captured
    }
}
