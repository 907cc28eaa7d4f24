use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Write};
use std::rc::Rc;

/// Thin abstraction over the host console so drivers and tests can swap in
/// their own input source and output sink. `get_input` returns `None` once
/// the source is exhausted.
pub trait Console {
    fn get_input(&mut self) -> Option<String>;
    fn output(&mut self, text: &str);
}

/// Line-buffered stdin/stdout console used by interactive drivers.
pub struct StdConsole;

impl Console for StdConsole {
    fn get_input(&mut self) -> Option<String> {
        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => {
                while line.ends_with('\n') || line.ends_with('\r') {
                    line.pop();
                }
                Some(line)
            }
        }
    }

    fn output(&mut self, text: &str) {
        println!("{text}");
        let _ = io::stdout().flush();
    }
}

/// Console fed from a fixed input script, capturing output lines. Tests and
/// non-interactive embedders hand one of these to the interpreter and keep
/// the shared `captured` handle to inspect afterwards.
#[derive(Default)]
pub struct ScriptedConsole {
    inputs: VecDeque<String>,
    outputs: Rc<RefCell<Vec<String>>>,
}

impl ScriptedConsole {
    pub fn new<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            outputs: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Shared handle to the captured output lines; stays valid after the
    /// console has been handed to the interpreter.
    pub fn captured(&self) -> Rc<RefCell<Vec<String>>> {
        Rc::clone(&self.outputs)
    }
}

impl Console for ScriptedConsole {
    fn get_input(&mut self) -> Option<String> {
        self.inputs.pop_front()
    }

    fn output(&mut self, text: &str) {
        self.outputs.borrow_mut().push(text.to_string());
    }
}
