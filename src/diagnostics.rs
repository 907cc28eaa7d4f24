use crate::runtime::error::RuntimeError;
use miette::Report;

/// Renders an uncaught runtime error for the driver: the error kind the
/// language defines (NAME, TYPE, FAULT) followed by the diagnostic itself.
pub fn report_runtime_error(error: RuntimeError) {
    let kind = error.kind();
    eprintln!("{kind} error: {:?}", Report::new(error));
}
