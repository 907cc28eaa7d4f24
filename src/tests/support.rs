//! Node builders and run helpers shared by the end-to-end tests. Programs
//! are constructed the way the external parser would hand them over.

use crate::language::ast::{
    AssignStmt, BinaryOp, CallExpr, Expr, FunctionDef, IfStmt, LambdaDef, Literal, Param,
    PassMode, Program, ReturnStmt, Statement, WhileStmt,
};
use crate::runtime::console::ScriptedConsole;
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::Interpreter;
use std::rc::Rc;

pub fn int(value: i64) -> Expr {
    Expr::Literal(Literal::Int(value))
}

pub fn text(value: &str) -> Expr {
    Expr::Literal(Literal::Str(value.into()))
}

pub fn boolean(value: bool) -> Expr {
    Expr::Literal(Literal::Bool(value))
}

pub fn nil() -> Expr {
    Expr::Literal(Literal::Nil)
}

pub fn var(name: &str) -> Expr {
    Expr::Variable(name.into())
}

pub fn new_object() -> Expr {
    Expr::NewObject
}

pub fn bin(op: BinaryOp, op1: Expr, op2: Expr) -> Expr {
    Expr::Binary {
        op,
        op1: Box::new(op1),
        op2: Box::new(op2),
    }
}

pub fn lambda(params: Vec<Param>, statements: Vec<Statement>) -> Expr {
    Expr::Lambda(Rc::new(LambdaDef { params, statements }))
}

pub fn call(name: &str, args: Vec<Expr>) -> CallExpr {
    CallExpr {
        objref: None,
        name: name.into(),
        args,
    }
}

pub fn mcall(objref: &str, name: &str, args: Vec<Expr>) -> CallExpr {
    CallExpr {
        objref: Some(objref.into()),
        name: name.into(),
        args,
    }
}

pub fn call_expr(name: &str, args: Vec<Expr>) -> Expr {
    Expr::Call(call(name, args))
}

pub fn mcall_expr(objref: &str, name: &str, args: Vec<Expr>) -> Expr {
    Expr::Call(mcall(objref, name, args))
}

pub fn assign(target: &str, value: Expr) -> Statement {
    Statement::Assign(AssignStmt {
        target: target.into(),
        value,
    })
}

pub fn call_stmt(call: CallExpr) -> Statement {
    Statement::Call(call)
}

pub fn print_stmt(args: Vec<Expr>) -> Statement {
    call_stmt(call("print", args))
}

pub fn ret(expression: Expr) -> Statement {
    Statement::Return(ReturnStmt {
        expression: Some(expression),
    })
}

pub fn ret_void() -> Statement {
    Statement::Return(ReturnStmt { expression: None })
}

pub fn if_stmt(condition: Expr, statements: Vec<Statement>) -> Statement {
    Statement::If(IfStmt {
        condition,
        statements,
        else_statements: None,
    })
}

pub fn if_else(
    condition: Expr,
    statements: Vec<Statement>,
    else_statements: Vec<Statement>,
) -> Statement {
    Statement::If(IfStmt {
        condition,
        statements,
        else_statements: Some(else_statements),
    })
}

pub fn while_stmt(condition: Expr, statements: Vec<Statement>) -> Statement {
    Statement::While(WhileStmt {
        condition,
        statements,
    })
}

pub fn param(name: &str) -> Param {
    Param {
        name: name.into(),
        mode: PassMode::ByValue,
    }
}

pub fn ref_param(name: &str) -> Param {
    Param {
        name: name.into(),
        mode: PassMode::ByRef,
    }
}

pub fn func(name: &str, params: Vec<Param>, statements: Vec<Statement>) -> FunctionDef {
    FunctionDef {
        name: name.into(),
        params,
        statements,
    }
}

pub fn run_with_inputs(
    functions: Vec<FunctionDef>,
    inputs: &[&str],
) -> (RuntimeResult<()>, Vec<String>) {
    let console = ScriptedConsole::new(inputs.iter().copied());
    let captured = console.captured();
    let mut interpreter = Interpreter::new(Program::new(functions), Box::new(console));
    let result = interpreter.run();
    let outputs = captured.borrow().clone();
    (result, outputs)
}

pub fn run_ok(functions: Vec<FunctionDef>) -> Vec<String> {
    let (result, outputs) = run_with_inputs(functions, &[]);
    match result {
        Ok(()) => outputs,
        Err(err) => panic!("program failed with {err}"),
    }
}

pub fn run_main(statements: Vec<Statement>) -> Vec<String> {
    run_ok(vec![func("main", Vec::new(), statements)])
}

pub fn run_err(functions: Vec<FunctionDef>) -> RuntimeError {
    let (result, _) = run_with_inputs(functions, &[]);
    match result {
        Err(err) => err,
        Ok(()) => panic!("program unexpectedly succeeded"),
    }
}

pub fn run_main_err(statements: Vec<Statement>) -> RuntimeError {
    run_err(vec![func("main", Vec::new(), statements)])
}

pub fn lines(outputs: &[&str]) -> Vec<String> {
    outputs.iter().map(|line| line.to_string()).collect()
}
