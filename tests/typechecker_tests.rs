mod common;

use cmmc::ast::BinaryOp;
use cmmc::symtab::ScopePolicy;
use cmmc::typechecker::types::Type;
use cmmc::typechecker::{ErrorCode, SemanticError, TypeChecker};

use common::*;

fn check(program: &cmmc::ast::Program) -> Result<(), Vec<SemanticError>> {
    cmmc::check(program)
}

fn errors_of(program: &cmmc::ast::Program) -> Vec<SemanticError> {
    check(program).unwrap_err()
}

/// Wraps statements into `int main() { ... }`.
fn main_with(defs: Vec<cmmc::ast::Def>, stmts: Vec<cmmc::ast::Stmt>) -> cmmc::ast::Program {
    program(vec![fun_def("main", int_spec(), vec![], block(defs, stmts), 1)])
}

#[test]
fn undefined_variable_renders_code_and_line() {
    let prog = main_with(vec![], vec![expr_stmt(var("x", 2))]);
    let errors = errors_of(&prog);
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].to_string(),
        "Error type 1 at Line 2: Undefined variable \"x\"."
    );
}

#[test]
fn redefined_variable_in_same_scope() {
    let prog = main_with(
        vec![def(
            int_spec(),
            vec![dec(var_dec("a", 2)), dec(var_dec("a", 3))],
        )],
        vec![],
    );
    let errors = errors_of(&prog);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, ErrorCode::RedefinedVariable);
    assert_eq!(errors[0].line, 3);
}

#[test]
fn redefinition_inside_struct_body_is_a_field_error() {
    let fields = vec![def(
        int_spec(),
        vec![dec(var_dec("x", 2)), dec(var_dec("x", 3))],
    )];
    let prog = program(vec![type_def(struct_def("s", fields, 1))]);
    let errors = errors_of(&prog);
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].to_string(),
        "Error type 15 at Line 3: Redefined field \"x\"."
    );
}

#[test]
fn shadowing_is_allowed_in_an_inner_scope() {
    let inner = block(vec![def(int_spec(), vec![dec(var_dec("a", 3))])], vec![]);
    let prog = main_with(
        vec![def(int_spec(), vec![dec(var_dec("a", 2))])],
        vec![cmmc::ast::Stmt::Compound(inner)],
    );
    assert!(check(&prog).is_ok());
}

#[test]
fn assignment_type_mismatch() {
    let prog = main_with(
        vec![def(int_spec(), vec![dec(var_dec("a", 2))])],
        vec![expr_stmt(assign(var("a", 3), float_lit(1.5, 3)))],
    );
    let errors = errors_of(&prog);
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].to_string(),
        "Error type 5 at Line 3: Type mismatched for assignment."
    );
}

#[test]
fn assignment_into_an_rvalue() {
    let prog = main_with(vec![], vec![expr_stmt(assign(lit(1, 2), lit(2, 2)))]);
    let errors = errors_of(&prog);
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].to_string(),
        "Error type 6 at Line 2: The left-hand side of an assignment must be a variable."
    );
}

#[test]
fn operand_type_mismatch() {
    let prog = main_with(
        vec![],
        vec![expr_stmt(bin(BinaryOp::Add, lit(1, 2), float_lit(2.0, 2)))],
    );
    let errors = errors_of(&prog);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, ErrorCode::OperandMismatch);
}

#[test]
fn return_type_mismatch() {
    let prog = main_with(vec![], vec![ret(float_lit(1.5, 2))]);
    let errors = errors_of(&prog);
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].to_string(),
        "Error type 8 at Line 2: Type mismatched for return."
    );
}

#[test]
fn argument_mismatch_quotes_both_signatures() {
    let f = fun_def(
        "f",
        int_spec(),
        vec![param("x", 1)],
        block(vec![], vec![ret(lit(0, 1))]),
        1,
    );
    let prog = program(vec![
        f,
        fun_def(
            "main",
            int_spec(),
            vec![],
            block(vec![], vec![expr_stmt(call("f", vec![float_lit(1.0, 3)], 3))]),
            2,
        ),
    ]);
    let errors = errors_of(&prog);
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].to_string(),
        "Error type 9 at Line 3: Function \"f(int)\" is not applicable for arguments \"(float)\"."
    );
}

#[test]
fn indexing_a_scalar_is_not_an_array() {
    let prog = main_with(
        vec![def(int_spec(), vec![dec(var_dec("x", 2))])],
        vec![expr_stmt(index(var("x", 3), lit(0, 3)))],
    );
    let errors = errors_of(&prog);
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].to_string(),
        "Error type 10 at Line 3: \"x\" is not an array."
    );
}

#[test]
fn calling_a_variable_is_not_a_function() {
    let prog = main_with(
        vec![def(int_spec(), vec![dec(var_dec("x", 2))])],
        vec![expr_stmt(call("x", vec![], 3))],
    );
    let errors = errors_of(&prog);
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].to_string(),
        "Error type 11 at Line 3: \"x\" is not a function."
    );
}

#[test]
fn non_integer_index() {
    let prog = main_with(
        vec![def(int_spec(), vec![dec(array_dec("a", &[3], 2))])],
        vec![expr_stmt(index(var("a", 3), float_lit(1.5, 3)))],
    );
    let errors = errors_of(&prog);
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].to_string(),
        "Error type 12 at Line 3: \"1.5\" is not an integer."
    );
}

#[test]
fn dot_on_a_non_struct() {
    let prog = main_with(
        vec![def(int_spec(), vec![dec(var_dec("x", 2))])],
        vec![expr_stmt(member(var("x", 3), "f"))],
    );
    let errors = errors_of(&prog);
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].to_string(),
        "Error type 13 at Line 3: Illegal use of \".\"."
    );
}

#[test]
fn missing_field() {
    let fields = vec![def(int_spec(), vec![dec(var_dec("x", 1))])];
    let prog = main_with(
        vec![def(struct_def("s", fields, 2), vec![dec(var_dec("p", 2))])],
        vec![expr_stmt(member(var("p", 3), "y"))],
    );
    let errors = errors_of(&prog);
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].to_string(),
        "Error type 14 at Line 3: Non-existent field \"y\"."
    );
}

#[test]
fn duplicated_struct_tag() {
    let prog = program(vec![
        type_def(struct_def(
            "s",
            vec![def(int_spec(), vec![dec(var_dec("x", 1))])],
            1,
        )),
        type_def(struct_def(
            "s",
            vec![def(int_spec(), vec![dec(var_dec("y", 2))])],
            2,
        )),
    ]);
    let errors = errors_of(&prog);
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].to_string(),
        "Error type 16 at Line 2: Duplicated name \"s\"."
    );
}

#[test]
fn undefined_structure_reference() {
    let prog = program(vec![globals(struct_ref("t", 1), vec![var_dec("a", 1)])]);
    let errors = errors_of(&prog);
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].to_string(),
        "Error type 17 at Line 1: Undefined structure \"t\"."
    );
}

#[test]
fn structurally_identical_structs_assign_cleanly() {
    let a_fields = vec![def(
        int_spec(),
        vec![dec(var_dec("x", 1)), dec(var_dec("y", 1))],
    )];
    let b_fields = vec![def(
        int_spec(),
        vec![dec(var_dec("u", 2)), dec(var_dec("v", 2))],
    )];
    let prog = program(vec![
        type_def(struct_def("a", a_fields, 1)),
        type_def(struct_def("b", b_fields, 2)),
        globals(struct_ref("a", 3), vec![var_dec("p", 3)]),
        globals(struct_ref("b", 4), vec![var_dec("q", 4)]),
        fun_def(
            "main",
            int_spec(),
            vec![],
            block(vec![], vec![expr_stmt(assign(var("p", 6), var("q", 6)))]),
            5,
        ),
    ]);
    assert!(check(&prog).is_ok());
}

#[test]
fn array_sizes_are_ignored_by_comparison() {
    let prog = main_with(
        vec![def(
            int_spec(),
            vec![dec(array_dec("a", &[3], 2)), dec(array_dec("b", &[5], 2))],
        )],
        vec![expr_stmt(assign(var("a", 3), var("b", 3)))],
    );
    assert!(check(&prog).is_ok());
}

#[test]
fn declaration_then_consistent_definition_leaves_one_defined_function() {
    let prog = program(vec![
        fun_decl("g", int_spec(), vec![param("n", 1)], 1),
        fun_def(
            "g",
            int_spec(),
            vec![param("n", 2)],
            block(vec![], vec![ret(var("n", 2))]),
            2,
        ),
    ]);
    let mut checker = TypeChecker::new();
    checker.check_program(&prog).unwrap();
    let symbol = checker.symbol_table().lookup("g").unwrap();
    assert!(matches!(
        symbol.ty,
        Type::Function {
            is_defined: true,
            ..
        }
    ));
}

#[test]
fn declared_but_never_defined_reports_once() {
    let prog = program(vec![
        fun_decl("g", int_spec(), vec![param("n", 1)], 1),
        fun_decl("g", int_spec(), vec![param("n", 2)], 2),
        fun_def(
            "main",
            int_spec(),
            vec![],
            block(
                vec![],
                vec![
                    expr_stmt(call("g", vec![lit(1, 4)], 4)),
                    expr_stmt(call("g", vec![lit(2, 5)], 5)),
                ],
            ),
            3,
        ),
    ]);
    let errors = errors_of(&prog);
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].to_string(),
        "Error type 18 at Line 1: Undefined function \"g\"."
    );
}

#[test]
fn calling_an_undeclared_function() {
    let prog = main_with(vec![], vec![expr_stmt(call("h", vec![lit(1, 2)], 2))]);
    let errors = errors_of(&prog);
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].to_string(),
        "Error type 2 at Line 2: Undefined function \"h\"."
    );
}

#[test]
fn read_and_write_are_accepted_without_declarations() {
    let prog = main_with(
        vec![def(int_spec(), vec![dec(var_dec("x", 2))])],
        vec![
            expr_stmt(assign(var("x", 3), call("read", vec![], 3))),
            expr_stmt(call("write", vec![var("x", 4)], 4)),
        ],
    );
    assert!(check(&prog).is_ok());
}

#[test]
fn redefining_a_function_body() {
    let body = || block(vec![], vec![ret(lit(0, 1))]);
    let prog = program(vec![
        fun_def("f", int_spec(), vec![], body(), 1),
        fun_def("f", int_spec(), vec![], body(), 2),
    ]);
    let errors = errors_of(&prog);
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].to_string(),
        "Error type 4 at Line 2: Redefined function \"f\"."
    );
}

#[test]
fn inconsistent_declaration() {
    let prog = program(vec![
        fun_def(
            "f",
            int_spec(),
            vec![],
            block(vec![], vec![ret(lit(0, 1))]),
            1,
        ),
        fun_decl("f", int_spec(), vec![param("x", 2)], 2),
    ]);
    let errors = errors_of(&prog);
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].to_string(),
        "Error type 19 at Line 2: Inconsistent declaration of function \"f\"."
    );
}

#[test]
fn recursion_sees_the_function_being_defined() {
    let prog = program(vec![fun_def(
        "fact",
        int_spec(),
        vec![param("n", 1)],
        block(
            vec![],
            vec![ret(call(
                "fact",
                vec![bin(BinaryOp::Subtract, var("n", 2), lit(1, 2))],
                2,
            ))],
        ),
        1,
    )]);
    assert!(check(&prog).is_ok());
}

#[test]
fn table_reports_whether_every_function_is_defined() {
    let declared = program(vec![fun_decl("g", int_spec(), vec![param("n", 1)], 1)]);
    let mut checker = TypeChecker::new();
    assert!(checker.check_program(&declared).is_err());
    assert!(!checker.symbol_table().all_functions_defined());

    let defined = program(vec![fun_def(
        "g",
        int_spec(),
        vec![param("n", 1)],
        block(vec![], vec![ret(var("n", 1))]),
        1,
    )]);
    let mut checker = TypeChecker::new();
    checker.check_program(&defined).unwrap();
    assert!(checker.symbol_table().all_functions_defined());
}

#[test]
fn flat_policy_retains_locals_after_analysis() {
    let prog = main_with(vec![def(int_spec(), vec![dec(var_dec("a", 2))])], vec![]);
    let mut checker = TypeChecker::with_policy(ScopePolicy::Flat);
    checker.check_program(&prog).unwrap();
    assert!(checker.symbol_table().lookup("a").is_some());
}
