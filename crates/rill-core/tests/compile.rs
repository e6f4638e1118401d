// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! End-to-end compiles: whole programs in, emitted module text and
//! diagnostics out.

use rill_core::compile::compile_source;
use rill_core::diagnostics::Severity;

#[test]
fn empty_program_defines_main() {
    let result = compile_source("program p is begin end program.");
    assert!(result.succeeded(), "{:?}", result.diagnostics.records());
    assert!(result.module.contains("define i32 @main(){"));
    assert!(result.module.contains("ret i32 0"));
}

#[test]
fn global_store_of_a_sum() {
    let result = compile_source(
        "program p is variable x : integer; begin x := 3 + 4; end program.",
    );
    assert!(result.succeeded(), "{:?}", result.diagnostics.records());
    assert!(result.module.contains("@x = global i32 zeroinitializer"));
    assert!(result.module.contains("add i32 3, 4"));
    assert!(result.module.contains("store i32 %1, i32* @x"));
}

#[test]
fn bool_into_int_converts_without_error() {
    let result = compile_source(
        "program p is variable x : integer; begin x := true; end program.",
    );
    assert!(result.succeeded(), "{:?}", result.diagnostics.records());
    assert!(result.module.contains("zext i1 true to i32"));
}

#[test]
fn string_into_int_is_an_error() {
    let result = compile_source(
        "program p is variable x : integer; begin x := \"hi\"; end program.",
    );
    assert!(!result.succeeded());
    let messages: Vec<String> = result
        .diagnostics
        .records()
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .map(|d| d.message.to_string())
        .collect();
    assert!(
        messages.iter().any(|m| m.contains("integer") && m.contains("string")),
        "{messages:?}"
    );
}

#[test]
fn procedure_returning_a_constant() {
    let result = compile_source(
        "program p is procedure f : integer () begin return 1; end procedure; \
         begin end program.",
    );
    assert!(result.succeeded(), "{:?}", result.diagnostics.records());
    assert!(result.module.contains("define i32 @f(){"));
    assert!(result.module.contains("ret i32 1"));
}

#[test]
fn array_declaration_and_indexed_store() {
    let result = compile_source(
        "program p is variable a : integer[4]; begin a[0] := 1; end program.",
    );
    assert!(result.succeeded(), "{:?}", result.diagnostics.records());
    assert!(result.module.contains("[4 x i32]"));
    assert!(result
        .module
        .contains("getelementptr inbounds [4 x i32], [4 x i32]* @a, i32 0, i32 0"));
    assert!(result.module.contains("store i32 1,"));
}

// ============================================================================
// Boundary behaviors
// ============================================================================

#[test]
fn nested_block_comments_of_depth_ten() {
    let mut source = String::from("program p is ");
    for _ in 0..10 {
        source.push_str("/* ");
    }
    for _ in 0..10 {
        source.push_str("*/ ");
    }
    source.push_str("begin end program.");
    let result = compile_source(&source);
    assert!(result.succeeded(), "{:?}", result.diagnostics.records());
}

#[test]
fn unclosed_block_comment_warns_only() {
    let result = compile_source("program p is begin end program. /* drifting off");
    assert!(result.succeeded());
    assert_eq!(result.diagnostics.warning_count(), 1);
}

#[test]
fn unterminated_string_is_an_error() {
    let result = compile_source("program p is begin end program. \"drifting");
    assert!(!result.succeeded());
}

#[test]
fn zero_bound_recovers_as_one() {
    let result = compile_source(
        "program p is variable a : integer[0]; begin a[0] := 1; end program.",
    );
    assert!(!result.succeeded());
    // The bound heals to 1 so the rest of the program still compiles.
    assert!(result.module.contains("[1 x i32]"));
}

// ============================================================================
// Quantified invariants
// ============================================================================

#[test]
fn one_define_per_procedure_plus_main() {
    let result = compile_source(
        "program p is \
         procedure f : integer () begin return 1; end procedure; \
         procedure g : integer () begin return 2; end procedure; \
         begin end program.",
    );
    assert!(result.succeeded(), "{:?}", result.diagnostics.records());
    let defines = result.module.matches("define ").count();
    assert_eq!(defines, 3);
}

#[test]
fn every_array_index_in_bounds_type_checks() {
    let mut body = String::new();
    for i in 0..4 {
        body.push_str(&format!("a[{i}] := a[{i}] + 1;\n"));
    }
    let result = compile_source(&format!(
        "program p is variable a : integer[4]; begin {body} end program."
    ));
    assert!(result.succeeded(), "{:?}", result.diagnostics.records());
}

#[test]
fn recursion_through_own_name_compiles_clean() {
    let result = compile_source(
        "program p is \
         procedure count : integer (variable n : integer) \
         begin \
         if (n <= 0) then return 0; end if; \
         return count(n - 1); \
         end procedure; \
         begin end program.",
    );
    assert!(result.succeeded(), "{:?}", result.diagnostics.records());
    assert!(result.module.contains("call i32 @count(i32"));
}

#[test]
fn float_arithmetic_infers_float() {
    let result = compile_source(
        "program p is variable y : float; begin y := 2 * 3.5; end program.",
    );
    assert!(result.succeeded(), "{:?}", result.diagnostics.records());
    assert!(result.module.contains("fmul float"));
}

#[test]
fn diagnostics_come_out_in_source_order() {
    let result = compile_source(
        "program p is\n\
         variable x : integer;\n\
         begin\n\
         x := \"a\";\n\
         x := \"b\";\n\
         end program.",
    );
    assert!(!result.succeeded());
    let error_lines: Vec<u32> = result
        .diagnostics
        .records()
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .map(|d| d.line)
        .collect();
    let mut sorted = error_lines.clone();
    sorted.sort_unstable();
    assert_eq!(error_lines, sorted);
}

#[test]
fn section_order_is_stable() {
    let result = compile_source(
        "program p is variable x : integer; variable ok : bool; \
         begin x := 1; ok := putstring(\"hi\"); end program.",
    );
    assert!(result.succeeded(), "{:?}", result.diagnostics.records());
    let module = &result.module;
    let globals = module.find("@x = global").unwrap();
    let strings = module.find("@.str.0").unwrap();
    let declares = module.find("declare i1 @putstring").unwrap();
    let body = module.find("define i32 @main()").unwrap();
    assert!(globals < strings && strings < declares && declares < body);
}

#[test]
fn demo_programs_compile_clean() {
    let demos = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../demos")
        .canonicalize()
        .expect("demos directory");
    let mut seen = 0;
    for entry in std::fs::read_dir(demos).expect("readable demos directory") {
        let path = entry.expect("directory entry").path();
        if path.extension().map_or(true, |ext| ext != "src") {
            continue;
        }
        seen += 1;
        let source = std::fs::read_to_string(&path).expect("readable demo");
        let result = compile_source(&source);
        assert!(
            result.succeeded(),
            "{}: {:?}",
            path.display(),
            result.diagnostics.records()
        );
        assert!(result.module.contains("define i32 @main(){"));
    }
    assert!(seen >= 4, "expected the demo corpus, found {seen} programs");
}

#[test]
fn full_io_program_compiles() {
    // Procedure calls are expressions, not statements, so the `put` calls
    // land on the right of assignments.
    let result = compile_source(
        "program echo is\n\
         variable n : integer;\n\
         variable i : integer;\n\
         variable total : float;\n\
         variable ok : bool;\n\
         begin\n\
         n := getinteger();\n\
         total := 0.0;\n\
         for (i := 0; i < n)\n\
         total := total + sqrt(i);\n\
         i := i + 1;\n\
         end for;\n\
         ok := putfloat(total);\n\
         end program.",
    );
    assert!(result.succeeded(), "{:?}", result.diagnostics.records());
    assert!(result.module.contains("call i32 @getinteger()"));
    assert!(result.module.contains("call float @altsqrt(i32"));
    assert!(result.module.contains("call i1 @putfloat(float"));
}
