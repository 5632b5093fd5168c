use std::time::Duration;

use pcp_exec::Fault;
use pretty_assertions::assert_eq;
use speculoos::prelude::*;

mod common;
use common::*;

const ECHO: &str = r#"
import java.util.Scanner;

public class Main {
    public static void main(String[] args) {
        Scanner in = new Scanner(System.in);
        while (in.hasNext()) {
            System.out.println(in.next());
        }
    }
}
"#;

#[test]
fn test_echo_tokens() {
    setup();
    if !has_java() {
        return;
    }
    let executor = executor(Duration::from_secs(20));
    let res = executor.execute(&java(ECHO, "1 2 3 4 5")).unwrap();
    assert_that!(res.compiled()).is_true();
    assert_that!(res.exception()).is_false();
    assert_that!(res.timed_out()).is_false();
    assert_eq!(res.stdout(), Some("1\n2\n3\n4\n5\n"));
}

#[test]
fn test_compile_error() {
    setup();
    if !has_java() {
        return;
    }
    let executor = executor(Duration::from_secs(20));
    let res = executor
        .execute(&java("public class Main { void f() { int x = ; } }", ""))
        .unwrap();
    assert_that!(res.compiled()).is_false();
    assert_that!(res.exception()).is_true();
    assert_that!(res.stdout()).is_none();
}

#[test]
fn test_missing_entry_point() {
    setup();
    if !has_java() {
        return;
    }
    let executor = executor(Duration::from_secs(20));
    let res = executor
        .execute(&java("public class Main { public void main() {} }", ""))
        .unwrap();
    assert_that!(res.compiled()).is_false();
    assert_that!(res.exception()).is_true();
}

#[test]
fn test_system_exit() {
    setup();
    if !has_java() {
        return;
    }
    let executor = executor(Duration::from_secs(20));
    let exits = ["System.exit(0);", "System.exit(3);", "Runtime.getRuntime().halt(0);"];
    for exit in exits {
        let source = format!(
            "public class Main {{\n    public static void main(String[] args) {{\n        System.out.println(\"bye\");\n        {}\n    }}\n}}\n",
            exit
        );
        let res = executor.execute(&java(&source, "")).unwrap();
        assert_that!(res.compiled()).is_true();
        assert_that!(res.exception()).is_true();
        assert_eq!(res.fault(), Some(&Fault::TerminationAttempt), "{}", exit);
        assert_eq!(res.stdout(), Some("bye\n"));
        let res = executor.execute(&java(ECHO, "still alive")).unwrap();
        assert_eq!(res.stdout(), Some("still\nalive\n"));
    }
}

#[test]
fn test_runtime_exception() {
    setup();
    if !has_java() {
        return;
    }
    let executor = executor(Duration::from_secs(20));
    let source = r#"
public class Main {
    public static void main(String[] args) {
        int zero = args.length;
        System.out.println(1 / zero);
    }
}
"#;
    let res = executor.execute(&java(source, "")).unwrap();
    assert_that!(res.compiled()).is_true();
    assert_that!(res.exception()).is_true();
    assert_that!(res.stderr().unwrap()).contains("ArithmeticException");
    assert_that!(matches!(res.fault(), Some(Fault::RuntimeFault(_)))).is_true();
}

#[test]
fn test_same_class_name_back_to_back() {
    setup();
    if !has_java() {
        return;
    }
    let executor = executor(Duration::from_secs(20));
    let make = |text: &str| {
        format!(
            "public class Main {{ static String TEXT = \"{}\"; \
             public static void main(String[] a) {{ System.out.println(TEXT); }} }}",
            text
        )
    };
    let res = executor.execute(&java(&make("first"), "")).unwrap();
    assert_eq!(res.stdout(), Some("first\n"));
    let res = executor.execute(&java(&make("second"), "")).unwrap();
    assert_eq!(res.stdout(), Some("second\n"));
}

#[test]
fn test_infinite_loop() {
    setup();
    if !has_java() {
        return;
    }
    let limit = Duration::from_secs(3);
    let executor = executor(limit);
    let source = "public class Main { public static void main(String[] a) { while (true) {} } }";
    let res = executor.execute(&java(source, "")).unwrap();
    assert_that!(res.compiled()).is_true();
    assert_that!(res.timed_out()).is_true();
    assert_that!(res.exception()).is_false();
    assert_that!(res.elapsed()).is_greater_than_or_equal_to(limit);
    assert_that!(res.elapsed()).is_less_than(limit + Duration::from_secs(2));
}
