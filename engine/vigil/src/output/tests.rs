use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_scope_captures_lines() {
    let scope = OutputScope::acquire();
    assert!(is_capturing());
    print_line(format_args!("hello {}", 42));
    crate::capture_print!("second");
    assert_eq!(scope.release(), "hello 42\nsecond\n");
    assert!(!is_capturing());
}

#[test]
fn test_nested_scopes_are_isolated() {
    let outer = OutputScope::acquire();
    crate::capture_print!("outer before");
    let inner = OutputScope::acquire();
    crate::capture_print!("inner");
    assert_eq!(inner.release(), "inner\n");
    crate::capture_print!("outer after");
    assert_eq!(outer.release(), "outer before\nouter after\n");
}

#[test]
fn test_drop_restores_enclosing_scope() {
    let outer = OutputScope::acquire();
    {
        let _inner = OutputScope::acquire();
        crate::capture_print!("discarded");
    }
    crate::capture_print!("kept");
    assert_eq!(outer.release(), "kept\n");
}

#[test]
fn test_panic_inside_scope_restores() {
    let outer = OutputScope::acquire();
    let result = std::panic::catch_unwind(|| {
        let _inner = OutputScope::acquire();
        crate::capture_print!("partial");
        panic!("body failed");
    });
    assert!(result.is_err());
    crate::capture_print!("after");
    assert_eq!(outer.release(), "after\n");
}

#[test]
fn test_scope_writer_targets_innermost_scope() {
    let scope = OutputScope::acquire();
    let mut writer = ScopeWriter::new();
    write!(writer, "a").unwrap();
    writeln!(writer, "b").unwrap();
    assert_eq!(scope.release(), "ab\n");
}

#[test]
fn test_buffer_target_shares_contents() {
    let buffer = SharedBuffer::new();
    let mut sink = OutputTarget::Buffer(buffer.clone()).open().unwrap();
    sink.line(format_args!("one"));
    sink.text("two");
    sink.flush();
    assert_eq!(buffer.contents(), "one\ntwo");
    buffer.clear();
    assert_eq!(buffer.contents(), "");
}

#[test]
fn test_file_target_writes_on_flush() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.txt");
    {
        let mut sink = OutputTarget::File(path.clone()).open().unwrap();
        sink.line(format_args!("line"));
        sink.flush();
    }
    assert_eq!(std::fs::read_to_string(path).unwrap(), "line\n");
}

#[test]
fn test_file_target_missing_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let target = OutputTarget::File(dir.path().join("missing").join("report.txt"));
    assert!(target.open().is_err());
}

#[test]
fn test_print_without_scope_falls_through() {
    assert!(!is_capturing());
    print_line(format_args!("uncaptured line"));
    let scope = OutputScope::acquire();
    assert_eq!(scope.release(), "");
}
