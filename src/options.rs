//! Edit options (O in spec.md §3): the `<default-operation>`/`<test-option>`/
//! `<error-option>` triple parsed out of `<edit-config>`.
//!
//! Grounded on `original_source/apps/netconf/netconf_rpc.c`'s
//! `get_edit_opts`/`enum operation_type`/`enum test_option`/`enum
//! error_option`. The core only ever accepts the default test/error option
//! (`spec.md` §3); anything else is rejected with `operation-not-supported`
//! by the caller in [`crate::operations`].

/// `<default-operation>` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Merge,
    Replace,
    None,
    Create,
    Delete,
    Remove,
}

impl Operation {
    pub fn parse(s: &str) -> Option<Operation> {
        Some(match s {
            "merge" => Operation::Merge,
            "replace" => Operation::Replace,
            "none" => Operation::None,
            "create" => Operation::Create,
            "delete" => Operation::Delete,
            "remove" => Operation::Remove,
            _ => return None,
        })
    }
}

impl Default for Operation {
    fn default() -> Operation {
        Operation::Merge
    }
}

/// `<test-option>` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestOption {
    Set,
    TestThenSet,
    TestOnly,
}

impl TestOption {
    pub fn parse(s: &str) -> Option<TestOption> {
        Some(match s {
            "set" => TestOption::Set,
            "test-then-set" => TestOption::TestThenSet,
            "test-only" => TestOption::TestOnly,
            _ => return None,
        })
    }
}

impl Default for TestOption {
    fn default() -> TestOption {
        TestOption::TestThenSet
    }
}

/// `<error-option>` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorOption {
    StopOnError,
    ContinueOnError,
}

impl ErrorOption {
    pub fn parse(s: &str) -> Option<ErrorOption> {
        Some(match s {
            "stop-on-error" => ErrorOption::StopOnError,
            "continue-on-error" => ErrorOption::ContinueOnError,
            _ => return None,
        })
    }
}

impl Default for ErrorOption {
    fn default() -> ErrorOption {
        ErrorOption::StopOnError
    }
}

/// The full options triple, defaulting to {merge, test-then-set,
/// stop-on-error} per spec.md §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EditOptions {
    pub operation: Operation,
    pub test_option: TestOption,
    pub error_option: ErrorOption,
}

impl EditOptions {
    /// Whether this triple is one the core supports: only the default
    /// test/error options (spec.md §3's "Core supports only the default
    /// test/error options; other combinations are rejected").
    pub fn is_supported(&self) -> bool {
        self.test_option == TestOption::TestThenSet && self.error_option == ErrorOption::StopOnError
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let opts = EditOptions::default();
        assert_eq!(opts.operation, Operation::Merge);
        assert_eq!(opts.test_option, TestOption::TestThenSet);
        assert_eq!(opts.error_option, ErrorOption::StopOnError);
        assert!(opts.is_supported());
    }

    #[test]
    fn non_default_test_option_is_unsupported() {
        let opts = EditOptions {
            test_option: TestOption::TestOnly,
            ..EditOptions::default()
        };
        assert!(!opts.is_supported());
    }

    #[test]
    fn parses_all_variants() {
        assert_eq!(Operation::parse("replace"), Some(Operation::Replace));
        assert_eq!(Operation::parse("bogus"), None);
        assert_eq!(TestOption::parse("test-only"), Some(TestOption::TestOnly));
        assert_eq!(ErrorOption::parse("continue-on-error"), Some(ErrorOption::ContinueOnError));
    }
}
