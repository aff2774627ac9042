//! Where parse output goes.

/// Output and termination capability used by [`Program::parse`].
///
/// [`Program::parse`]: crate::Program::parse
pub trait Host {
    fn print(&self, text: &str);

    fn print_error(&self, text: &str) {
        self.print(text);
    }

    /// Called after an argument error has been reported.
    fn exit(&self, code: i32);
}

/// stdout for help and version, stderr for errors, and a real process exit.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdHost;

impl Host for StdHost {
    fn print(&self, text: &str) {
        println!("{text}");
    }

    fn print_error(&self, text: &str) {
        eprintln!("{text}");
    }

    fn exit(&self, code: i32) {
        std::process::exit(code);
    }
}

#[cfg(test)]
pub(crate) use recorder::Recorder;

#[cfg(test)]
mod recorder {
    use std::cell::{Cell, RefCell};

    use super::Host;

    /// Captures output instead of writing it.
    #[derive(Default)]
    pub(crate) struct Recorder {
        printed: RefCell<Vec<String>>,
        errors: RefCell<Vec<String>>,
        exit: Cell<Option<i32>>,
    }

    impl Recorder {
        pub(crate) fn printed(&self) -> Vec<String> {
            self.printed.borrow().clone()
        }

        pub(crate) fn errors(&self) -> Vec<String> {
            self.errors.borrow().clone()
        }

        pub(crate) fn exit_code(&self) -> Option<i32> {
            self.exit.get()
        }
    }

    impl Host for Recorder {
        fn print(&self, text: &str) {
            self.printed.borrow_mut().push(text.to_string());
        }

        fn print_error(&self, text: &str) {
            self.errors.borrow_mut().push(text.to_string());
        }

        fn exit(&self, code: i32) {
            self.exit.set(Some(code));
        }
    }

    #[test]
    fn error_output_defaults_to_print() {
        struct Plain(RefCell<Vec<String>>);
        impl Host for Plain {
            fn print(&self, text: &str) {
                self.0.borrow_mut().push(text.to_string());
            }
            fn exit(&self, _code: i32) {}
        }

        let host = Plain(RefCell::new(Vec::new()));
        host.print_error("boom");
        assert_eq!(*host.0.borrow(), ["boom"]);
    }
}
