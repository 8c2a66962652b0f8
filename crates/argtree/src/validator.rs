use std::fmt;

use crate::message::Message;

type Check<T> = Box<dyn Fn(&T) -> Message>;

/// Ordered chain of checks run against a parsed value.
///
/// Checks run in registration order; the first error is returned as is.
pub struct Validator<T> {
    checks: Vec<Check<T>>,
}

impl<T> Default for Validator<T> {
    fn default() -> Self {
        Self { checks: Vec::new() }
    }
}

impl<T> fmt::Debug for Validator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("checks", &self.checks.len())
            .finish()
    }
}

impl<T> Validator<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, check: impl Fn(&T) -> Message + 'static) {
        self.checks.push(Box::new(check));
    }

    pub fn validate(&self, value: &T) -> Message {
        for check in &self.checks {
            let msg = check(value);
            if msg.is_error() {
                return msg;
            }
        }
        Message::NoError
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn empty_chain_accepts_everything() {
        let validator = Validator::<i32>::new();
        assert!(validator.is_empty());
        assert_eq!(validator.validate(&7), Message::NoError);
    }

    #[test]
    fn first_failure_wins_and_stops_the_chain() {
        let calls = Rc::new(Cell::new(0));
        let mut validator = Validator::<i32>::new();

        validator.add(|v| {
            if *v >= 0 {
                Message::NoError
            } else {
                "must not be negative".into()
            }
        });
        validator.add(|v| {
            if *v < 100 {
                Message::NoError
            } else {
                "must be below 100".into()
            }
        });
        let counter = Rc::clone(&calls);
        validator.add(move |_| {
            counter.set(counter.get() + 1);
            "always fails".into()
        });

        assert_eq!(validator.len(), 3);
        assert_eq!(
            validator.validate(&-1),
            Message::validation("must not be negative")
        );
        assert_eq!(
            validator.validate(&500),
            Message::validation("must be below 100")
        );
        assert_eq!(calls.get(), 0);
        assert_eq!(validator.validate(&5), Message::validation("always fails"));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn validation_is_repeatable() {
        let mut validator = Validator::<String>::new();
        validator.add(|s| {
            if s.is_empty() {
                "empty".into()
            } else {
                Message::NoError
            }
        });
        for _ in 0..3 {
            assert!(validator.validate(&String::new()).is_error());
            assert!(!validator.validate(&"x".to_string()).is_error());
        }
    }
}
