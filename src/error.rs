use std::fmt::Display;

use anyhow::{anyhow, Error};

/// Exit with status `1` printing the error chain, instead of panicking.
pub trait NiceError<T> {
    /// The content if present, otherwise report the error and exit.
    fn nice_unwrap(self) -> T;

    /// Like `nice_unwrap`, adding `message` as the outermost context of the error.
    fn nice_expect<S: Display + Send + Sync + 'static>(self, message: S) -> T;
}

/// Print the error and its causes on stderr.
fn report(error: &Error) {
    debug!("{:?}", error);
    eprintln!("Error: {}", error);
    for cause in error.chain().skip(1) {
        eprintln!("\nCaused by:\n    {}", cause);
    }
}

fn fail(error: Error) -> ! {
    report(&error);
    std::process::exit(1);
}

impl<T> NiceError<T> for Result<T, Error> {
    fn nice_unwrap(self) -> T {
        self.unwrap_or_else(|e| fail(e))
    }

    fn nice_expect<S: Display + Send + Sync + 'static>(self, message: S) -> T {
        self.unwrap_or_else(|e| fail(e.context(message)))
    }
}

impl<T> NiceError<T> for Option<T> {
    fn nice_unwrap(self) -> T {
        self.unwrap_or_else(|| fail(anyhow!("Option is None")))
    }

    fn nice_expect<S: Display + Send + Sync + 'static>(self, message: S) -> T {
        self.unwrap_or_else(|| fail(anyhow!("{}", message)))
    }
}
