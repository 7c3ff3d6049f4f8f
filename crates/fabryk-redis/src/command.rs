//! Wire-level command value.
//!
//! A [`Command`] is a verb plus an ordered list of binary-safe arguments.
//! Most arguments are UTF-8 tokens; vector parameters are raw bytes.

use std::fmt;

/// A single engine command, e.g. `FT.SEARCH idx ... PARAMS 2 vector <bytes>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    name: String,
    args: Vec<Vec<u8>>,
}

impl Command {
    /// Create a command with no arguments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Append an argument.
    pub fn arg(mut self, arg: impl Into<Vec<u8>>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append an argument in place.
    pub fn push_arg(&mut self, arg: impl Into<Vec<u8>>) {
        self.args.push(arg.into());
    }

    /// Append several arguments in place.
    pub fn extend_args<I, A>(&mut self, args: I)
    where
        I: IntoIterator<Item = A>,
        A: Into<Vec<u8>>,
    {
        self.args.extend(args.into_iter().map(Into::into));
    }

    /// The command verb.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The arguments, in order.
    pub fn args(&self) -> &[Vec<u8>] {
        &self.args
    }

    /// Argument at `index` as UTF-8, if it is valid UTF-8.
    pub fn arg_str(&self, index: usize) -> Option<&str> {
        self.args
            .get(index)
            .and_then(|a| std::str::from_utf8(a).ok())
    }

    /// The verb followed by every argument, as lossy strings.
    pub fn tokens(&self) -> Vec<String> {
        std::iter::once(self.name.clone())
            .chain(
                self.args
                    .iter()
                    .map(|a| String::from_utf8_lossy(a).into_owned()),
            )
            .collect()
    }
}

impl fmt::Display for Command {
    /// Space-joined tokens; non-UTF-8 arguments are byte-escaped (`\xf8`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for arg in &self.args {
            f.write_str(" ")?;
            match std::str::from_utf8(arg) {
                Ok(s) => f.write_str(s)?,
                Err(_) => {
                    for byte in arg {
                        write!(f, "{}", std::ascii::escape_default(*byte))?;
                    }
                }
            }
        }
        Ok(())
    }
}
