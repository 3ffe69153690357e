//! Command templates with `{placeholder}` substitution.

use crate::Invocation;

/// A program plus an argument list containing placeholders.
///
/// Recognized placeholders:
/// - `{input}` - the invocation's input path
/// - `{output}` - the invocation's output path
/// - `{name}` - any entry of [`Invocation::vars`]
///
/// Placeholders are substituted inside arguments, so `--pdf-engine={engine}`
/// works as expected. Unknown placeholders are left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    program: String,
    args: Vec<String>,
}

impl CommandTemplate {
    /// Create a template from a program and its arguments.
    #[must_use]
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Build a template from an argv-style list (`["mmdc", "-i", "{input}"]`).
    ///
    /// Returns `None` if the list is empty or the program name is blank.
    #[must_use]
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        if program.trim().is_empty() {
            return None;
        }
        Some(Self::new(program.clone(), args.iter().cloned()))
    }

    /// Program name or path.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Unexpanded arguments.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Whether any argument references `{name}`.
    #[must_use]
    pub fn uses(&self, name: &str) -> bool {
        let needle = format!("{{{name}}}");
        self.args.iter().any(|a| a.contains(&needle))
    }

    /// Expand placeholders and append the invocation's extra arguments.
    #[must_use]
    pub fn expand(&self, invocation: &Invocation) -> Vec<String> {
        let input = invocation.input.to_string_lossy();
        let output = invocation.output.to_string_lossy();

        let mut expanded: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                let mut value = arg.replace("{input}", &input).replace("{output}", &output);
                for (name, replacement) in &invocation.vars {
                    value = value.replace(&format!("{{{name}}}"), replacement);
                }
                value
            })
            .collect();
        expanded.extend(invocation.extra_args.iter().cloned());
        expanded
    }
}
