//! Named verification commands.
//!
//! A `by_command` rule is not compared inline: the engine hands the observed
//! value to a [`CommandRegistry`] and records whatever it answers.

use crate::error::MatchError;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Placeholder substituted with the accessor of the checked value.
pub const IT_PLACEHOLDER: &str = "$it";

/// Errors raised by a command registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// No command is registered under that name
    #[error("Command {0} is not registered")]
    NotRegistered(String),

    /// The command ran and failed
    #[error("Command {command} failed: {reason}")]
    Failed {
        /// Command name
        command: String,
        /// Failure reason
        reason: String,
    },
}

impl From<CommandError> for MatchError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::NotRegistered(command) => Self::command(command, "not registered"),
            CommandError::Failed { command, reason } => Self::command(command, reason),
        }
    }
}

/// A call to a named command with the value it should check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    /// Expression as declared, e.g. `executeMe($it)`
    pub expression: String,
    /// Observed value at the rule's path
    pub value: JsonValue,
    /// Concrete location of the value
    pub path: String,
}

impl CommandInvocation {
    /// Create an invocation.
    #[must_use]
    pub fn new(expression: impl Into<String>, value: JsonValue, path: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            value,
            path: path.into(),
        }
    }

    /// Command name: the expression up to its argument list.
    ///
    /// # Examples
    ///
    /// ```
    /// use contract_matcher::command::CommandInvocation;
    ///
    /// let call = CommandInvocation::new("executeMe($it)", serde_json::Value::Null, "$.foo3");
    /// assert_eq!(call.name(), "executeMe");
    /// assert_eq!(call.render_with("body['foo3']"), "executeMe(body['foo3'])");
    /// ```
    #[must_use]
    pub fn name(&self) -> &str {
        command_name(&self.expression)
    }

    /// The expression with `$it` replaced by an accessor.
    #[must_use]
    pub fn render_with(&self, accessor: &str) -> String {
        self.expression.replace(IT_PLACEHOLDER, accessor)
    }
}

/// Name part of a command expression.
#[must_use]
pub fn command_name(expression: &str) -> &str {
    expression
        .find('(')
        .map_or(expression, |open| &expression[..open])
        .trim()
}

/// What a command answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// The value satisfied the command
    pub accepted: bool,
    /// Assertion fragment to emit in generated code, if any
    pub rendered: Option<String>,
}

impl CommandOutcome {
    /// An accepted outcome.
    #[must_use]
    pub const fn accepted() -> Self {
        Self {
            accepted: true,
            rendered: None,
        }
    }

    /// A rejected outcome.
    #[must_use]
    pub const fn rejected() -> Self {
        Self {
            accepted: false,
            rendered: None,
        }
    }

    /// Attach an assertion fragment.
    #[must_use]
    pub fn with_rendered(mut self, rendered: impl Into<String>) -> Self {
        self.rendered = Some(rendered.into());
        self
    }
}

/// Resolves command names to verification routines.
pub trait CommandRegistry: Send + Sync {
    /// Run the command named by the invocation against its value.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] if the command is unknown or fails.
    fn invoke(&self, invocation: &CommandInvocation) -> Result<CommandOutcome, CommandError>;
}

/// Accepts every command; verification happens in generated tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeferredCommands;

impl CommandRegistry for DeferredCommands {
    fn invoke(&self, invocation: &CommandInvocation) -> Result<CommandOutcome, CommandError> {
        Ok(CommandOutcome::accepted().with_rendered(invocation.render_with(IT_PLACEHOLDER)))
    }
}

type CommandFn = dyn Fn(&JsonValue) -> Result<bool, String> + Send + Sync;

/// Commands registered by name.
#[derive(Default)]
pub struct CommandTable {
    commands: HashMap<String, Box<CommandFn>>,
}

impl CommandTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command.
    #[must_use]
    pub fn register<F>(mut self, name: impl Into<String>, command: F) -> Self
    where
        F: Fn(&JsonValue) -> Result<bool, String> + Send + Sync + 'static,
    {
        self.commands.insert(name.into(), Box::new(command));
        self
    }

    /// Whether a command is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }
}

impl fmt::Debug for CommandTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.commands.keys().collect();
        names.sort();
        f.debug_struct("CommandTable").field("commands", &names).finish()
    }
}

impl CommandRegistry for CommandTable {
    fn invoke(&self, invocation: &CommandInvocation) -> Result<CommandOutcome, CommandError> {
        let name = invocation.name();
        let command = self
            .commands
            .get(name)
            .ok_or_else(|| CommandError::NotRegistered(name.to_string()))?;
        let accepted = command(&invocation.value).map_err(|reason| CommandError::Failed {
            command: name.to_string(),
            reason,
        })?;
        Ok(CommandOutcome {
            accepted,
            rendered: None,
        })
    }
}
