//! Named sub-command registry
//!
//! Owned by whoever builds the [`super::Interpreter`]; there is no global table.
//! Each entry carries a statically declared description used for `help`.

use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use super::aggregator::ButtonAction;
use super::error::{CommandError, RegistryError};
use super::grammar::{CONTROL_PREFIX, EXIT, HELP, HOLD_DOWN, RELEASE};
use super::stick;
use crate::controller::StickCommand;

/// A controller mutation produced by a sub-command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerRequest {
    Stick(StickCommand),
    Buttons(ButtonAction),
    Flush,
}

pub type SubCommandHandler =
    Box<dyn Fn(&[&str]) -> Result<Vec<ControllerRequest>, CommandError> + Send + Sync>;

pub struct SubCommand {
    description: &'static str,
    handler: SubCommandHandler,
}

impl SubCommand {
    pub fn description(&self) -> &'static str {
        self.description
    }

    pub fn resolve(&self, args: &[&str]) -> Result<Vec<ControllerRequest>, CommandError> {
        (self.handler)(args)
    }
}

impl fmt::Debug for SubCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubCommand")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub struct SubCommandRegistry {
    commands: BTreeMap<String, SubCommand>,
}

impl SubCommandRegistry {
    /// Registry holding only `stick`
    pub fn with_defaults() -> Self {
        let mut registry = Self::default();
        registry.insert("stick", stick::DESCRIPTION, |args| {
            Ok(vec![ControllerRequest::Stick(stick::resolve(args)?)])
        });
        registry
    }

    /// Adds a sub-command; an existing entry is never replaced
    pub fn register<F>(
        &mut self,
        name: &str,
        description: &'static str,
        handler: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(&[&str]) -> Result<Vec<ControllerRequest>, CommandError> + Send + Sync + 'static,
    {
        if name.is_empty()
            || name.starts_with(CONTROL_PREFIX)
            || [EXIT, HELP, HOLD_DOWN, RELEASE].contains(&name)
            || name.contains(|c: char| c.is_whitespace() || c == '|')
        {
            return Err(RegistryError::ReservedName(name.to_string()));
        }
        if self.commands.contains_key(name) {
            return Err(RegistryError::AlreadyRegistered(name.to_string()));
        }

        self.insert(name, description, handler);
        Ok(())
    }

    fn insert<F>(&mut self, name: &str, description: &'static str, handler: F)
    where
        F: Fn(&[&str]) -> Result<Vec<ControllerRequest>, CommandError> + Send + Sync + 'static,
    {
        debug!("Registering sub-command \"{}\"", name);
        self.commands.insert(
            name.to_string(),
            SubCommand {
                description,
                handler: Box::new(handler),
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&SubCommand> {
        self.commands.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    /// Help text for the given button set and every registered sub-command
    pub fn help_text(&self, available_buttons: &[&str]) -> String {
        let mut text = String::from("Button commands:\n");
        text.push_str(&available_buttons.join(", "));
        text.push_str("\n\nCommands:\n");
        for command in self.commands.values() {
            text.push_str(command.description);
            text.push('\n');
        }
        text.push_str("\nCommands can be chained using \"|\".\n");
        text.push_str("Add \"_d\" to hold the buttons down, \"_u\" to release them.\n");
        text.push_str("Type \"exit\" to close.");
        text
    }
}
