use std::collections::BTreeMap;

use crate::editing::commands::{Command, CommandState, ExecuteOptions};
use crate::editing::paragraph::ParagraphCommand;
use crate::models::{ChangeSet, Document, ModelError, Selection, SubscriptionId};

/// Name the paragraph command is registered under.
pub const PARAGRAPH: &str = "paragraph";

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Outcome of [`Editor::execute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Executed {
    Applied,
    /// The command was disabled; the document is unchanged.
    Skipped,
}

/// Document plus a registry of named commands kept in sync with it.
///
/// Every command is refreshed after each execution, undo, redo, selection
/// change and read-only toggle, so [`Editor::command_state`] always reflects
/// the live selection.
pub struct Editor {
    document: Document,
    commands: BTreeMap<String, Box<dyn Command>>,
    read_only: bool,
}

impl Editor {
    /// Wrap `document` with the built-in commands registered.
    pub fn new(document: Document) -> Self {
        let mut editor = Self {
            document,
            commands: BTreeMap::new(),
            read_only: false,
        };
        editor.register(PARAGRAPH, Box::new(ParagraphCommand::new()));
        editor
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    /// Register (or replace) a command and bring its state up to date.
    pub fn register(&mut self, name: impl Into<String>, mut command: Box<dyn Command>) {
        self.refresh_one(command.as_mut());
        self.commands.insert(name.into(), command);
    }

    pub fn command_names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    pub fn command_state(&self, name: &str) -> Option<CommandState> {
        self.commands.get(name).map(|command| command.state())
    }

    /// Run a command if it is enabled.
    ///
    /// A disabled command is not run and [`Executed::Skipped`] is returned.
    pub fn execute(
        &mut self,
        name: &str,
        options: ExecuteOptions,
    ) -> Result<Executed, EditorError> {
        let command = self
            .commands
            .get_mut(name)
            .ok_or_else(|| EditorError::UnknownCommand(name.to_string()))?;

        if !command.state().is_enabled {
            log::debug!("Command '{name}' is disabled; skipping");
            return Ok(Executed::Skipped);
        }

        log::debug!("Executing command '{name}'");
        let result = command.execute(&mut self.document, options);
        self.refresh_commands();
        result?;
        Ok(Executed::Applied)
    }

    pub fn set_selection(&mut self, selection: Selection) -> Result<(), EditorError> {
        self.document.set_selection(selection)?;
        self.refresh_commands();
        Ok(())
    }

    pub fn undo(&mut self) -> Result<bool, EditorError> {
        if self.read_only {
            return Ok(false);
        }
        let undone = self.document.undo()?;
        self.refresh_commands();
        Ok(undone)
    }

    pub fn redo(&mut self) -> Result<bool, EditorError> {
        if self.read_only {
            return Ok(false);
        }
        let redone = self.document.redo()?;
        self.refresh_commands();
        Ok(redone)
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// In read-only mode every command reports itself disabled.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
        self.refresh_commands();
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&ChangeSet) + 'static) -> SubscriptionId {
        self.document.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.document.unsubscribe(id)
    }

    pub fn refresh_commands(&mut self) {
        let document = &self.document;
        let read_only = self.read_only;
        for command in self.commands.values_mut() {
            refresh_command(command.as_mut(), document, read_only);
        }
    }

    fn refresh_one(&self, command: &mut dyn Command) {
        refresh_command(command, &self.document, self.read_only);
    }
}

fn refresh_command(command: &mut dyn Command, document: &Document, read_only: bool) {
    command.refresh(document);
    if read_only {
        command.state_mut().is_enabled = false;
    }
}
