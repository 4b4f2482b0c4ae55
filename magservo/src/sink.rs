//! Actuator sinks
//!
//! The control core never touches coil drivers directly; every command goes
//! through an [`ActuatorSink`] supplied by the driver.

use crate::coils::CoilCommand;

/// Destination for per-coil duty-cycle commands
///
/// Application is fire-and-forget: the core never reads actuator state back.
pub trait ActuatorSink {
    fn apply(&mut self, command: &CoilCommand);
}

impl<S: ActuatorSink + ?Sized> ActuatorSink for &mut S {
    fn apply(&mut self, command: &CoilCommand) {
        (**self).apply(command)
    }
}

impl<S: ActuatorSink + ?Sized> ActuatorSink for Box<S> {
    fn apply(&mut self, command: &CoilCommand) {
        (**self).apply(command)
    }
}

/// Discards every command
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ActuatorSink for NullSink {
    fn apply(&mut self, _command: &CoilCommand) {}
}

/// Keeps every command it receives, for tests and replay
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    commands: Vec<CoilCommand>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[CoilCommand] {
        &self.commands
    }

    pub fn last(&self) -> Option<&CoilCommand> {
        self.commands.last()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl ActuatorSink for RecordingSink {
    fn apply(&mut self, command: &CoilCommand) {
        self.commands.push(*command);
    }
}
