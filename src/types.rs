//! The declarative command model.
//!
//! A [`Command`] tree describes names, help text, flags and handlers without
//! referring to the parsing engine. Flags bind their value to a [`Slot`]:
//! either a field of the configuration or storage the caller keeps outside
//! it. The slot's type fixes the flag's kind, so a flag can never be
//! declared with one kind and backed by storage of another.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use clap::ArgMatches;

use crate::context::Context;

/// Where a flag's value is written.
pub enum Slot<C, T> {
    /// A field of the configuration, e.g. `|c| &mut c.name`.
    Field(fn(&mut C) -> &mut T),
    /// Storage owned by the caller outside the configuration.
    Shared(Rc<RefCell<T>>),
}

impl<C, T> Slot<C, T> {
    pub(crate) fn store(&self, config: &mut C, value: T) {
        match self {
            Slot::Field(field) => *field(config) = value,
            Slot::Shared(cell) => *cell.borrow_mut() = value,
        }
    }
}

impl<C, T> From<Rc<RefCell<T>>> for Slot<C, T> {
    fn from(cell: Rc<RefCell<T>>) -> Self {
        Slot::Shared(cell)
    }
}

/// A flag's storage, one variant per supported value kind.
pub enum ValueRef<C> {
    String(Slot<C, String>),
    StringList(Slot<C, Vec<String>>),
    Int(Slot<C, i64>),
    IntList(Slot<C, Vec<i64>>),
    Bool(Slot<C, bool>),
}

impl<C> ValueRef<C> {
    pub fn kind(&self) -> ValueKind {
        match self {
            ValueRef::String(_) => ValueKind::String,
            ValueRef::StringList(_) => ValueKind::StringList,
            ValueRef::Int(_) => ValueKind::Int,
            ValueRef::IntList(_) => ValueKind::IntList,
            ValueRef::Bool(_) => ValueKind::Bool,
        }
    }
}

/// The kind of value a flag holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    StringList,
    Int,
    IntList,
    Bool,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::StringList => "string list",
            ValueKind::Int => "int",
            ValueKind::IntList => "int list",
            ValueKind::Bool => "bool",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a flag applies to its command only or to all descendants too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagScope {
    Local,
    Persistent,
}

/// One command-line flag.
pub struct Flag<C> {
    name: String,
    short: Option<char>,
    description: String,
    value: ValueRef<C>,
    required: bool,
}

impl<C> Flag<C> {
    pub fn new(name: &str, value: ValueRef<C>) -> Self {
        Self {
            name: name.to_string(),
            short: None,
            description: String::new(),
            value,
            required: false,
        }
    }

    /// A string flag bound to a config field, e.g.
    /// `Flag::string("name", |c: &mut MyConfig| &mut c.name)`.
    ///
    /// Flags backed by storage outside the config are built with
    /// [`Flag::new`] and a [`Slot::Shared`].
    pub fn string(name: &str, field: fn(&mut C) -> &mut String) -> Self {
        Self::new(name, ValueRef::String(Slot::Field(field)))
    }

    /// A repeatable, comma-splitting string flag.
    pub fn string_list(name: &str, field: fn(&mut C) -> &mut Vec<String>) -> Self {
        Self::new(name, ValueRef::StringList(Slot::Field(field)))
    }

    pub fn int(name: &str, field: fn(&mut C) -> &mut i64) -> Self {
        Self::new(name, ValueRef::Int(Slot::Field(field)))
    }

    /// A repeatable, comma-splitting integer flag.
    pub fn int_list(name: &str, field: fn(&mut C) -> &mut Vec<i64>) -> Self {
        Self::new(name, ValueRef::IntList(Slot::Field(field)))
    }

    /// A boolean flag: `--name` sets it, `--name=false` clears it.
    pub fn bool(name: &str, field: fn(&mut C) -> &mut bool) -> Self {
        Self::new(name, ValueRef::Bool(Slot::Field(field)))
    }

    /// One-character alias, e.g. `-v`.
    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Fail the invocation when the flag is not supplied.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn short_name(&self) -> Option<char> {
        self.short
    }

    pub fn help(&self) -> &str {
        &self.description
    }

    pub fn value(&self) -> &ValueRef<C> {
        &self.value
    }

    pub fn kind(&self) -> ValueKind {
        self.value.kind()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }
}

/// Short and long help text for a command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Descriptions {
    pub short: String,
    pub long: String,
}

/// What a handler receives besides the context.
pub struct Invocation<'m> {
    /// Names from the root to the matched command.
    pub path: Vec<String>,
    /// Positional arguments.
    pub args: Vec<String>,
    /// Raw matches of the matched command, for arguments added through
    /// [`Command::customize`].
    pub matches: &'m ArgMatches,
}

pub type Handler<C> = Box<dyn Fn(&Context<'_, C>, &Invocation<'_>) -> anyhow::Result<()>>;

pub type Customize = Box<dyn Fn(clap::Command) -> clap::Command>;

/// A node of the command tree.
pub struct Command<C> {
    name: String,
    descriptions: Descriptions,
    local_flags: Vec<Flag<C>>,
    persistent_flags: Vec<Flag<C>>,
    handler: Option<Handler<C>>,
    customize: Option<Customize>,
    children: Vec<Command<C>>,
}

impl<C> Command<C> {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            descriptions: Descriptions::default(),
            local_flags: Vec::new(),
            persistent_flags: Vec::new(),
            handler: None,
            customize: None,
            children: Vec::new(),
        }
    }

    /// One-line description shown in command lists.
    pub fn short_description(mut self, text: &str) -> Self {
        self.descriptions.short = text.to_string();
        self
    }

    /// Description shown by `--help`.
    pub fn long_description(mut self, text: &str) -> Self {
        self.descriptions.long = text.to_string();
        self
    }

    /// A flag visible only on this command.
    pub fn local_flag(mut self, flag: Flag<C>) -> Self {
        self.local_flags.push(flag);
        self
    }

    /// A flag visible on this command and every descendant.
    pub fn persistent_flag(mut self, flag: Flag<C>) -> Self {
        self.persistent_flags.push(flag);
        self
    }

    /// The function run when this command is matched. Without one, the
    /// command prints its help.
    pub fn handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Context<'_, C>, &Invocation<'_>) -> anyhow::Result<()> + 'static,
    {
        self.handler = Some(Box::new(handler));
        self
    }

    /// Adjust the underlying `clap::Command` after everything declared here
    /// has been applied, e.g. to set a version.
    pub fn customize<F>(mut self, customize: F) -> Self
    where
        F: Fn(clap::Command) -> clap::Command + 'static,
    {
        self.customize = Some(Box::new(customize));
        self
    }

    pub fn child(mut self, child: Command<C>) -> Self {
        self.children.push(child);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptions(&self) -> &Descriptions {
        &self.descriptions
    }

    pub fn local_flags(&self) -> &[Flag<C>] {
        &self.local_flags
    }

    pub fn persistent_flags(&self) -> &[Flag<C>] {
        &self.persistent_flags
    }

    pub fn handler_fn(&self) -> Option<&Handler<C>> {
        self.handler.as_ref()
    }

    pub fn customization(&self) -> Option<&Customize> {
        self.customize.as_ref()
    }

    pub fn children(&self) -> &[Command<C>] {
        &self.children
    }

    pub fn find_child(&self, name: &str) -> Option<&Command<C>> {
        self.children.iter().find(|c| c.name == name)
    }
}
