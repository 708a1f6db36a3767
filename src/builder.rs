//! Engine-independent construction of a command tree.
//!
//! [`build`] walks a declarative [`Command`] and drives a [`CommandBuilder`],
//! which knows how to express nodes, flags and children in one particular
//! parsing engine. The walk order is fixed: persistent flags, local flags,
//! children in declaration order, and finally the command's customization
//! hook. Persistent flags of every ancestor are passed down, so a builder can
//! reject names that would collide once they are inherited.

use crate::error::ClappError;
use crate::types::{Command, Flag, FlagScope};

/// A parsing engine's view of command construction.
pub trait CommandBuilder<C> {
    /// The engine's command representation.
    type Node;

    /// Create the node for `command`, without flags or children.
    fn node(&mut self, command: &Command<C>) -> Self::Node;

    /// Add `flag` to `node`. `inherited` holds the persistent flags of the
    /// command's ancestors, root first.
    fn register_flag(
        &mut self,
        node: Self::Node,
        flag: &Flag<C>,
        scope: FlagScope,
        inherited: &[&Flag<C>],
    ) -> Result<Self::Node, ClappError>;

    /// Make an already registered flag mandatory.
    fn mark_required(
        &mut self,
        node: Self::Node,
        flag: &Flag<C>,
        scope: FlagScope,
    ) -> Result<Self::Node, ClappError>;

    fn add_child(&mut self, parent: Self::Node, child: Self::Node) -> Self::Node;

    /// Apply the command's customization hook, if it has one.
    fn customize(
        &mut self,
        node: Self::Node,
        command: &Command<C>,
        inherited: &[&Flag<C>],
    ) -> Result<Self::Node, ClappError>;
}

/// Build `command` and all of its descendants.
///
/// Each child is built completely before it is attached. The first child
/// that fails aborts the build: neither it nor any later sibling is attached.
pub fn build<C, B>(builder: &mut B, command: &Command<C>) -> Result<B::Node, ClappError>
where
    B: CommandBuilder<C> + ?Sized,
{
    build_level(builder, command, &[])
}

fn build_level<'t, C, B>(
    builder: &mut B,
    command: &'t Command<C>,
    inherited: &[&'t Flag<C>],
) -> Result<B::Node, ClappError>
where
    B: CommandBuilder<C> + ?Sized,
{
    let mut node = builder.node(command);

    for flag in command.persistent_flags() {
        node = register(builder, node, flag, FlagScope::Persistent, inherited)?;
    }
    for flag in command.local_flags() {
        node = register(builder, node, flag, FlagScope::Local, inherited)?;
    }

    let mut visible = inherited.to_vec();
    visible.extend(command.persistent_flags());
    for child in command.children() {
        let child_node = build_level(builder, child, &visible)?;
        node = builder.add_child(node, child_node);
    }

    builder.customize(node, command, inherited)
}

fn register<C, B>(
    builder: &mut B,
    node: B::Node,
    flag: &Flag<C>,
    scope: FlagScope,
    inherited: &[&Flag<C>],
) -> Result<B::Node, ClappError>
where
    B: CommandBuilder<C> + ?Sized,
{
    let node = builder.register_flag(node, flag, scope, inherited)?;
    if flag.is_required() {
        builder.mark_required(node, flag, scope)
    } else {
        Ok(node)
    }
}
