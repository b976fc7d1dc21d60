//! Commands and their kinds.

use std::any::{Any, TypeId};
use std::fmt;

/// A request to change the system. It may be rejected.
///
/// The kind of a command is its Rust type; each kind maps to exactly one
/// handler.
pub trait Command: Any + Send + fmt::Debug {}

/// Runtime identity of a command kind.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandType {
    id: TypeId,
    name: &'static str,
}

impl CommandType {
    pub fn of<C: Command>() -> Self {
        Self {
            id: TypeId::of::<C>(),
            name: std::any::type_name::<C>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name, e.g. `bank::account::commands::Withdraw`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Last path segment of the type name, without generic arguments.
    pub fn short_name(&self) -> &'static str {
        last_segment(self.name)
    }

    /// Operation name derived from the kind; see [`handler_name`].
    pub fn handler_name(&self) -> String {
        handler_name(self.name)
    }
}

impl fmt::Debug for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

fn last_segment(kind: &str) -> &str {
    let kind = kind.split('<').next().unwrap_or(kind);
    kind.rsplit([':', '.', '\\'])
        .find(|segment| !segment.is_empty())
        .unwrap_or(kind)
}

/// Derives a handler operation name from a command kind name.
///
/// Takes the last segment of the qualified name (`::`, `.` and `\` all
/// separate segments), strips a trailing literal `Command` and lower-cases
/// the first character: `App.Command.CreateOrderCommand` becomes
/// `createOrder`, `Withdraw` becomes `withdraw`. A kind named exactly
/// `Command` keeps its name.
///
/// Handlers are registered by type; this name only exists for
/// interoperating with services that expose operations by name.
pub fn handler_name(kind: &str) -> String {
    let segment = last_segment(kind);
    let base = match segment.strip_suffix("Command") {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => segment,
    };

    let mut chars = base.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct CreateOrderCommand;
    impl Command for CreateOrderCommand {}

    #[derive(Debug)]
    struct Withdraw;
    impl Command for Withdraw {}

    #[test]
    fn test_strips_command_suffix() {
        assert_eq!(handler_name("CreateOrderCommand"), "createOrder");
        assert_eq!(handler_name("App.Command.CreateOrderCommand"), "createOrder");
        assert_eq!(handler_name("App\\Command\\CreateOrderCommand"), "createOrder");
    }

    #[test]
    fn test_keeps_names_without_suffix() {
        assert_eq!(handler_name("Withdraw"), "withdraw");
        assert_eq!(handler_name("bank::commands::Withdraw"), "withdraw");
    }

    #[test]
    fn test_only_the_trailing_suffix_is_stripped() {
        assert_eq!(handler_name("CommandCenterCommand"), "commandCenter");
        assert_eq!(handler_name("IssueCommandLog"), "issueCommandLog");
        assert_eq!(handler_name("Command"), "command");
        assert_eq!(handler_name(""), "");
    }

    #[test]
    fn test_generic_arguments_are_ignored() {
        assert_eq!(
            handler_name("app::Envelope<app::CreateOrderCommand>"),
            "envelope"
        );
    }

    #[test]
    fn test_command_type_uses_the_rust_type_name() {
        let kind = CommandType::of::<CreateOrderCommand>();

        assert!(kind.name().ends_with("::CreateOrderCommand"));
        assert_eq!(kind.short_name(), "CreateOrderCommand");
        assert_eq!(kind.handler_name(), "createOrder");
        assert_eq!(CommandType::of::<Withdraw>().handler_name(), "withdraw");
        assert_ne!(kind, CommandType::of::<Withdraw>());
    }
}
