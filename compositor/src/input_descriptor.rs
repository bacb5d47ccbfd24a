use crate::graph::SocketValue;
use crate::result::ResultType;

/// What an operation expects from one of its inputs.
///
/// Derived once from the input socket when the operation is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputDescriptor {
    /// Type of the input. Unlinked values are converted to it; linked results
    /// are bound with the type their producer gave them.
    pub result_type: ResultType,
    /// Value used when the input is not linked, if the socket declares one.
    /// Inputs without one read the zero value of their type.
    pub default_value: Option<SocketValue>,
    /// Lower values take precedence when choosing the domain the operation
    /// is computed on.
    pub domain_priority: i32,
    /// The input is read as a single value even if an image is linked.
    pub expects_single_value: bool,
    /// The input is used in its own domain rather than the operation's.
    pub skip_realization: bool,
}
