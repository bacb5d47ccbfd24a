//! Links between sockets (edges of the compositor graph).

use serde::{Deserialize, Serialize};

use super::socket::{InputSocket, OutputSocket};

/// A directed edge from an output socket to an input socket.
///
/// An input socket has at most one incoming link, an output socket may fan
/// out to any number of inputs.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Link {
    pub from: OutputSocket,
    pub to: InputSocket,
}

impl Link {
    pub fn new(from: OutputSocket, to: InputSocket) -> Self {
        Self { from, to }
    }
}
