//! Node graph model consumed by the compositor.
//!
//! The graph is built by the editor and is read-only while it is evaluated.
//! Group, group input and reroute nodes forward values between sockets; socket
//! resolution in [`crate::utilities`] walks through them.

pub mod link;
pub mod node;
pub mod node_graph;
pub mod node_types;
pub mod socket;

pub use link::Link;
pub use node::{Node, NodeRole};
pub use node_graph::NodeGraph;
pub use node_types::{NodeTypeDefinition, NodeTypeLibrary};
pub use socket::{InputSocket, OutputSocket, Socket, SocketDefinition, SocketType, SocketValue};
