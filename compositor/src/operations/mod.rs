//! Built-in operations.

pub mod composite;
pub mod image_input;
pub mod input_single_value;
pub mod shader_node;
pub mod value;

pub use self::composite::CompositeOperation;
pub use self::image_input::ImageInputOperation;
pub use self::input_single_value::InputSingleValueOperation;
pub use self::shader_node::ShaderNodeOperation;
pub use self::value::{RgbOperation, ValueOperation};
