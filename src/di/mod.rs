mod builder;
mod container;
mod scope;

pub use builder::ContainerBuilder;
pub use container::Container;
pub use scope::Scope;
