//! 实例提供者实现

pub mod collection;
pub mod construct;
pub mod existing;
pub mod factory;
pub mod native;
pub mod open_generic;

pub use collection::CollectionInstanceProvider;
pub use construct::ConstructProvider;
pub use existing::ExistingInstanceProvider;
pub use factory::FactoryProvider;
pub use native::{NativeObjectProvider, NativeSource};
pub use open_generic::OpenGenericProvider;
