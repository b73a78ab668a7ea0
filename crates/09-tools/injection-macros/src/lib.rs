//! # Injection Macros
//!
//! 这个 crate 提供 `#[derive(Injectable)]`，在编译时生成注入描述，
//! 代替手写的 `Injectable::describe`。
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use injection_macros::Injectable;
//! use std::sync::Arc;
//!
//! #[derive(Injectable)]
//! pub struct Bar {
//!     foo: Arc<dyn IFoo>,
//!     plugins: Vec<Arc<dyn Plugin>>,
//!     #[inject(default)]
//!     hits: AtomicUsize,
//! }
//! ```

use proc_macro::TokenStream;

mod attributes;
mod injectable;

/// 派生 `Injectable`
///
/// # 结构体参数
///
/// - `#[inject(native)]` - 宿主原生对象，不生成构造函数，只注入标注了 `#[inject]` 的字段
/// - `#[inject(disposable)]` - 作用域释放时调用 `Disposable::dispose`
/// - `#[inject(generic = "Name")]` - 同时实现 `GenericService`，类型参数按声明顺序作为闭合参数
///
/// # 字段参数
///
/// - `#[inject(default)]` - 构造时使用 `Default::default()`，不参与解析
/// - `#[inject]` - 原生对象上需要注入的字段
#[proc_macro_derive(Injectable, attributes(inject))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    injectable::derive_injectable_impl(input)
}
