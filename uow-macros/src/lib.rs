use proc_macro::TokenStream;

mod transactional;

/// 事务标记宏
///
/// 标注在 `impl CommandHandler<C> for H` 块上，为处理器声明事务范围：
/// - `#[transactional]`：在事务中执行，提交后发布领域事件；
/// - `#[transactional(enabled = false)]`：显式声明不参与事务。
///
/// 与 `#[async_trait]` 同时使用时需放在其之前。
#[proc_macro_attribute]
pub fn transactional(attr: TokenStream, item: TokenStream) -> TokenStream {
    transactional::expand(attr.into(), item.into())
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
