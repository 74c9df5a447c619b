use proc_macro2::TokenStream;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::spanned::Spanned;
use syn::{ImplItem, Item, LitBool, Result, Token};

const SCOPE_CONST: &str = "TRANSACTION_SCOPE";

/// #[transactional] 宏实现
/// - 仅作用于 `impl CommandHandler<C> for H` 块
/// - 注入 `const TRANSACTION_SCOPE`：默认 `Required`，`enabled = false` 时为 `Suppressed`
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> Result<TokenStream> {
    let cfg: TransactionalAttrConfig = syn::parse2(attr)?;
    let input: Item = syn::parse2(item)?;

    let mut imp = match input {
        Item::Impl(imp) => imp,
        other => {
            return Err(syn::Error::new(
                other.span(),
                "#[transactional] only on `impl CommandHandler<C> for H` blocks",
            ));
        }
    };

    if imp.trait_.is_none() {
        return Err(syn::Error::new(
            imp.self_ty.span(),
            "#[transactional] requires a trait impl, e.g. `impl CommandHandler<C> for H`",
        ));
    }

    let declared = imp.items.iter().find_map(|it| match it {
        ImplItem::Const(c) if c.ident == SCOPE_CONST => Some(c.ident.span()),
        _ => None,
    });
    if let Some(span) = declared {
        return Err(syn::Error::new(
            span,
            "TRANSACTION_SCOPE is already declared; remove it or drop #[transactional]",
        ));
    }

    let scope = if cfg.enabled {
        quote! { ::uow_application::transaction_scope::TransactionScope::Required }
    } else {
        quote! { ::uow_application::transaction_scope::TransactionScope::Suppressed }
    };

    imp.items.insert(
        0,
        syn::parse_quote! {
            const TRANSACTION_SCOPE: ::core::option::Option<
                ::uow_application::transaction_scope::TransactionScope,
            > = ::core::option::Option::Some(#scope);
        },
    );

    Ok(quote! { #imp })
}

// 解析键值参数：enabled = <bool>
struct TransactionalAttrConfig {
    enabled: bool,
}

impl Parse for TransactionalAttrConfig {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut enabled: Option<bool> = None;

        while !input.is_empty() {
            let key: syn::Ident = input.parse()?;
            let _: Token![=] = input.parse()?;

            match key.to_string().as_str() {
                "enabled" => {
                    if enabled.is_some() {
                        return Err(syn::Error::new(
                            key.span(),
                            "duplicate key 'enabled' in attribute",
                        ));
                    }
                    let lit: LitBool = input.parse()?;
                    enabled = Some(lit.value);
                }
                _ => {
                    return Err(syn::Error::new(
                        key.span(),
                        "unknown key in attribute; expected 'enabled'",
                    ));
                }
            }

            if input.is_empty() {
                break;
            }
            let _: Token![,] = input.parse()?;
        }

        Ok(Self {
            enabled: enabled.unwrap_or(true),
        })
    }
}
