//! `#[inject(...)]` 属性解析

use syn::{
    punctuated::Punctuated, Attribute, Expr, Field, Lit, LitStr, Meta, Result, Token,
};

/// 结构体级参数
#[derive(Default)]
pub struct TypeOptions {
    pub native: bool,
    pub disposable: bool,
    pub generic: Option<LitStr>,
}

/// 字段级参数
#[derive(Default)]
pub struct FieldOptions {
    /// 构造时使用默认值
    pub default: bool,
    /// 原生对象上的注入字段
    pub inject: bool,
}

/// 收集全部 `#[inject(...)]` 参数，`#[inject]` 本身返回空列表
fn inject_metas(attrs: &[Attribute]) -> Result<Vec<(Attribute, Vec<Meta>)>> {
    let mut collected = Vec::new();
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("inject")) {
        let metas = match &attr.meta {
            Meta::Path(_) => Vec::new(),
            _ => attr
                .parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?
                .into_iter()
                .collect(),
        };
        collected.push((attr.clone(), metas));
    }
    Ok(collected)
}

pub fn parse_type_options(attrs: &[Attribute]) -> Result<TypeOptions> {
    let mut options = TypeOptions::default();

    for (attr, metas) in inject_metas(attrs)? {
        if metas.is_empty() {
            return Err(syn::Error::new_spanned(attr, "结构体上的 #[inject] 需要参数"));
        }
        for meta in metas {
            match meta {
                Meta::Path(path) if path.is_ident("native") => options.native = true,
                Meta::Path(path) if path.is_ident("disposable") => options.disposable = true,
                Meta::NameValue(nv) if nv.path.is_ident("generic") => match nv.value {
                    Expr::Lit(expr_lit) => match expr_lit.lit {
                        Lit::Str(lit_str) => options.generic = Some(lit_str),
                        other => return Err(syn::Error::new_spanned(other, "generic 需要字符串")),
                    },
                    other => return Err(syn::Error::new_spanned(other, "generic 需要字符串")),
                },
                other => {
                    return Err(syn::Error::new_spanned(other, "不支持的 inject 参数"));
                }
            }
        }
    }

    Ok(options)
}

pub fn parse_field_options(field: &Field) -> Result<FieldOptions> {
    let mut options = FieldOptions::default();

    for (_, metas) in inject_metas(&field.attrs)? {
        if metas.is_empty() {
            options.inject = true;
        }
        for meta in metas {
            match meta {
                Meta::Path(path) if path.is_ident("default") => options.default = true,
                other => {
                    return Err(syn::Error::new_spanned(other, "不支持的字段 inject 参数"));
                }
            }
        }
    }

    if options.default && options.inject {
        return Err(syn::Error::new_spanned(
            field,
            "#[inject] 与 #[inject(default)] 不能同时使用",
        ));
    }
    Ok(options)
}
