//! `#[derive(Injectable)]` 实现

use crate::attributes::{parse_field_options, parse_type_options, TypeOptions};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, parse_quote, Data, DataStruct, DeriveInput, Fields, Generics, Index,
    Member, Result,
};

pub fn derive_injectable_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> Result<TokenStream2> {
    let options = parse_type_options(&input.attrs)?;
    let data = match &input.data {
        Data::Struct(data) => data,
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "Injectable 只能派生于结构体",
            ))
        }
    };

    let name = &input.ident;
    let generics = with_service_bounds(&input.generics);
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let body = if options.native {
        native_members(data)?
    } else {
        constructor(data)?
    };
    let native = options.native.then(|| quote!(descriptor.native_object();));
    let disposable = options.disposable.then(|| quote!(descriptor.disposable();));
    let generic_service = generic_service(input, &generics, &options);

    Ok(quote! {
        impl #impl_generics ::di_abstractions::Injectable for #name #ty_generics #where_clause {
            fn describe(descriptor: &mut ::di_abstractions::TypeDescriptor<Self>) {
                #body
                #native
                #disposable
            }
        }

        #generic_service
    })
}

/// 类型参数需要满足服务约束
fn with_service_bounds(generics: &Generics) -> Generics {
    let mut generics = generics.clone();
    let params: Vec<_> = generics
        .type_params()
        .map(|param| param.ident.clone())
        .collect();
    let where_clause = generics.make_where_clause();
    for ident in params {
        where_clause
            .predicates
            .push(parse_quote!(#ident: ::core::marker::Send + ::core::marker::Sync + 'static));
    }
    generics
}

/// 以全部字段为参数的构造函数
fn constructor(data: &DataStruct) -> Result<TokenStream2> {
    let mut parameters = Vec::new();
    let mut values = Vec::new();

    for field in data.fields.iter() {
        let field_options = parse_field_options(field)?;
        if field_options.inject {
            return Err(syn::Error::new_spanned(
                field,
                "#[inject] 字段只用于 #[inject(native)] 类型",
            ));
        }
        let ty = &field.ty;
        if field_options.default {
            values.push(quote!(::core::default::Default::default()));
        } else {
            parameters.push(quote!(<#ty as ::di_abstractions::Dependency>::parameter_info()));
            values.push(quote!(<#ty as ::di_abstractions::Dependency>::resolve(ctx)?));
        }
    }

    let construct = match &data.fields {
        Fields::Named(fields) => {
            let idents = fields.named.iter().map(|field| &field.ident);
            quote!(Self { #(#idents: #values),* })
        }
        Fields::Unnamed(_) => quote!(Self(#(#values),*)),
        Fields::Unit => quote!(Self),
    };
    let ctx = if parameters.is_empty() {
        format_ident!("_ctx")
    } else {
        format_ident!("ctx")
    };

    Ok(quote! {
        descriptor.raw_constructor(
            "derive",
            ::std::vec![#(#parameters),*],
            true,
            |#ctx: &::di_abstractions::InjectContext<'_>| -> ::di_abstractions::DependencyResult<Self> {
                ::core::result::Result::Ok(#construct)
            },
        );
    })
}

/// 原生对象只注入标注的字段
fn native_members(data: &DataStruct) -> Result<TokenStream2> {
    let mut members = Vec::new();

    for (index, field) in data.fields.iter().enumerate() {
        let field_options = parse_field_options(field)?;
        if field_options.default {
            return Err(syn::Error::new_spanned(
                field,
                "原生对象不由容器构造，#[inject(default)] 无效",
            ));
        }
        if !field_options.inject {
            continue;
        }

        let ty = &field.ty;
        let (member, label) = match &field.ident {
            Some(ident) => (Member::Named(ident.clone()), ident.to_string()),
            None => (Member::Unnamed(Index::from(index)), index.to_string()),
        };
        members.push(quote! {
            descriptor.field(#label, |target: &mut Self, value: #ty| {
                target.#member = value;
            });
        });
    }

    Ok(quote!(#(#members)*))
}

fn generic_service(
    input: &DeriveInput,
    generics: &Generics,
    options: &TypeOptions,
) -> Option<TokenStream2> {
    let definition = options.generic.as_ref()?;
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
    let arguments = input.generics.type_params().map(|param| &param.ident);

    Some(quote! {
        impl #impl_generics ::di_abstractions::GenericService for #name #ty_generics #where_clause {
            fn definition() -> ::di_abstractions::GenericDefinition {
                ::di_abstractions::GenericDefinition::new(#definition)
            }

            fn type_arguments() -> ::std::vec::Vec<::di_abstractions::TypeKey> {
                ::std::vec![#(::di_abstractions::TypeKey::of::<#arguments>()),*]
            }
        }
    })
}
