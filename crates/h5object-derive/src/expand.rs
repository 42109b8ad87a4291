//! Code generation for `#[derive(H5Object)]`.

use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Fields};

use crate::attrs::{AttrDecl, FieldOptions, MemberOptions, TypeOptions};

fn attribute_calls(attrs: &[AttrDecl]) -> Vec<TokenStream> {
    attrs
        .iter()
        .map(|a| {
            let name = &a.name;
            let values = &a.values;
            if a.multi {
                let n = values.len();
                quote! {
                    .with_attributes(#name, {
                        let values: [&'static str; #n] = [#(#values),*];
                        values
                    })
                }
            } else {
                let value = &values[0];
                quote!(.with_attribute(#name, #value))
            }
        })
        .collect()
}

fn member_meta(ident: &str, opts: &MemberOptions) -> TokenStream {
    let rename = opts.rename.as_ref().map(|r| quote!(.with_entry_name(#r)));
    let skip = opts.skip.then(|| quote!(.skipped()));
    let as_attribute = opts.as_attribute.then(|| quote!(.as_group_attribute()));
    let attrs = attribute_calls(&opts.attrs);
    quote! {
        ::h5object::MemberMeta::new(#ident) #rename #skip #as_attribute #(#attrs)*
    }
}

pub(crate) fn derive(input: &DeriveInput) -> syn::Result<TokenStream> {
    if !input.generics.params.is_empty() || input.generics.where_clause.is_some() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "H5Object cannot be derived for generic types",
        ));
    }

    let fields = match &input.data {
        Data::Struct(s) => match &s.fields {
            Fields::Named(named) => named.named.iter().collect::<Vec<_>>(),
            Fields::Unit => Vec::new(),
            Fields::Unnamed(_) => {
                return Err(syn::Error::new_spanned(
                    &input.ident,
                    "H5Object needs named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "H5Object can only be derived for structs",
            ))
        }
    };

    let ty = &input.ident;
    let type_name = ty.unraw().to_string();
    let opts = TypeOptions::parse(&input.attrs)?;

    let mut field_metas = Vec::new();
    let mut field_members = Vec::new();
    let mut base = None;

    for field in fields {
        let fopts = FieldOptions::parse(&field.attrs)?;
        let Some(ident) = &field.ident else { continue };

        if fopts.base {
            if base.is_some() {
                return Err(syn::Error::new_spanned(field, "only one field can be `base`"));
            }
            base = Some(ident.clone());
            continue;
        }

        let idx = field_metas.len();
        field_metas.push(member_meta(&ident.unraw().to_string(), &fopts.member));
        if !fopts.member.skip {
            field_members.push(quote! {
                ::h5object::Member::field(&__meta[#idx], &self.#ident)
            });
        }
    }

    let property_metas: Vec<_> = opts
        .properties
        .iter()
        .map(|p| member_meta(&p.name.value(), &p.options))
        .collect();
    let property_members: Vec<_> = opts
        .properties
        .iter()
        .enumerate()
        .map(|(idx, p)| {
            let getter = &p.getter;
            quote! {
                ::h5object::Member::property(&__meta[#idx], move || {
                    ::h5object::IntoValue::into_value(#getter(self))
                })
            }
        })
        .collect();

    let group = opts.group.as_ref().map(|g| quote!(.with_group_name(#g)));
    let skip = opts.skip.then(|| quote!(.skipped()));
    let type_attrs = attribute_calls(&opts.attrs);

    let properties_fn = (!opts.properties.is_empty()).then(|| {
        quote! {
            fn properties(&self) -> ::std::vec::Vec<::h5object::Member<'_>> {
                let __meta = __h5_type_meta().properties();
                ::std::vec![#(#property_members),*]
            }
        }
    });
    let base_fn = base.map(|b| {
        quote! {
            fn base(&self) -> ::std::option::Option<&dyn ::h5object::H5Object> {
                ::std::option::Option::Some(&self.#b)
            }
        }
    });

    Ok(quote! {
        const _: () = {
            fn __h5_type_meta() -> &'static ::h5object::TypeMeta {
                static META: ::std::sync::OnceLock<::h5object::TypeMeta> = ::std::sync::OnceLock::new();
                META.get_or_init(|| {
                    ::h5object::TypeMeta::new(#type_name)
                        #group
                        #skip
                        #(#type_attrs)*
                        #(.with_field(#field_metas))*
                        #(.with_property(#property_metas))*
                })
            }

            impl ::h5object::H5Object for #ty {
                fn type_meta(&self) -> &::h5object::TypeMeta {
                    __h5_type_meta()
                }

                #[allow(unused_variables)]
                fn fields(&self) -> ::std::vec::Vec<::h5object::Member<'_>> {
                    let __meta = __h5_type_meta().fields();
                    ::std::vec![#(#field_members),*]
                }

                #properties_fn

                #base_fn

                fn as_any(&self) -> &dyn ::std::any::Any {
                    self
                }
            }

            impl ::h5object::ToValue for #ty {
                fn to_value(&self) -> ::h5object::Value<'_> {
                    ::h5object::Value::Object(self)
                }
            }

            impl ::h5object::Element for #ty {
                fn array_value(items: &[Self]) -> ::h5object::Value<'_> {
                    ::h5object::Value::CompoundArray(
                        ::h5object::CompoundArray::new(items)
                            .with_writer(::h5object::serialize::write_table::<#ty>),
                    )
                }
            }
        };
    })
}

#[cfg(test)]
mod tests {
    use super::derive;
    use syn::{parse_quote, DeriveInput};

    fn error_of(input: DeriveInput) -> String {
        match derive(&input) {
            Ok(_) => panic!("derive accepted invalid input"),
            Err(e) => e.to_string(),
        }
    }

    #[test]
    fn test_accepts_plain_struct() {
        let input: DeriveInput = parse_quote! {
            #[h5(group = "eit", attr(name = "unit", value = "V"))]
            struct Eit {
                #[h5(name = "start_datetime")]
                start: i64,
            }
        };
        let tokens = derive(&input).expect("derive failed").to_string();
        assert!(tokens.contains("write_table"));
        assert!(tokens.contains("start_datetime"));
    }

    #[test]
    fn test_rejects_duplicate_value() {
        let err = error_of(parse_quote! {
            #[h5(attr(name = "x", value = "a", value = "b"))]
            struct Dup { a: i32 }
        });
        assert!(err.contains("duplicate `value`"), "{err}");
    }

    #[test]
    fn test_rejects_blank_member_name() {
        let err = error_of(parse_quote! {
            struct Blank {
                #[h5(name = "")]
                child: i32,
            }
        });
        assert!(err.contains("name must not be empty"), "{err}");

        let err = error_of(parse_quote! {
            #[h5(property(name = " ", get = "Self::f"))]
            struct BlankProperty { a: i32 }
        });
        assert!(err.contains("name must not be empty"), "{err}");
    }

    #[test]
    fn test_rejects_generics_and_tuples() {
        let err = error_of(parse_quote! { struct Wrap<T> { t: T } });
        assert!(err.contains("generic"), "{err}");

        let err = error_of(parse_quote! { struct Pair(i32, i32); });
        assert!(err.contains("named fields"), "{err}");
    }
}
