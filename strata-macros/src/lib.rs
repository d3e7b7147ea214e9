mod decode_field;
mod entity_type;

use decode_field::{FieldKind, decode_field};
use entity_type::entity_type;
use proc_macro::TokenStream;
use quote::quote;
use syn::{ItemStruct, parse_macro_input};

/// Implements `strata::Entity` for a struct with named fields.
///
/// Every field is a property (a `Hydrated<T>` where `T: AsValue`) unless marked with
/// `#[relation]` (a `Hydrated<T>` where `T: FromProxies`) or `#[ignored]`.
#[proc_macro_derive(Entity, attributes(entity_type, property_name, relation, ignored))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let item: ItemStruct = parse_macro_input!(input as ItemStruct);
    let name = &item.ident;
    let (impl_generics, ty_generics, where_clause) = item.generics.split_for_impl();
    let entity_type = entity_type(&item);
    let fields: Vec<_> = item.fields.iter().map(decode_field).collect();
    for (i, field) in fields.iter().enumerate() {
        if field.kind == FieldKind::Ignored {
            continue;
        }
        if fields[..i]
            .iter()
            .any(|v| v.kind != FieldKind::Ignored && v.name == field.name)
        {
            panic!(
                "The name `{}` is used by more than one field of `{}`",
                field.name, name
            );
        }
    }
    let properties: Vec<_> = fields
        .iter()
        .filter(|v| v.kind == FieldKind::Property)
        .collect();
    let relations: Vec<_> = fields
        .iter()
        .filter(|v| v.kind == FieldKind::Relation)
        .collect();
    let property_names = properties.iter().map(|v| &v.name);
    let relation_names = relations.iter().map(|v| &v.name);
    let get_arms = properties.iter().map(|v| {
        let (ident, name) = (&v.ident, &v.name);
        quote!(#name => self.#ident.to_value(Self::ENTITY_TYPE, #name))
    });
    let set_arms = properties.iter().map(|v| {
        let (ident, name) = (&v.ident, &v.name);
        quote!(#name => self.#ident.set_value(value))
    });
    let relation_arms = relations.iter().map(|v| {
        let (ident, name) = (&v.ident, &v.name);
        quote! {
            #name => {
                self.#ident.set(::strata::FromProxies::from_proxies(related)?);
                Ok(())
            }
        }
    });
    quote! {
        impl #impl_generics ::strata::Entity for #name #ty_generics #where_clause {
            const ENTITY_TYPE: &'static str = #entity_type;
            const PROPERTIES: &'static [&'static str] = &[#(#property_names),*];
            const RELATIONS: &'static [&'static str] = &[#(#relation_names),*];

            fn field(&self, property: &str) -> ::strata::Result<::strata::Value> {
                match property {
                    #(#get_arms,)*
                    _ => Err(::strata::MapperError::unknown_property(Self::ENTITY_TYPE, property).into()),
                }
            }

            fn set_field(&mut self, property: &str, value: ::strata::Value) -> ::strata::Result<()> {
                let _ = &value;
                match property {
                    #(#set_arms,)*
                    _ => Err(::strata::MapperError::unknown_property(Self::ENTITY_TYPE, property).into()),
                }
            }

            fn set_relation(
                &mut self,
                relation: &str,
                related: ::std::vec::Vec<::strata::Proxy>,
            ) -> ::strata::Result<()> {
                let _ = &related;
                match relation {
                    #(#relation_arms)*
                    _ => Err(::strata::MapperError::UnknownRelation {
                        entity_type: Self::ENTITY_TYPE.into(),
                        relation: relation.into(),
                    }
                    .into()),
                }
            }
        }
    }
    .into()
}
