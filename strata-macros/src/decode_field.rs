use convert_case::{Case, Casing};
use syn::{Attribute, Field, Ident, LitStr, Meta};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldKind {
    Property,
    Relation,
    Ignored,
}

#[derive(Debug)]
pub(crate) struct FieldMetadata {
    pub(crate) ident: Ident,
    pub(crate) name: String,
    pub(crate) kind: FieldKind,
}

fn optional_name(attr: &Attribute, attribute: &str, default: &str) -> Option<String> {
    if let Meta::Path(..) = attr.meta {
        return None;
    }
    let Ok(v) = attr
        .meta
        .require_list()
        .and_then(|v| v.parse_args::<LitStr>())
    else {
        panic!(
            "Error while parsing `{}`, use it like #[{}(\"{}\")]",
            attribute, attribute, default
        );
    };
    Some(v.value())
}

/// Properties are named after the field in camel case unless `#[property_name("..")]` says
/// otherwise. `#[relation]` marks a relation valued field, `#[ignored]` leaves it out.
pub(crate) fn decode_field(field: &Field) -> FieldMetadata {
    let ident = field
        .ident
        .clone()
        .expect("Field is expected to have a name");
    let default_name = ident
        .to_string()
        .trim_start_matches("r#")
        .to_case(Case::Camel);
    let mut metadata = FieldMetadata {
        ident,
        name: default_name.clone(),
        kind: FieldKind::Property,
    };
    for attr in &field.attrs {
        let path = attr.path();
        if path.is_ident("property_name") {
            let Some(name) = optional_name(attr, "property_name", &default_name) else {
                panic!(
                    "Error while parsing `property_name`, use it like #[property_name(\"{}\")]",
                    &default_name
                );
            };
            metadata.name = name;
        } else if path.is_ident("relation") {
            metadata.kind = FieldKind::Relation;
            if let Some(name) = optional_name(attr, "relation", &default_name) {
                metadata.name = name;
            }
        } else if path.is_ident("ignored") {
            metadata.kind = FieldKind::Ignored;
        }
    }
    metadata
}
