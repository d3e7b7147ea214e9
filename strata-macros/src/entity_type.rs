use syn::{ItemStruct, LitStr};

pub(crate) fn entity_type(item: &ItemStruct) -> String {
    let default_entity_type = item.ident.to_string();
    item.attrs
        .iter()
        .find_map(|attr| {
            if attr.meta.path().is_ident("entity_type") {
                let Ok(v) = attr
                    .meta
                    .require_list()
                    .and_then(|v| v.parse_args::<LitStr>())
                else {
                    panic!(
                        "Error while parsing `entity_type`, use it like #[entity_type(\"{}\")]",
                        &default_entity_type
                    );
                };
                return Some(v.value());
            }
            None
        })
        .unwrap_or(default_entity_type)
}
