use quote::{format_ident, quote};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use syn::{DeriveInput, Lit, Meta, NestedMeta};

#[derive(Default)]
struct ComponentOptions {
    shared: bool,
    buffer: bool,
    system_state: bool,
    inline_capacity: Option<usize>,
}

fn parse_options(ast: &DeriveInput) -> syn::Result<ComponentOptions> {
    let mut options = ComponentOptions::default();
    for attr in ast.attrs.iter().filter(|a| a.path.is_ident("component")) {
        let list = match attr.parse_meta()? {
            Meta::List(list) => list,
            other => return Err(syn::Error::new_spanned(other, "expected #[component(...)]")),
        };

        for nested in list.nested {
            match nested {
                NestedMeta::Meta(Meta::Path(path)) if path.is_ident("shared") => options.shared = true,
                NestedMeta::Meta(Meta::Path(path)) if path.is_ident("buffer") => options.buffer = true,
                NestedMeta::Meta(Meta::Path(path)) if path.is_ident("system_state") => options.system_state = true,
                NestedMeta::Meta(Meta::NameValue(value)) if value.path.is_ident("inline_capacity") => {
                    match &value.lit {
                        Lit::Int(int) => options.inline_capacity = Some(int.base10_parse()?),
                        other => return Err(syn::Error::new_spanned(other, "expected an integer")),
                    }
                },
                other => return Err(syn::Error::new_spanned(other, "unknown component option")),
            }
        }
    }

    if options.shared && options.buffer {
        return Err(syn::Error::new_spanned(&ast.ident, "a component cannot be both shared and a buffer element"));
    }
    if options.inline_capacity.is_some() && !options.buffer {
        return Err(syn::Error::new_spanned(&ast.ident, "inline_capacity requires #[component(buffer)]"));
    }

    Ok(options)
}

pub fn impl_component(ast: &DeriveInput) -> TokenStream {
    let options = match parse_options(ast) {
        Ok(options) => options,
        Err(error) => return error.to_compile_error().into(),
    };

    let name = &ast.ident;
    let name_str = name.to_string().to_uppercase();
    let id_name = format_ident!("__COMPONENT_ID_OF_{}", name_str);

    let mut flags = Vec::new();
    let mut markers = TokenStream2::new();
    if options.shared {
        flags.push(quote!(chunk_ecs::components::ComponentFlags::SHARED));
        markers.extend(quote!(impl chunk_ecs::components::SharedComponent for #name {}));
    }
    if options.buffer {
        flags.push(quote!(chunk_ecs::components::ComponentFlags::BUFFER));
        markers.extend(quote!(impl chunk_ecs::components::BufferElement for #name {}));
    }
    if options.system_state {
        flags.push(quote!(chunk_ecs::components::ComponentFlags::SYSTEM_STATE));
        markers.extend(quote!(impl chunk_ecs::components::SystemStateComponent for #name {}));
    }

    let flags = flags
        .into_iter()
        .fold(quote!(chunk_ecs::components::ComponentFlags::NONE), |acc, flag| quote!(#acc.union(#flag)));

    let inline_capacity = match (options.buffer, options.inline_capacity) {
        (true, Some(capacity)) => quote!(#capacity),
        (true, None) => quote!(chunk_ecs::buffers::default_inline_capacity(::std::mem::size_of::<#name>())),
        (false, _) => quote!(0),
    };

    let gen = quote! {
        chunk_ecs::lazy_static! {
            static ref #id_name: chunk_ecs::components::ComponentId = unsafe {
                chunk_ecs::components::allocate_component_id()
            };
        }

        impl chunk_ecs::components::Component for #name {
            const FLAGS: chunk_ecs::components::ComponentFlags = #flags;
            const INLINE_CAPACITY: usize = #inline_capacity;

            #[inline(always)]
            fn component_id() -> chunk_ecs::components::ComponentId {
                *#id_name
            }
        }

        #markers
    };
    gen.into()
}
