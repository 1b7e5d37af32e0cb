mod component;

use proc_macro::TokenStream;
use syn;

/// Implements `Component` for a plain `Copy + Default` struct.
///
/// Storage rules can be selected with a `#[component(...)]` attribute:
/// - `shared`: the value is deduplicated and stored once per chunk.
/// - `system_state`: the component survives entity destruction.
/// - `buffer`: the type is the element of a per-entity dynamic buffer;
///   `inline_capacity = N` sets how many elements are stored inside the chunk.
#[proc_macro_derive(Component, attributes(component))]
pub fn derive_component(input: TokenStream) -> TokenStream {
    let ast = syn::parse(input).unwrap();
    component::impl_component(&ast)
}
