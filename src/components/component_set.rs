use crate::components::{Component, ComponentType};

/// A tuple of [Component] types, used to describe an archetype without listing
/// every [ComponentType] by hand.
pub trait ComponentSet {
	/// The [component types](ComponentType) of the set, in declaration order.
	fn component_types() -> Vec<ComponentType>;
}

impl ComponentSet for () {
	fn component_types() -> Vec<ComponentType> {
		Vec::new()
	}
}

macro_rules! impl_component_set {
    ($($t: ident $i: tt),*) => {
        impl <$($t: Component),*> ComponentSet for ($($t),*,) {
            fn component_types() -> Vec<ComponentType> {
                vec![$(ComponentType::of::<$t>()),*]
            }
        }
    };
}

impl_component_set!(T0 0);
impl_component_set!(T0 0, T1 1);
impl_component_set!(T0 0, T1 1, T2 2);
impl_component_set!(T0 0, T1 1, T2 2, T3 3);
impl_component_set!(T0 0, T1 1, T2 2, T3 3, T4 4);
impl_component_set!(T0 0, T1 1, T2 2, T3 3, T4 4, T5 5);
impl_component_set!(T0 0, T1 1, T2 2, T3 3, T4 4, T5 5, T6 6);
impl_component_set!(T0 0, T1 1, T2 2, T3 3, T4 4, T5 5, T6 6, T7 7);
impl_component_set!(T0 0, T1 1, T2 2, T3 3, T4 4, T5 5, T6 6, T7 7, T8 8);
impl_component_set!(T0 0, T1 1, T2 2, T3 3, T4 4, T5 5, T6 6, T7 7, T8 8, T9 9);
impl_component_set!(T0 0, T1 1, T2 2, T3 3, T4 4, T5 5, T6 6, T7 7, T8 8, T9 9, T10 10);
impl_component_set!(T0 0, T1 1, T2 2, T3 3, T4 4, T5 5, T6 6, T7 7, T8 8, T9 9, T10 10, T11 11);
