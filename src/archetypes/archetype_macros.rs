/// Get or create an [Archetype](crate::Archetype) holding exactly the listed component types.
///
/// `create_archetype!(world, [A, B])` builds the type list at the call site, while
/// `create_archetype!(world, (A, B))` goes through [ComponentSet](crate::components::ComponentSet).
/// Both return a `Result`, failing on duplicate types or when a single entity does not fit a chunk.
#[macro_export]
macro_rules! create_archetype {
	($world: expr, [$($t: ty),* $(,)?]) => {
		$world.create_archetype(&[
			$($crate::components::ComponentType::of::<$t>()),*
		])
	};
	($world: expr, ($($t: ty),+ $(,)?)) => {
		$world.create_archetype_of::<($($t,)+)>()
	};
}
