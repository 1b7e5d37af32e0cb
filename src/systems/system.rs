use crate::entities::EntityStore;

/// A unit of per-frame logic run by [EcsContext](crate::EcsContext) in registration order.
///
/// Systems usually register their [component groups](crate::entities::ComponentGroup) in
/// [setup](System::setup) and schedule jobs against them in [run](System::run).
pub trait System: Send {
	/// Called once by [setup_systems](crate::EcsContext::setup_systems).
	fn setup(&mut self, _world: &mut EntityStore) {}

	fn run(&mut self, world: &mut EntityStore);
}

/// Closures are systems without setup.
impl<F> System for F
where
	F: FnMut(&mut EntityStore) + Send,
{
	fn run(&mut self, world: &mut EntityStore) {
		self(world)
	}
}
