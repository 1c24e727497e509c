
use crate::pipeline::binding_stage_index;
use resource::ShaderStage;
use std::collections::BTreeMap;
use std::rc::Weak;

/// BindingTable struct
/// Resources bound to descriptor bindings, each with a handle that stops upgrading once the
/// resource is dropped. Entries persist across draws until their stage is unbound.
pub struct BindingTable<T: Copy> {
    entries: BTreeMap<u32, (T, Weak<()>)>
}

impl<T: Copy> Default for BindingTable<T> {
    fn default() -> Self {
        BindingTable { entries: BTreeMap::new() }
    }
}

impl<T: Copy> BindingTable<T> {

    pub fn insert(&mut self, binding: u32, value: T, alive: Weak<()>) {
        self.entries.insert(binding, (value, alive));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Forget everything bound to one stage
    pub fn clear_stage(&mut self, stage: ShaderStage) {
        let index = stage.index();
        self.entries.retain(|binding, _| binding_stage_index(*binding) != index);
    }

    /// Forget entries whose resource has been dropped, returning how many went
    pub fn prune_dropped(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|binding, (_, alive)| {
            let live = alive.upgrade().is_some();
            if !live {
                log::warn!("Resource at binding {} was dropped while bound", binding);
            }
            live
        });
        before - self.entries.len()
    }

    /// Bound values in binding order
    pub fn iter(&self) -> impl Iterator<Item = (u32, T)> + '_ {
        self.entries.iter().map(|(binding, (value, _))| (*binding, *value))
    }
}
