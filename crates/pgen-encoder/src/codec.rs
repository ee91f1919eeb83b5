use pgen_schemas::{FluidStack, ItemStack};

/// Host item-duplication capability used while encoding.
pub trait StackCodec: Send + Sync {
    /// Transport-safe copy of an item stack.
    fn copy_item(&self, stack: &ItemStack) -> ItemStack {
        stack.clone()
    }

    /// Item-like stand-in for a fluid. `None` when the host cannot represent
    /// fluids as items.
    fn fluid_to_item(&self, fluid: &FluidStack) -> Option<ItemStack> {
        let _ = fluid;
        None
    }
}

/// Copies items verbatim; no fluid support.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainCodec;

impl StackCodec for PlainCodec {}

/// Represents a fluid as a "drop" item whose amount is the fluid volume.
#[derive(Clone, Debug)]
pub struct FluidDropCodec {
    drop_item: String,
}

impl FluidDropCodec {
    pub fn new(drop_item: impl Into<String>) -> Self {
        Self {
            drop_item: drop_item.into(),
        }
    }
}

impl StackCodec for FluidDropCodec {
    fn fluid_to_item(&self, fluid: &FluidStack) -> Option<ItemStack> {
        if fluid.volume == 0 {
            return None;
        }
        Some(
            ItemStack::new(self.drop_item.clone(), 0, fluid.volume)
                .named(fluid.label())
                .tagged([fluid.id.clone()]),
        )
    }
}
