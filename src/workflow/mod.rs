pub mod item_ctx;
pub mod selectors;
pub mod subform_flow;

pub use item_ctx::ItemCtx;
pub use selectors::SubFormSelectors;
pub use subform_flow::{FlowState, ItemProcessor, ProcessResult, SubFormFlow};
