//! Built-in processors

mod crds;
mod default;
mod helm_data;

pub use crds::FilterCRDs;
pub use default::{
    AddNamespace, BoolFilter, DefaultProcessor, DefaultProcessorOptions, HOOK_ANNOTATION,
};
pub use helm_data::FilterRemoveHelmData;
