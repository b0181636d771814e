mod dent_box;
mod dent_detection;
mod inference_device;
mod model_config;
mod pathology_class;

pub use dent_box::*;
pub use dent_detection::*;
pub use inference_device::*;
pub use model_config::*;
pub use pathology_class::*;
