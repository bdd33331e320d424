pub mod evaluation;
pub mod float_model;
pub mod mode;
pub mod quantization;
pub mod quantized_model;

pub use evaluation::{export_and_evaluate, EvaluationReport, ExportJob};
pub use mode::QuantMode;
pub use quantization::QuantParams;
pub use quantized_model::QuantizedMlp;
