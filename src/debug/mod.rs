// Debug module - diagnostic tracing for the detection pipeline

pub mod pipeline_tracer;
