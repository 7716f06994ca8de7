// Application layer: the pipeline stages wired from domain logic and ports.

pub mod stages;
