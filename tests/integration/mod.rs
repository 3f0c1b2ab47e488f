//! End-to-end pipeline tests against in-memory collaborators.

mod fakes;
mod pipeline;
