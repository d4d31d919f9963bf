// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod coordinator;
pub mod engine;
pub mod error;
pub mod forms;
pub mod ids;
pub mod model;
pub mod selection;
pub mod service;
pub mod store;

pub use coordinator::*;
pub use engine::*;
pub use error::*;
pub use forms::*;
pub use ids::*;
pub use model::*;
pub use selection::*;
pub use service::*;
pub use store::*;
