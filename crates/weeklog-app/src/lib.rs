// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod calendar;
pub mod demo;
pub mod ids;
pub mod model;
pub mod state;
pub mod tasks;

pub use calendar::*;
pub use demo::*;
pub use ids::*;
pub use model::*;
pub use state::*;
pub use tasks::*;
