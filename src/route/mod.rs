// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

pub mod endpoint;
pub mod route_map;

pub use endpoint::{Endpoint, ErrorHandler};
pub use route_map::RouteMap;
