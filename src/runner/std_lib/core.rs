//! Core built-ins registration.

use crate::runner::plugin::registry::BuiltInRegistry;

use super::array;
use super::error;
use super::global;
use super::json;
use super::math;
use super::number;
use super::object;
use super::string;

/// Register all core built-in objects with the registry.
pub fn register_core_builtins(registry: &mut BuiltInRegistry) {
    global::register(registry);
    object::register(registry);
    array::register(registry);
    string::register(registry);
    number::register(registry);
    math::register(registry);
    json::register(registry);
    error::register(registry);
}
