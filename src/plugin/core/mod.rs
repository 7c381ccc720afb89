//! Built-in plugins.
//!
//! Variants are always registered. Utility plugins are registered in the
//! fixed order of [`CORE_PLUGINS`](crate::config::defaults::CORE_PLUGINS),
//! skipping any that `corePlugins` disabled.

mod utilities;
mod variants;

use crate::error::Result;

use super::{Plugin, PluginApi};

/// A built-in plugin: a name and a registration function.
#[derive(Clone, Copy)]
pub struct CorePlugin {
    name: &'static str,
    register: fn(&mut dyn PluginApi) -> Result<()>,
}

impl CorePlugin {
    const fn new(name: &'static str, register: fn(&mut dyn PluginApi) -> Result<()>) -> Self {
        Self { name, register }
    }
}

impl std::fmt::Debug for CorePlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("CorePlugin").field(&self.name).finish()
    }
}

impl Plugin for CorePlugin {
    fn name(&self) -> &str {
        self.name
    }

    fn register(&self, api: &mut dyn PluginApi) -> Result<()> {
        (self.register)(api)
    }
}

/// The variant plugins, in sort order.
pub fn variant_plugins() -> Vec<CorePlugin> {
    variants::PLUGINS.to_vec()
}

/// The utility plugin registered under `name` (a `corePlugins` key).
pub fn utility_plugin(name: &str) -> Option<CorePlugin> {
    utilities::PLUGINS.iter().find(|plugin| plugin.name == name).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::CORE_PLUGINS;

    #[test]
    fn test_every_core_plugin_is_implemented() {
        for name in CORE_PLUGINS {
            assert!(utility_plugin(name).is_some(), "{name} has no implementation");
        }
        assert!(utility_plugin("nope").is_none());
    }

    #[test]
    fn test_variant_plugins_register_pseudo_classes_before_screens() {
        let names: Vec<_> = variant_plugins().iter().map(|p| p.name).collect();
        let pseudo = names.iter().position(|n| *n == "pseudoClassVariants").unwrap();
        let screens = names.iter().position(|n| *n == "screenVariants").unwrap();
        assert!(pseudo < screens);
    }
}
