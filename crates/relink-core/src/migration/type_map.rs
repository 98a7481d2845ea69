//! Legacy type → link type resolution.

use heck::ToKebabCase;
use std::collections::BTreeMap;
use std::fmt;

use crate::defaults::LINK_TYPE_HANDLE_PREFIX;

/// Callback that may redirect or veto a mapping.
///
/// Receives the legacy key and the type the static table proposes (`None`
/// when the table has no entry). Returning `None` suppresses migration of that
/// legacy type; returning `Some` supplies or replaces the mapping.
pub type TypeOverride = Box<dyn Fn(&str, Option<&str>) -> Option<String>>;

/// Maps legacy type keys to new link type identifiers.
pub struct TypeMapper {
    table: BTreeMap<String, String>,
    override_hook: Option<TypeOverride>,
}

impl TypeMapper {
    pub fn new<K, V>(table: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            table: table
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            override_hook: None,
        }
    }

    /// Install the override callback, replacing any previous one.
    pub fn with_override(mut self, hook: TypeOverride) -> Self {
        self.override_hook = Some(hook);
        self
    }

    /// Resolve a legacy key. The override always runs, even on a table miss.
    pub fn resolve(&self, old_key: &str) -> Option<String> {
        let proposed = self.table.get(old_key).map(String::as_str);

        match &self.override_hook {
            Some(hook) => hook(old_key, proposed),
            None => proposed.map(str::to_string),
        }
    }

    /// Number of entries in the static table.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl fmt::Debug for TypeMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeMapper")
            .field("table", &self.table)
            .field("override_hook", &self.override_hook.is_some())
            .finish()
    }
}

/// Synthetic handle of a link type: `default-<kebab-case-type>`.
pub fn link_type_handle(link_type: &str) -> String {
    format!("{}{}", LINK_TYPE_HANDLE_PREFIX, link_type.to_kebab_case())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> TypeMapper {
        TypeMapper::new([("url", "url"), ("tel", "phone"), ("entry", "entry")])
    }

    #[test]
    fn test_resolve_mapped_key() {
        assert_eq!(mapper().resolve("tel").as_deref(), Some("phone"));
        assert_eq!(mapper().resolve("url").as_deref(), Some("url"));
    }

    #[test]
    fn test_resolve_unmapped_key() {
        assert_eq!(mapper().resolve("product"), None);
    }

    #[test]
    fn test_override_can_veto() {
        let mapper = mapper().with_override(Box::new(|old, proposed| {
            if old == "tel" {
                None
            } else {
                proposed.map(str::to_string)
            }
        }));

        assert_eq!(mapper.resolve("tel"), None);
        assert_eq!(mapper.resolve("url").as_deref(), Some("url"));
    }

    #[test]
    fn test_override_runs_on_table_miss() {
        let mapper = mapper().with_override(Box::new(|old, proposed| match old {
            "product" => Some("commerce-product".to_string()),
            _ => proposed.map(str::to_string),
        }));

        assert_eq!(mapper.resolve("product").as_deref(), Some("commerce-product"));
        assert_eq!(mapper.resolve("unknown"), None);
    }

    #[test]
    fn test_override_sees_proposed_type() {
        let mapper = mapper().with_override(Box::new(|_, proposed| {
            proposed.map(|p| format!("{p}-v2"))
        }));

        assert_eq!(mapper.resolve("entry").as_deref(), Some("entry-v2"));
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let mapper = mapper();
        for _ in 0..3 {
            assert_eq!(mapper.resolve("tel").as_deref(), Some("phone"));
        }
    }

    #[test]
    fn test_link_type_handle() {
        assert_eq!(link_type_handle("url"), "default-url");
        assert_eq!(link_type_handle("commerceProduct"), "default-commerce-product");
        assert_eq!(
            link_type_handle(r"verbb\hyper\links\Entry"),
            "default-verbb-hyper-links-entry"
        );
    }
}
