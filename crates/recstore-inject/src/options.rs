use serde::{Deserialize, Serialize};

/// Call-site or per-definition injection options.
///
/// `None` leaves the value to the next layer down: call site over
/// definition over store defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InjectOptions {
    pub notify: Option<bool>,
    pub use_class: Option<bool>,
    pub find_belongs_to: Option<bool>,
    pub find_has_many: Option<bool>,
    pub find_has_one: Option<bool>,
    pub find_inverse_links: Option<bool>,
    pub keep_change_history: Option<bool>,
    pub reset_history_on_inject: Option<bool>,
}

impl InjectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(mut self, value: bool) -> Self {
        self.notify = Some(value);
        self
    }

    pub fn use_class(mut self, value: bool) -> Self {
        self.use_class = Some(value);
        self
    }

    pub fn find_belongs_to(mut self, value: bool) -> Self {
        self.find_belongs_to = Some(value);
        self
    }

    pub fn find_has_many(mut self, value: bool) -> Self {
        self.find_has_many = Some(value);
        self
    }

    pub fn find_has_one(mut self, value: bool) -> Self {
        self.find_has_one = Some(value);
        self
    }

    pub fn find_inverse_links(mut self, value: bool) -> Self {
        self.find_inverse_links = Some(value);
        self
    }

    pub fn keep_change_history(mut self, value: bool) -> Self {
        self.keep_change_history = Some(value);
        self
    }

    pub fn reset_history_on_inject(mut self, value: bool) -> Self {
        self.reset_history_on_inject = Some(value);
        self
    }

    /// Turn every relation discovery option off.
    pub fn without_linking(self) -> Self {
        self.find_belongs_to(false)
            .find_has_many(false)
            .find_has_one(false)
            .find_inverse_links(false)
    }
}

/// Effective options for one injection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolvedOptions {
    pub notify: bool,
    pub use_class: bool,
    pub find_belongs_to: bool,
    pub find_has_many: bool,
    pub find_has_one: bool,
    pub find_inverse_links: bool,
    pub keep_change_history: bool,
    pub reset_history_on_inject: bool,
}

impl Default for ResolvedOptions {
    fn default() -> Self {
        Self {
            notify: true,
            use_class: true,
            find_belongs_to: true,
            find_has_many: true,
            find_has_one: true,
            find_inverse_links: true,
            keep_change_history: false,
            reset_history_on_inject: false,
        }
    }
}

impl ResolvedOptions {
    /// Apply every option `options` sets on top of `self`.
    pub fn overlay(self, options: &InjectOptions) -> Self {
        Self {
            notify: options.notify.unwrap_or(self.notify),
            use_class: options.use_class.unwrap_or(self.use_class),
            find_belongs_to: options.find_belongs_to.unwrap_or(self.find_belongs_to),
            find_has_many: options.find_has_many.unwrap_or(self.find_has_many),
            find_has_one: options.find_has_one.unwrap_or(self.find_has_one),
            find_inverse_links: options
                .find_inverse_links
                .unwrap_or(self.find_inverse_links),
            keep_change_history: options
                .keep_change_history
                .unwrap_or(self.keep_change_history),
            reset_history_on_inject: options
                .reset_history_on_inject
                .unwrap_or(self.reset_history_on_inject),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_overlay_keeps_defaults() {
        let base = ResolvedOptions::default();
        assert_eq!(base.overlay(&InjectOptions::new()), base);
    }

    #[test]
    fn call_site_wins_over_definition() {
        let definition = InjectOptions::new().keep_change_history(true).notify(false);
        let call = InjectOptions::new().notify(true);
        let resolved = ResolvedOptions::default()
            .overlay(&definition)
            .overlay(&call);
        assert!(resolved.notify);
        assert!(resolved.keep_change_history);
        assert!(!resolved.reset_history_on_inject);
    }

    #[test]
    fn without_linking_disables_discovery() {
        let resolved = ResolvedOptions::default().overlay(&InjectOptions::new().without_linking());
        assert!(!resolved.find_belongs_to);
        assert!(!resolved.find_has_many);
        assert!(!resolved.find_has_one);
        assert!(!resolved.find_inverse_links);
        assert!(resolved.notify);
    }

    #[test]
    fn partial_json_deserializes() {
        let options: InjectOptions =
            serde_json::from_str(r#"{"notify": false, "find_has_many": true}"#).unwrap();
        assert_eq!(options.notify, Some(false));
        assert_eq!(options.find_has_many, Some(true));
        assert_eq!(options.use_class, None);
    }
}
