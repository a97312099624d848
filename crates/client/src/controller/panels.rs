//! Content panels shown one at a time over a placeholder.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Panel {
    /// Element id, always ending in `Content`.
    pub id: String,
    pub visible: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Panels {
    panels: Vec<Panel>,
    placeholder_visible: bool,
    focused: Option<String>,
}

impl Panels {
    /// Build panels from content ids; `"tarot"` becomes `"tarotContent"`.
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let panels = ids
            .into_iter()
            .map(|id| Panel { id: format!("{}Content", id.as_ref()), visible: false })
            .collect();
        Self { panels, placeholder_visible: true, focused: None }
    }

    /// Hide every panel and the placeholder, then reveal `{id}Content`.
    ///
    /// Returns `false` if no such panel exists; everything stays hidden.
    pub fn show(&mut self, id: &str) -> bool {
        let target = format!("{id}Content");
        self.hide_panels();
        self.placeholder_visible = false;

        match self.panels.iter_mut().find(|p| p.id == target) {
            Some(panel) => {
                panel.visible = true;
                self.focused = Some(target);
                true
            }
            None => {
                self.focused = None;
                false
            }
        }
    }

    /// Hide every panel and bring the placeholder back.
    pub fn close(&mut self) {
        self.hide_panels();
        self.placeholder_visible = true;
        self.focused = None;
    }

    fn hide_panels(&mut self) {
        for panel in &mut self.panels {
            panel.visible = false;
        }
    }

    pub fn visible(&self) -> Option<&str> {
        self.panels.iter().find(|p| p.visible).map(|p| p.id.as_str())
    }

    pub fn placeholder_visible(&self) -> bool {
        self.placeholder_visible
    }

    pub fn focused(&self) -> Option<&str> {
        self.focused.as_deref()
    }

    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }
}
