// In-memory stand-in for the page a content script runs against.
// Carries just enough DOM for the scaffold: elements with
// tag/id/class/attrs/text, meta entries, style sheets, childList-style
// mutation observers, and the one-shot injection guard for the
// page-world bridge.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use url::Url;

/// One element of the simulated document.
#[derive(Debug, Clone, Default)]
pub struct Element {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub text: String,
    pub attrs: HashMap<String, String>,
    /// Inline style properties, e.g. background-color.
    pub style: HashMap<String, String>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn with_attr(mut self, key: &str, value: &str) -> Self {
        self.attrs.insert(key.to_string(), value.to_string());
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

/// childList-style structural change notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Added { tag: String },
    Removed { tag: String },
}

/// The shared page document. Cheap to clone; all clones see one page.
/// Accessors are synchronous on purpose: page-world code (the bridge)
/// calls them directly, outside any async context.
#[derive(Clone)]
pub struct PageDocument {
    inner: Arc<Mutex<DocInner>>,
}

struct DocInner {
    title: String,
    url: String,
    user_agent: String,
    viewport: (u32, u32),
    meta: HashMap<String, String>,
    elements: Vec<Element>,
    styles: Vec<String>,
    /// Injection guard for the page-world bridge. Set once, cleared
    /// only by page teardown (dropping the document).
    injected: bool,
    observers: Vec<mpsc::UnboundedSender<Mutation>>,
}

impl PageDocument {
    pub fn new(url: &str, title: &str) -> Self {
        Self {
            inner: Arc::new(Mutex::new(DocInner {
                title: title.to_string(),
                url: url.to_string(),
                user_agent: "ScaffoldHost/1.0".to_string(),
                viewport: (1280, 800),
                meta: HashMap::new(),
                elements: Vec::new(),
                styles: Vec::new(),
                injected: false,
                observers: Vec::new(),
            })),
        }
    }

    pub fn title(&self) -> String {
        self.lock().title.clone()
    }

    pub fn url(&self) -> String {
        self.lock().url.clone()
    }

    /// Host name of the page URL; empty when the URL does not parse.
    pub fn domain(&self) -> String {
        let url = self.lock().url.clone();
        Url::parse(&url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default()
    }

    pub fn user_agent(&self) -> String {
        self.lock().user_agent.clone()
    }

    pub fn set_user_agent(&self, user_agent: &str) {
        self.lock().user_agent = user_agent.to_string();
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.lock().viewport
    }

    pub fn set_viewport(&self, width: u32, height: u32) {
        self.lock().viewport = (width, height);
    }

    pub fn set_meta(&self, name: &str, content: &str) {
        self.lock()
            .meta
            .insert(name.to_string(), content.to_string());
    }

    pub fn meta(&self, name: &str) -> Option<String> {
        self.lock().meta.get(name).cloned()
    }

    /// Append an element and notify childList observers.
    pub fn append(&self, element: Element) {
        let tag = element.tag.clone();
        let mut doc = self.lock();
        doc.elements.push(element);
        notify(&mut doc, Mutation::Added { tag });
    }

    /// Remove the element with this id, notifying observers. Returns
    /// whether anything was removed.
    pub fn remove_by_id(&self, id: &str) -> bool {
        let mut doc = self.lock();
        let before = doc.elements.len();
        let mut removed_tag = None;
        doc.elements.retain(|el| {
            if el.id.as_deref() == Some(id) {
                removed_tag = Some(el.tag.clone());
                false
            } else {
                true
            }
        });
        if let Some(tag) = removed_tag {
            notify(&mut doc, Mutation::Removed { tag });
        }
        doc.elements.len() != before
    }

    pub fn element_count(&self) -> usize {
        self.lock().elements.len()
    }

    pub fn has_element_id(&self, id: &str) -> bool {
        self.lock()
            .elements
            .iter()
            .any(|el| el.id.as_deref() == Some(id))
    }

    pub fn add_style_sheet(&self, css: &str) {
        self.lock().styles.push(css.to_string());
    }

    pub fn style_sheets(&self) -> Vec<String> {
        self.lock().styles.clone()
    }

    /// Snapshot of the elements matching `selector`.
    pub fn select(&self, selector: &str) -> Vec<Element> {
        self.lock()
            .elements
            .iter()
            .filter(|el| matches(el, selector))
            .cloned()
            .collect()
    }

    pub fn count_matches(&self, selector: &str) -> usize {
        self.lock()
            .elements
            .iter()
            .filter(|el| matches(el, selector))
            .count()
    }

    /// Add a class to every match; returns the match count.
    pub fn add_class(&self, selector: &str, class: &str) -> usize {
        self.mutate_matches(selector, |el| {
            if !el.has_class(class) {
                el.classes.push(class.to_string());
            }
        })
    }

    /// Strip a class wherever it appears; returns how many elements
    /// carried it.
    pub fn remove_class(&self, class: &str) -> usize {
        let mut doc = self.lock();
        let mut stripped = 0;
        for el in doc.elements.iter_mut() {
            let before = el.classes.len();
            el.classes.retain(|c| c != class);
            if el.classes.len() != before {
                stripped += 1;
            }
        }
        stripped
    }

    /// Set an inline style property on every match; returns the count.
    pub fn set_inline_style(&self, selector: &str, property: &str, value: &str) -> usize {
        self.mutate_matches(selector, |el| {
            el.style
                .insert(property.to_string(), value.to_string());
        })
    }

    /// Clear an inline style property wherever it is set.
    pub fn clear_inline_style(&self, property: &str) {
        let mut doc = self.lock();
        for el in doc.elements.iter_mut() {
            el.style.remove(property);
        }
    }

    /// Anchor elements carrying an href.
    pub fn links(&self) -> Vec<Element> {
        self.select("a[href]")
    }

    /// Image elements carrying a src.
    pub fn images(&self) -> Vec<Element> {
        self.select("img[src]")
    }

    /// Non-empty text of the block elements the scaffold scrapes.
    pub fn text_blocks(&self) -> Vec<String> {
        self.select("p, h1, h2, h3, h4, h5, h6, li")
            .into_iter()
            .map(|el| el.text.trim().to_string())
            .filter(|text| !text.is_empty())
            .collect()
    }

    /// All element text, the textContent of the whole document.
    pub fn whole_text(&self) -> String {
        self.lock()
            .elements
            .iter()
            .map(|el| el.text.trim())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Register a childList observer.
    pub fn observe(&self) -> mpsc::UnboundedReceiver<Mutation> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().observers.push(tx);
        rx
    }

    pub fn observer_count(&self) -> usize {
        self.lock().observers.len()
    }

    /// One-shot injection guard: the first caller gets `true` and owns
    /// installation; later callers get `false`. There is no way to
    /// clear the flag short of tearing the page down.
    pub fn mark_injected(&self) -> bool {
        let mut doc = self.lock();
        if doc.injected {
            false
        } else {
            doc.injected = true;
            true
        }
    }

    pub fn is_injected(&self) -> bool {
        self.lock().injected
    }

    fn mutate_matches(&self, selector: &str, mut apply: impl FnMut(&mut Element)) -> usize {
        let mut doc = self.lock();
        let mut count = 0;
        for el in doc.elements.iter_mut() {
            if matches(el, selector) {
                apply(el);
                count += 1;
            }
        }
        count
    }

    fn lock(&self) -> MutexGuard<'_, DocInner> {
        self.inner.lock().expect("page document poisoned")
    }
}

fn notify(doc: &mut DocInner, mutation: Mutation) {
    doc.observers
        .retain(|tx| tx.send(mutation.clone()).is_ok());
}

/// Selector subset the scaffold scripts use: tag, `#id`, `.class`,
/// `tag[attr]`, `tag[attr="value"]`, and comma lists of those.
fn matches(el: &Element, selector: &str) -> bool {
    selector
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .any(|s| matches_single(el, s))
}

fn matches_single(el: &Element, selector: &str) -> bool {
    if let Some(id) = selector.strip_prefix('#') {
        return el.id.as_deref() == Some(id);
    }
    if let Some(class) = selector.strip_prefix('.') {
        return el.has_class(class);
    }
    if let Some((tag, rest)) = selector.split_once('[') {
        let cond = match rest.strip_suffix(']') {
            Some(cond) => cond,
            None => return false,
        };
        if !tag.is_empty() && el.tag != tag {
            return false;
        }
        return match cond.split_once('=') {
            Some((attr, value)) => {
                el.attrs.get(attr).map(String::as_str) == Some(value.trim_matches('"'))
            }
            None => el.attrs.contains_key(cond),
        };
    }
    el.tag == selector
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_page() -> PageDocument {
        let page = PageDocument::new("https://example.com/articles/1", "Sample");
        page.append(Element::new("h1").with_text("Heading"));
        page.append(
            Element::new("a")
                .with_attr("href", "https://example.com/next")
                .with_text("next"),
        );
        page.append(Element::new("p").with_class("lead").with_text("First paragraph"));
        page.append(Element::new("div").with_id("sidebar"));
        page
    }

    #[test]
    fn test_selector_subset() {
        let page = sample_page();
        assert_eq!(page.count_matches("p"), 1);
        assert_eq!(page.count_matches("#sidebar"), 1);
        assert_eq!(page.count_matches(".lead"), 1);
        assert_eq!(page.count_matches("a[href]"), 1);
        assert_eq!(page.count_matches("a[href=\"https://example.com/next\"]"), 1);
        assert_eq!(page.count_matches("p, h1, li"), 2);
        assert_eq!(page.count_matches("#missing"), 0);
    }

    #[test]
    fn test_domain_comes_from_the_url() {
        let page = sample_page();
        assert_eq!(page.domain(), "example.com");
        assert_eq!(PageDocument::new("not a url", "x").domain(), "");
    }

    #[tokio::test]
    async fn test_observers_see_childlist_changes() {
        let page = sample_page();
        let mut mutations = page.observe();

        page.append(Element::new("span").with_id("late"));
        assert_eq!(
            mutations.recv().await.unwrap(),
            Mutation::Added {
                tag: "span".to_string()
            }
        );

        assert!(page.remove_by_id("late"));
        assert_eq!(
            mutations.recv().await.unwrap(),
            Mutation::Removed {
                tag: "span".to_string()
            }
        );
    }

    #[test]
    fn test_injection_guard_is_one_shot() {
        let page = sample_page();
        assert!(!page.is_injected());
        assert!(page.mark_injected());
        assert!(!page.mark_injected());
        assert!(page.is_injected());
    }

    #[test]
    fn test_class_mutation_round_trip() {
        let page = sample_page();
        assert_eq!(page.add_class("p", "hl"), 1);
        assert!(page.select("p")[0].has_class("hl"));
        assert_eq!(page.remove_class("hl"), 1);
        assert!(!page.select("p")[0].has_class("hl"));
    }
}
