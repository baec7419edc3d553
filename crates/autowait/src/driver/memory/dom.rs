// In-memory document model
//
// Documents are built from NodeSpec trees. Each document carries a
// generation number; element handles remember the generation they were
// resolved in, so replacing a document makes every older handle stale.

use super::css::{CssSelector, ElementView};
use crate::driver::{ActionableState, ContextId};
use crate::error::Result;
use crate::protocol::{Selector, SelectorStep};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub type NodeId = u64;

/// Behaviour attached to a node, run with the document locked.
pub type Handler = Arc<dyn Fn(&mut Scope<'_>) + Send + Sync>;

/// Declarative description of an element subtree.
///
/// # Example
///
/// ```ignore
/// use autowait::driver::memory::element;
///
/// let body = element("body").child(
///     element("button")
///         .data_test("checkout")
///         .text("Checkout")
///         .on_click(|scope| scope.navigate("https://shop.test/checkout.html")),
/// );
/// ```
#[derive(Clone, Default)]
pub struct NodeSpec {
    tag: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    value: Option<String>,
    hidden: bool,
    disabled: bool,
    animating: bool,
    inert: bool,
    on_click: Option<Handler>,
    on_change: Option<Handler>,
    children: Vec<NodeSpec>,
}

/// Starts a [`NodeSpec`] for the given tag.
pub fn element(tag: &str) -> NodeSpec {
    NodeSpec {
        tag: tag.to_ascii_lowercase(),
        ..Default::default()
    }
}

impl NodeSpec {
    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| n == name) {
            Some(existing) => existing.1 = value,
            None => self.attributes.push((name.to_string(), value)),
        }
        self
    }

    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    /// Adds a class (repeatable).
    pub fn class(mut self, class: &str) -> Self {
        match self.attributes.iter_mut().find(|(n, _)| n == "class") {
            Some(existing) => {
                existing.1.push(' ');
                existing.1.push_str(class);
            }
            None => self.attributes.push(("class".to_string(), class.to_string())),
        }
        self
    }

    pub fn data_test(self, value: &str) -> Self {
        self.attr("data-test", value)
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Initial value of an input, or the selected value of a select.
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Marks the subtree as mid-animation (not stable).
    pub fn animating(mut self, animating: bool) -> Self {
        self.animating = animating;
        self
    }

    /// Marks the subtree as covered, so it does not receive pointer events.
    pub fn inert(mut self, inert: bool) -> Self {
        self.inert = inert;
        self
    }

    pub fn child(mut self, child: NodeSpec) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = NodeSpec>) -> Self {
        self.children.extend(children);
        self
    }

    /// Click handler. Clicks bubble: every handler from the target up to the
    /// root runs, innermost first.
    pub fn on_click(mut self, handler: impl Fn(&mut Scope<'_>) + Send + Sync + 'static) -> Self {
        self.on_click = Some(Arc::new(handler));
        self
    }

    /// Handler run after `fill` or `select_options` changed the value.
    pub fn on_change(mut self, handler: impl Fn(&mut Scope<'_>) + Send + Sync + 'static) -> Self {
        self.on_change = Some(Arc::new(handler));
        self
    }
}

impl fmt::Debug for NodeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeSpec")
            .field("tag", &self.tag)
            .field("attributes", &self.attributes)
            .field("text", &self.text)
            .field("children", &self.children.len())
            .finish()
    }
}

pub(crate) struct Node {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: String,
    value: String,
    hidden: bool,
    disabled: bool,
    animating: bool,
    inert: bool,
    on_click: Option<Handler>,
    on_change: Option<Handler>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// One loaded document.
pub struct Document {
    generation: u64,
    root: NodeId,
    nodes: HashMap<NodeId, Node>,
    next_node: NodeId,
}

impl Document {
    /// Builds a document whose root holds `body`.
    pub fn new(generation: u64, body: NodeSpec) -> Self {
        let mut document = Self {
            generation,
            root: 0,
            nodes: HashMap::new(),
            next_node: 0,
        };
        let root = document.insert(None, element("#document"));
        document.root = root;
        document.insert(Some(root), body);
        document
    }

    /// An empty `about:blank` document.
    pub fn blank(generation: u64) -> Self {
        Self::new(generation, element("body"))
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn contains(&self, node: NodeId) -> bool {
        node != self.root && self.nodes.contains_key(&node)
    }

    fn insert(&mut self, parent: Option<NodeId>, spec: NodeSpec) -> NodeId {
        let id = self.next_node;
        self.next_node += 1;

        let NodeSpec {
            tag,
            attributes,
            text,
            value,
            hidden,
            disabled,
            animating,
            inert,
            on_click,
            on_change,
            children,
        } = spec;
        let attributes: BTreeMap<String, String> = attributes.into_iter().collect();
        let value = value
            .or_else(|| attributes.get("value").cloned())
            .unwrap_or_default();

        self.nodes.insert(
            id,
            Node {
                tag,
                attributes,
                text: text.unwrap_or_default(),
                value,
                hidden,
                disabled,
                animating,
                inert,
                on_click,
                on_change,
                parent,
                children: Vec::new(),
            },
        );
        if let Some(parent) = parent {
            if let Some(parent_node) = self.nodes.get_mut(&parent) {
                parent_node.children.push(id);
            }
        }
        for child in children {
            self.insert(Some(id), child);
        }

        // A select without an explicit value shows its first option.
        if self.nodes[&id].tag == "select" && self.nodes[&id].value.is_empty() {
            if let Some((_, value, _)) = self.options_of(id).into_iter().next() {
                if let Some(node) = self.nodes.get_mut(&id) {
                    node.value = value;
                }
            }
        }
        id
    }

    fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            order.push(id);
            if let Some(node) = self.nodes.get(&id) {
                stack.extend(node.children.iter().rev());
            }
        }
        order
    }

    fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.nodes.get(&node).and_then(|n| n.parent), |id| {
            self.nodes.get(id).and_then(|n| n.parent)
        })
    }

    // The node itself, then its ancestors up to (excluding) the root.
    fn self_and_ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::once(node)
            .chain(self.ancestors(node))
            .filter(move |id| *id != self.root)
    }

    /// Resolves a selector chain against this document.
    pub fn resolve(&self, selector: &Selector) -> Result<Vec<NodeId>> {
        if selector.is_empty() {
            return Ok(Vec::new());
        }
        let mut current = vec![self.root];
        for step in selector.steps() {
            current = match step {
                SelectorStep::Css(css) => {
                    let css = CssSelector::parse(css)?;
                    self.query_within(&current, &css)
                }
                SelectorStep::Parent => {
                    let parents: HashSet<NodeId> = current
                        .iter()
                        .filter_map(|id| self.nodes.get(id).and_then(|n| n.parent))
                        .filter(|id| *id != self.root)
                        .collect();
                    self.preorder()
                        .into_iter()
                        .filter(|id| parents.contains(id))
                        .collect()
                }
                SelectorStep::Nth(index) => {
                    let len = current.len() as i64;
                    let index = if *index < 0 {
                        len + i64::from(*index)
                    } else {
                        i64::from(*index)
                    };
                    if (0..len).contains(&index) {
                        vec![current[index as usize]]
                    } else {
                        Vec::new()
                    }
                }
            };
        }
        Ok(current)
    }

    /// Elements matching `css` that descend from any node in `scope`.
    pub(crate) fn query_within(&self, scope: &[NodeId], css: &CssSelector) -> Vec<NodeId> {
        let scope: HashSet<NodeId> = scope.iter().copied().collect();
        self.preorder()
            .into_iter()
            .filter(|id| *id != self.root)
            .filter(|id| self.ancestors(*id).any(|a| scope.contains(&a)))
            .filter(|id| css.matches(self, *id))
            .collect()
    }

    fn query_css(&self, css: &str) -> Vec<NodeId> {
        match CssSelector::parse(css) {
            Ok(css) => self.query_within(&[self.root], &css),
            Err(e) => {
                tracing::warn!("Ignoring selector in page script: {}", e);
                Vec::new()
            }
        }
    }

    pub(crate) fn state(&self, node: NodeId) -> ActionableState {
        let Some(current) = self.nodes.get(&node) else {
            return ActionableState::detached();
        };
        ActionableState {
            attached: self.contains(node),
            visible: self.is_visible(node),
            stable: !self.self_and_ancestors(node).any(|id| self.nodes[&id].animating),
            enabled: !current.disabled,
            receives_events: !self.self_and_ancestors(node).any(|id| self.nodes[&id].inert),
        }
    }

    pub(crate) fn is_visible(&self, node: NodeId) -> bool {
        self.contains(node) && !self.self_and_ancestors(node).any(|id| self.nodes[&id].hidden)
    }

    pub(crate) fn text_content(&self, node: NodeId) -> String {
        let Some(current) = self.nodes.get(&node) else {
            return String::new();
        };
        let mut text = current.text.clone();
        for child in &current.children {
            text.push_str(&self.text_content(*child));
        }
        text
    }

    pub(crate) fn inner_text(&self, node: NodeId) -> String {
        if !self.is_visible(node) {
            return String::new();
        }
        let current = &self.nodes[&node];
        let mut parts = Vec::new();
        if !current.text.trim().is_empty() {
            parts.push(current.text.trim().to_string());
        }
        for child in &current.children {
            let text = self.inner_text(*child);
            if !text.is_empty() {
                parts.push(text);
            }
        }
        parts.join("\n")
    }

    pub(crate) fn tag_of(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(&node).map(|n| n.tag.as_str())
    }

    pub(crate) fn attribute_of(&self, node: NodeId, name: &str) -> Option<&str> {
        self.nodes
            .get(&node)
            .and_then(|n| n.attributes.get(name))
            .map(String::as_str)
    }

    pub(crate) fn value_of(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(&node).map(|n| n.value.as_str())
    }

    pub(crate) fn set_value(&mut self, node: NodeId, value: String) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.value = value;
        }
    }

    /// (index, value, label) of every option below a select.
    pub(crate) fn options_of(&self, select: NodeId) -> Vec<(usize, String, String)> {
        let Ok(css) = CssSelector::parse("option") else {
            return Vec::new();
        };
        self.query_within(&[select], &css)
            .into_iter()
            .enumerate()
            .map(|(index, id)| {
                let node = &self.nodes[&id];
                let label = self.text_content(id).trim().to_string();
                let value = node
                    .attributes
                    .get("value")
                    .cloned()
                    .unwrap_or_else(|| label.clone());
                (index, value, label)
            })
            .collect()
    }

    pub(crate) fn click_handlers(&self, node: NodeId) -> Vec<Handler> {
        self.self_and_ancestors(node)
            .filter_map(|id| self.nodes[&id].on_click.clone())
            .collect()
    }

    pub(crate) fn change_handler(&self, node: NodeId) -> Option<Handler> {
        self.nodes.get(&node).and_then(|n| n.on_change.clone())
    }

    /// Nearest enclosing `<a href>` as (href, opens-new-context).
    pub(crate) fn enclosing_link(&self, node: NodeId) -> Option<(String, bool)> {
        self.self_and_ancestors(node).find_map(|id| {
            let n = &self.nodes[&id];
            if n.tag != "a" {
                return None;
            }
            let href = n.attributes.get("href")?;
            let blank = n.attributes.get("target").is_some_and(|t| t == "_blank");
            Some((href.clone(), blank))
        })
    }

    fn remove(&mut self, node: NodeId) {
        let Some(removed) = self.nodes.remove(&node) else {
            return;
        };
        if let Some(parent) = removed.parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|c| *c != node);
        }
        for child in removed.children {
            self.remove(child);
        }
    }
}

impl ElementView for Document {
    type Id = NodeId;

    fn tag(&self, node: NodeId) -> &str {
        self.nodes.get(&node).map(|n| n.tag.as_str()).unwrap_or("")
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.attribute_of(node, name)
    }

    fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        self.nodes
            .get(&node)
            .and_then(|n| n.parent)
            .filter(|p| *p != self.root)
    }
}

/// Deferred effects requested by page scripts.
pub(crate) enum Effect {
    Rerender,
    Navigate(String),
    OpenContext(String),
    After(Duration, Handler),
}

/// What a page script can see and do.
///
/// DOM edits apply immediately. Re-rendering, navigation, opening contexts
/// and timers run after the script returns.
pub struct Scope<'a> {
    context: &'a ContextId,
    url: &'a str,
    document: &'a mut Document,
    target: Option<NodeId>,
    effects: Vec<Effect>,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(
        context: &'a ContextId,
        url: &'a str,
        document: &'a mut Document,
        target: Option<NodeId>,
    ) -> Self {
        Self {
            context,
            url,
            document,
            target,
            effects: Vec::new(),
        }
    }

    pub(crate) fn into_effects(self) -> Vec<Effect> {
        self.effects
    }

    pub fn context(&self) -> &ContextId {
        self.context
    }

    pub fn url(&self) -> &str {
        self.url
    }

    /// Current value of the element the event was dispatched to.
    pub fn target_value(&self) -> Option<String> {
        self.target
            .and_then(|t| self.document.value_of(t))
            .map(str::to_string)
    }

    /// Value of the first element matching `css`.
    pub fn value_of(&self, css: &str) -> Option<String> {
        let node = *self.document.query_css(css).first()?;
        self.document.value_of(node).map(str::to_string)
    }

    /// Text content of the first element matching `css`.
    pub fn text_of(&self, css: &str) -> Option<String> {
        let node = *self.document.query_css(css).first()?;
        Some(self.document.text_content(node))
    }

    /// Number of elements matching `css`.
    pub fn count(&self, css: &str) -> usize {
        self.document.query_css(css).len()
    }

    fn update(&mut self, css: &str, apply: impl Fn(&mut Node)) -> usize {
        let targets = self.document.query_css(css);
        for id in &targets {
            if let Some(node) = self.document.nodes.get_mut(id) {
                apply(node);
            }
        }
        targets.len()
    }

    pub fn set_text(&mut self, css: &str, text: &str) -> usize {
        self.update(css, |node| node.text = text.to_string())
    }

    pub fn set_attribute(&mut self, css: &str, name: &str, value: &str) -> usize {
        self.update(css, |node| {
            node.attributes.insert(name.to_string(), value.to_string());
        })
    }

    pub fn set_hidden(&mut self, css: &str, hidden: bool) -> usize {
        self.update(css, |node| node.hidden = hidden)
    }

    pub fn set_disabled(&mut self, css: &str, disabled: bool) -> usize {
        self.update(css, |node| node.disabled = disabled)
    }

    pub fn set_animating(&mut self, css: &str, animating: bool) -> usize {
        self.update(css, |node| node.animating = animating)
    }

    pub fn set_inert(&mut self, css: &str, inert: bool) -> usize {
        self.update(css, |node| node.inert = inert)
    }

    /// Detaches every element matching `css`.
    pub fn remove(&mut self, css: &str) -> usize {
        let targets = self.document.query_css(css);
        for id in &targets {
            self.document.remove(*id);
        }
        targets.len()
    }

    /// Appends `spec` to the first element matching `parent_css`.
    pub fn append(&mut self, parent_css: &str, spec: NodeSpec) -> bool {
        match self.document.query_css(parent_css).first() {
            Some(parent) => {
                let parent = *parent;
                self.document.insert(Some(parent), spec);
                true
            }
            None => false,
        }
    }

    /// Replaces the document with a fresh render of the current URL,
    /// without a navigation.
    pub fn rerender(&mut self) {
        self.effects.push(Effect::Rerender);
    }

    pub fn navigate(&mut self, url: impl Into<String>) {
        self.effects.push(Effect::Navigate(url.into()));
    }

    /// Opens a new context (popup) with this one as its opener.
    pub fn open_context(&mut self, url: impl Into<String>) {
        self.effects.push(Effect::OpenContext(url.into()));
    }

    /// Runs `handler` against this context after `delay`.
    pub fn after(
        &mut self,
        delay: Duration,
        handler: impl Fn(&mut Scope<'_>) + Send + Sync + 'static,
    ) {
        self.effects.push(Effect::After(delay, Arc::new(handler)));
    }
}
