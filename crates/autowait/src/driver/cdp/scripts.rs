// In-page scripts evaluated through Runtime.evaluate
//
// Every script is an async arrow function invoked with JSON arguments and
// evaluated with returnByValue. Element scripts resolve their target from
// the `window.__autowait` registry and answer `{stale: true}` when the node
// is gone or the document was replaced, `{error: "..."}` on misuse and
// `{value: ...}` otherwise.

use crate::error::Result;
use serde_json::Value;

/// Resolves a selector chain. Arguments: the steps as
/// `{css}` / `{parent: true}` / `{nth}` objects.
pub(crate) const QUERY: &str = r#"async (steps) => {
  const aw = window.__autowait || (window.__autowait = {
    doc: Math.floor(Math.random() * 9007199254740991),
    next: 1,
    map: new Map(),
  });
  const ordered = (nodes) => [...new Set(nodes)].sort((a, b) =>
    a === b ? 0 : (a.compareDocumentPosition(b) & Node.DOCUMENT_POSITION_FOLLOWING ? -1 : 1));
  let current = steps.length ? [document] : [];
  for (const step of steps) {
    if (step.css !== undefined) {
      current = ordered(current.flatMap((scope) => [...scope.querySelectorAll(step.css)]));
    } else if (step.parent) {
      current = ordered(current.map((el) => el.parentElement).filter((el) => el));
    } else {
      const index = step.nth < 0 ? current.length + step.nth : step.nth;
      current = index >= 0 && index < current.length ? [current[index]] : [];
    }
  }
  const ids = current.map((el) => {
    for (const [id, ref] of aw.map) {
      if (ref.deref() === el) return id;
    }
    const id = aw.next++;
    aw.map.set(id, new WeakRef(el));
    return id;
  });
  return { value: { doc: aw.doc, ids } };
}"#;

const LOOKUP: &str = r#"const aw = window.__autowait;
  const el = aw && aw.doc === doc ? aw.map.get(id)?.deref() : undefined;
  if (!el || !el.isConnected) return { stale: true };"#;

const STATE: &str = r#"const frame = () => new Promise((resolve) => {
    requestAnimationFrame(() => resolve());
    setTimeout(resolve, 100);
  });
  const style = getComputedStyle(el);
  const box = () => el.getBoundingClientRect();
  const visible = typeof el.checkVisibility === 'function'
    ? el.checkVisibility({ visibilityProperty: true }) && box().width > 0 && box().height > 0
    : style.visibility !== 'hidden' && box().width > 0 && box().height > 0;
  if (visible) el.scrollIntoView({ block: 'center', inline: 'center', behavior: 'instant' });
  await frame();
  const first = box();
  await frame();
  const second = box();
  const stable = first.x === second.x && first.y === second.y
    && first.width === second.width && first.height === second.height;
  const enabled = !el.matches(':disabled') && el.getAttribute('aria-disabled') !== 'true';
  let receives_events = false;
  if (visible) {
    const hit = document.elementFromPoint(
      second.x + second.width / 2,
      second.y + second.height / 2,
    );
    receives_events = !!hit && (hit === el || el.contains(hit));
  }
  return { value: { attached: true, visible, stable, enabled, receives_events } };"#;

const CENTER: &str = r#"el.scrollIntoView({
    block: 'center',
    inline: 'center',
    behavior: 'instant',
  });
  const rect = el.getBoundingClientRect();
  return { value: { x: rect.x + rect.width / 2, y: rect.y + rect.height / 2 } };"#;

const TEXT_CONTENT: &str = "return { value: el.textContent };";

const INNER_TEXT: &str = "return { value: el.innerText };";

const ATTRIBUTE: &str = "return { value: el.getAttribute(arg) };";

const INPUT_VALUE: &str = r#"if (!['INPUT', 'TEXTAREA', 'SELECT'].includes(el.tagName))
    return { error: 'Node is not an <input>, <textarea> or <select> element' };
  return { value: el.value };"#;

// Focuses and selects the current content so the next insertText replaces it.
// An empty fill clears the value directly.
const PREPARE_FILL: &str = r#"const editable = el.isContentEditable;
  if (!['INPUT', 'TEXTAREA'].includes(el.tagName) && !editable)
    return { error: 'Element is not an <input>, <textarea> or [contenteditable] element' };
  el.focus();
  if (editable) {
    const range = document.createRange();
    range.selectNodeContents(el);
    const selection = window.getSelection();
    selection.removeAllRanges();
    selection.addRange(range);
  } else {
    el.select();
  }
  if (arg === '') {
    if (editable) el.textContent = ''; else el.value = '';
    el.dispatchEvent(new Event('input', { bubbles: true }));
    el.dispatchEvent(new Event('change', { bubbles: true }));
    return { value: false };
  }
  return { value: true };"#;

const SELECT_OPTIONS: &str = r#"if (el.tagName !== 'SELECT')
    return { error: 'Element is not a <select> element' };
  if (arg.length > 1 && !el.multiple)
    return { error: 'Cannot select multiple options on a single <select>' };
  const options = [...el.options];
  const picked = [];
  for (const wanted of arg) {
    const found = options.find((option, index) =>
      (wanted.value !== undefined && option.value === wanted.value)
      || (wanted.label !== undefined && option.label.trim() === wanted.label.trim())
      || (wanted.index !== undefined && index === wanted.index));
    if (!found) return { error: 'No option matching ' + JSON.stringify(wanted) };
    picked.push(found);
  }
  for (const option of options) option.selected = picked.includes(option);
  el.dispatchEvent(new Event('input', { bubbles: true }));
  el.dispatchEvent(new Event('change', { bubbles: true }));
  return { value: picked.map((option) => option.value) };"#;

/// Current URL and ready state of the document.
pub(crate) const PAGE_STATE: &str =
    "({ value: { url: location.href, readyState: document.readyState } })";

/// Element operations, each run against one registered node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ElementScript {
    State,
    Center,
    TextContent,
    InnerText,
    Attribute,
    InputValue,
    PrepareFill,
    SelectOptions,
}

impl ElementScript {
    fn body(self) -> &'static str {
        match self {
            ElementScript::State => STATE,
            ElementScript::Center => CENTER,
            ElementScript::TextContent => TEXT_CONTENT,
            ElementScript::InnerText => INNER_TEXT,
            ElementScript::Attribute => ATTRIBUTE,
            ElementScript::InputValue => INPUT_VALUE,
            ElementScript::PrepareFill => PREPARE_FILL,
            ElementScript::SelectOptions => SELECT_OPTIONS,
        }
    }

    /// Expression invoking this script on node `id` of document `doc`.
    pub(crate) fn expression(self, doc: u64, id: u64, arg: &Value) -> Result<String> {
        Ok(format!(
            "(async (doc, id, arg) => {{\n  {}\n  {}\n}})({}, {}, {})",
            LOOKUP,
            self.body(),
            doc,
            id,
            serde_json::to_string(arg)?
        ))
    }
}

/// Expression invoking [`QUERY`] with the given steps.
pub(crate) fn query_expression(steps: &Value) -> Result<String> {
    Ok(format!("({})({})", QUERY, serde_json::to_string(steps)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_element_expression_embeds_arguments() {
        let expression = ElementScript::Attribute
            .expression(17, 3, &json!("data-test"))
            .unwrap();
        assert!(expression.ends_with("})(17, 3, \"data-test\")"), "{expression}");
        assert!(expression.contains("el.getAttribute(arg)"));
        assert!(expression.contains("return { stale: true }"));
    }

    #[test]
    fn test_query_expression_serializes_steps() {
        let expression =
            query_expression(&json!([{"css": "[data-test=\"title\"]"}, {"nth": -1}])).unwrap();
        assert!(expression.contains(r#"{"css":"[data-test=\"title\"]"}"#), "{expression}");
    }
}
