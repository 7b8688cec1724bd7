//! In-page scripts used by `ChromiumPage`
//!
//! Snapshot scripts tag every reported element with a `data-mab-ref`
//! attribute so later actions can address it by selector.

pub(crate) const REF_ATTRIBUTE: &str = "data-mab-ref";

const PRELUDE: &str = r#"
  const clean = (s) => String(s || '').replace(/\s+/g, ' ').trim();
  const ref = (el) => {
    if (!el.dataset.mabRef) {
      window.__mabSeq = (window.__mabSeq || 0) + 1;
      el.dataset.mabRef = 'm' + window.__mabSeq;
    }
    return el.dataset.mabRef;
  };
  const visible = (el) => {
    const r = el.getBoundingClientRect();
    const st = window.getComputedStyle(el);
    return r.width > 0 && r.height > 0 && st.visibility !== 'hidden' && st.display !== 'none';
  };
  const cls = (el) => String(typeof el.className === 'string' ? el.className : (el.className && el.className.baseVal) || '').toLowerCase();
"#;

const INPUTS_BODY: &str = r#"
  const labelOf = (el) => {
    if (el.id) {
      const l = document.querySelector('label[for="' + CSS.escape(el.id) + '"]');
      if (l) return clean(l.innerText);
    }
    const wrap = el.closest('label');
    if (wrap) return clean(wrap.innerText);
    const aria = el.getAttribute('aria-label');
    if (aria) return clean(aria);
    const by = el.getAttribute('aria-labelledby');
    if (by) {
      const l = document.getElementById(by);
      if (l) return clean(l.innerText);
    }
    let node = el;
    for (let depth = 0; node && depth < 4; depth++) {
      let prev = node.previousElementSibling;
      while (prev) {
        const t = clean(prev.innerText);
        if (t) return t.slice(0, 200);
        prev = prev.previousElementSibling;
      }
      node = node.parentElement;
    }
    return clean(el.getAttribute('placeholder'));
  };
  const sectionOf = (el) => {
    const box = el.closest('fieldset, section, [role="group"], [role="region"], .section, .card, .panel');
    if (!box) return '';
    const head = box.querySelector('legend, h1, h2, h3, h4, h5, h6, [class*="title"], [class*="heading"]');
    return head ? clean(head.innerText).slice(0, 200) : '';
  };
  const selector = 'input:not([type=hidden]):not([type=checkbox]):not([type=radio]):not([type=submit]):not([type=button]), textarea';
  return Array.from(document.querySelectorAll(selector)).map((el) => ({
    element: ref(el),
    label: labelOf(el),
    section: sectionOf(el),
    kind: String(el.type || 'text').toLowerCase(),
    name: el.name || '',
    value: el.value || '',
    visible: visible(el),
  }));
"#;

const CONTROLS_BODY: &str = r#"
  const isGreen = (el) => {
    if (/green|success/.test(cls(el))) return true;
    const m = window.getComputedStyle(el).backgroundColor.match(/\d+/g);
    if (!m || m.length < 3) return false;
    const [r, g, b] = m.map(Number);
    return g > 120 && g > r + 40 && g > b + 20;
  };
  const hasPlay = (el) => /play/.test(cls(el)) ||
    !!el.querySelector('[class*="play"], [data-icon*="play"], [data-testid*="play"], [aria-label*="play" i]');
  const selector = 'button, a[href], [role="button"], input[type=submit], input[type=button], tr, [role="row"], [data-href]';
  return Array.from(document.querySelectorAll(selector)).map((el) => {
    const tag = el.tagName.toLowerCase();
    const kind = (tag === 'tr' || el.getAttribute('role') === 'row') ? 'row' : (tag === 'a' ? 'link' : 'button');
    const text = clean(el.innerText || el.value || el.getAttribute('aria-label') || el.title);
    return {
      element: ref(el),
      kind,
      text,
      isSubmit: String(el.type || '').toLowerCase() === 'submit',
      green: isGreen(el),
      hasPlayIcon: hasPlay(el),
      inDialog: !!el.closest('[role="dialog"], [role="alertdialog"], dialog, .modal'),
      visible: visible(el),
    };
  }).filter((c) => c.kind !== 'row' || c.text);
"#;

const TABLES_BODY: &str = r#"
  const htmlTable = (t) => {
    const cells = (row) => Array.from(row.cells).map((c) => clean(c.innerText));
    let rows = Array.from(t.rows);
    let header = [];
    const head = t.tHead && t.tHead.rows[0];
    if (head) {
      header = cells(head);
      rows = rows.filter((r) => r.parentElement !== t.tHead);
    } else if (rows.length) {
      header = cells(rows[0]);
      rows = rows.slice(1);
    }
    return { element: ref(t), table: { header, rows: rows.map(cells) } };
  };
  const ariaTable = (t) => {
    const cellSel = '[role="columnheader"], [role="rowheader"], [role="cell"], [role="gridcell"]';
    const rows = Array.from(t.querySelectorAll('[role="row"]'))
      .map((r) => Array.from(r.querySelectorAll(cellSel)).map((c) => clean(c.innerText)));
    const header = rows.length ? rows[0] : [];
    return { element: ref(t), table: { header, rows: rows.slice(1) } };
  };
  return Array.from(document.querySelectorAll('table')).map(htmlTable)
    .concat(Array.from(document.querySelectorAll('[role="table"], [role="grid"]')).filter((t) => t.tagName !== 'TABLE').map(ariaTable));
"#;

fn wrap(body: &str) -> String {
    format!("(() => {{{PRELUDE}{body}}})()")
}

pub(crate) fn inputs() -> String {
    wrap(INPUTS_BODY)
}

pub(crate) fn controls() -> String {
    wrap(CONTROLS_BODY)
}

pub(crate) fn tables() -> String {
    wrap(TABLES_BODY)
}

pub(crate) const PAGE_TEXT: &str = "document.body ? document.body.innerText : ''";

pub(crate) const SCROLL_TO_BOTTOM: &str =
    "(() => { window.scrollTo(0, document.body ? document.body.scrollHeight : 0); return true; })()";

pub(crate) const IDLE_PROBE: &str = r#"(() => ({
  ready: document.readyState === 'complete',
  resources: performance.getEntriesByType('resource').length,
}))()"#;

/// Selector for an element tagged by a snapshot
pub(crate) fn selector(element_ref: &str) -> String {
    format!("[{REF_ATTRIBUTE}=\"{element_ref}\"]")
}

fn quoted_selector(element_ref: &str) -> String {
    // serde_json string encoding doubles as a JS string literal
    serde_json::Value::String(selector(element_ref)).to_string()
}

pub(crate) fn select_all(element_ref: &str) -> String {
    format!(
        r"(() => {{
  const el = document.querySelector({sel});
  if (!el) return false;
  el.focus();
  if (typeof el.select === 'function') el.select(); else document.execCommand('selectAll');
  return true;
}})()",
        sel = quoted_selector(element_ref)
    )
}

pub(crate) fn native_clear(element_ref: &str) -> String {
    format!(
        r"(() => {{
  const el = document.querySelector({sel});
  if (!el) return false;
  const proto = el instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
  const setter = Object.getOwnPropertyDescriptor(proto, 'value').set;
  setter.call(el, '');
  el.dispatchEvent(new Event('input', {{ bubbles: true }}));
  el.dispatchEvent(new Event('change', {{ bubbles: true }}));
  return true;
}})()",
        sel = quoted_selector(element_ref)
    )
}

pub(crate) fn read_value(element_ref: &str) -> String {
    format!(
        r"(() => {{
  const el = document.querySelector({sel});
  return el ? String(el.value ?? '') : null;
}})()",
        sel = quoted_selector(element_ref)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_are_quoted() {
        assert_eq!(selector("m12"), r#"[data-mab-ref="m12"]"#);
        assert!(read_value("m12").contains(r#"document.querySelector("[data-mab-ref=\"m12\"]")"#));
    }

    #[test]
    fn snapshot_scripts_are_iifes() {
        for script in [inputs(), controls(), tables()] {
            assert!(script.starts_with("(() => {"));
            assert!(script.ends_with("})()"));
            assert!(script.contains("const ref"));
        }
    }
}
