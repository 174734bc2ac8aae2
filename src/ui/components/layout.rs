//! Layout component wrapping all pages with Pico CSS and common elements.

use dioxus::prelude::*;

use super::nav::Nav;

/// Shared JavaScript utilities (XSS-safe escaping, JSON calls, notices).
const SHARED_JS: &str = r#"
function esc(s) { return String(s ?? '').replace(/[&<>"']/g, c => ({'&':'&amp;','<':'&lt;','>':'&gt;','"':'&quot;',"'":'&#39;'})[c]); }

// Calls a console endpoint; throws with the server's error text on failure.
async function api(method, url, body) {
    const opts = { method, headers: {} };
    if (body !== undefined) {
        opts.headers['Content-Type'] = 'application/json';
        opts.body = JSON.stringify(body);
    }
    const res = await fetch(url, opts);
    const data = await res.json().catch(() => ({}));
    if (!res.ok) {
        const err = new Error(data.error || `HTTP ${res.status}`);
        err.kind = data.kind;
        throw err;
    }
    return data;
}

function notice(id, text, ok) {
    const el = document.getElementById(id);
    if (!el) return;
    el.className = ok ? 'status-ok' : 'status-err';
    el.textContent = text;
}

function showMode(holder) {
    const el = document.getElementById('mode-holder');
    if (!el) return;
    el.textContent = holder ? `Locked: ${holder}` : '';
}
"#;

/// Fills the footer mode indicator once the page has loaded.
const MODE_JS: &str = r#"
fetch('/api/mode').then(r => r.json()).then(m => showMode(m.holder)).catch(() => {});
"#;

/// CSS styles for the application (extends Pico CSS).
const CUSTOM_STYLES: &str = r#"
:root { --pico-font-size: 15px; }
.status-ok { color: var(--pico-ins-color); }
.status-err { color: var(--pico-del-color); }
.drum-grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(320px, 1fr)); gap: 1rem; }
.controls { display: flex; gap: 0.5rem; margin-top: 0.5rem; }
.controls button { margin: 0; padding: 0.5rem 1rem; }
.fill-bar { height: 0.6rem; background: var(--pico-muted-border-color); border-radius: 0.3rem; overflow: hidden; }
.fill-bar > span { display: block; height: 100%; background: var(--pico-primary-background); }
pre.logs { max-height: 24rem; overflow: auto; font-size: 0.8rem; white-space: pre-wrap; }
#mode-holder { font-size: 0.8rem; color: var(--pico-muted-color); }
small { color: var(--pico-muted-color); }
"#;

#[derive(Props, Clone, PartialEq)]
pub struct LayoutProps {
    /// Page title (shown in browser tab)
    pub title: String,
    /// Active navigation item ID
    pub nav_active: String,
    /// Page content
    pub children: Element,
    /// Optional additional scripts to include
    #[props(default)]
    pub scripts: Option<String>,
}

/// Main layout component wrapping all pages.
#[component]
pub fn Layout(props: LayoutProps) -> Element {
    let version = env!("PDC_VERSION");

    rsx! {
        head {
            meta { charset: "utf-8" }
            meta { name: "viewport", content: "width=device-width, initial-scale=1" }
            title { "{props.title} - Pill Dispenser" }
            link {
                rel: "stylesheet",
                href: "https://cdn.jsdelivr.net/npm/@picocss/pico@2/css/pico.min.css"
            }
            style { {CUSTOM_STYLES} }
            script { dangerous_inner_html: SHARED_JS }
        }
        body {
            header { class: "container",
                Nav { active: props.nav_active.clone() }
            }
            main { class: "container",
                {props.children}
            }
            footer {
                class: "container",
                style: "display:flex;justify-content:space-between;align-items:center;",
                small { "Pill Dispenser Console v{version}" }
                span { id: "mode-holder" }
            }
            script { dangerous_inner_html: MODE_JS }
            if let Some(scripts) = props.scripts {
                script { dangerous_inner_html: "{scripts}" }
            }
        }
    }
}
