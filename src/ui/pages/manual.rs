//! Manual dispense page component.

use dioxus::prelude::*;

use crate::model::Drum;
use crate::ui::components::Layout;

/// Client-side JavaScript for the Manual page.
const MANUAL_SCRIPT: &str = r#"

async function dispense(drum) {
    const pills = parseInt(document.getElementById(`pills-${drum}`).value, 10);
    if (!Number.isInteger(pills) || pills < 1) {
        notice('manual-notice', 'Please enter a number of pills of at least 1.', false);
        return;
    }
    const btn = document.getElementById(`dispense-${drum}`);
    btn.setAttribute('aria-busy', 'true');
    try {
        const result = await api('POST', '/api/dispense', { drum, pills });
        notice('manual-notice', result.message || 'Dispense sent', true);
    } catch (e) {
        notice('manual-notice', e.message, false);
    } finally {
        btn.removeAttribute('aria-busy');
    }
}

function renderLogs(text) {
    document.getElementById('manual-logs').textContent = text || 'No logs yet';
}

async function loadLogs() {
    try {
        const snap = await api('GET', '/api/snapshot');
        renderLogs(snap.logs.data || snap.logs.error);
    } catch (e) {
        renderLogs(e.message);
    }
}

loadLogs();

const es = new EventSource('/events');
es.onmessage = (e) => {
    try {
        const event = JSON.parse(e.data);
        if (event.type === 'LogsUpdated') renderLogs(event.payload.logs);
        if (event.type === 'ModeChanged') showMode(event.payload.holder);
    } catch (err) { console.error('SSE parse error:', err); }
};
es.onerror = () => {
    console.warn('SSE disconnected, falling back to polling');
    es.close();
    setInterval(loadLogs, 10000);
};
"#;

/// Manual dispense page component.
#[component]
pub fn ManualPage() -> Element {
    rsx! {
        Layout {
            title: "Manual".to_string(),
            nav_active: "manual".to_string(),
            scripts: Some(MANUAL_SCRIPT.to_string()),

            hgroup {
                h1 { "Manual Dispense" }
                p { "Not available while the schedule is being edited" }
            }

            div { class: "drum-grid",
                for drum in Drum::ALL {
                    article {
                        header { strong { "Drum {drum}" } }
                        div {
                            class: "controls",
                            dangerous_inner_html: format!(
                                r#"<input type="number" id="pills-{drum}" min="1" value="1" style="max-width:6rem">
                                <button id="dispense-{drum}" onclick="dispense({drum})">Dispense</button>"#
                            )
                        }
                    }
                }
            }
            p { id: "manual-notice" }

            section {
                h2 { "Logs" }
                pre { class: "logs", id: "manual-logs", "Loading..." }
            }
        }
    }
}
